//! CLI error handling with user-friendly messages.

use std::fmt;
use std::path::PathBuf;
use std::process;

use geotiles::config::ConfigFileError;
use geotiles::generate::GenerateError;
use geotiles::sink::SinkError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(std::io::Error),
    /// Configuration file error
    Config(ConfigFileError),
    /// Bad command-line value
    Usage(String),
    /// Input dump does not exist
    InputMissing(PathBuf),
    /// Output path is already taken
    OutputExists(PathBuf),
    /// Failed to create the output
    Sink(SinkError),
    /// Generation failed
    Generate(GenerateError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::OutputExists(_) = self {
            eprintln!();
            eprintln!("Output is never overwritten. Remove it or choose another path.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::InputMissing(path) => {
                write!(f, "Input dump '{}' does not exist", path.display())
            }
            CliError::OutputExists(path) => {
                write!(f, "Output '{}' already exists", path.display())
            }
            CliError::Sink(e) => write!(f, "Failed to create output: {}", e),
            CliError::Generate(e) => write!(f, "Generation failed: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::LoggingInit(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Sink(e) => Some(e),
            CliError::Generate(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<SinkError> for CliError {
    fn from(e: SinkError) -> Self {
        match e {
            SinkError::AlreadyExists(path) => CliError::OutputExists(path),
            other => CliError::Sink(other),
        }
    }
}

impl From<GenerateError> for CliError {
    fn from(e: GenerateError) -> Self {
        CliError::Generate(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_sink_path_maps_to_output_exists() {
        let err: CliError = SinkError::AlreadyExists(PathBuf::from("out.mbtiles")).into();
        assert!(matches!(err, CliError::OutputExists(_)));
        assert_eq!(err.to_string(), "Output 'out.mbtiles' already exists");
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: CliError = SinkError::Io(io).into();
        assert!(matches!(err, CliError::Sink(_)));
        assert!(err.source().is_some());
        assert!(CliError::Usage("bad".to_string()).source().is_none());
    }
}
