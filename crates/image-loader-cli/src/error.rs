//! Error types for the loader CLI

use std::fmt;

#[derive(Debug)]
pub enum CliError {
    Config(String),
    Fetcher(Box<http_blob_fetch::FetchError>),
    Io(Box<std::io::Error>),
    Image(Box<image::ImageError>),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Fetcher(err) => write!(f, "Fetcher error: {}", err),
            CliError::Io(err) => write!(f, "IO error: {}", err),
            CliError::Image(err) => write!(f, "Image error: {}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Fetcher(err) => Some(err.as_ref()),
            CliError::Io(err) => Some(err.as_ref()),
            CliError::Image(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<http_blob_fetch::FetchError> for CliError {
    fn from(err: http_blob_fetch::FetchError) -> Self {
        CliError::Fetcher(Box::new(err))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(Box::new(err))
    }
}

impl From<image::ImageError> for CliError {
    fn from(err: image::ImageError) -> Self {
        CliError::Image(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for CliError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        CliError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = CliError::Config("missing URI arguments".to_string());
        assert_eq!(
            format!("{}", err),
            "Configuration error: missing URI arguments"
        );
    }

    #[test]
    fn test_io_error_display() {
        let err = CliError::from(std::io::Error::other("output dir gone"));
        assert!(format!("{}", err).contains("output dir gone"));
    }

    #[test]
    fn test_error_is_debug() {
        let err = CliError::Config("test".to_string());
        assert!(format!("{:?}", err).contains("Config"));
    }
}
