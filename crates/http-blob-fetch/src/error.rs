//! Error types for blob fetching

use std::fmt;

#[derive(Debug)]
pub enum FetchError {
    Http(Box<reqwest::Error>),
    Status(reqwest::StatusCode),
    Io(Box<std::io::Error>),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Http(err) => write!(f, "HTTP error: {}", err),
            FetchError::Status(status) => write!(f, "Unexpected status: {}", status),
            FetchError::Io(err) => write!(f, "I/O error during transfer: {}", err),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Http(err) => Some(err.as_ref()),
            FetchError::Io(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(Box::new(err))
    }
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = FetchError::Status(reqwest::StatusCode::NOT_FOUND);
        assert_eq!(format!("{}", err), "Unexpected status: 404 Not Found");
    }

    #[test]
    fn test_io_error_display() {
        let err = FetchError::from(std::io::Error::other("connection reset"));
        assert!(format!("{}", err).contains("connection reset"));
    }

    #[test]
    fn test_error_is_debug() {
        let err = FetchError::Status(reqwest::StatusCode::BAD_GATEWAY);
        assert!(format!("{:?}", err).contains("Status"));
    }
}
