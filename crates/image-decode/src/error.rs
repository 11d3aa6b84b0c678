//! Error types for image decoding

use std::fmt;

#[derive(Debug)]
pub enum DecodeError {
    Malformed(Box<image::ImageError>),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed(err) => write!(f, "Decode error: {}", err),
        }
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DecodeError::Malformed(err) => Some(err.as_ref()),
        }
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        DecodeError::Malformed(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
