//! Error types for the disk blob cache

use std::fmt;

#[derive(Debug)]
pub enum DiskCacheError {
    Io(Box<std::io::Error>),
    InsufficientSpace { available: u64, required: u64 },
    Journal(Box<serde_json::Error>),
}

impl fmt::Display for DiskCacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskCacheError::Io(err) => write!(f, "Disk cache I/O error: {}", err),
            DiskCacheError::InsufficientSpace {
                available,
                required,
            } => write!(
                f,
                "Insufficient free space: {} bytes available, {} required",
                available, required
            ),
            DiskCacheError::Journal(err) => write!(f, "Cache journal error: {}", err),
        }
    }
}

impl std::error::Error for DiskCacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DiskCacheError::Io(err) => Some(err.as_ref()),
            DiskCacheError::Journal(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DiskCacheError {
    fn from(err: std::io::Error) -> Self {
        DiskCacheError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for DiskCacheError {
    fn from(err: serde_json::Error) -> Self {
        DiskCacheError::Journal(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, DiskCacheError>;
