use std::fmt;

/// Errors that can occur while storing or listing uploaded files.
#[derive(Debug)]
pub enum StorageError {
    /// An I/O error occurred.
    Io(std::io::Error),
    /// The upload filename cannot be used on disk.
    InvalidName(String),
    /// The file could not be decoded or encoded as an image.
    Image(String),
    /// A generated file would replace one that already exists.
    NameTaken(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "storage IO error: {err}"),
            Self::InvalidName(name) => write!(f, "invalid upload name: {name}"),
            Self::Image(msg) => write!(f, "image processing failed: {msg}"),
            Self::NameTaken(path) => write!(f, "path already in use: {path}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for StorageError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(io) => Self::Io(io),
            other => Self::Image(other.to_string()),
        }
    }
}
