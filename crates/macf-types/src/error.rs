use std::fmt;

/// Result type for macf-types operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the types layer.
#[derive(Debug)]
pub enum Error {
    /// A breadcrumb string could not be parsed.
    InvalidBreadcrumb(String),
    /// A task metadata block could not be parsed.
    InvalidTaskMetadata(String),
    /// Generic (de)serialization failure.
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidBreadcrumb(s) => write!(f, "invalid breadcrumb: {s}"),
            Error::InvalidTaskMetadata(s) => write!(f, "invalid task metadata block: {s}"),
            Error::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
