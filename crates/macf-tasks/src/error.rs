use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Types(macf_types::Error),
    Json(serde_json::Error),
    NotFound(String),
    /// task create without required `plan_ca_ref`, or mutate without grant
    /// (spec §7: "no event emitted, to avoid polluting history with user
    /// mistakes").
    ProtectionViolation(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::Types(err) => write!(f, "schema error: {err}"),
            Error::Json(err) => write!(f, "json error: {err}"),
            Error::NotFound(id) => write!(f, "task not found: {id}"),
            Error::ProtectionViolation(msg) => write!(f, "protection violation: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Types(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<macf_types::Error> for Error {
    fn from(err: macf_types::Error) -> Self {
        Error::Types(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
