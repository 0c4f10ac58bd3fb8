use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    EventLog(macf_eventlog::Error),
    Types(macf_types::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::EventLog(err) => write!(f, "event log error: {err}"),
            Error::Types(err) => write!(f, "schema error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::EventLog(err) => Some(err),
            Error::Types(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<macf_eventlog::Error> for Error {
    fn from(err: macf_eventlog::Error) -> Self {
        Error::EventLog(err)
    }
}

impl From<macf_types::Error> for Error {
    fn from(err: macf_types::Error) -> Self {
        Error::Types(err)
    }
}
