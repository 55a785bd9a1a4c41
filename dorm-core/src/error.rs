use thiserror::Error as ThisError;

/// Errors raised by dorm itself, as opposed to the ones coming from the driver.
///
/// They travel inside [`anyhow::Error`] like every other failure, use
/// [`is_validation`] and [`is_connection`] (or `downcast_ref::<Error>()`) to
/// classify a returned error.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caller misuse detected before any I/O happens.
    #[error("validation error: {0}")]
    Validation(String),
    /// The connection could not be acquired, created or used.
    #[error("connection error: {0}")]
    Connection(String),
    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> anyhow::Error {
        Error::Validation(message.into()).into()
    }
    pub fn connection(message: impl Into<String>) -> anyhow::Error {
        Error::Connection(message.into()).into()
    }
    pub fn configuration(message: impl Into<String>) -> anyhow::Error {
        Error::Configuration(message.into()).into()
    }
}

fn find(error: &anyhow::Error) -> Option<&Error> {
    error
        .downcast_ref::<Error>()
        .or_else(|| error.chain().find_map(|e| e.downcast_ref::<Error>()))
}

pub fn is_validation(error: &anyhow::Error) -> bool {
    matches!(find(error), Some(Error::Validation(..)))
}

pub fn is_connection(error: &anyhow::Error) -> bool {
    matches!(find(error), Some(Error::Connection(..)))
}

pub fn is_configuration(error: &anyhow::Error) -> bool {
    matches!(find(error), Some(Error::Configuration(..)))
}
