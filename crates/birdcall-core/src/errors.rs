/// Core error type.
///
/// Only [`Error::Config`] is meant to reach callers of the dispatcher; everything
/// that happens while talking to the remote API is absorbed into the dispatch report.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
