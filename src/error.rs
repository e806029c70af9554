use std::io;
use thiserror::Error;

/// Errors raised while reading or parsing the control channel.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O: {0}")]
    IO(String),
    #[error("Unexpected EOF on stream")]
    UnexpectedEof,
    #[error("Bad reply: {0}")]
    BadReply(String),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::UnexpectedEof,
            _ => Self::IO(err.to_string()),
        }
    }
}
