use std::{io, path::PathBuf};
use thiserror::Error;
use tokio::time::error::Elapsed as TimeElapsed;

use super::fs::{EntryKind, RemotePath, Step};
use crate::error;
use crate::protocol::Reply;

pub type TransportResult<T> = Result<T, Error>;

/// Enum for transport errors
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Contains a negative reply of the server
    #[error("{0}")]
    Reply(Reply),
    /// Any errors related to I/O
    #[error("I/O: {0}")]
    IO(String),
    /// Time limit for receiving a reply exceeded
    #[error("Timeout")]
    Timeout,
    /// A reply timed out earlier, the control channel can no longer be trusted
    #[error("Control channel out of sync after a timeout")]
    ChannelBroken,
    /// A reply code the command does not allow
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(Reply),
    /// Occurs when server behavior differs from the protocol
    #[error("{0}")]
    UnexpectedBehavior(String),
    /// The configured text encoding label is not known
    #[error("Unknown encoding: {0}")]
    Encoding(String),
}

impl Error {
    /// Returns `true` if the server answered with a negative reply, as opposed
    /// to the connection itself failing.
    pub fn is_reply(&self) -> bool {
        matches!(self, Self::Reply(_))
    }
}

impl From<Reply> for Error {
    fn from(reply: Reply) -> Self {
        Self::Reply(reply)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Self::IO(error.to_string())
    }
}

impl From<TimeElapsed> for Error {
    fn from(_: TimeElapsed) -> Self {
        Self::Timeout
    }
}

impl From<error::Error> for Error {
    fn from(error: error::Error) -> Self {
        match error {
            error::Error::IO(msg) => Self::IO(msg),
            error => Self::UnexpectedBehavior(error.to_string()),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Failures reported by the session and the mirror engine
#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport refused a directory change. The logical path is left
    /// where the transport still is.
    #[error("cannot change directory to {step} from {path}: {source}")]
    Navigation {
        step: Step,
        path: RemotePath,
        source: Error,
    },
    /// Structured facts are not available; `fallback` holds the plain
    /// listing if that one could be fetched
    #[error("structured listing of {path} unavailable: {source}")]
    ListingUnavailable {
        path: RemotePath,
        source: Error,
        fallback: Option<String>,
    },
    #[error("cannot download {name} in {}: {source}", .destination.display())]
    Retrieval {
        name: String,
        destination: PathBuf,
        source: Error,
    },
    #[error("item {name} type {kind:?} unknown, skipped")]
    UnsupportedEntryKind { name: String, kind: EntryKind },
    #[error("unsafe remote name {0:?}")]
    UnsafeName(String),
    #[error("local I/O on {}: {source}", .path.display())]
    LocalIo { path: PathBuf, source: io::Error },
    #[error("Cancelled")]
    Cancelled,
    #[error("Config: {0}")]
    Config(String),
    #[error("{0}")]
    Transport(#[from] Error),
}
