// error.rs - Error type shared by the whole engine

use std::io;

use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before the run starts; nothing has been spawned or emitted.
    #[error("invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("image {name} is not a valid PGM: {reason}")]
    Pgm { name: String, reason: String },

    #[error("image {name} is {found:?} (width, height), expected {expected:?}")]
    ImageSize {
        name: String,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("image {0} not found")]
    ImageNotFound(String),

    #[error("the image io task has stopped")]
    IoStopped,

    /// A worker task panicked or was cancelled. Fatal for the run.
    #[error("worker task failed: {0}")]
    Worker(#[from] JoinError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParams { reason: reason.into() }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
