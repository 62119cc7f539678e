//! Crate-level error type

use std::io;

use thiserror::Error;

use crate::gcode::GcodeError;
use crate::preprocess::PreprocessError;
use crate::protocol::ProtocolError;
use crate::transport::TransportError;

/// Any failure surfaced by the interpreter, machine or preprocessing passes
#[derive(Error, Debug)]
pub enum Error {
    /// Syntax, validation or state-precondition failure on a G-code line
    #[error(transparent)]
    Gcode(#[from] GcodeError),

    /// Device status, SD card failure or a call that violates a size limit
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Writer failure (I/O, timeout, framing, retries exhausted)
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// Preprocessing pipeline failure
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    /// Profile could not be parsed
    #[cfg(feature = "serde")]
    #[error("profile error: {0}")]
    Profile(#[from] serde_json::Error),

    /// File I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Device(err) => Self::Protocol(err),
            other => Self::Transport(other),
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
