//! Writer-level error types covering I/O, framing and device statuses.

use core::fmt;
use std::io;

use super::packet::PacketError;
use crate::protocol::ProtocolError;

/// Unified error type for s3g writers.
#[derive(Debug)]
pub enum TransportError {
    /// Underlying stream failure.
    Io(io::Error),
    /// Packet framing failure.
    Packet(PacketError),
    /// No complete response arrived in time.
    Timeout {
        /// Milliseconds waited.
        waited_ms: u128,
    },
    /// Every attempt hit a retryable failure.
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
    },
    /// The writer does not support this operation.
    NotImplemented(&'static str),
    /// The device answered with a non-success status.
    Device(ProtocolError),
}

impl TransportError {
    /// Whether the failed exchange may be attempted again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Packet(PacketError::Crc { .. }) => true,
            Self::Device(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Packet(err) => write!(f, "packet error: {err}"),
            Self::Timeout { waited_ms } => write!(f, "timed out after {waited_ms} ms"),
            Self::RetriesExhausted { attempts } => {
                write!(f, "gave up after {attempts} attempts")
            }
            Self::NotImplemented(operation) => write!(f, "{operation} is not implemented"),
            Self::Device(err) => write!(f, "device error: {err}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Packet(err) => Some(err),
            Self::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<PacketError> for TransportError {
    fn from(err: PacketError) -> Self {
        Self::Packet(err)
    }
}

impl From<ProtocolError> for TransportError {
    fn from(err: ProtocolError) -> Self {
        Self::Device(err)
    }
}
