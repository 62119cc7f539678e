//! Writers: the capability that moves payloads to a device
//!
//! The interpreter and [`Machine`](crate::Machine) only ever see the
//! [`Writer`] trait. [`StreamWriter`] frames payloads over any byte stream
//! (usually a serial port opened by the caller); [`FileWriter`] records
//! actions into an `.s3g` capture.

mod error;
mod file;
mod packet;
mod stream;

pub use error::TransportError;
pub use file::FileWriter;
pub use packet::{FRAME_OVERHEAD, PacketDecoder, PacketError, START_BYTE, crc8, encode_packet};
pub use stream::{StreamWriter, WriterConfig, WriterStats};

use bytes::Bytes;

/// Result type alias
pub type Result<T> = std::result::Result<T, TransportError>;

/// Something that can deliver payloads to a device.
///
/// Every method defaults to [`TransportError::NotImplemented`], so a
/// writer only implements what it supports.
pub trait Writer {
    /// Send a buffered command; any reply body is discarded.
    fn send_action_payload(&mut self, payload: &[u8]) -> Result<()> {
        let _ = payload;
        Err(TransportError::NotImplemented("send_action_payload"))
    }

    /// Send a query and return the full response, status byte included.
    fn send_query_payload(&mut self, payload: &[u8]) -> Result<Bytes> {
        let _ = payload;
        Err(TransportError::NotImplemented("send_query_payload"))
    }

    /// Open the underlying channel.
    fn open(&mut self) -> Result<()> {
        Err(TransportError::NotImplemented("open"))
    }

    /// Close the underlying channel.
    fn close(&mut self) -> Result<()> {
        Err(TransportError::NotImplemented("close"))
    }

    /// Whether the underlying channel is open.
    fn is_open(&self) -> Result<bool> {
        Err(TransportError::NotImplemented("is_open"))
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn send_action_payload(&mut self, payload: &[u8]) -> Result<()> {
        (**self).send_action_payload(payload)
    }

    fn send_query_payload(&mut self, payload: &[u8]) -> Result<Bytes> {
        (**self).send_query_payload(payload)
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> Result<bool> {
        (**self).is_open()
    }
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn send_action_payload(&mut self, payload: &[u8]) -> Result<()> {
        (**self).send_action_payload(payload)
    }

    fn send_query_payload(&mut self, payload: &[u8]) -> Result<Bytes> {
        (**self).send_query_payload(payload)
    }

    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> Result<bool> {
        (**self).is_open()
    }
}

/// A writer with no channel behind it; every operation is unsupported.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconnectedWriter;

impl Writer for UnconnectedWriter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_writer_not_implemented() {
        let mut writer = UnconnectedWriter;
        assert!(matches!(
            writer.send_action_payload(&[]),
            Err(TransportError::NotImplemented("send_action_payload"))
        ));
        assert!(matches!(
            writer.send_query_payload(&[]),
            Err(TransportError::NotImplemented("send_query_payload"))
        ));
        assert!(matches!(
            writer.open(),
            Err(TransportError::NotImplemented("open"))
        ));
        assert!(matches!(
            writer.close(),
            Err(TransportError::NotImplemented("close"))
        ));
        assert!(matches!(
            writer.is_open(),
            Err(TransportError::NotImplemented("is_open"))
        ));
    }

    #[test]
    fn test_writer_through_reference() {
        fn open_through<W: Writer>(mut writer: W) -> Result<()> {
            writer.open()
        }

        let mut inner = UnconnectedWriter;
        assert!(open_through(&mut inner).is_err());
        assert!(open_through(Box::new(inner)).is_err());
    }
}
