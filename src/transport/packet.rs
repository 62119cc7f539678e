//! s3g packet framing.
//!
//! ```text
//! [0xD5] [LEN] [PAYLOAD (LEN bytes)] [CRC-8]
//! ```
//!
//! The CRC is the Dallas/Maxim 1-Wire CRC-8 over the payload only.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use crc::{CRC_8_MAXIM_DOW, Crc};

use crate::protocol::MAX_PAYLOAD_LENGTH;

/// Start-of-packet marker.
pub const START_BYTE: u8 = 0xD5;

/// Bytes added around a payload by framing.
pub const FRAME_OVERHEAD: usize = 3;

const CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_MAXIM_DOW);

/// CRC-8 (Maxim) of `data`.
#[must_use]
pub fn crc8(data: &[u8]) -> u8 {
    CRC8.checksum(data)
}

/// Errors produced when framing or deframing packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Payload length exceeds what one packet can carry.
    PayloadTooLarge {
        /// Length of the payload.
        len: usize,
        /// Maximum payload length.
        max: usize,
    },
    /// Trailer did not match the payload.
    Crc {
        /// CRC computed over the received payload.
        expected: u8,
        /// CRC carried by the packet.
        found: u8,
    },
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge { len, max } => {
                write!(f, "payload too large: {len} bytes (max {max})")
            }
            Self::Crc { expected, found } => {
                write!(f, "packet CRC mismatch: expected {expected:#04x}, got {found:#04x}")
            }
        }
    }
}

impl std::error::Error for PacketError {}

/// Wrap a payload in a packet.
pub fn encode_packet(payload: &[u8]) -> Result<Bytes, PacketError> {
    if payload.len() > MAX_PAYLOAD_LENGTH {
        return Err(PacketError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_LENGTH,
        });
    }

    let mut buf = BytesMut::with_capacity(payload.len() + FRAME_OVERHEAD);
    buf.put_u8(START_BYTE);
    // bounded by MAX_PAYLOAD_LENGTH above
    buf.put_u8(payload.len() as u8);
    buf.put_slice(payload);
    buf.put_u8(crc8(payload));
    Ok(buf.freeze())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    WaitForStart,
    WaitForLength,
    Payload { remaining: usize },
    Crc,
}

/// Incremental packet decoder.
///
/// Bytes are pushed one at a time; noise before a start byte is skipped.
/// After a completed packet or an error the decoder is ready for the next
/// start byte.
#[derive(Debug, Clone)]
pub struct PacketDecoder {
    state: DecodeState,
    payload: BytesMut,
}

impl Default for PacketDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketDecoder {
    /// Create a decoder waiting for a start byte.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DecodeState::WaitForStart,
            payload: BytesMut::with_capacity(MAX_PAYLOAD_LENGTH),
        }
    }

    /// Whether the decoder is inside a packet.
    #[must_use]
    pub fn in_packet(&self) -> bool {
        self.state != DecodeState::WaitForStart
    }

    /// Drop any partial packet.
    pub fn reset(&mut self) {
        self.state = DecodeState::WaitForStart;
        self.payload.clear();
    }

    /// Feed one byte. Returns the payload when a packet completes.
    pub fn push(&mut self, byte: u8) -> Result<Option<Bytes>, PacketError> {
        match self.state {
            DecodeState::WaitForStart => {
                if byte == START_BYTE {
                    self.state = DecodeState::WaitForLength;
                }
            }
            DecodeState::WaitForLength => {
                let len = usize::from(byte);
                if len > MAX_PAYLOAD_LENGTH {
                    self.reset();
                    return Err(PacketError::PayloadTooLarge {
                        len,
                        max: MAX_PAYLOAD_LENGTH,
                    });
                }
                self.payload.clear();
                self.state = if len == 0 {
                    DecodeState::Crc
                } else {
                    DecodeState::Payload { remaining: len }
                };
            }
            DecodeState::Payload { remaining } => {
                self.payload.put_u8(byte);
                self.state = if remaining == 1 {
                    DecodeState::Crc
                } else {
                    DecodeState::Payload {
                        remaining: remaining - 1,
                    }
                };
            }
            DecodeState::Crc => {
                let payload = self.payload.split().freeze();
                self.state = DecodeState::WaitForStart;
                let expected = crc8(&payload);
                if expected != byte {
                    return Err(PacketError::Crc {
                        expected,
                        found: byte,
                    });
                }
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }
}
