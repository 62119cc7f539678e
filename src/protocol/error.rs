//! s3g protocol errors

use thiserror::Error;

use super::types::{Opcode, ResponseCode, SdResponse};

/// Errors raised while building calls or decoding device responses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Device could not process the packet
    #[error("device reported a generic packet error")]
    GenericPacket,

    /// Device command buffer is full
    #[error("device action buffer overflow")]
    BufferOverflow,

    /// Device saw a bad packet CRC
    #[error("device reported a CRC mismatch")]
    CrcMismatch,

    /// Device refused the packet size
    #[error("device reported packet too big")]
    PacketTooBig,

    /// Firmware does not implement the opcode
    #[error("command not supported by device")]
    CommandNotSupported,

    /// Toolhead did not answer the motherboard
    #[error("downstream (toolhead) timeout")]
    DownstreamTimeout,

    /// Toolhead bus lock not acquired
    #[error("tool lock timeout")]
    ToolLock,

    /// Build was cancelled on the device
    #[error("build cancelled on device")]
    BuildCancelled,

    /// Device is busy printing from SD
    #[error("device is running a local build")]
    ActiveLocalBuild,

    /// Device shut its heaters down
    #[error("device is in overheat state")]
    Overheat,

    /// Status byte outside the response code table
    #[error("unknown response code: {code:#04x}")]
    UnknownResponseCode {
        /// Raw status byte
        code: u8,
    },

    /// Response carried no status byte at all
    #[error("empty response")]
    EmptyResponse,

    /// SD card operation failed
    #[error("SD card error: {0}")]
    SdCard(SdResponse),

    /// `EXTENDED_STOP` reported a non-zero result
    #[error("extended stop failed with code {code}")]
    ExtendedStop {
        /// Secondary status byte
        code: u8,
    },

    /// Ready query answered something other than 0 or 1
    #[error("heat element ready query returned {value}")]
    HeatElementReady {
        /// Raw reply byte
        value: u8,
    },

    /// Device wrote a different number of EEPROM bytes than requested
    #[error("EEPROM write mismatch: requested {requested} bytes, device wrote {written}")]
    EepromMismatch {
        /// Bytes sent
        requested: usize,
        /// Bytes the device reports as written
        written: usize,
    },

    /// Extended position vector does not hold exactly five axes
    #[error("extended point must have {expected} values, got {len}")]
    PointLength {
        /// Supplied length
        len: usize,
        /// Required length
        expected: usize,
    },

    /// EEPROM range does not fit in one packet
    #[error("EEPROM length {len} exceeds {max} bytes per packet")]
    EepromLength {
        /// Requested length
        len: usize,
        /// Maximum for this operation
        max: usize,
    },

    /// Encoded call would not fit in one packet
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Encoded size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Tool index outside the addressable range
    #[error("tool index {index} out of range (max {max})")]
    ToolIndex {
        /// Requested index
        index: u8,
        /// Highest addressable index
        max: u8,
    },

    /// Reply shorter than the opcode's layout
    #[error("reply too short: need {needed} bytes, got {got}")]
    ReplyTooShort {
        /// Bytes the layout needs
        needed: usize,
        /// Bytes received
        got: usize,
    },

    /// Reply string ran off the end of the buffer
    #[error("reply string is missing its terminator")]
    MissingTerminator,

    /// Reply decoded to a different kind of value than the call produces
    #[error("unexpected reply to {opcode}")]
    UnexpectedReply {
        /// Opcode of the call
        opcode: Opcode,
    },
}

impl ProtocolError {
    /// Map a non-success status byte to its error. `Success` maps to `None`.
    #[must_use]
    pub const fn from_status(code: ResponseCode) -> Option<Self> {
        Some(match code {
            ResponseCode::Success => return None,
            ResponseCode::GenericPacketError => Self::GenericPacket,
            ResponseCode::ActionBufferOverflow => Self::BufferOverflow,
            ResponseCode::CrcMismatch => Self::CrcMismatch,
            ResponseCode::PacketTooBig => Self::PacketTooBig,
            ResponseCode::CommandNotSupported => Self::CommandNotSupported,
            ResponseCode::DownstreamTimeout => Self::DownstreamTimeout,
            ResponseCode::ToolLockTimeout => Self::ToolLock,
            ResponseCode::CancelBuild => Self::BuildCancelled,
            ResponseCode::ActiveLocalBuild => Self::ActiveLocalBuild,
            ResponseCode::OverheatState => Self::Overheat,
        })
    }

    /// Whether the device asked for the same packet to be sent again
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::GenericPacket | Self::BufferOverflow | Self::CrcMismatch)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ProtocolError>;
