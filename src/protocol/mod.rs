//! s3g binary command protocol
//!
//! Opcode tables, payload layouts, the payload codec and typed reply
//! decoding. Nothing here touches I/O.

mod call;
mod codec;
mod error;
mod layout;
mod reply;
mod types;

pub use call::{
    MAX_EEPROM_READ, MAX_EEPROM_WRITE, MAX_TOOL_EEPROM_READ, MAX_TOOL_EEPROM_WRITE, ProtocolCall,
};
pub use codec::{check_status, encode, encode_reply, unpack_reply};
pub use error::{ProtocolError, Result};
pub use layout::{FieldKind, FieldValue, Layout, ReplyShape};
pub use reply::{
    AdvancedVersion, BuildStats, CommunicationStats, ExtendedPosition, PidState, Value,
    decode_response,
};
pub use types::{
    Axis, AxisSet, Button, ButtonOptions, DisplayOptions, HostCommand, MotherboardStatus,
    MotorOptions, Opcode, ResponseCode, SdResponse, StopOptions, ToolCommand, ToolStatus,
};

/// Protocol version advertised by the host
pub const S3G_VERSION: u16 = 100;

/// Largest payload one packet can carry
pub const MAX_PAYLOAD_LENGTH: usize = 32;

/// Highest addressable toolhead
pub const MAX_TOOL_INDEX: u8 = 127;

/// Axes in an extended point
pub const EXTENDED_POINT_LENGTH: usize = 5;
