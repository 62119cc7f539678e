//! Typed device replies
//!
//! [`decode_response`] turns a raw response into a [`Value`], applying the
//! status byte and the opcode-specific secondary statuses.

use super::codec::{check_status, unpack_reply};
use super::layout::{FieldValue, ReplyShape};
use super::types::{
    HostCommand, MotherboardStatus, Opcode, SdResponse, ToolCommand, ToolStatus,
};
use super::{ProtocolError, Result};

/// `GET_ADVANCED_VERSION` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvancedVersion {
    /// Firmware version
    pub version: u16,
    /// Internal build number
    pub internal_version: u16,
    /// Reserved
    pub reserved_a: u16,
    /// Reserved
    pub reserved_b: u16,
}

/// `GET_EXTENDED_POSITION` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedPosition {
    /// X, Y, Z, A, B in steps
    pub position: [i32; 5],
    /// Endstop bits
    pub endstops: u16,
}

/// `GET_BUILD_STATS` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    /// Build state code
    pub state: u8,
    /// Elapsed hours
    pub hours: u8,
    /// Elapsed minutes
    pub minutes: u8,
    /// Lines processed
    pub line_number: u32,
}

/// `GET_COMMUNICATION_STATS` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommunicationStats {
    /// Packets received from the host
    pub packets_received: u32,
    /// Packets sent to toolheads
    pub packets_sent: u32,
    /// Toolhead packets that got no answer
    pub non_responsive: u32,
    /// Toolhead packet retries
    pub packet_retries: u32,
    /// Noise bytes seen on the tool bus
    pub noise_bytes: u32,
}

/// `GET_PID_STATE` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidState {
    /// Extruder error term
    pub extruder_error: i16,
    /// Extruder delta term
    pub extruder_delta: i16,
    /// Extruder last output
    pub extruder_last: i16,
    /// Platform error term
    pub platform_error: i16,
    /// Platform delta term
    pub platform_delta: i16,
    /// Platform last output
    pub platform_last: i16,
}

/// Decoded result of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Action, or a query with nothing to report
    None,
    /// Firmware version
    Version(u16),
    /// Extended firmware version
    AdvancedVersion(AdvancedVersion),
    /// Free command buffer bytes
    BufferSize(u32),
    /// Yes/no answer (finished, ready)
    Bool(bool),
    /// EEPROM bytes read
    Eeprom(Vec<u8>),
    /// EEPROM bytes written
    BytesWritten(u8),
    /// Bytes captured to the SD card
    CaptureSize(u32),
    /// Next SD card filename; empty at the end of the directory
    Filename(String),
    /// Name of the current build
    BuildName(String),
    /// Position in steps and endstops
    ExtendedPosition(ExtendedPosition),
    /// Motherboard status bits
    MotherboardStatus(MotherboardStatus),
    /// Build statistics
    BuildStats(BuildStats),
    /// Tool bus statistics
    CommunicationStats(CommunicationStats),
    /// Toolhead status bits
    ToolStatus(ToolStatus),
    /// PID terms
    PidState(PidState),
    /// Temperature in degrees Celsius
    Temperature(u16),
    /// Motor speed, microseconds per rotation
    MotorSpeed(u32),
}

/// Decode the response to a call with `opcode`
pub fn decode_response(opcode: Opcode, response: &[u8]) -> Result<Value> {
    let body = check_status(response)?;
    let ReplyShape::Query(fields) = opcode.layout().reply else {
        return Ok(Value::None);
    };
    let values = unpack_reply(fields, body)?;
    let mut fields = Fields(values.into_iter());

    let value = match opcode {
        Opcode::Host(cmd) => host_value(cmd, &mut fields)?,
        Opcode::Tool(cmd) => tool_value(cmd, &mut fields)?,
    };
    Ok(value)
}

fn host_value(cmd: HostCommand, fields: &mut Fields) -> Result<Value> {
    Ok(match cmd {
        HostCommand::GetVersion => Value::Version(fields.u16()),
        HostCommand::GetAdvancedVersion => Value::AdvancedVersion(AdvancedVersion {
            version: fields.u16(),
            internal_version: fields.u16(),
            reserved_a: fields.u16(),
            reserved_b: fields.u16(),
        }),
        HostCommand::GetAvailableBufferSize => Value::BufferSize(fields.u32()),
        HostCommand::IsFinished => Value::Bool(fields.u8() != 0),
        HostCommand::ReadFromEeprom => Value::Eeprom(fields.bytes()),
        HostCommand::WriteToEeprom => Value::BytesWritten(fields.u8()),
        HostCommand::CaptureToFile | HostCommand::PlaybackCapture => {
            sd_status(fields.u8())?;
            Value::None
        }
        HostCommand::EndCapture => Value::CaptureSize(fields.u32()),
        HostCommand::GetNextFilename => {
            sd_status(fields.u8())?;
            Value::Filename(fields.string())
        }
        HostCommand::GetBuildName => Value::BuildName(fields.string()),
        HostCommand::GetExtendedPosition => {
            let position = [fields.i32(), fields.i32(), fields.i32(), fields.i32(), fields.i32()];
            Value::ExtendedPosition(ExtendedPosition {
                position,
                endstops: fields.u16(),
            })
        }
        HostCommand::ExtendedStop => match fields.u8() {
            0 => Value::None,
            code => return Err(ProtocolError::ExtendedStop { code }),
        },
        HostCommand::GetMotherboardStatus => {
            Value::MotherboardStatus(MotherboardStatus::from_u8(fields.u8()))
        }
        HostCommand::GetBuildStats => {
            let stats = BuildStats {
                state: fields.u8(),
                hours: fields.u8(),
                minutes: fields.u8(),
                line_number: fields.u32(),
            };
            Value::BuildStats(stats)
        }
        HostCommand::GetCommunicationStats => Value::CommunicationStats(CommunicationStats {
            packets_received: fields.u32(),
            packets_sent: fields.u32(),
            non_responsive: fields.u32(),
            packet_retries: fields.u32(),
            noise_bytes: fields.u32(),
        }),
        _ => Value::None,
    })
}

fn tool_value(cmd: ToolCommand, fields: &mut Fields) -> Result<Value> {
    Ok(match cmd {
        ToolCommand::GetVersion => Value::Version(fields.u16()),
        ToolCommand::GetToolheadTemp
        | ToolCommand::GetPlatformTemp
        | ToolCommand::GetToolheadTargetTemp
        | ToolCommand::GetPlatformTargetTemp => Value::Temperature(fields.u16()),
        ToolCommand::GetMotor1SpeedRpm => Value::MotorSpeed(fields.u32()),
        ToolCommand::IsToolReady | ToolCommand::IsPlatformReady => match fields.u8() {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            value => return Err(ProtocolError::HeatElementReady { value }),
        },
        ToolCommand::ReadFromEeprom => Value::Eeprom(fields.bytes()),
        ToolCommand::WriteToEeprom => Value::BytesWritten(fields.u8()),
        ToolCommand::GetToolStatus => Value::ToolStatus(ToolStatus::from_u8(fields.u8())),
        ToolCommand::GetPidState => Value::PidState(PidState {
            extruder_error: fields.i16(),
            extruder_delta: fields.i16(),
            extruder_last: fields.i16(),
            platform_error: fields.i16(),
            platform_delta: fields.i16(),
            platform_last: fields.i16(),
        }),
        _ => Value::None,
    })
}

fn sd_status(code: u8) -> Result<()> {
    match SdResponse::from_u8(code) {
        SdResponse::Success => Ok(()),
        other => Err(ProtocolError::SdCard(other)),
    }
}

/// Unpacked fields, consumed in layout order.
///
/// The layout table guarantees the kinds line up, so a mismatch can only
/// come from a table bug; it yields a zero value rather than a panic.
struct Fields(std::vec::IntoIter<FieldValue>);

impl Fields {
    fn u8(&mut self) -> u8 {
        match self.0.next() {
            Some(FieldValue::U8(v)) => v,
            _ => 0,
        }
    }

    fn u16(&mut self) -> u16 {
        match self.0.next() {
            Some(FieldValue::U16(v)) => v,
            _ => 0,
        }
    }

    fn i16(&mut self) -> i16 {
        match self.0.next() {
            Some(FieldValue::I16(v)) => v,
            _ => 0,
        }
    }

    fn u32(&mut self) -> u32 {
        match self.0.next() {
            Some(FieldValue::U32(v)) => v,
            _ => 0,
        }
    }

    fn i32(&mut self) -> i32 {
        match self.0.next() {
            Some(FieldValue::I32(v)) => v,
            _ => 0,
        }
    }

    fn bytes(&mut self) -> Vec<u8> {
        match self.0.next() {
            Some(FieldValue::Tail(v) | FieldValue::CStr(v)) => v,
            _ => Vec::new(),
        }
    }

    fn string(&mut self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }
}
