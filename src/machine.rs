//! Typed access to a device through a [`Writer`]
//!
//! [`Machine::execute`] runs any [`ProtocolCall`]: it encodes the payload,
//! sends it as an action or a query depending on the opcode, and decodes
//! the reply. The remaining methods are shortcuts that build the call and
//! unwrap the expected [`Value`].

use tracing::{debug, instrument};

use crate::error::Result;
use crate::protocol::{
    AdvancedVersion, BuildStats, CommunicationStats, ExtendedPosition, MotherboardStatus,
    PidState, ProtocolCall, ProtocolError, StopOptions, ToolStatus, Value, decode_response,
    encode,
};
use crate::transport::Writer;

/// A device reached through a writer
#[derive(Debug)]
pub struct Machine<W> {
    writer: W,
}

impl<W: Writer> Machine<W> {
    /// Drive the device behind `writer`
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Borrow the writer
    pub const fn writer(&self) -> &W {
        &self.writer
    }

    /// Mutably borrow the writer
    pub const fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Give the writer back
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Encode, send and decode one call.
    ///
    /// Actions return [`Value::None`]. Device statuses surface as
    /// [`Error::Protocol`](crate::Error::Protocol) whichever layer saw them.
    #[instrument(level = "trace", skip(self, call), fields(opcode = %call.opcode()))]
    pub fn execute(&mut self, call: &ProtocolCall) -> Result<Value> {
        let payload = encode(call);
        debug!(opcode = %call.opcode(), len = payload.len(), query = call.is_query(), "issuing call");

        if call.is_query() {
            let response = self.writer.send_query_payload(&payload)?;
            Ok(decode_response(call.opcode(), &response)?)
        } else {
            self.writer.send_action_payload(&payload)?;
            Ok(Value::None)
        }
    }

    fn query<T>(&mut self, call: &ProtocolCall, extract: impl FnOnce(Value) -> Option<T>) -> Result<T> {
        let value = self.execute(call)?;
        extract(value).ok_or_else(|| {
            ProtocolError::UnexpectedReply {
                opcode: call.opcode(),
            }
            .into()
        })
    }

    /// Firmware version
    pub fn get_version(&mut self) -> Result<u16> {
        self.query(&ProtocolCall::get_version(), |value| match value {
            Value::Version(version) => Some(version),
            _ => None,
        })
    }

    /// Extended firmware version
    pub fn get_advanced_version(&mut self) -> Result<AdvancedVersion> {
        self.query(&ProtocolCall::get_advanced_version(), |value| match value {
            Value::AdvancedVersion(version) => Some(version),
            _ => None,
        })
    }

    /// Free bytes in the command buffer
    pub fn get_available_buffer_size(&mut self) -> Result<u32> {
        self.query(&ProtocolCall::get_available_buffer_size(), |value| match value {
            Value::BufferSize(size) => Some(size),
            _ => None,
        })
    }

    /// Whether all queued motion has completed
    pub fn is_finished(&mut self) -> Result<bool> {
        self.query(&ProtocolCall::is_finished(), |value| match value {
            Value::Bool(finished) => Some(finished),
            _ => None,
        })
    }

    /// Stop everything immediately
    pub fn abort_immediately(&mut self) -> Result<()> {
        self.execute(&ProtocolCall::abort_immediately()).map(|_| ())
    }

    /// Halt steppers and/or clear the command buffer
    pub fn extended_stop(&mut self, options: StopOptions) -> Result<()> {
        self.execute(&ProtocolCall::extended_stop(options)).map(|_| ())
    }

    /// Start capturing to `filename` on the SD card
    pub fn capture_to_file(&mut self, filename: &str) -> Result<()> {
        self.execute(&ProtocolCall::capture_to_file(filename)?).map(|_| ())
    }

    /// Stop capturing; returns the captured size in bytes
    pub fn end_capture_to_file(&mut self) -> Result<u32> {
        self.query(&ProtocolCall::end_capture(), |value| match value {
            Value::CaptureSize(size) => Some(size),
            _ => None,
        })
    }

    /// Build `filename` from the SD card
    pub fn playback_capture(&mut self, filename: &str) -> Result<()> {
        self.execute(&ProtocolCall::playback_capture(filename)?).map(|_| ())
    }

    /// Next SD card filename; empty once the directory is exhausted
    pub fn get_next_filename(&mut self, restart: bool) -> Result<String> {
        self.query(&ProtocolCall::get_next_filename(restart), |value| match value {
            Value::Filename(name) => Some(name),
            _ => None,
        })
    }

    /// Name of the running build
    pub fn get_build_name(&mut self) -> Result<String> {
        self.query(&ProtocolCall::get_build_name(), |value| match value {
            Value::BuildName(name) => Some(name),
            _ => None,
        })
    }

    /// Position in steps plus endstop states
    pub fn get_extended_position(&mut self) -> Result<ExtendedPosition> {
        self.query(&ProtocolCall::get_extended_position(), |value| match value {
            Value::ExtendedPosition(position) => Some(position),
            _ => None,
        })
    }

    /// Motherboard status bits
    pub fn get_motherboard_status(&mut self) -> Result<MotherboardStatus> {
        self.query(&ProtocolCall::get_motherboard_status(), |value| match value {
            Value::MotherboardStatus(status) => Some(status),
            _ => None,
        })
    }

    /// Statistics for the current or last build
    pub fn get_build_stats(&mut self) -> Result<BuildStats> {
        self.query(&ProtocolCall::get_build_stats(), |value| match value {
            Value::BuildStats(stats) => Some(stats),
            _ => None,
        })
    }

    /// Tool bus counters
    pub fn get_communication_stats(&mut self) -> Result<CommunicationStats> {
        self.query(&ProtocolCall::get_communication_stats(), |value| match value {
            Value::CommunicationStats(stats) => Some(stats),
            _ => None,
        })
    }

    /// Toolhead firmware version
    pub fn get_toolhead_version(&mut self, tool_index: u8) -> Result<u16> {
        self.query(&ProtocolCall::get_toolhead_version(tool_index)?, |value| match value {
            Value::Version(version) => Some(version),
            _ => None,
        })
    }

    /// Current extruder temperature
    pub fn get_toolhead_temperature(&mut self, tool_index: u8) -> Result<u16> {
        let call = ProtocolCall::get_toolhead_temperature(tool_index)?;
        self.query(&call, temperature)
    }

    /// Extruder target temperature
    pub fn get_toolhead_target_temperature(&mut self, tool_index: u8) -> Result<u16> {
        let call = ProtocolCall::get_toolhead_target_temperature(tool_index)?;
        self.query(&call, temperature)
    }

    /// Current platform temperature
    pub fn get_platform_temperature(&mut self, tool_index: u8) -> Result<u16> {
        let call = ProtocolCall::get_platform_temperature(tool_index)?;
        self.query(&call, temperature)
    }

    /// Platform target temperature
    pub fn get_platform_target_temperature(&mut self, tool_index: u8) -> Result<u16> {
        let call = ProtocolCall::get_platform_target_temperature(tool_index)?;
        self.query(&call, temperature)
    }

    /// Whether the extruder has reached its target
    pub fn is_tool_ready(&mut self, tool_index: u8) -> Result<bool> {
        self.query(&ProtocolCall::is_tool_ready(tool_index)?, |value| match value {
            Value::Bool(ready) => Some(ready),
            _ => None,
        })
    }

    /// Whether the platform has reached its target
    pub fn is_platform_ready(&mut self, tool_index: u8) -> Result<bool> {
        self.query(&ProtocolCall::is_platform_ready(tool_index)?, |value| match value {
            Value::Bool(ready) => Some(ready),
            _ => None,
        })
    }

    /// Toolhead status bits
    pub fn get_tool_status(&mut self, tool_index: u8) -> Result<ToolStatus> {
        self.query(&ProtocolCall::get_tool_status(tool_index)?, |value| match value {
            Value::ToolStatus(status) => Some(status),
            _ => None,
        })
    }

    /// Heater PID terms
    pub fn get_pid_state(&mut self, tool_index: u8) -> Result<PidState> {
        self.query(&ProtocolCall::get_pid_state(tool_index)?, |value| match value {
            Value::PidState(state) => Some(state),
            _ => None,
        })
    }

    /// Motor 1 speed in microseconds per rotation
    pub fn get_motor1_speed(&mut self, tool_index: u8) -> Result<u32> {
        self.query(&ProtocolCall::get_motor1_speed(tool_index)?, |value| match value {
            Value::MotorSpeed(speed) => Some(speed),
            _ => None,
        })
    }

    /// Raw motherboard EEPROM read
    pub fn read_from_eeprom(&mut self, offset: u16, length: usize) -> Result<Vec<u8>> {
        self.query(&ProtocolCall::read_from_eeprom(offset, length)?, eeprom_bytes)
    }

    /// Raw motherboard EEPROM write; the device must confirm every byte
    pub fn write_to_eeprom(&mut self, offset: u16, data: &[u8]) -> Result<()> {
        let written = self.query(&ProtocolCall::write_to_eeprom(offset, data)?, bytes_written)?;
        confirm_write(data.len(), written)
    }

    /// Raw toolhead EEPROM read
    pub fn read_from_toolhead_eeprom(
        &mut self,
        tool_index: u8,
        offset: u16,
        length: usize,
    ) -> Result<Vec<u8>> {
        let call = ProtocolCall::read_from_toolhead_eeprom(tool_index, offset, length)?;
        self.query(&call, eeprom_bytes)
    }

    /// Raw toolhead EEPROM write; the device must confirm every byte
    pub fn write_to_toolhead_eeprom(&mut self, tool_index: u8, offset: u16, data: &[u8]) -> Result<()> {
        let call = ProtocolCall::write_to_toolhead_eeprom(tool_index, offset, data)?;
        let written = self.query(&call, bytes_written)?;
        confirm_write(data.len(), written)
    }
}

fn temperature(value: Value) -> Option<u16> {
    match value {
        Value::Temperature(degrees) => Some(degrees),
        _ => None,
    }
}

fn eeprom_bytes(value: Value) -> Option<Vec<u8>> {
    match value {
        Value::Eeprom(bytes) => Some(bytes),
        _ => None,
    }
}

fn bytes_written(value: Value) -> Option<u8> {
    match value {
        Value::BytesWritten(count) => Some(count),
        _ => None,
    }
}

fn confirm_write(requested: usize, written: u8) -> Result<()> {
    if usize::from(written) == requested {
        Ok(())
    } else {
        Err(ProtocolError::EepromMismatch {
            requested,
            written: usize::from(written),
        }
        .into())
    }
}
