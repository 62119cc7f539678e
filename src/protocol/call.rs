//! Logical protocol calls
//!
//! A [`ProtocolCall`] is an opcode plus its typed arguments, checked against
//! every length and range limit before it can exist. Encoding one is
//! therefore infallible.

use super::layout::{FieldValue, ReplyShape};
use super::types::{
    Axis, AxisSet, Button, ButtonOptions, DisplayOptions, HostCommand, MotorOptions, Opcode,
    StopOptions, ToolCommand,
};
use super::{
    EXTENDED_POINT_LENGTH, MAX_PAYLOAD_LENGTH, MAX_TOOL_INDEX, ProtocolError, Result, S3G_VERSION,
};

/// Longest host EEPROM read (one byte of the reply is the status)
pub const MAX_EEPROM_READ: usize = MAX_PAYLOAD_LENGTH - 1;
/// Longest host EEPROM write (opcode, offset and length precede the data)
pub const MAX_EEPROM_WRITE: usize = MAX_PAYLOAD_LENGTH - 4;
/// Longest toolhead EEPROM read
pub const MAX_TOOL_EEPROM_READ: usize = MAX_PAYLOAD_LENGTH - 1;
/// Longest toolhead EEPROM write
pub const MAX_TOOL_EEPROM_WRITE: usize = MAX_PAYLOAD_LENGTH - 6;

/// Bytes of a build-start packet other than the name itself
const BUILD_START_OVERHEAD: usize = 7;

/// One host or tool operation with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolCall {
    opcode: Opcode,
    tool_index: Option<u8>,
    args: Vec<FieldValue>,
}

impl ProtocolCall {
    /// Opcode of this call
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Target toolhead, for tool commands
    #[must_use]
    pub const fn tool_index(&self) -> Option<u8> {
        self.tool_index
    }

    /// Arguments in wire order
    #[must_use]
    pub fn args(&self) -> &[FieldValue] {
        &self.args
    }

    /// Reply the device sends for this call
    #[must_use]
    pub const fn reply_shape(&self) -> ReplyShape {
        self.opcode.layout().reply
    }

    /// Whether this call must be sent as a query
    #[must_use]
    pub const fn is_query(&self) -> bool {
        self.reply_shape().is_query()
    }

    /// Size of the encoded payload
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.opcode.header_len() + self.args.iter().map(FieldValue::encoded_len).sum::<usize>()
    }

    fn host(cmd: HostCommand, args: Vec<FieldValue>) -> Result<Self> {
        Self {
            opcode: Opcode::Host(cmd),
            tool_index: None,
            args,
        }
        .checked()
    }

    fn tool(tool_index: u8, cmd: ToolCommand, args: Vec<FieldValue>) -> Result<Self> {
        check_tool_index(tool_index)?;
        Self {
            opcode: Opcode::Tool(cmd),
            tool_index: Some(tool_index),
            args,
        }
        .checked()
    }

    /// Calls whose arguments can never overflow a packet
    fn fixed(cmd: HostCommand, args: Vec<FieldValue>) -> Self {
        Self {
            opcode: Opcode::Host(cmd),
            tool_index: None,
            args,
        }
    }

    fn checked(self) -> Result<Self> {
        let size = self.encoded_len();
        if size > MAX_PAYLOAD_LENGTH {
            return Err(ProtocolError::PayloadTooLarge {
                size,
                max: MAX_PAYLOAD_LENGTH,
            });
        }
        Ok(self)
    }

    #[cfg(test)]
    pub(crate) fn from_parts(opcode: Opcode, tool_index: Option<u8>, args: Vec<FieldValue>) -> Self {
        Self {
            opcode,
            tool_index,
            args,
        }
    }
}

fn point_args(position: &[i32]) -> Result<Vec<FieldValue>> {
    if position.len() != EXTENDED_POINT_LENGTH {
        return Err(ProtocolError::PointLength {
            len: position.len(),
            expected: EXTENDED_POINT_LENGTH,
        });
    }
    Ok(position.iter().copied().map(FieldValue::I32).collect())
}

fn eeprom_read_args(offset: u16, length: usize, max: usize) -> Result<Vec<FieldValue>> {
    let len = u8::try_from(length)
        .ok()
        .filter(|len| usize::from(*len) <= max)
        .ok_or(ProtocolError::EepromLength { len: length, max })?;
    Ok(vec![FieldValue::U16(offset), FieldValue::U8(len)])
}

fn eeprom_write_args(offset: u16, data: &[u8], max: usize) -> Result<Vec<FieldValue>> {
    let mut args = eeprom_read_args(offset, data.len(), max)?;
    args.push(FieldValue::Tail(data.to_vec()));
    Ok(args)
}

fn text(value: &str) -> FieldValue {
    FieldValue::CStr(value.as_bytes().to_vec())
}

/// Host queries
impl ProtocolCall {
    /// `GET_VERSION`, advertising the host protocol version
    #[must_use]
    pub fn get_version() -> Self {
        Self::fixed(HostCommand::GetVersion, vec![FieldValue::U16(S3G_VERSION)])
    }

    /// `GET_ADVANCED_VERSION`
    #[must_use]
    pub fn get_advanced_version() -> Self {
        Self::fixed(
            HostCommand::GetAdvancedVersion,
            vec![FieldValue::U16(S3G_VERSION)],
        )
    }

    /// `INIT`
    #[must_use]
    pub fn init() -> Self {
        Self::fixed(HostCommand::Init, Vec::new())
    }

    /// `GET_AVAILABLE_BUFFER_SIZE`
    #[must_use]
    pub fn get_available_buffer_size() -> Self {
        Self::fixed(HostCommand::GetAvailableBufferSize, Vec::new())
    }

    /// `CLEAR_BUFFER`
    #[must_use]
    pub fn clear_buffer() -> Self {
        Self::fixed(HostCommand::ClearBuffer, Vec::new())
    }

    /// `ABORT_IMMEDIATELY`
    #[must_use]
    pub fn abort_immediately() -> Self {
        Self::fixed(HostCommand::AbortImmediately, Vec::new())
    }

    /// `PAUSE`
    #[must_use]
    pub fn pause() -> Self {
        Self::fixed(HostCommand::Pause, Vec::new())
    }

    /// `IS_FINISHED`
    #[must_use]
    pub fn is_finished() -> Self {
        Self::fixed(HostCommand::IsFinished, Vec::new())
    }

    /// `READ_FROM_EEPROM` of `length` bytes at `offset`
    pub fn read_from_eeprom(offset: u16, length: usize) -> Result<Self> {
        Self::host(
            HostCommand::ReadFromEeprom,
            eeprom_read_args(offset, length, MAX_EEPROM_READ)?,
        )
    }

    /// `WRITE_TO_EEPROM` of `data` at `offset`
    pub fn write_to_eeprom(offset: u16, data: &[u8]) -> Result<Self> {
        Self::host(
            HostCommand::WriteToEeprom,
            eeprom_write_args(offset, data, MAX_EEPROM_WRITE)?,
        )
    }

    /// `CAPTURE_TO_FILE`
    pub fn capture_to_file(filename: &str) -> Result<Self> {
        Self::host(HostCommand::CaptureToFile, vec![text(filename)])
    }

    /// `END_CAPTURE`
    #[must_use]
    pub fn end_capture() -> Self {
        Self::fixed(HostCommand::EndCapture, Vec::new())
    }

    /// `PLAYBACK_CAPTURE`
    pub fn playback_capture(filename: &str) -> Result<Self> {
        Self::host(HostCommand::PlaybackCapture, vec![text(filename)])
    }

    /// `RESET`
    #[must_use]
    pub fn reset() -> Self {
        Self::fixed(HostCommand::Reset, Vec::new())
    }

    /// `GET_NEXT_FILENAME`; `restart` rewinds to the first directory entry
    #[must_use]
    pub fn get_next_filename(restart: bool) -> Self {
        Self::fixed(
            HostCommand::GetNextFilename,
            vec![FieldValue::U8(u8::from(restart))],
        )
    }

    /// `GET_BUILD_NAME`
    #[must_use]
    pub fn get_build_name() -> Self {
        Self::fixed(HostCommand::GetBuildName, Vec::new())
    }

    /// `GET_EXTENDED_POSITION`
    #[must_use]
    pub fn get_extended_position() -> Self {
        Self::fixed(HostCommand::GetExtendedPosition, Vec::new())
    }

    /// `EXTENDED_STOP`
    #[must_use]
    pub fn extended_stop(options: StopOptions) -> Self {
        Self::fixed(
            HostCommand::ExtendedStop,
            vec![FieldValue::U8(options.as_u8())],
        )
    }

    /// `GET_MOTHERBOARD_STATUS`
    #[must_use]
    pub fn get_motherboard_status() -> Self {
        Self::fixed(HostCommand::GetMotherboardStatus, Vec::new())
    }

    /// `GET_BUILD_STATS`
    #[must_use]
    pub fn get_build_stats() -> Self {
        Self::fixed(HostCommand::GetBuildStats, Vec::new())
    }

    /// `GET_COMMUNICATION_STATS`
    #[must_use]
    pub fn get_communication_stats() -> Self {
        Self::fixed(HostCommand::GetCommunicationStats, Vec::new())
    }
}

/// Host actions
impl ProtocolCall {
    /// `FIND_AXES_MINIMUMS`
    #[must_use]
    pub fn find_axes_minimums(axes: AxisSet, rate: u32, timeout: u16) -> Self {
        Self::fixed(HostCommand::FindAxesMinimums, homing_args(axes, rate, timeout))
    }

    /// `FIND_AXES_MAXIMUMS`
    #[must_use]
    pub fn find_axes_maximums(axes: AxisSet, rate: u32, timeout: u16) -> Self {
        Self::fixed(HostCommand::FindAxesMaximums, homing_args(axes, rate, timeout))
    }

    /// `DELAY` in microseconds
    #[must_use]
    pub fn delay(microseconds: u32) -> Self {
        Self::fixed(HostCommand::Delay, vec![FieldValue::U32(microseconds)])
    }

    /// `CHANGE_TOOL`
    pub fn change_tool(tool_index: u8) -> Result<Self> {
        check_tool_index(tool_index)?;
        Ok(Self::fixed(
            HostCommand::ChangeTool,
            vec![FieldValue::U8(tool_index)],
        ))
    }

    /// `WAIT_FOR_TOOL_READY`; `delay` is the poll interval, `timeout` in seconds
    pub fn wait_for_tool_ready(tool_index: u8, delay: u16, timeout: u16) -> Result<Self> {
        check_tool_index(tool_index)?;
        Ok(Self::fixed(
            HostCommand::WaitForToolReady,
            wait_args(tool_index, delay, timeout),
        ))
    }

    /// `WAIT_FOR_PLATFORM_READY`
    pub fn wait_for_platform_ready(tool_index: u8, delay: u16, timeout: u16) -> Result<Self> {
        check_tool_index(tool_index)?;
        Ok(Self::fixed(
            HostCommand::WaitForPlatformReady,
            wait_args(tool_index, delay, timeout),
        ))
    }

    /// `ENABLE_AXES`; bit 7 selects enable versus disable
    #[must_use]
    pub fn toggle_axes(axes: AxisSet, enable: bool) -> Self {
        let mut bits = axes.as_u8();
        if enable {
            bits |= 0x80;
        }
        Self::fixed(HostCommand::EnableAxes, vec![FieldValue::U8(bits)])
    }

    /// `QUEUE_EXTENDED_POINT` to `position` (steps) at `rate` (µs per step)
    pub fn queue_extended_point(position: &[i32], rate: u32) -> Result<Self> {
        let mut args = point_args(position)?;
        args.push(FieldValue::U32(rate));
        Self::host(HostCommand::QueueExtendedPoint, args)
    }

    /// `SET_EXTENDED_POSITION`
    pub fn set_extended_position(position: &[i32]) -> Result<Self> {
        Self::host(HostCommand::SetExtendedPosition, point_args(position)?)
    }

    /// `QUEUE_EXTENDED_POINT_NEW` over `duration` (µs), some axes relative
    pub fn queue_extended_point_new(
        position: &[i32],
        duration: u32,
        relative_axes: AxisSet,
    ) -> Result<Self> {
        let mut args = point_args(position)?;
        args.push(FieldValue::U32(duration));
        args.push(FieldValue::U8(relative_axes.as_u8()));
        Self::host(HostCommand::QueueExtendedPointNew, args)
    }

    /// `STORE_HOME_POSITIONS`
    #[must_use]
    pub fn store_home_positions(axes: AxisSet) -> Self {
        Self::fixed(
            HostCommand::StoreHomePositions,
            vec![FieldValue::U8(axes.as_u8())],
        )
    }

    /// `RECALL_HOME_POSITIONS`
    #[must_use]
    pub fn recall_home_positions(axes: AxisSet) -> Self {
        Self::fixed(
            HostCommand::RecallHomePositions,
            vec![FieldValue::U8(axes.as_u8())],
        )
    }

    /// `SET_POT_VALUE` for one axis
    #[must_use]
    pub fn set_potentiometer_value(axis: Axis, value: u8) -> Self {
        Self::fixed(
            HostCommand::SetPotValue,
            vec![FieldValue::U8(axis.bit()), FieldValue::U8(value)],
        )
    }

    /// `SET_RGB_LED`
    #[must_use]
    pub fn set_rgb_led(red: u8, green: u8, blue: u8, blink: u8) -> Self {
        Self::fixed(
            HostCommand::SetRgbLed,
            vec![
                FieldValue::U8(red),
                FieldValue::U8(green),
                FieldValue::U8(blue),
                FieldValue::U8(blink),
                FieldValue::U8(0),
            ],
        )
    }

    /// `SET_BEEP`; `duration` in milliseconds
    #[must_use]
    pub fn set_beep(frequency: u16, duration: u16) -> Self {
        Self::fixed(
            HostCommand::SetBeep,
            vec![
                FieldValue::U16(frequency),
                FieldValue::U16(duration),
                FieldValue::U8(0),
            ],
        )
    }

    /// `WAIT_FOR_BUTTON`; a zero timeout waits forever
    #[must_use]
    pub fn wait_for_button(button: Button, timeout: u16, options: ButtonOptions) -> Self {
        Self::fixed(
            HostCommand::WaitForButton,
            vec![
                FieldValue::U8(button.as_u8()),
                FieldValue::U16(timeout),
                FieldValue::U8(options.as_u8()),
            ],
        )
    }

    /// `DISPLAY_MESSAGE` at `row`/`col`; a zero timeout keeps it up
    pub fn display_message(
        row: u8,
        col: u8,
        message: &str,
        timeout: u8,
        options: DisplayOptions,
    ) -> Result<Self> {
        Self::host(
            HostCommand::DisplayMessage,
            vec![
                FieldValue::U8(options.as_u8()),
                FieldValue::U8(col),
                FieldValue::U8(row),
                FieldValue::U8(timeout),
                text(message),
            ],
        )
    }

    /// `SET_BUILD_PERCENT`
    #[must_use]
    pub fn set_build_percent(percent: u8) -> Self {
        Self::fixed(
            HostCommand::SetBuildPercent,
            vec![FieldValue::U8(percent), FieldValue::U8(0)],
        )
    }

    /// `QUEUE_SONG`
    #[must_use]
    pub fn queue_song(song_id: u8) -> Self {
        Self::fixed(HostCommand::QueueSong, vec![FieldValue::U8(song_id)])
    }

    /// `RESET_TO_FACTORY`
    #[must_use]
    pub fn reset_to_factory() -> Self {
        Self::fixed(HostCommand::ResetToFactory, vec![FieldValue::U8(0)])
    }

    /// `BUILD_START_NOTIFICATION`. Names too long for one packet are cut.
    #[must_use]
    pub fn build_start_notification(build_name: &str) -> Self {
        let max = MAX_PAYLOAD_LENGTH - BUILD_START_OVERHEAD;
        let mut name = build_name.as_bytes().to_vec();
        name.truncate(max);
        Self::fixed(
            HostCommand::BuildStartNotification,
            vec![FieldValue::U32(0), FieldValue::CStr(name)],
        )
    }

    /// `BUILD_END_NOTIFICATION`
    #[must_use]
    pub fn build_end_notification() -> Self {
        Self::fixed(HostCommand::BuildEndNotification, vec![FieldValue::U8(0)])
    }
}

/// Toolhead calls
impl ProtocolCall {
    /// Tool `GET_VERSION`
    pub fn get_toolhead_version(tool_index: u8) -> Result<Self> {
        Self::tool(
            tool_index,
            ToolCommand::GetVersion,
            vec![FieldValue::U16(S3G_VERSION)],
        )
    }

    /// Tool `INIT`
    pub fn toolhead_init(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::Init, Vec::new())
    }

    /// Tool `PAUSE`
    pub fn toolhead_pause(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::Pause, Vec::new())
    }

    /// Tool `ABORT`
    pub fn toolhead_abort(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::Abort, Vec::new())
    }

    /// `GET_TOOLHEAD_TEMP`
    pub fn get_toolhead_temperature(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::GetToolheadTemp, Vec::new())
    }

    /// `SET_TOOLHEAD_TARGET_TEMP`
    pub fn set_toolhead_temperature(tool_index: u8, temperature: u16) -> Result<Self> {
        Self::tool(
            tool_index,
            ToolCommand::SetToolheadTargetTemp,
            vec![FieldValue::U16(temperature)],
        )
    }

    /// `SET_MOTOR_1_SPEED_RPM`; `duration` is microseconds per rotation
    pub fn set_motor1_speed_rpm(tool_index: u8, duration: u32) -> Result<Self> {
        Self::tool(
            tool_index,
            ToolCommand::SetMotor1SpeedRpm,
            vec![FieldValue::U32(duration)],
        )
    }

    /// `TOGGLE_MOTOR_1`
    pub fn toggle_motor1(tool_index: u8, options: MotorOptions) -> Result<Self> {
        Self::tool(
            tool_index,
            ToolCommand::ToggleMotor1,
            vec![FieldValue::U8(options.as_u8())],
        )
    }

    /// `TOGGLE_FAN`
    pub fn toggle_fan(tool_index: u8, on: bool) -> Result<Self> {
        Self::tool(
            tool_index,
            ToolCommand::ToggleFan,
            vec![FieldValue::U8(u8::from(on))],
        )
    }

    /// `TOGGLE_EXTRA_OUTPUT`
    pub fn toggle_extra_output(tool_index: u8, on: bool) -> Result<Self> {
        Self::tool(
            tool_index,
            ToolCommand::ToggleExtraOutput,
            vec![FieldValue::U8(u8::from(on))],
        )
    }

    /// `SET_SERVO_1_POSITION` in degrees
    pub fn set_servo1_position(tool_index: u8, theta: u8) -> Result<Self> {
        Self::tool(
            tool_index,
            ToolCommand::SetServo1Position,
            vec![FieldValue::U8(theta)],
        )
    }

    /// `GET_MOTOR_1_SPEED_RPM`
    pub fn get_motor1_speed(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::GetMotor1SpeedRpm, Vec::new())
    }

    /// `IS_TOOL_READY`
    pub fn is_tool_ready(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::IsToolReady, Vec::new())
    }

    /// Tool `READ_FROM_EEPROM`
    pub fn read_from_toolhead_eeprom(tool_index: u8, offset: u16, length: usize) -> Result<Self> {
        Self::tool(
            tool_index,
            ToolCommand::ReadFromEeprom,
            eeprom_read_args(offset, length, MAX_TOOL_EEPROM_READ)?,
        )
    }

    /// Tool `WRITE_TO_EEPROM`
    pub fn write_to_toolhead_eeprom(tool_index: u8, offset: u16, data: &[u8]) -> Result<Self> {
        Self::tool(
            tool_index,
            ToolCommand::WriteToEeprom,
            eeprom_write_args(offset, data, MAX_TOOL_EEPROM_WRITE)?,
        )
    }

    /// `GET_PLATFORM_TEMP`
    pub fn get_platform_temperature(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::GetPlatformTemp, Vec::new())
    }

    /// `SET_PLATFORM_TEMP`
    pub fn set_platform_temperature(tool_index: u8, temperature: u16) -> Result<Self> {
        Self::tool(
            tool_index,
            ToolCommand::SetPlatformTemp,
            vec![FieldValue::U16(temperature)],
        )
    }

    /// `GET_TOOLHEAD_TARGET_TEMP`
    pub fn get_toolhead_target_temperature(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::GetToolheadTargetTemp, Vec::new())
    }

    /// `GET_PLATFORM_TARGET_TEMP`
    pub fn get_platform_target_temperature(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::GetPlatformTargetTemp, Vec::new())
    }

    /// `IS_PLATFORM_READY`
    pub fn is_platform_ready(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::IsPlatformReady, Vec::new())
    }

    /// `GET_TOOL_STATUS`
    pub fn get_tool_status(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::GetToolStatus, Vec::new())
    }

    /// `GET_PID_STATE`
    pub fn get_pid_state(tool_index: u8) -> Result<Self> {
        Self::tool(tool_index, ToolCommand::GetPidState, Vec::new())
    }
}

fn homing_args(axes: AxisSet, rate: u32, timeout: u16) -> Vec<FieldValue> {
    vec![
        FieldValue::U8(axes.as_u8()),
        FieldValue::U32(rate),
        FieldValue::U16(timeout),
    ]
}

fn wait_args(tool_index: u8, delay: u16, timeout: u16) -> Vec<FieldValue> {
    vec![
        FieldValue::U8(tool_index),
        FieldValue::U16(delay),
        FieldValue::U16(timeout),
    ]
}

fn check_tool_index(tool_index: u8) -> Result<()> {
    if tool_index > MAX_TOOL_INDEX {
        return Err(ProtocolError::ToolIndex {
            index: tool_index,
            max: MAX_TOOL_INDEX,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_length_checked() {
        let err = ProtocolCall::queue_extended_point(&[1, 2, 3, 4], 100).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::PointLength {
                len: 4,
                expected: 5
            }
        );
        assert!(ProtocolCall::set_extended_position(&[0; 6]).is_err());
        assert!(ProtocolCall::set_extended_position(&[0; 5]).is_ok());
    }

    #[test]
    fn test_eeprom_limits() {
        assert!(ProtocolCall::read_from_eeprom(0, 31).is_ok());
        assert_eq!(
            ProtocolCall::read_from_eeprom(0, 32).unwrap_err(),
            ProtocolError::EepromLength { len: 32, max: 31 }
        );
        assert!(ProtocolCall::write_to_eeprom(0, &[0; 28]).is_ok());
        assert_eq!(
            ProtocolCall::write_to_eeprom(0, &[0; 29]).unwrap_err(),
            ProtocolError::EepromLength { len: 29, max: 28 }
        );
        assert!(ProtocolCall::write_to_toolhead_eeprom(0, 0, &[0; 26]).is_ok());
        assert!(matches!(
            ProtocolCall::write_to_toolhead_eeprom(0, 0, &[0; 27]),
            Err(ProtocolError::EepromLength { len: 27, max: 26 })
        ));
        assert!(matches!(
            ProtocolCall::read_from_eeprom(0, 1000),
            Err(ProtocolError::EepromLength { len: 1000, .. })
        ));
    }

    #[test]
    fn test_eeprom_writes_fill_a_packet_exactly() {
        let host = ProtocolCall::write_to_eeprom(0, &[0; MAX_EEPROM_WRITE]).unwrap();
        assert_eq!(host.encoded_len(), MAX_PAYLOAD_LENGTH);
        let tool = ProtocolCall::write_to_toolhead_eeprom(3, 0, &[0; MAX_TOOL_EEPROM_WRITE]).unwrap();
        assert_eq!(tool.encoded_len(), MAX_PAYLOAD_LENGTH);
    }

    #[test]
    fn test_tool_index_range() {
        assert!(ProtocolCall::get_toolhead_temperature(127).is_ok());
        assert_eq!(
            ProtocolCall::get_toolhead_temperature(128).unwrap_err(),
            ProtocolError::ToolIndex {
                index: 128,
                max: 127
            }
        );
        assert!(ProtocolCall::change_tool(200).is_err());
    }

    #[test]
    fn test_long_message_rejected() {
        let message = "x".repeat(40);
        let err = ProtocolCall::display_message(0, 0, &message, 0, DisplayOptions::new()).unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { size: 46, max: 32 }));
        assert!(ProtocolCall::capture_to_file(&"f".repeat(31)).is_err());
        assert!(ProtocolCall::capture_to_file(&"f".repeat(30)).is_ok());
    }

    #[test]
    fn test_build_name_truncated() {
        let call = ProtocolCall::build_start_notification(&"n".repeat(60));
        assert_eq!(call.encoded_len(), MAX_PAYLOAD_LENGTH - 1);
        match &call.args()[1] {
            FieldValue::CStr(name) => assert_eq!(name.len(), 25),
            other => panic!("unexpected field {other:?}"),
        }
    }

    #[test]
    fn test_enable_axes_bit() {
        let axes = AxisSet::new().with(Axis::X).with(Axis::Y);
        assert_eq!(
            ProtocolCall::toggle_axes(axes, true).args(),
            &[FieldValue::U8(0x83)]
        );
        assert_eq!(
            ProtocolCall::toggle_axes(axes, false).args(),
            &[FieldValue::U8(0x03)]
        );
    }
}
