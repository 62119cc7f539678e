//! Per-opcode field layouts
//!
//! Every opcode maps to a fixed, ordered list of argument fields and a reply
//! shape. Tool commands list only the fields that follow the tool index and
//! tool opcode; the tunnelling header is added by the codec.

use super::types::{HostCommand, Opcode, ToolCommand};

/// Wire width and signedness of one payload field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Unsigned byte
    U8,
    /// Little-endian unsigned 16-bit
    U16,
    /// Little-endian signed 16-bit
    I16,
    /// Little-endian unsigned 32-bit
    U32,
    /// Little-endian signed 32-bit
    I32,
    /// Raw bytes followed by a single NUL terminator
    CStr,
    /// Raw bytes running to the end of the payload
    Tail,
}

impl FieldKind {
    /// Encoded size of fixed-width fields. Variable fields return `None`.
    #[must_use]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::U8 => Some(1),
            Self::U16 | Self::I16 => Some(2),
            Self::U32 | Self::I32 => Some(4),
            Self::CStr | Self::Tail => None,
        }
    }
}

/// A decoded or to-be-encoded payload field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldValue {
    /// Unsigned byte
    U8(u8),
    /// Unsigned 16-bit
    U16(u16),
    /// Signed 16-bit
    I16(i16),
    /// Unsigned 32-bit
    U32(u32),
    /// Signed 32-bit
    I32(i32),
    /// String bytes without the terminator
    CStr(Vec<u8>),
    /// Trailing raw bytes
    Tail(Vec<u8>),
}

impl FieldValue {
    /// Kind of this value
    #[must_use]
    pub const fn kind(&self) -> FieldKind {
        match self {
            Self::U8(_) => FieldKind::U8,
            Self::U16(_) => FieldKind::U16,
            Self::I16(_) => FieldKind::I16,
            Self::U32(_) => FieldKind::U32,
            Self::I32(_) => FieldKind::I32,
            Self::CStr(_) => FieldKind::CStr,
            Self::Tail(_) => FieldKind::Tail,
        }
    }

    /// Bytes this value occupies on the wire
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::CStr(bytes) => bytes.len() + 1,
            Self::Tail(bytes) => bytes.len(),
            other => other.kind().fixed_size().unwrap_or(0),
        }
    }
}

/// What the device sends back after the status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyShape {
    /// Fire-and-forget; sent with `send_action_payload`
    Action,
    /// Round trip; the reply body is unpacked with these fields
    Query(&'static [FieldKind]),
}

impl ReplyShape {
    /// Whether the call expects a reply body
    #[must_use]
    pub const fn is_query(self) -> bool {
        matches!(self, Self::Query(_))
    }
}

/// Argument fields and reply shape of one opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Argument fields after the opcode byte, in wire order
    pub args: &'static [FieldKind],
    /// Reply shape
    pub reply: ReplyShape,
}

impl Layout {
    const fn action(args: &'static [FieldKind]) -> Self {
        Self {
            args,
            reply: ReplyShape::Action,
        }
    }

    const fn query(args: &'static [FieldKind], reply: &'static [FieldKind]) -> Self {
        Self {
            args,
            reply: ReplyShape::Query(reply),
        }
    }
}

use FieldKind::{CStr, I16, I32, Tail, U8, U16, U32};

const NONE: &[FieldKind] = &[];
const POINT: &[FieldKind] = &[I32, I32, I32, I32, I32];
const POINT_AND_RATE: &[FieldKind] = &[I32, I32, I32, I32, I32, U32];
const POINT_NEW: &[FieldKind] = &[I32, I32, I32, I32, I32, U32, U8];
const EXTENDED_POSITION: &[FieldKind] = &[I32, I32, I32, I32, I32, U16];
const HOMING: &[FieldKind] = &[U8, U32, U16];
const WAIT_READY: &[FieldKind] = &[U8, U16, U16];
const EEPROM_READ: &[FieldKind] = &[U16, U8];
const EEPROM_WRITE: &[FieldKind] = &[U16, U8, Tail];

impl HostCommand {
    /// Argument and reply layout
    #[must_use]
    pub const fn layout(self) -> Layout {
        match self {
            Self::GetVersion => Layout::query(&[U16], &[U16]),
            Self::Init | Self::ClearBuffer | Self::Pause | Self::Reset => Layout::action(NONE),
            Self::GetAvailableBufferSize | Self::EndCapture => Layout::query(NONE, &[U32]),
            Self::AbortImmediately => Layout::query(NONE, NONE),
            // the tunnelled tool command decides the real layout
            Self::ToolQuery => Layout::query(NONE, NONE),
            Self::ToolActionCommand => Layout::action(NONE),
            Self::IsFinished | Self::GetMotherboardStatus => Layout::query(NONE, &[U8]),
            Self::ReadFromEeprom => Layout::query(EEPROM_READ, &[Tail]),
            Self::WriteToEeprom => Layout::query(EEPROM_WRITE, &[U8]),
            Self::CaptureToFile | Self::PlaybackCapture => Layout::query(&[CStr], &[U8]),
            Self::GetNextFilename => Layout::query(&[U8], &[U8, CStr]),
            Self::GetBuildName => Layout::query(NONE, &[CStr]),
            Self::GetExtendedPosition => Layout::query(NONE, EXTENDED_POSITION),
            Self::ExtendedStop => Layout::query(&[U8], &[U8]),
            Self::GetBuildStats => Layout::query(NONE, &[U8, U8, U8, U32, U32]),
            Self::GetCommunicationStats => Layout::query(NONE, &[U32, U32, U32, U32, U32]),
            Self::GetAdvancedVersion => Layout::query(&[U16], &[U16, U16, U16, U16]),
            Self::FindAxesMinimums | Self::FindAxesMaximums => Layout::action(HOMING),
            Self::Delay => Layout::action(&[U32]),
            Self::ChangeTool
            | Self::EnableAxes
            | Self::StoreHomePositions
            | Self::RecallHomePositions
            | Self::QueueSong
            | Self::ResetToFactory
            | Self::BuildEndNotification => Layout::action(&[U8]),
            Self::WaitForToolReady | Self::WaitForPlatformReady => Layout::action(WAIT_READY),
            Self::QueueExtendedPoint => Layout::action(POINT_AND_RATE),
            Self::SetExtendedPosition => Layout::action(POINT),
            Self::QueueExtendedPointNew => Layout::action(POINT_NEW),
            Self::SetPotValue | Self::SetBuildPercent => Layout::action(&[U8, U8]),
            Self::SetRgbLed => Layout::action(&[U8, U8, U8, U8, U8]),
            Self::SetBeep => Layout::action(&[U16, U16, U8]),
            Self::WaitForButton => Layout::action(&[U8, U16, U8]),
            Self::DisplayMessage => Layout::action(&[U8, U8, U8, U8, CStr]),
            Self::BuildStartNotification => Layout::action(&[U32, CStr]),
        }
    }
}

impl ToolCommand {
    /// Argument and reply layout of the tunnelled command
    #[must_use]
    pub const fn layout(self) -> Layout {
        match self {
            Self::GetVersion => Layout::query(&[U16], &[U16]),
            Self::Init | Self::Pause | Self::Abort => Layout::action(NONE),
            Self::GetToolheadTemp
            | Self::GetPlatformTemp
            | Self::GetToolheadTargetTemp
            | Self::GetPlatformTargetTemp => Layout::query(NONE, &[U16]),
            Self::SetToolheadTargetTemp | Self::SetPlatformTemp => Layout::action(&[U16]),
            Self::SetMotor1SpeedRpm => Layout::action(&[U32]),
            Self::ToggleMotor1 | Self::ToggleFan | Self::ToggleExtraOutput | Self::SetServo1Position => {
                Layout::action(&[U8])
            }
            Self::GetMotor1SpeedRpm => Layout::query(NONE, &[U32]),
            Self::IsToolReady | Self::IsPlatformReady | Self::GetToolStatus => {
                Layout::query(NONE, &[U8])
            }
            Self::ReadFromEeprom => Layout::query(EEPROM_READ, &[Tail]),
            Self::WriteToEeprom => Layout::query(EEPROM_WRITE, &[U8]),
            Self::GetPidState => Layout::query(NONE, &[I16, I16, I16, I16, I16, I16]),
        }
    }
}

impl Opcode {
    /// Layout of the opcode itself (for tool opcodes, the tunnelled fields)
    #[must_use]
    pub const fn layout(self) -> Layout {
        match self {
            Self::Host(cmd) => cmd.layout(),
            Self::Tool(cmd) => cmd.layout(),
        }
    }

    /// Host opcode that carries this call on the wire
    #[must_use]
    pub const fn wire_command(self) -> HostCommand {
        match self {
            Self::Host(cmd) => cmd,
            Self::Tool(cmd) => {
                if cmd.layout().reply.is_query() {
                    HostCommand::ToolQuery
                } else {
                    HostCommand::ToolActionCommand
                }
            }
        }
    }

    /// Bytes preceding the argument fields: opcode, plus the tunnelling header
    #[must_use]
    pub const fn header_len(self) -> usize {
        match self.wire_command() {
            HostCommand::ToolQuery => 3,
            HostCommand::ToolActionCommand => 4,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_host_commands_are_actions() {
        for cmd in HostCommand::ALL {
            if cmd.as_u8() >= 128 {
                assert_eq!(cmd.layout().reply, ReplyShape::Action, "{cmd}");
            }
        }
    }

    #[test]
    fn test_tool_wire_command() {
        assert_eq!(
            Opcode::Tool(ToolCommand::GetToolheadTemp).wire_command(),
            HostCommand::ToolQuery
        );
        assert_eq!(
            Opcode::Tool(ToolCommand::SetToolheadTargetTemp).wire_command(),
            HostCommand::ToolActionCommand
        );
        assert_eq!(Opcode::Tool(ToolCommand::ToggleFan).header_len(), 4);
        assert_eq!(Opcode::Tool(ToolCommand::IsToolReady).header_len(), 3);
        assert_eq!(Opcode::Host(HostCommand::Delay).header_len(), 1);
    }

    #[test]
    fn test_point_layouts() {
        assert_eq!(HostCommand::SetExtendedPosition.layout().args.len(), 5);
        assert_eq!(HostCommand::QueueExtendedPoint.layout().args.len(), 6);
        assert_eq!(HostCommand::QueueExtendedPointNew.layout().args.len(), 7);
    }
}
