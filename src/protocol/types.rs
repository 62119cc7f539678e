//! s3g opcodes, response codes and bitfield types

use std::fmt;

/// Host (motherboard) level commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HostCommand {
    /// Firmware version handshake
    GetVersion = 0,
    /// Reset the machine to its power-on state
    Init = 1,
    /// Free space in the command buffer
    GetAvailableBufferSize = 2,
    /// Drop all queued commands
    ClearBuffer = 3,
    /// Stop everything: steppers, buffers and toolheads
    AbortImmediately = 7,
    /// Toggle pause
    Pause = 8,
    /// Forward a query to a toolhead
    ToolQuery = 10,
    /// Whether the steppers are idle
    IsFinished = 11,
    /// Raw motherboard EEPROM read
    ReadFromEeprom = 12,
    /// Raw motherboard EEPROM write
    WriteToEeprom = 13,
    /// Start capturing commands to an SD card file
    CaptureToFile = 14,
    /// Stop capturing
    EndCapture = 15,
    /// Build a file from the SD card
    PlaybackCapture = 16,
    /// Soft reset
    Reset = 17,
    /// Iterate the SD card directory
    GetNextFilename = 18,
    /// Name of the running build
    GetBuildName = 20,
    /// Current 5D position and endstop states
    GetExtendedPosition = 21,
    /// Halt steppers and/or clear the buffer
    ExtendedStop = 22,
    /// Motherboard status bits
    GetMotherboardStatus = 23,
    /// Statistics for the current or last build
    GetBuildStats = 24,
    /// Tool network traffic counters
    GetCommunicationStats = 25,
    /// Extended firmware version
    GetAdvancedVersion = 27,

    /// Home in the negative direction
    FindAxesMinimums = 131,
    /// Home in the positive direction
    FindAxesMaximums = 132,
    /// Halt motion for a number of microseconds
    Delay = 133,
    /// Switch the active toolhead
    ChangeTool = 134,
    /// Block until a toolhead reaches temperature
    WaitForToolReady = 135,
    /// Forward an action to a toolhead
    ToolActionCommand = 136,
    /// Power steppers on or off
    EnableAxes = 137,
    /// Move to a 5D point at a DDA rate
    QueueExtendedPoint = 139,
    /// Redefine the current 5D position
    SetExtendedPosition = 140,
    /// Block until the platform reaches temperature
    WaitForPlatformReady = 141,
    /// Move to a 5D point over a duration, with relative axes
    QueueExtendedPointNew = 142,
    /// Save the current position as home
    StoreHomePositions = 143,
    /// Move to the saved home position
    RecallHomePositions = 144,
    /// Stepper driver reference voltage
    SetPotValue = 145,
    /// RGB LED colour and blink rate
    SetRgbLed = 146,
    /// Play a tone
    SetBeep = 147,
    /// Block until a button is pressed
    WaitForButton = 148,
    /// Put a message on the interface board
    DisplayMessage = 149,
    /// Build progress shown on the interface board
    SetBuildPercent = 150,
    /// Play a stored song
    QueueSong = 151,
    /// Restore EEPROM factory defaults
    ResetToFactory = 152,
    /// A build has started
    BuildStartNotification = 153,
    /// A build has ended
    BuildEndNotification = 154,
}

impl HostCommand {
    /// Every host command, in opcode order
    pub const ALL: [Self; 45] = [
        Self::GetVersion,
        Self::Init,
        Self::GetAvailableBufferSize,
        Self::ClearBuffer,
        Self::AbortImmediately,
        Self::Pause,
        Self::ToolQuery,
        Self::IsFinished,
        Self::ReadFromEeprom,
        Self::WriteToEeprom,
        Self::CaptureToFile,
        Self::EndCapture,
        Self::PlaybackCapture,
        Self::Reset,
        Self::GetNextFilename,
        Self::GetBuildName,
        Self::GetExtendedPosition,
        Self::ExtendedStop,
        Self::GetMotherboardStatus,
        Self::GetBuildStats,
        Self::GetCommunicationStats,
        Self::GetAdvancedVersion,
        Self::FindAxesMinimums,
        Self::FindAxesMaximums,
        Self::Delay,
        Self::ChangeTool,
        Self::WaitForToolReady,
        Self::ToolActionCommand,
        Self::EnableAxes,
        Self::QueueExtendedPoint,
        Self::SetExtendedPosition,
        Self::WaitForPlatformReady,
        Self::QueueExtendedPointNew,
        Self::StoreHomePositions,
        Self::RecallHomePositions,
        Self::SetPotValue,
        Self::SetRgbLed,
        Self::SetBeep,
        Self::WaitForButton,
        Self::DisplayMessage,
        Self::SetBuildPercent,
        Self::QueueSong,
        Self::ResetToFactory,
        Self::BuildStartNotification,
        Self::BuildEndNotification,
    ];

    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.as_u8() == value)
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for HostCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}({})", self.as_u8())
    }
}

/// Toolhead level commands, tunnelled through `TOOL_QUERY` / `TOOL_ACTION_COMMAND`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ToolCommand {
    /// Toolhead firmware version
    GetVersion = 0,
    /// Reset the toolhead
    Init = 1,
    /// Current extruder temperature
    GetToolheadTemp = 2,
    /// Extruder setpoint
    SetToolheadTargetTemp = 3,
    /// Motor 1 speed as microseconds per rotation
    SetMotor1SpeedRpm = 6,
    /// Motor 1 enable/direction bits
    ToggleMotor1 = 10,
    /// Cooling fan on/off
    ToggleFan = 12,
    /// Extra output on/off
    ToggleExtraOutput = 13,
    /// Servo 1 angle
    SetServo1Position = 14,
    /// Motor 1 speed
    GetMotor1SpeedRpm = 17,
    /// Extruder at temperature
    IsToolReady = 22,
    /// Pause the toolhead
    Pause = 23,
    /// Disable heaters and motors
    Abort = 24,
    /// Raw toolhead EEPROM read
    ReadFromEeprom = 25,
    /// Raw toolhead EEPROM write
    WriteToEeprom = 26,
    /// Current platform temperature
    GetPlatformTemp = 30,
    /// Platform setpoint
    SetPlatformTemp = 31,
    /// Extruder setpoint readback
    GetToolheadTargetTemp = 32,
    /// Platform setpoint readback
    GetPlatformTargetTemp = 33,
    /// Platform at temperature
    IsPlatformReady = 35,
    /// Toolhead status bits
    GetToolStatus = 36,
    /// PID controller terms
    GetPidState = 37,
}

impl ToolCommand {
    /// Every tool command, in opcode order
    pub const ALL: [Self; 22] = [
        Self::GetVersion,
        Self::Init,
        Self::GetToolheadTemp,
        Self::SetToolheadTargetTemp,
        Self::SetMotor1SpeedRpm,
        Self::ToggleMotor1,
        Self::ToggleFan,
        Self::ToggleExtraOutput,
        Self::SetServo1Position,
        Self::GetMotor1SpeedRpm,
        Self::IsToolReady,
        Self::Pause,
        Self::Abort,
        Self::ReadFromEeprom,
        Self::WriteToEeprom,
        Self::GetPlatformTemp,
        Self::SetPlatformTemp,
        Self::GetToolheadTargetTemp,
        Self::GetPlatformTargetTemp,
        Self::IsPlatformReady,
        Self::GetToolStatus,
        Self::GetPidState,
    ];

    /// Convert from byte
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.as_u8() == value)
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tool{self:?}({})", self.as_u8())
    }
}

/// An opcode from either of the two disjoint opcode spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Motherboard command
    Host(HostCommand),
    /// Toolhead command
    Tool(ToolCommand),
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host(cmd) => cmd.fmt(f),
            Self::Tool(cmd) => cmd.fmt(f),
        }
    }
}

impl From<HostCommand> for Opcode {
    fn from(cmd: HostCommand) -> Self {
        Self::Host(cmd)
    }
}

impl From<ToolCommand> for Opcode {
    fn from(cmd: ToolCommand) -> Self {
        Self::Tool(cmd)
    }
}

/// First byte of every device response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseCode {
    /// Packet could not be processed
    GenericPacketError = 0x80,
    /// Command accepted
    Success = 0x81,
    /// Action buffer full, try again later
    ActionBufferOverflow = 0x82,
    /// Packet CRC did not match
    CrcMismatch = 0x83,
    /// Packet larger than the device accepts
    PacketTooBig = 0x84,
    /// Opcode not implemented by the firmware
    CommandNotSupported = 0x85,
    /// Toolhead did not answer
    DownstreamTimeout = 0x87,
    /// Toolhead bus lock not acquired
    ToolLockTimeout = 0x88,
    /// The build was cancelled on the device
    CancelBuild = 0x89,
    /// The device is running a build from SD
    ActiveLocalBuild = 0x8A,
    /// The device shut down its heaters
    OverheatState = 0x8B,
}

impl ResponseCode {
    /// Convert from byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x80 => Some(Self::GenericPacketError),
            0x81 => Some(Self::Success),
            0x82 => Some(Self::ActionBufferOverflow),
            0x83 => Some(Self::CrcMismatch),
            0x84 => Some(Self::PacketTooBig),
            0x85 => Some(Self::CommandNotSupported),
            0x87 => Some(Self::DownstreamTimeout),
            0x88 => Some(Self::ToolLockTimeout),
            0x89 => Some(Self::CancelBuild),
            0x8A => Some(Self::ActiveLocalBuild),
            0x8B => Some(Self::OverheatState),
            _ => None,
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Statuses a writer may resend the same packet for
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::GenericPacketError | Self::ActionBufferOverflow | Self::CrcMismatch
        )
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GenericPacketError => "generic packet error",
            Self::Success => "success",
            Self::ActionBufferOverflow => "action buffer overflow",
            Self::CrcMismatch => "CRC mismatch",
            Self::PacketTooBig => "packet too big",
            Self::CommandNotSupported => "command not supported",
            Self::DownstreamTimeout => "downstream timeout",
            Self::ToolLockTimeout => "tool lock timeout",
            Self::CancelBuild => "build cancelled",
            Self::ActiveLocalBuild => "active local build",
            Self::OverheatState => "overheat state",
        };
        write!(f, "{name} ({:#04x})", self.as_u8())
    }
}

/// Secondary status byte of SD card operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdResponse {
    /// Operation succeeded
    Success,
    /// No card inserted
    NoCardPresent,
    /// Card failed to initialise
    InitializationFailed,
    /// Partition table unreadable
    PartitionTableError,
    /// Filesystem unreadable
    FilesystemError,
    /// Directory unreadable
    DirectoryError,
    /// Code outside the known table
    Unknown(u8),
}

impl SdResponse {
    /// Convert from byte
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::NoCardPresent,
            2 => Self::InitializationFailed,
            3 => Self::PartitionTableError,
            4 => Self::FilesystemError,
            5 => Self::DirectoryError,
            other => Self::Unknown(other),
        }
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::NoCardPresent => 1,
            Self::InitializationFailed => 2,
            Self::PartitionTableError => 3,
            Self::FilesystemError => 4,
            Self::DirectoryError => 5,
            Self::Unknown(other) => other,
        }
    }
}

impl fmt::Display for SdResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::NoCardPresent => write!(f, "no card present"),
            Self::InitializationFailed => write!(f, "initialization failed"),
            Self::PartitionTableError => write!(f, "partition table error"),
            Self::FilesystemError => write!(f, "filesystem error"),
            Self::DirectoryError => write!(f, "directory error"),
            Self::Unknown(code) => write!(f, "unknown SD response {code}"),
        }
    }
}

/// One of the five machine axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    /// X
    X,
    /// Y
    Y,
    /// Z
    Z,
    /// First extruder axis
    A,
    /// Second extruder axis
    B,
}

impl Axis {
    /// All axes in wire order
    pub const ALL: [Self; 5] = [Self::X, Self::Y, Self::Z, Self::A, Self::B];

    /// Index into a 5D point
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Bit used in axis bitfields
    #[must_use]
    pub const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// G-code letter for this axis
    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::Z => 'Z',
            Self::A => 'A',
            Self::B => 'B',
        }
    }

    /// Parse a G-code axis letter (case-insensitive)
    #[must_use]
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Self::X),
            'Y' => Some(Self::Y),
            'Z' => Some(Self::Z),
            'A' => Some(Self::A),
            'B' => Some(Self::B),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Set of axes packed one bit per axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AxisSet(u8);

impl AxisSet {
    /// Valid axis bits mask
    pub const VALID_MASK: u8 = 0x1F;

    /// Create an empty set
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// All five axes
    #[must_use]
    pub const fn all() -> Self {
        Self(Self::VALID_MASK)
    }

    /// Create from byte, ignoring bits that do not name an axis
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        Self(value & Self::VALID_MASK)
    }

    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Add an axis
    #[must_use]
    pub const fn with(mut self, axis: Axis) -> Self {
        self.0 |= axis.bit();
        self
    }

    /// Check whether an axis is selected
    #[must_use]
    pub const fn contains(self, axis: Axis) -> bool {
        (self.0 & axis.bit()) != 0
    }

    /// Check if no axis is selected
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Selected axes in wire order
    pub fn iter(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |axis| self.contains(*axis))
    }
}

impl FromIterator<Axis> for AxisSet {
    fn from_iter<I: IntoIterator<Item = Axis>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::with)
    }
}

impl fmt::Display for AxisSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        for axis in self.iter() {
            write!(f, "{axis}")?;
        }
        Ok(())
    }
}

/// Interface board button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Button {
    /// Center
    Center = 0x01,
    /// Right
    Right = 0x02,
    /// Left
    Left = 0x04,
    /// Down
    Down = 0x08,
    /// Up
    Up = 0x10,
}

impl Button {
    /// Convert to byte
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Declares a newtype over `u8` holding a fixed set of named bits.
macro_rules! bit_options {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$flag_meta:meta])* $flag:ident = $bit:expr, $getter:ident; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        pub struct $name(u8);

        impl $name {
            $( $(#[$flag_meta])* pub const $flag: u8 = $bit; )+

            /// Valid bits mask
            pub const VALID_MASK: u8 = 0 $( | $bit )+;

            /// Create empty options
            #[must_use]
            pub const fn new() -> Self {
                Self(0)
            }

            /// Create from byte, dropping bits outside the table
            #[must_use]
            pub const fn from_u8(value: u8) -> Self {
                Self(value & Self::VALID_MASK)
            }

            /// Convert to byte
            #[must_use]
            pub const fn as_u8(self) -> u8 {
                self.0
            }

            /// Set a bit
            #[must_use]
            pub const fn with(mut self, flag: u8) -> Self {
                self.0 |= flag & Self::VALID_MASK;
                self
            }

            /// Set a bit when `enabled`
            #[must_use]
            pub const fn with_if(self, flag: u8, enabled: bool) -> Self {
                if enabled { self.with(flag) } else { self }
            }

            /// Check if a bit is set
            #[must_use]
            pub const fn has(self, flag: u8) -> bool {
                (self.0 & flag) != 0
            }

            $(
                #[doc = concat!("Whether `", stringify!($flag), "` is set")]
                #[must_use]
                pub const fn $getter(self) -> bool {
                    self.has(Self::$flag)
                }
            )+
        }
    };
}

bit_options! {
    /// `DISPLAY_MESSAGE` options
    DisplayOptions {
        /// Clear the existing message buffer and timeout
        CLEAR_EXISTING = 1 << 0, clear_existing;
        /// Last message of a group
        LAST_IN_GROUP = 1 << 1, last_in_group;
        /// Keep the message until a button is pressed
        WAIT_FOR_BUTTON = 1 << 2, wait_for_button;
    }
}

bit_options! {
    /// `WAIT_FOR_BUTTON` timeout behaviour
    ButtonOptions {
        /// Enter the ready state on timeout
        READY_ON_TIMEOUT = 1 << 0, ready_on_timeout;
        /// Reset on timeout
        RESET_ON_TIMEOUT = 1 << 1, reset_on_timeout;
        /// Clear the screen on button press
        CLEAR_SCREEN = 1 << 2, clear_screen;
    }
}

bit_options! {
    /// `EXTENDED_STOP` options
    StopOptions {
        /// Halt the steppers
        HALT_STEPPERS = 1 << 0, halt_steppers;
        /// Clear the command buffer
        CLEAR_BUFFER = 1 << 1, clear_buffer;
    }
}

bit_options! {
    /// `TOGGLE_MOTOR_1` bits
    MotorOptions {
        /// Motor on
        ENABLE = 1 << 0, enable;
        /// Clockwise
        CLOCKWISE = 1 << 1, clockwise;
    }
}

bit_options! {
    /// `GET_MOTHERBOARD_STATUS` reply bits
    MotherboardStatus {
        /// Heaters shut down after 20 minutes of inactivity
        HEAT_SHUTDOWN = 1 << 6, heat_shutdown;
        /// System power fault
        POWER_ERROR = 1 << 7, power_error;
    }
}

bit_options! {
    /// `GET_TOOL_STATUS` reply bits
    ToolStatus {
        /// Extruder at target temperature
        EXTRUDER_READY = 1 << 0, extruder_ready;
        /// Extruder thermocouple not detected
        EXTRUDER_NOT_PLUGGED_IN = 1 << 1, extruder_not_plugged_in;
        /// Extruder above its maximum temperature
        EXTRUDER_OVER_MAX_TEMP = 1 << 2, extruder_over_max_temp;
        /// Extruder not heating as expected
        EXTRUDER_NOT_HEATING = 1 << 3, extruder_not_heating;
        /// Extruder dropped 30 degrees below target
        EXTRUDER_DROPPING_TEMP = 1 << 4, extruder_dropping_temp;
        /// Platform heater fault
        PLATFORM_ERROR = 1 << 6, platform_error;
        /// Extruder heater fault
        EXTRUDER_ERROR = 1 << 7, extruder_error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_command_roundtrip() {
        for cmd in HostCommand::ALL {
            let byte = cmd.as_u8();
            assert_eq!(HostCommand::from_u8(byte), Some(cmd));
        }
        assert_eq!(HostCommand::from_u8(200), None);
    }

    #[test]
    fn test_tool_command_roundtrip() {
        for cmd in ToolCommand::ALL {
            assert_eq!(ToolCommand::from_u8(cmd.as_u8()), Some(cmd));
        }
        assert_eq!(ToolCommand::from_u8(99), None);
    }

    #[test]
    fn test_axis_set_bits() {
        let axes: AxisSet = [Axis::X, Axis::Z, Axis::B].into_iter().collect();
        assert_eq!(axes.as_u8(), 0x01 | 0x04 | 0x10);
        assert!(axes.contains(Axis::Z));
        assert!(!axes.contains(Axis::A));
        assert_eq!(axes.to_string(), "XZB");
        assert_eq!(AxisSet::all().as_u8(), 0x1F);
    }

    #[test]
    fn test_status_bits() {
        let status = MotherboardStatus::from_u8(0x80 | 0x01);
        assert!(status.power_error());
        assert!(!status.heat_shutdown());
        // bit 0 is unused and never surfaces
        assert_eq!(status.as_u8(), 0x80);

        let tool = ToolStatus::from_u8(0b1000_0001);
        assert!(tool.extruder_ready());
        assert!(tool.extruder_error());
        assert!(!tool.platform_error());
    }

    #[test]
    fn test_retryable_codes() {
        assert!(ResponseCode::ActionBufferOverflow.is_retryable());
        assert!(!ResponseCode::CommandNotSupported.is_retryable());
        assert_eq!(ResponseCode::from_u8(0x86), None);
    }
}
