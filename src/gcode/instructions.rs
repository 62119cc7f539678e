//! Command descriptor table
//!
//! Every supported G/M command is one [`Instruction`]: the codes and
//! flags it accepts, the codes it requires, and the handler it runs.
//! [`Instruction::validate`] is the single validation routine applied to
//! every line before its handler sees it.

use super::error::GcodeErrorKind;
use super::parser::ParsedLine;

/// Handler selected by an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// G0, G1
    LinearMove,
    /// G4
    Dwell,
    /// G10
    StoreOffsets,
    /// G54 (register 1), G55 (register 2)
    UseOffsets(u8),
    /// G92
    SetPosition,
    /// G130
    SetPotentiometers,
    /// G161
    FindAxesMinimums,
    /// G162
    FindAxesMaximums,
    /// M17 (true), M18 (false)
    ToggleAxes(bool),
    /// M70
    DisplayMessage,
    /// M72
    PlaySong,
    /// M73
    BuildPercent,
    /// M101, M102, M103
    ExtruderNoop,
    /// M104
    SetToolheadTemperature,
    /// M105
    GetTemperature,
    /// M109
    SetPlatformTemperature,
    /// M126 (true), M127 (false)
    ExtraOutput(bool),
    /// M131
    StoreHomePositions,
    /// M132
    RecallHomePositions,
    /// M133
    WaitForToolReady,
    /// M134
    WaitForPlatformReady,
    /// M135
    ChangeTool,
}

/// Declared shape of one command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    /// `G` or `M`
    pub letter: char,
    /// Command number
    pub number: u16,
    /// Codes the command accepts
    pub codes: &'static str,
    /// Accepted codes that must be present
    pub required: &'static str,
    /// Flags the command accepts
    pub flags: &'static str,
    /// What runs the command
    pub handler: Handler,
}

const fn g(number: u16, codes: &'static str, required: &'static str, flags: &'static str, handler: Handler) -> Instruction {
    Instruction {
        letter: 'G',
        number,
        codes,
        required,
        flags,
        handler,
    }
}

const fn m(number: u16, codes: &'static str, required: &'static str, flags: &'static str, handler: Handler) -> Instruction {
    Instruction {
        letter: 'M',
        number,
        codes,
        required,
        flags,
        handler,
    }
}

/// Every supported command
pub const INSTRUCTIONS: &[Instruction] = &[
    g(0, "XYZABEF", "", "", Handler::LinearMove),
    g(1, "XYZABEF", "", "", Handler::LinearMove),
    g(4, "P", "P", "", Handler::Dwell),
    g(10, "XYZP", "P", "", Handler::StoreOffsets),
    g(54, "", "", "", Handler::UseOffsets(1)),
    g(55, "", "", "", Handler::UseOffsets(2)),
    g(92, "XYZABE", "", "", Handler::SetPosition),
    g(130, "XYZAB", "", "", Handler::SetPotentiometers),
    g(161, "F", "F", "XYZ", Handler::FindAxesMinimums),
    g(162, "F", "F", "XYZ", Handler::FindAxesMaximums),
    m(17, "", "", "XYZAB", Handler::ToggleAxes(true)),
    m(18, "", "", "XYZAB", Handler::ToggleAxes(false)),
    m(70, "P", "P", "", Handler::DisplayMessage),
    m(72, "P", "P", "", Handler::PlaySong),
    m(73, "P", "P", "", Handler::BuildPercent),
    m(101, "T", "", "", Handler::ExtruderNoop),
    m(102, "T", "", "", Handler::ExtruderNoop),
    m(103, "T", "", "", Handler::ExtruderNoop),
    m(104, "ST", "ST", "", Handler::SetToolheadTemperature),
    m(105, "T", "", "", Handler::GetTemperature),
    m(109, "ST", "ST", "", Handler::SetPlatformTemperature),
    m(126, "T", "T", "", Handler::ExtraOutput(true)),
    m(127, "T", "T", "", Handler::ExtraOutput(false)),
    m(131, "", "", "XYZAB", Handler::StoreHomePositions),
    m(132, "", "", "XYZAB", Handler::RecallHomePositions),
    m(133, "TP", "T", "", Handler::WaitForToolReady),
    m(134, "TP", "T", "", Handler::WaitForPlatformReady),
    m(135, "T", "T", "", Handler::ChangeTool),
];

/// Find the instruction for `letter` and `number`
#[must_use]
pub fn lookup(letter: char, number: u16) -> Option<&'static Instruction> {
    INSTRUCTIONS
        .iter()
        .find(|instruction| instruction.letter == letter && instruction.number == number)
}

impl Instruction {
    /// Check `line` against the declared codes and flags.
    ///
    /// The command letter itself is not a code. Invalid letters are
    /// reported before missing ones.
    pub fn validate(&self, line: &ParsedLine) -> Result<(), GcodeErrorKind> {
        let codes: String = line
            .codes
            .keys()
            .copied()
            .filter(|&letter| letter != self.letter && !self.codes.contains(letter))
            .collect();
        let flags: String = line
            .flags
            .iter()
            .copied()
            .filter(|&letter| !self.flags.contains(letter))
            .collect();

        match (codes.is_empty(), flags.is_empty()) {
            (true, true) => {}
            (false, true) => return Err(GcodeErrorKind::InvalidCode { codes }),
            (true, false) => return Err(GcodeErrorKind::InvalidFlag { flags }),
            (false, false) => return Err(GcodeErrorKind::InvalidCodeAndFlag { codes, flags }),
        }

        match self.required.chars().find(|&letter| !line.has_code(letter)) {
            Some(letter) => Err(GcodeErrorKind::MissingCode { letter }),
            None => Ok(()),
        }
    }
}
