//! G-code errors

use thiserror::Error;

use crate::protocol::Axis;

/// What went wrong with a line
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GcodeErrorKind {
    /// Line bytes are not valid UTF-8
    #[error("line is not valid UTF-8")]
    ImproperEncoding,

    /// G or M number with no handler
    #[error("unrecognized command {command}")]
    UnrecognizedCommand {
        /// Command as written, e.g. `G999`
        command: String,
    },

    /// Codes present but neither a G nor an M command
    #[error("line has no G or M command")]
    MissingCommand,

    /// A word that does not start with a letter
    #[error("invalid word `{word}`")]
    InvalidWord {
        /// Word as written
        word: String,
    },

    /// Letter given twice on one line
    #[error("code {letter} repeated")]
    RepeatCode {
        /// Repeated letter
        letter: char,
    },

    /// Code value is not a finite number
    #[error("code {letter} has invalid number `{value}`")]
    InvalidNumber {
        /// Code letter
        letter: char,
        /// Text after the letter
        value: String,
    },

    /// `(` with no matching `)`
    #[error("unterminated comment")]
    UnterminatedComment,

    /// Codes the command does not accept
    #[error("invalid codes: {codes}")]
    InvalidCode {
        /// Offending letters
        codes: String,
    },

    /// Flags the command does not accept
    #[error("invalid flags: {flags}")]
    InvalidFlag {
        /// Offending letters
        flags: String,
    },

    /// Both invalid codes and invalid flags
    #[error("invalid codes: {codes}; invalid flags: {flags}")]
    InvalidCodeAndFlag {
        /// Offending code letters
        codes: String,
        /// Offending flag letters
        flags: String,
    },

    /// Required code absent (no stored feedrate counts as a missing `F`)
    #[error("missing code {letter}")]
    MissingCode {
        /// Missing letter
        letter: char,
    },

    /// Codes that may not appear together
    #[error("conflicting codes: {codes}")]
    ConflictingCodes {
        /// Letters present together
        codes: String,
    },

    /// Build percent outside 0..=100
    #[error("bad percentage {percent}")]
    BadPercentage {
        /// Requested percentage
        percent: f64,
    },

    /// Offset register other than 1 or 2
    #[error("invalid offset register {register}")]
    InvalidOffset {
        /// Requested register
        register: f64,
    },

    /// Tool index not addressable on this device
    #[error("invalid tool index {index}")]
    InvalidToolIndex {
        /// Requested index
        index: f64,
    },

    /// Extrusion needs a tool that maps to an axis
    #[error("no active tool for extrusion")]
    NoToolIndex,

    /// Build start requested with no build name set
    #[error("no build name set")]
    NoBuildName,

    /// Position needed for an axis that has been homed and not redefined
    #[error("position of axis {axis} is unknown")]
    UnknownPosition {
        /// Axis with no known position
        axis: Axis,
    },

    /// Move with no displacement reached the speed calculation
    #[error("zero length move")]
    ZeroLengthMove,

    /// Value does not fit the field it is sent in
    #[error("code {letter} value {value} out of range")]
    OutOfRange {
        /// Code letter
        letter: char,
        /// Value given
        value: f64,
    },
}

/// A failed line, with enough context to reproduce it
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line_number} `{command}`: {kind}")]
pub struct GcodeError {
    /// 1-based line counter of the interpreter
    pub line_number: usize,
    /// Raw line text, trailing newline removed
    pub command: String,
    /// Failure
    #[source]
    pub kind: GcodeErrorKind,
}

impl GcodeError {
    /// Attach line context to `kind`
    pub fn new(line_number: usize, command: impl Into<String>, kind: GcodeErrorKind) -> Self {
        Self {
            line_number,
            command: command.into(),
            kind,
        }
    }
}
