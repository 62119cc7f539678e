//! G-code interpretation
//!
//! Lines are tokenized by [`parse_line`], matched against the
//! [`INSTRUCTIONS`] table and executed by an [`Interpreter`], which keeps
//! the machine's logical state and converts millimetres and feedrates
//! into steps and DDA rates using a device [`Profile`].

mod dda;
mod error;
mod instructions;
mod interpreter;
mod parser;
mod profile;
mod state;

pub use dda::{calculate_dda_speed, displacement, homing_rate, longest, magnitude, safe_feedrate, to_steps};
pub use error::{GcodeError, GcodeErrorKind};
pub use instructions::{Handler, INSTRUCTIONS, Instruction, lookup};
pub use interpreter::Interpreter;
pub use parser::{ParsedLine, parse_line, split_comment};
pub use profile::{AxesProfile, AxisProfile, Profile};
pub use state::{BuildState, InterpreterState, Position};
