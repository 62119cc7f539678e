//! s3g host driver
//!
//! Drives a MakerBot-style motherboard and its toolheads over the s3g
//! binary protocol.
//!
//! - [`gcode`]: tokenizer, command table and the [`Interpreter`] that turns
//!   G-code lines into protocol calls while tracking machine state.
//! - [`protocol`]: opcode tables, payload layouts, the payload codec and
//!   typed reply decoding.
//! - [`transport`]: the [`Writer`] capability plus packet framing, a
//!   retrying stream writer and a capture-file writer.
//! - [`preprocess`]: line-rewriting passes that clean slicer output before
//!   it is interpreted.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use s3g::{FileWriter, Interpreter, Profile};
//!
//! let writer = FileWriter::create("part.s3g")?;
//! let mut interpreter = Interpreter::new(writer, Profile::replicator_dual());
//! interpreter.set_build_name("part");
//! interpreter.execute_start_sequence()?;
//! interpreter.execute_line("G1 X10 Y10 Z0.3 F3000")?;
//! interpreter.execute_end_sequence()?;
//! # Ok::<(), s3g::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod gcode;
pub mod machine;
pub mod preprocess;
pub mod protocol;
pub mod transport;

pub use error::{Error, Result};
pub use gcode::{GcodeError, GcodeErrorKind, Interpreter, InterpreterState, Profile};
pub use machine::Machine;
pub use preprocess::{PreprocessError, Preprocessor, process};
pub use protocol::{ProtocolCall, ProtocolError, Value};
pub use transport::{FileWriter, StreamWriter, TransportError, Writer};
