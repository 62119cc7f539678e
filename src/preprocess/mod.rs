//! G-code preprocessing passes
//!
//! Each pass rewrites a whole file's lines in memory. Passes compose by
//! handing one pass's output lines to the next; [`Skeinforge50Pipeline`]
//! is the fixed composition used for Skeinforge 50 output.

mod anchor;
mod progress;
mod rpm;
mod skeinforge;
mod tool_swap;

pub use anchor::{AnchorPreprocessor, WAITING_POSITION, cross_section_area, euclidean_distance};
pub use progress::ProgressPreprocessor;
pub use rpm::RpmPreprocessor;
pub use skeinforge::{Skeinforge50Pipeline, Skeinforge50Preprocessor};
pub use tool_swap::ToolSwapPreprocessor;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::gcode::{GcodeErrorKind, parse_line};

/// Preprocessing failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreprocessError {
    /// Input or output path does not name a `.gcode` file
    #[error("not a .gcode file: {}", path.display())]
    NotGcodeFile {
        /// Offending path
        path: PathBuf,
    },

    /// A line the pass needs to read could not be tokenized
    #[error("line {line_number}: {kind}")]
    Parse {
        /// 1-based line within the pass input
        line_number: usize,
        /// Tokenizer failure
        kind: GcodeErrorKind,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PreprocessError>;

/// A line-rewriting pass
pub trait Preprocessor {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Rewrite `lines`, which carry no line terminators
    fn process_lines(&mut self, lines: Vec<String>) -> Result<Vec<String>>;

    /// Rewrite the file at `input` into `output`.
    ///
    /// Both paths must end in `.gcode`; neither file is touched otherwise.
    fn process_file(&mut self, input: &Path, output: &Path) -> crate::Result<()> {
        check_gcode_path(input)?;
        check_gcode_path(output)?;

        let text = fs::read_to_string(input)?;
        let lines: Vec<String> = text.lines().map(str::to_owned).collect();
        let count = lines.len();
        let lines = self.process_lines(lines)?;
        debug!(pass = self.name(), lines_in = count, lines_out = lines.len(), "processed file");

        let mut out = lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        fs::write(output, out)?;
        Ok(())
    }
}

/// Run [`Skeinforge50Pipeline`] over `input`, writing `output`
pub fn process(input: impl AsRef<Path>, output: impl AsRef<Path>) -> crate::Result<()> {
    Skeinforge50Pipeline::default().process_file(input.as_ref(), output.as_ref())
}

fn check_gcode_path(path: &Path) -> Result<()> {
    let is_gcode = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("gcode"));
    if is_gcode {
        Ok(())
    } else {
        Err(PreprocessError::NotGcodeFile {
            path: path.to_path_buf(),
        })
    }
}

/// Command letter and number of a line, if it tokenizes and has one
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn command_of(line: &str) -> Option<(char, u16)> {
    let (letter, number) = parse_line(line).ok()?.command()?;
    (number.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&number))
        .then_some((letter, number as u16))
}
