//! Skeinforge 50 compatibility.

use tracing::debug;

use super::{
    AnchorPreprocessor, Preprocessor, ProgressPreprocessor, Result, RpmPreprocessor, command_of,
};
use crate::gcode::parse_line;

/// Drops commands Skeinforge 50 emits that the interpreter either assumes
/// or cannot run: `G21`, `G90`, `M105`, and `M104` without a `T` code
#[derive(Debug, Clone, Copy, Default)]
pub struct Skeinforge50Preprocessor;

fn keep(line: &str) -> bool {
    match command_of(line) {
        Some(('G', 21 | 90) | ('M', 105)) => false,
        Some(('M', 104)) => parse_line(line).is_ok_and(|parsed| parsed.has_code('T')),
        _ => true,
    }
}

impl Preprocessor for Skeinforge50Preprocessor {
    fn name(&self) -> &'static str {
        "skeinforge50"
    }

    fn process_lines(&mut self, lines: Vec<String>) -> Result<Vec<String>> {
        Ok(lines.into_iter().filter(|line| keep(line)).collect())
    }
}

/// RPM removal, anchor, Skeinforge 50 cleanup, then progress markers
#[derive(Debug, Clone, Default)]
pub struct Skeinforge50Pipeline {
    rpm: RpmPreprocessor,
    anchor: AnchorPreprocessor,
    skeinforge: Skeinforge50Preprocessor,
    progress: ProgressPreprocessor,
}

impl Preprocessor for Skeinforge50Pipeline {
    fn name(&self) -> &'static str {
        "skeinforge50-pipeline"
    }

    fn process_lines(&mut self, lines: Vec<String>) -> Result<Vec<String>> {
        let passes: [&mut dyn Preprocessor; 4] = [
            &mut self.rpm,
            &mut self.anchor,
            &mut self.skeinforge,
            &mut self.progress,
        ];
        passes.into_iter().try_fold(lines, |lines, pass| {
            let count = lines.len();
            let lines = pass.process_lines(lines)?;
            debug!(pass = pass.name(), lines_in = count, lines_out = lines.len(), "pass complete");
            Ok(lines)
        })
    }
}
