//! Removes extruder RPM commands.

use super::{Preprocessor, Result, command_of};

/// Drops `M101`, `M102`, `M103` and `M108`
#[derive(Debug, Clone, Copy, Default)]
pub struct RpmPreprocessor;

impl Preprocessor for RpmPreprocessor {
    fn name(&self) -> &'static str {
        "rpm"
    }

    fn process_lines(&mut self, lines: Vec<String>) -> Result<Vec<String>> {
        Ok(lines
            .into_iter()
            .filter(|line| !matches!(command_of(line), Some(('M', 101 | 102 | 103 | 108))))
            .collect())
    }
}
