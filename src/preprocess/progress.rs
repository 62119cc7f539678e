//! Build progress annotation.

use super::{Preprocessor, Result};

/// Inserts `M73 P<n>` markers as the file advances.
///
/// The marker for `n` goes before the first line at which `n` percent of
/// the lines have been passed. Only 1 through 99 are emitted; the print
/// start and end sequences announce 0 and 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressPreprocessor;

/// Marker line for `percent`
#[must_use]
pub fn progress_line(percent: usize) -> String {
    format!("M73 P{percent} (progress ({percent}%))")
}

impl Preprocessor for ProgressPreprocessor {
    fn name(&self) -> &'static str {
        "progress"
    }

    fn process_lines(&mut self, lines: Vec<String>) -> Result<Vec<String>> {
        let total = lines.len();
        let mut out = Vec::with_capacity(total + 99);
        let mut next = 1;

        for (i, line) in lines.into_iter().enumerate() {
            let percent = i * 100 / total;
            while next <= percent && next <= 99 {
                out.push(progress_line(next));
                next += 1;
            }
            out.push(line);
        }
        Ok(out)
    }
}
