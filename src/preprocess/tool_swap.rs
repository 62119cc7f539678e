//! Swaps the two extruders of a dual-extrusion file.

use super::{Preprocessor, Result};

/// Exchanges the A and B axes and tools T0 and T1.
///
/// Only the code part of a line is rewritten, and uppercased; comments are
/// kept as written. Words are swapped one at a time, so a line holding both
/// letters never swaps twice.
///
/// Tool and axis names inside comments are not swapped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolSwapPreprocessor;

fn swapped_word(word: &str) -> Option<String> {
    let upper = word.to_ascii_uppercase();
    match upper.as_str() {
        "T0" => return Some("T1".into()),
        "T1" => return Some("T0".into()),
        _ => {}
    }
    let rest = upper.get(1..)?;
    match upper.chars().next()? {
        'A' => Some(format!("B{rest}")),
        'B' => Some(format!("A{rest}")),
        _ => None,
    }
}

fn comment_start(line: &str) -> usize {
    line.find(['(', ';']).unwrap_or(line.len())
}

/// Swap one line
#[must_use]
pub fn swap_line(line: &str) -> String {
    let (code, comment) = line.split_at(comment_start(line));
    if !code.split_whitespace().any(|word| swapped_word(word).is_some()) {
        return line.to_owned();
    }

    let mut out = String::with_capacity(line.len());
    let mut rest = code;
    while !rest.is_empty() {
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (word, tail) = rest.split_at(word_end);
        match swapped_word(word) {
            Some(swapped) => out.push_str(&swapped),
            None => out.push_str(&word.to_ascii_uppercase()),
        }
        let space_end = tail.find(|c: char| !c.is_whitespace()).unwrap_or(tail.len());
        out.push_str(&tail[..space_end]);
        rest = &tail[space_end..];
    }
    out.push_str(comment);
    out
}

impl Preprocessor for ToolSwapPreprocessor {
    fn name(&self) -> &'static str {
        "tool-swap"
    }

    fn process_lines(&mut self, lines: Vec<String>) -> Result<Vec<String>> {
        Ok(lines.iter().map(|line| swap_line(line)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axes_swapped() {
        assert_eq!(swap_line("G1 A10 B20"), "G1 B10 A20");
        assert_eq!(swap_line("g1 x1 a2.5"), "G1 X1 B2.5");
    }

    #[test]
    fn test_tools_swapped() {
        assert_eq!(swap_line("M135 T0"), "M135 T1");
        assert_eq!(swap_line("M104 S220 T1"), "M104 S220 T0");
    }

    #[test]
    fn test_no_double_swap() {
        assert_eq!(swap_line("G92 A0 B0 T0 T1"), "G92 B0 A0 T1 T0");
    }

    #[test]
    fn test_comment_kept() {
        assert_eq!(
            swap_line("M135 T0 (switch to a tool) ; B side"),
            "M135 T1 (switch to a tool) ; B side"
        );
        assert_eq!(swap_line("G1 A1 (T0 feeds A)"), "G1 B1 (T0 feeds A)");
    }

    #[test]
    fn test_unrelated_lines_untouched() {
        assert_eq!(swap_line("g1 x1 y2"), "g1 x1 y2");
        assert_eq!(swap_line("M133 T10"), "M133 T10");
        assert_eq!(swap_line("(A and B)"), "(A and B)");
    }

    #[test]
    fn test_pass() {
        let out = ToolSwapPreprocessor
            .process_lines(vec!["M135 T1".into(), "G1 X1".into()])
            .unwrap();
        assert_eq!(out, vec!["M135 T0", "G1 X1"]);
    }
}
