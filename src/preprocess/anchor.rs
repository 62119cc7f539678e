//! Anchor move synthesis
//!
//! Before the first `G1` of a file the pass inserts a slow move from the
//! waiting position to that `G1`'s target, extruding enough filament to
//! lay a bead along the way, then resets the extruder position to zero.

use std::f64::consts::PI;

use super::{PreprocessError, Preprocessor, Result};
use crate::gcode::{ParsedLine, parse_line, split_comment};

/// Where the start sequence parks the nozzle before a print
pub const WAITING_POSITION: &str = "G1 X-112 Y-73 Z150 F3300.0 (move to waiting position)";

/// Anchor move feedrate, mm/min
const ANCHOR_FEEDRATE: u32 = 1000;

/// Cross-section of an extruded bead of height `height` and width
/// `width`: a rectangle with half-circles of diameter `height` at the ends
#[must_use]
pub fn cross_section_area(height: f64, width: f64) -> f64 {
    let radius = height / 2.0;
    (PI / 2.0) * radius * radius + height * (width - height)
}

/// Straight-line distance
#[must_use]
pub fn euclidean_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Inserts the anchor move before the first `G1`
#[derive(Debug, Clone)]
pub struct AnchorPreprocessor {
    start: String,
    width_over_height: f64,
}

impl Default for AnchorPreprocessor {
    fn default() -> Self {
        Self {
            start: WAITING_POSITION.to_owned(),
            width_over_height: 1.6,
        }
    }
}

impl AnchorPreprocessor {
    /// Anchor from a different start line
    #[must_use]
    pub fn with_start(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            ..Self::default()
        }
    }

    /// Anchor move and extruder reset for a first move `end`
    pub fn anchor_commands(&self, end: &ParsedLine) -> Result<[String; 2]> {
        let start = parse_line(&self.start)
            .map_err(|kind| PreprocessError::Parse { line_number: 0, kind })?;

        let mut anchor = String::from("G1 ");
        for letter in ['X', 'Y', 'Z'] {
            if let Some(value) = end.code(letter) {
                anchor.push_str(&format!("{letter}{value} "));
            }
        }
        let extruder = extruder_letter(end);
        let amount = self.extrusion_distance(&start, end);
        anchor.push_str(&format!("F{ANCHOR_FEEDRATE} {extruder}{amount}"));

        Ok([anchor, format!("G92 {extruder}0")])
    }

    /// Filament for the anchor move: path length times bead cross-section
    #[must_use]
    pub fn extrusion_distance(&self, start: &ParsedLine, end: &ParsedLine) -> f64 {
        let point = |line: &ParsedLine| ['X', 'Y', 'Z'].map(|letter| line.code(letter).unwrap_or(0.0));
        let (from, to) = (point(start), point(end));
        let layer_height = to[2];
        euclidean_distance(&from, &to) * cross_section_area(layer_height, self.width_over_height)
    }
}

fn extruder_letter(line: &ParsedLine) -> char {
    if line.has_code('B') {
        'B'
    } else if line.has_code('E') {
        'E'
    } else {
        'A'
    }
}

fn is_linear_move(line: &str) -> bool {
    split_comment(line).is_ok_and(|(code, _)| {
        code.split_whitespace()
            .any(|word| word.eq_ignore_ascii_case("G1"))
    })
}

impl Preprocessor for AnchorPreprocessor {
    fn name(&self) -> &'static str {
        "anchor"
    }

    fn process_lines(&mut self, lines: Vec<String>) -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(lines.len() + 2);
        let mut anchored = false;

        for (i, line) in lines.into_iter().enumerate() {
            if !anchored && is_linear_move(&line) {
                let first = parse_line(&line).map_err(|kind| PreprocessError::Parse {
                    line_number: i + 1,
                    kind,
                })?;
                out.extend(self.anchor_commands(&first)?);
                anchored = true;
            }
            out.push(line);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|&line| line.to_owned()).collect()
    }

    #[test]
    fn test_cross_section() {
        let area = cross_section_area(0.5, 1.6);
        let expected = (PI / 2.0) * 0.0625 + 0.5 * 1.1;
        assert!((area - expected).abs() < 1e-12);
    }

    #[test]
    fn test_anchor_amount() {
        let out = AnchorPreprocessor::default()
            .process_lines(lines(&["M103", "G1 X10 Y0 Z0.5 F1200"]))
            .unwrap();

        let distance = euclidean_distance(&[-112.0, -73.0, 150.0], &[10.0, 0.0, 0.5]);
        let expected = distance * cross_section_area(0.5, 1.6);

        assert_eq!(out.len(), 4);
        assert_eq!(out[0], "M103");
        let anchor = parse_line(&out[1]).unwrap();
        assert_eq!(anchor.code('G'), Some(1.0));
        assert_eq!(anchor.code('X'), Some(10.0));
        assert_eq!(anchor.code('F'), Some(1000.0));
        assert!((anchor.code('A').unwrap() - expected).abs() < 1e-9);
        assert_eq!(out[2], "G92 A0");
        assert_eq!(out[3], "G1 X10 Y0 Z0.5 F1200");
    }

    #[test]
    fn test_fires_once() {
        let input = lines(&["G1 X1 Y1 Z0.2", "G1 X2 Y2 Z0.2", "G1 X3 Y3 Z0.2"]);
        let out = AnchorPreprocessor::default().process_lines(input).unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out.iter().filter(|line| line.starts_with("G92")).count(), 1);
    }

    #[test]
    fn test_extruder_letter() {
        let out = AnchorPreprocessor::default()
            .process_lines(lines(&["G1 X1 Y1 Z0.3 B4"]))
            .unwrap();
        assert_eq!(out[1], "G92 B0");

        let out = AnchorPreprocessor::default()
            .process_lines(lines(&["g1 X1 Y1 Z0.3 E4"]))
            .unwrap();
        assert_eq!(out[1], "G92 E0");
    }

    #[test]
    fn test_commented_move_ignored() {
        let input = lines(&["(G1 X5)", "G11 X1", "G1 X1 Z0.2"]);
        let out = AnchorPreprocessor::default().process_lines(input).unwrap();
        assert_eq!(&out[..2], &["(G1 X5)".to_owned(), "G11 X1".to_owned()]);
        assert!(out[2].starts_with("G1 X1 Z0.2 F1000 A"));
    }

    #[test]
    fn test_no_moves_untouched() {
        let input = lines(&["M104 S220 T0", "M133 T0"]);
        let out = AnchorPreprocessor::default().process_lines(input.clone()).unwrap();
        assert_eq!(out, input);
    }
}
