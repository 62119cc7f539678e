//! Line tokenizer shared by the interpreter and the preprocessing passes.

use std::collections::{BTreeMap, BTreeSet};

use super::error::GcodeErrorKind;

/// One tokenized line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLine {
    /// Letters with a numeric value, uppercased
    pub codes: BTreeMap<char, f64>,
    /// Bare letters, uppercased
    pub flags: BTreeSet<char>,
    /// Comment text, parenthesised and `;` parts joined by a space
    pub comment: String,
}

impl ParsedLine {
    /// Value of a code
    #[must_use]
    pub fn code(&self, letter: char) -> Option<f64> {
        self.codes.get(&letter).copied()
    }

    /// Whether a code is present
    #[must_use]
    pub fn has_code(&self, letter: char) -> bool {
        self.codes.contains_key(&letter)
    }

    /// Whether a flag is present
    #[must_use]
    pub fn has_flag(&self, letter: char) -> bool {
        self.flags.contains(&letter)
    }

    /// No codes and no flags; blank or comment-only
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty() && self.flags.is_empty()
    }

    /// The command letter and number, `G` taking priority over `M`
    #[must_use]
    pub fn command(&self) -> Option<(char, f64)> {
        ['G', 'M']
            .into_iter()
            .find_map(|letter| self.code(letter).map(|number| (letter, number)))
    }
}

/// Split `line` into its code part and its comment
///
/// Parentheses nest, so `(progress (5%))` is a single comment.
pub fn split_comment(line: &str) -> Result<(String, String), GcodeErrorKind> {
    let mut code = String::with_capacity(line.len());
    let mut comments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '(' => {
                if depth > 0 {
                    current.push(c);
                }
                depth += 1;
            }
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    comments.push(std::mem::take(&mut current));
                } else {
                    current.push(c);
                }
            }
            ';' if depth == 0 => {
                comments.push(chars.by_ref().collect());
                break;
            }
            _ if depth > 0 => current.push(c),
            _ => code.push(c),
        }
    }

    if depth > 0 {
        return Err(GcodeErrorKind::UnterminatedComment);
    }

    let comment = comments
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok((code, comment))
}

/// Tokenize one line
pub fn parse_line(line: &str) -> Result<ParsedLine, GcodeErrorKind> {
    let (code, comment) = split_comment(line)?;
    let mut parsed = ParsedLine {
        comment,
        ..ParsedLine::default()
    };

    for word in code.split_whitespace() {
        let mut chars = word.chars();
        let letter = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
            _ => {
                return Err(GcodeErrorKind::InvalidWord {
                    word: word.to_owned(),
                });
            }
        };
        if parsed.has_code(letter) || parsed.has_flag(letter) {
            return Err(GcodeErrorKind::RepeatCode { letter });
        }

        let rest = chars.as_str();
        if rest.is_empty() {
            parsed.flags.insert(letter);
            continue;
        }
        match rest.parse::<f64>() {
            Ok(value) if value.is_finite() => {
                parsed.codes.insert(letter, value);
            }
            _ => {
                return Err(GcodeErrorKind::InvalidNumber {
                    letter,
                    value: rest.to_owned(),
                });
            }
        }
    }

    Ok(parsed)
}
