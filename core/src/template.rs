//! Expansion of sed/Python style replacement templates.
//!
//! Supported: `\0`..`\99` and `\g<n>` numbered groups, `\g<name>` named
//! groups, `\n`/`\t`/`\r` and `\\`. Any other escaped character is kept as
//! the character itself. `$` and `&` are literal.

use regex::Captures;
use regex::Regex;
use regex::Replacer;

use crate::error::ExecError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Group(usize),
}

/// A replacement template resolved against one compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pieces: Vec<Piece>,
}

impl Template {
    /// Compile `template` for use with `regex`. Group references are checked
    /// against the groups the pattern actually defines.
    pub fn compile(template: &str, regex: &Regex) -> Result<Self, ExecError> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '\\' {
                literal.push(ch);
                continue;
            }
            let Some(escaped) = chars.next() else {
                return Err(ExecError::TrailingBackslash);
            };
            let group = match escaped {
                'n' => {
                    literal.push('\n');
                    continue;
                }
                't' => {
                    literal.push('\t');
                    continue;
                }
                'r' => {
                    literal.push('\r');
                    continue;
                }
                'g' if chars.peek() == Some(&'<') => {
                    chars.next();
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('>') => break,
                            Some(c) => name.push(c),
                            None => return Err(ExecError::InvalidGroupReference(name)),
                        }
                    }
                    resolve_group(&name, regex)?
                }
                d if d.is_ascii_digit() => {
                    let mut digits = String::from(d);
                    if let Some(second) = chars.next_if(char::is_ascii_digit) {
                        digits.push(second);
                    }
                    resolve_group(&digits, regex)?
                }
                other => {
                    literal.push(other);
                    continue;
                }
            };
            if !literal.is_empty() {
                pieces.push(Piece::Literal(std::mem::take(&mut literal)));
            }
            pieces.push(Piece::Group(group));
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Ok(Self { pieces })
    }
}

fn resolve_group(reference: &str, regex: &Regex) -> Result<usize, ExecError> {
    if let Ok(index) = reference.parse::<usize>() {
        return if index < regex.captures_len() {
            Ok(index)
        } else {
            Err(ExecError::InvalidGroupReference(reference.to_string()))
        };
    }
    regex
        .capture_names()
        .position(|name| name == Some(reference))
        .ok_or_else(|| ExecError::InvalidGroupReference(reference.to_string()))
}

impl Replacer for &Template {
    fn replace_append(&mut self, caps: &Captures<'_>, dst: &mut String) {
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => dst.push_str(text),
                // Groups that did not participate expand to nothing.
                Piece::Group(index) => {
                    if let Some(m) = caps.get(*index) {
                        dst.push_str(m.as_str());
                    }
                }
            }
        }
    }
}
