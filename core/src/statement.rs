//! Parsing of `s<sep>pattern<sep>replacement<sep>flags` statements.
//!
//! The scanner is escape-aware: `\<sep>` inside a field yields a literal
//! separator, every other backslash pair is passed through untouched so the
//! regex engine (pattern) or the template expander (replacement) sees it.

use std::fmt;

use regex::Regex;
use regex::RegexBuilder;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ParseError;

/// Upper bound on the compiled program size of a user pattern.
const COMPILED_SIZE_LIMIT: usize = 1 << 20;
const DFA_SIZE_LIMIT: usize = 2 << 20;

const ESCAPE: char = '\\';

/// Names the three fields of a statement, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Pattern,
    Replacement,
    Flags,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Pattern => "pattern",
            Field::Replacement => "replacement",
            Field::Flags => "flags",
        };
        f.write_str(name)
    }
}

/// Which characters may open a statement as its separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparatorPolicy {
    /// Only `/` and `#`.
    SlashOrHash,
    /// Any character that is not alphanumeric (and not the escape character).
    AnyPunctuation,
}

impl SeparatorPolicy {
    /// Whether `sep` may delimit the fields of a statement. The escape
    /// character never can.
    pub fn allows(self, sep: char) -> bool {
        sep != ESCAPE
            && match self {
                SeparatorPolicy::SlashOrHash => sep == '/' || sep == '#',
                SeparatorPolicy::AnyPunctuation => !sep.is_alphanumeric(),
            }
    }

    fn validate(self, sep: char) -> Result<(), ParseError> {
        if self.allows(sep) {
            Ok(())
        } else {
            Err(ParseError::InvalidSeparator(sep))
        }
    }
}

/// Field-reading rules attached to one trigger surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRules {
    pub separators: SeparatorPolicy,
    /// When false, a replacement running to the end of the text is accepted
    /// and the flags field is empty.
    pub replacement_terminator_required: bool,
    /// Strict flags reject unknown letters; lenient flags stop at the first
    /// character that is not a flag and ignore the rest.
    pub strict_flags: bool,
}

impl FieldRules {
    /// Rules for a message that consists of nothing but the statement.
    pub const fn bare() -> Self {
        Self {
            separators: SeparatorPolicy::SlashOrHash,
            replacement_terminator_required: false,
            strict_flags: false,
        }
    }

    /// Rules for a statement introduced with the `sed ` keyword.
    pub const fn explicit() -> Self {
        Self {
            separators: SeparatorPolicy::AnyPunctuation,
            replacement_terminator_required: true,
            strict_flags: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_matches_new_line: bool,
    /// `\d`, `\w`, `\s` and `\b` only consider ASCII.
    pub ascii_only: bool,
}

/// A parsed, compiled substitution. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct SubstitutionStatement {
    pub pattern: Regex,
    pub replacement: String,
    pub flags: RegexFlags,
    pub is_global: bool,
    pub highlight_edits: bool,
}

/// Parse `raw_text` using the rules of the bare (`explicit == false`) or the
/// `sed `-prefixed (`explicit == true`) trigger.
pub fn parse(raw_text: &str, explicit: bool) -> Result<SubstitutionStatement, ParseError> {
    let rules = if explicit {
        FieldRules::explicit()
    } else {
        FieldRules::bare()
    };
    parse_with_rules(raw_text, &rules)
}

pub fn parse_with_rules(
    raw_text: &str,
    rules: &FieldRules,
) -> Result<SubstitutionStatement, ParseError> {
    let rest = raw_text
        .strip_prefix('s')
        .ok_or(ParseError::NotSubstitution)?;
    let mut chars = rest.chars();
    let sep = chars
        .next()
        .ok_or(ParseError::UnterminatedField(Field::Pattern))?;
    rules.separators.validate(sep)?;
    let rest = chars.as_str();

    let (pattern_text, rest) = read_field(rest, sep, Field::Pattern, false)?;
    let rest = rest.ok_or(ParseError::UnterminatedField(Field::Pattern))?;
    let (replacement_text, rest) = read_field(
        rest,
        sep,
        Field::Replacement,
        !rules.replacement_terminator_required,
    )?;
    let (flags_text, _) = match rest {
        Some(rest) => read_field(rest, sep, Field::Flags, true)?,
        None => (String::new(), None),
    };

    let parsed = parse_flags(&flags_text, rules.strict_flags)?;
    let pattern = compile(&pattern_text, &parsed.regex)?;
    Ok(SubstitutionStatement {
        pattern,
        replacement: replacement_text,
        flags: parsed.regex,
        is_global: parsed.global,
        highlight_edits: !parsed.suppress_highlight,
    })
}

/// Read one field up to the next unescaped `sep`.
///
/// Returns the unescaped field and the text after the terminator, or `None`
/// as the remainder when an `optional` terminator was missing.
fn read_field(
    text: &str,
    sep: char,
    field: Field,
    optional: bool,
) -> Result<(String, Option<&str>), ParseError> {
    let mut value = String::with_capacity(text.len());
    let mut chars = text.char_indices();
    while let Some((idx, ch)) = chars.next() {
        if ch == sep {
            return Ok((value, Some(&text[idx + ch.len_utf8()..])));
        }
        if ch != ESCAPE {
            value.push(ch);
            continue;
        }
        match chars.next() {
            Some((_, escaped)) if escaped == sep => value.push(sep),
            Some((_, escaped)) => {
                value.push(ESCAPE);
                value.push(escaped);
            }
            None => value.push(ESCAPE),
        }
    }

    if optional {
        Ok((value, None))
    } else {
        Err(ParseError::UnterminatedField(field))
    }
}

struct ParsedFlags {
    regex: RegexFlags,
    global: bool,
    suppress_highlight: bool,
}

fn parse_flags(flags_text: &str, strict: bool) -> Result<ParsedFlags, ParseError> {
    let mut parsed = ParsedFlags {
        regex: RegexFlags::default(),
        global: false,
        suppress_highlight: false,
    };
    for ch in flags_text.chars() {
        match ch.to_ascii_lowercase() {
            'i' => parsed.regex.case_insensitive = true,
            'm' => parsed.regex.multi_line = true,
            's' => parsed.regex.dot_matches_new_line = true,
            'a' => parsed.regex.ascii_only = true,
            'g' => parsed.global = true,
            'u' => parsed.suppress_highlight = true,
            // Trailing prose after an explicit statement ends the flags.
            c if strict && c.is_whitespace() => break,
            c if strict => return Err(ParseError::UnknownFlag(c)),
            _ => break,
        }
    }
    Ok(parsed)
}

fn compile(pattern_text: &str, flags: &RegexFlags) -> Result<Regex, ParseError> {
    let source = if flags.ascii_only {
        asciify_classes(pattern_text)
    } else {
        pattern_text.to_string()
    };
    let regex = RegexBuilder::new(&source)
        .case_insensitive(flags.case_insensitive)
        .multi_line(flags.multi_line)
        .dot_matches_new_line(flags.dot_matches_new_line)
        .size_limit(COMPILED_SIZE_LIMIT)
        .dfa_size_limit(DFA_SIZE_LIMIT)
        .build()?;
    Ok(regex)
}

/// Rewrite the Perl class shorthands into their ASCII equivalents.
///
/// The engine refuses to disable Unicode wholesale for `&str` haystacks
/// (`(?-u:.)` could match inside a code point), so ASCII mode is expressed
/// class by class instead. Negated shorthands inside brackets have no
/// positive ASCII spelling and are left as they are.
fn asciify_classes(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut in_class = false;
    let mut chars = pattern.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            ESCAPE => {
                let Some(next) = chars.next() else {
                    out.push(ESCAPE);
                    break;
                };
                let replacement = match (next, in_class) {
                    ('d', false) => Some("[0-9]"),
                    ('d', true) => Some("0-9"),
                    ('D', false) => Some("[^0-9]"),
                    ('w', false) => Some("[0-9A-Za-z_]"),
                    ('w', true) => Some("0-9A-Za-z_"),
                    ('W', false) => Some("[^0-9A-Za-z_]"),
                    ('s', false) => Some(r"[\t\n\x0B\x0C\r ]"),
                    ('s', true) => Some(r"\t\n\x0B\x0C\r "),
                    ('S', false) => Some(r"[^\t\n\x0B\x0C\r ]"),
                    ('b', false) => Some(r"(?-u:\b)"),
                    _ => None,
                };
                match replacement {
                    Some(ascii) => out.push_str(ascii),
                    None => {
                        out.push(ESCAPE);
                        out.push(next);
                    }
                }
            }
            '[' if !in_class => {
                in_class = true;
                out.push(ch);
                // A leading `]` (optionally after `^`) is a literal member.
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}
