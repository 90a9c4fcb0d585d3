//! Recognizes which messages are substitution commands.
//!
//! Two surfaces exist: the bare form, where the whole body is a statement
//! such as `s/teh/the/`, and the explicit form, where `sed s|a|b|` appears
//! anywhere in the body. Each surface parses with its own [`FieldRules`].

use crate::statement::FieldRules;

const EXPLICIT_KEYWORD: &str = "sed ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSurface {
    Bare,
    Explicit,
}

/// A candidate command found in a message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandMatch<'a> {
    /// The statement text, starting at its leading `s`.
    pub text: &'a str,
    pub surface: TriggerSurface,
}

/// Parsing rules for both trigger surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triggers {
    pub bare: FieldRules,
    pub explicit: FieldRules,
}

impl Default for Triggers {
    fn default() -> Self {
        Self {
            bare: FieldRules::bare(),
            explicit: FieldRules::explicit(),
        }
    }
}

impl Triggers {
    pub fn rules_for(&self, surface: TriggerSurface) -> &FieldRules {
        match surface {
            TriggerSurface::Bare => &self.bare,
            TriggerSurface::Explicit => &self.explicit,
        }
    }
}

/// Find a command in `body`. The bare form wins when both could apply; it
/// needs a leading `s` followed by a separator the bare rules accept.
pub fn detect<'a>(body: &'a str, triggers: &Triggers) -> Option<CommandMatch<'a>> {
    let mut chars = body.chars();
    if chars.next() == Some('s')
        && chars
            .next()
            .is_some_and(|sep| triggers.bare.separators.allows(sep))
    {
        return Some(CommandMatch {
            text: body,
            surface: TriggerSurface::Bare,
        });
    }

    let mut search_from = 0;
    while let Some(offset) = body[search_from..].find(EXPLICIT_KEYWORD) {
        let start = search_from + offset;
        let statement = &body[start + EXPLICIT_KEYWORD.len()..];
        // `sed` must be a word of its own, so "used s/x/y/" is not a command.
        let at_word_start = body[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        if at_word_start && statement.starts_with('s') {
            return Some(CommandMatch {
                text: statement,
                surface: TriggerSurface::Explicit,
            });
        }
        search_from = start + EXPLICIT_KEYWORD.len();
    }
    None
}
