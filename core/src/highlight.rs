//! Renders the corrected text as HTML with changed spans underlined.
//!
//! The edit script comes from a Myers diff (the `similar` crate), which
//! yields a minimal, deterministic sequence of equal / insert / delete /
//! replace opcodes for a given pair of inputs. The unit being diffed depends
//! only on the size of the inputs: characters for chat-sized messages, words
//! for long ones, and for very long ones a single span between the common
//! prefix and suffix.

use similar::Algorithm;
use similar::DiffTag;

/// Combined length of both texts, in chars, up to which the diff runs per
/// character.
const CHAR_DIFF_LIMIT: usize = 4096;

/// Combined number of words and whitespace runs up to which the diff runs
/// per word.
const WORD_DIFF_LIMIT: usize = 4096;

const EDIT_OPEN: &str = "<u>";
const EDIT_CLOSE: &str = "</u>";

/// Render `new_text` for the rich-text body of a reply.
///
/// With `enabled` set, spans that were inserted or replaced relative to
/// `old_text` are wrapped in `<u>…</u>` and deleted spans are omitted.
/// Otherwise the text is only escaped.
pub fn highlight(new_text: &str, old_text: &str, enabled: bool) -> String {
    if !enabled {
        return escape(new_text);
    }

    let old = split_chars(old_text);
    let new = split_chars(new_text);
    if old.len() + new.len() <= CHAR_DIFF_LIMIT {
        return render_diff(&old, &new);
    }

    let old = split_words(old_text);
    let new = split_words(new_text);
    if old.len() + new.len() <= WORD_DIFF_LIMIT {
        return render_diff(&old, &new);
    }

    render_changed_span(new_text, old_text)
}

fn render_diff(old: &[&str], new: &[&str]) -> String {
    let ops = similar::capture_diff_slices(Algorithm::Myers, old, new);

    let mut out = String::new();
    // Adjacent changed spans render as one underline, deletions in between
    // contribute nothing.
    let mut changed = String::new();
    for op in &ops {
        let (tag, _, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {
                flush_changed(&mut out, &mut changed);
                out.push_str(&escape(&new[new_range].concat()));
            }
            DiffTag::Insert | DiffTag::Replace => changed.push_str(&new[new_range].concat()),
            DiffTag::Delete => {}
        }
    }
    flush_changed(&mut out, &mut changed);
    out
}

/// Underline everything between the longest common prefix and the longest
/// common suffix of the two texts.
fn render_changed_span(new_text: &str, old_text: &str) -> String {
    let prefix = common_len(new_text.chars(), old_text.chars());
    let (new_rest, old_rest) = (&new_text[prefix..], &old_text[prefix..]);
    let suffix = common_len(new_rest.chars().rev(), old_rest.chars().rev());
    let middle_end = new_rest.len() - suffix;

    let mut out = escape(&new_text[..prefix]);
    let mut changed = new_rest[..middle_end].to_string();
    flush_changed(&mut out, &mut changed);
    out.push_str(&escape(&new_rest[middle_end..]));
    out
}

/// Byte length of the run of equal chars at the front of both iterators.
fn common_len(a: impl Iterator<Item = char>, b: impl Iterator<Item = char>) -> usize {
    a.zip(b)
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum()
}

fn split_chars(text: &str) -> Vec<&str> {
    text.char_indices()
        .map(|(idx, c)| &text[idx..idx + c.len_utf8()])
        .collect()
}

/// Split into alternating runs of whitespace and non-whitespace.
fn split_words(text: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (idx, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|prev| prev != space) {
            words.push(&text[start..idx]);
            start = idx;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        words.push(&text[start..]);
    }
    words
}

fn flush_changed(out: &mut String, changed: &mut String) {
    if changed.is_empty() {
        return;
    }
    out.push_str(EDIT_OPEN);
    out.push_str(&escape(changed));
    out.push_str(EDIT_CLOSE);
    changed.clear();
}

/// Escape characters that are significant in the HTML body.
pub fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}
