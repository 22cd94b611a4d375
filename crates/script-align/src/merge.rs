use crate::script::ReferenceScript;

/// A generated bridge sentence waiting for the presenter to accept or
/// dismiss it.
///
/// `preview_offset` is where the text would go if accepted right now. It is
/// recomputed against the live cursor on accept, since the presenter keeps
/// talking while the suggestion is on screen.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct ReconstructionSuggestion {
    pub request_id: u64,
    pub text: String,
    pub preview_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct MergeReport {
    pub request_id: u64,
    /// Char offset in the new script where the inserted text begins.
    pub offset: usize,
    pub inserted: String,
    pub script_version: u64,
}

/// The presenter has moved so far past the gap that a bridge for it would no
/// longer make sense.
pub fn is_stale(live_offset: usize, last_span_end: usize, stale_after_chars: usize) -> bool {
    live_offset.saturating_sub(last_span_end) > stale_after_chars
}

/// Just past the first sentence terminator at or after `cursor_offset`,
/// searching at most `search_chars`. Falls back to the end of the script.
pub fn insertion_offset(
    script: &ReferenceScript,
    cursor_offset: usize,
    search_chars: usize,
) -> usize {
    script
        .next_terminator(cursor_offset, search_chars)
        .map(|i| i + 1)
        .unwrap_or_else(|| script.char_len())
}

/// Insert `text` at char `offset`, adding a separating space on either side
/// where the neighbouring text doesn't already provide whitespace.
///
/// Returns the new text and the char offset where `text` starts in it.
pub fn splice(script: &ReferenceScript, offset: usize, text: &str) -> (String, usize) {
    let offset = script.clamp(offset);
    let before = script.slice(0, offset);
    let after = script.slice(offset, script.char_len());
    let text = text.trim();

    let mut out = String::with_capacity(script.text().len() + text.len() + 2);
    out.push_str(before);
    if before.chars().next_back().is_some_and(|c| !c.is_whitespace()) {
        out.push(' ');
    }
    let start = out.chars().count();
    out.push_str(text);
    if after.chars().next().is_some_and(|c| !c.is_whitespace()) {
        out.push(' ');
    }
    out.push_str(after);

    (out, start)
}
