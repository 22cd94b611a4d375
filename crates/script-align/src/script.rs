use crate::normalize::normalize;
use crate::types::CharSpan;

/// Characters that end a sentence.
pub fn is_sentence_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n')
}

/// A whitespace-delimited word of the reference script with its character
/// range in the full text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptWord {
    pub text: String,
    pub normalized: String,
    pub start: usize,
    pub end: usize,
}

/// One immutable version of the presenter's script.
///
/// All public offsets are in chars. Any offset handed in from outside is
/// clamped to `[0, char_len]` instead of panicking.
#[derive(Debug, Clone)]
pub struct ReferenceScript {
    text: String,
    words: Vec<ScriptWord>,
    /// Byte offset of every char boundary, `char_len + 1` entries.
    boundaries: Vec<usize>,
    version: u64,
}

impl ReferenceScript {
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_version(text, 0)
    }

    pub fn with_version(text: impl Into<String>, version: u64) -> Self {
        let text = text.into();
        let mut boundaries: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        boundaries.push(text.len());

        let words = tokenize(&text);

        Self {
            text,
            words,
            boundaries,
            version,
        }
    }

    /// The script that results from replacing this one. Version numbers only
    /// ever increase within a session.
    pub fn successor(&self, text: impl Into<String>) -> Self {
        Self::with_version(text, self.version + 1)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn words(&self) -> &[ScriptWord] {
        &self.words
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn char_len(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn clamp(&self, offset: usize) -> usize {
        offset.min(self.char_len())
    }

    fn byte_at(&self, offset: usize) -> usize {
        self.boundaries[self.clamp(offset)]
    }

    pub fn slice(&self, start: usize, end: usize) -> &str {
        let start = self.clamp(start);
        let end = self.clamp(end).max(start);
        &self.text[self.byte_at(start)..self.byte_at(end)]
    }

    /// Character offset of the word at `index`, or the end of the script
    /// when `index` is past the last word.
    pub fn word_offset(&self, index: usize) -> usize {
        self.words
            .get(index)
            .map(|w| w.start)
            .unwrap_or_else(|| self.char_len())
    }

    /// Character range covered by the words `[start, end)`, from the start of
    /// the first word to the end of the last one.
    pub fn span_chars(&self, start: usize, end: usize) -> Option<CharSpan> {
        let end = end.min(self.words.len());
        if start >= end {
            return None;
        }
        Some(CharSpan::new(self.words[start].start, self.words[end - 1].end))
    }

    /// Words `[start, end)` joined by a single space.
    pub fn span_text(&self, start: usize, end: usize) -> String {
        let end = end.min(self.words.len());
        if start >= end {
            return String::new();
        }
        self.words[start..end]
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Sentence ranges: text split after every terminator, trimmed of
    /// surrounding whitespace, empty pieces dropped.
    pub fn sentences(&self) -> Vec<CharSpan> {
        let mut sentences = Vec::new();
        let mut piece_start = 0;

        for (i, c) in self.text.chars().enumerate() {
            if is_sentence_terminator(c) {
                self.push_trimmed(&mut sentences, piece_start, i + 1);
                piece_start = i + 1;
            }
        }
        self.push_trimmed(&mut sentences, piece_start, self.char_len());

        sentences
    }

    fn push_trimmed(&self, out: &mut Vec<CharSpan>, start: usize, end: usize) {
        let piece = self.slice(start, end);
        let leading = piece.chars().take_while(|c| c.is_whitespace()).count();
        let trailing = piece.chars().rev().take_while(|c| c.is_whitespace()).count();
        let total = piece.chars().count();

        if leading + trailing >= total {
            return;
        }
        out.push(CharSpan::new(start + leading, end - trailing));
    }

    /// Offset of the first sentence terminator at or after `offset`,
    /// looking at no more than `bound` chars.
    pub fn next_terminator(&self, offset: usize, bound: usize) -> Option<usize> {
        let offset = self.clamp(offset);
        let limit = offset.saturating_add(bound).min(self.char_len());
        self.slice(offset, limit)
            .chars()
            .position(is_sentence_terminator)
            .map(|i| offset + i)
    }
}

fn tokenize(text: &str) -> Vec<ScriptWord> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (i, c) in text.chars().enumerate() {
        if c.is_whitespace() {
            if !current.is_empty() {
                words.push(word(std::mem::take(&mut current), start, i));
            }
        } else {
            if current.is_empty() {
                start = i;
            }
            current.push(c);
        }
    }

    if !current.is_empty() {
        let end = start + current.chars().count();
        words.push(word(current, start, end));
    }

    words
}

fn word(text: String, start: usize, end: usize) -> ScriptWord {
    ScriptWord {
        normalized: normalize(&text),
        text,
        start,
        end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_with_char_offsets() {
        let script = ReferenceScript::new("첫째, 인공지능  기반\n자동화로");
        let words: Vec<_> = script
            .words()
            .iter()
            .map(|w| (w.text.as_str(), w.start, w.end))
            .collect();

        assert_eq!(
            words,
            [
                ("첫째,", 0, 3),
                ("인공지능", 4, 8),
                ("기반", 10, 12),
                ("자동화로", 13, 17),
            ]
        );
        assert_eq!(script.char_len(), 17);
    }

    #[test]
    fn slice_clamps_out_of_range() {
        let script = ReferenceScript::new("hello world");
        assert_eq!(script.slice(6, 100), "world");
        assert_eq!(script.slice(50, 60), "");
        assert_eq!(script.slice(8, 3), "");
    }

    #[test]
    fn word_offset_past_end_is_length() {
        let script = ReferenceScript::new("one two");
        assert_eq!(script.word_offset(1), 4);
        assert_eq!(script.word_offset(2), 7);
        assert_eq!(script.word_offset(99), 7);
    }

    #[test]
    fn span_helpers() {
        let script = ReferenceScript::new("a  bb ccc dddd");
        assert_eq!(script.span_chars(1, 3), Some(CharSpan::new(3, 9)));
        assert_eq!(script.span_text(0, 3), "a bb ccc");
        assert_eq!(script.span_chars(2, 2), None);
        assert_eq!(script.span_chars(3, 10), Some(CharSpan::new(10, 14)));
    }

    #[test]
    fn sentences_split_on_terminators() {
        let script = ReferenceScript::new("One two. Three?\n\nFour five");
        let texts: Vec<_> = script
            .sentences()
            .into_iter()
            .map(|s| script.slice(s.start, s.end).to_string())
            .collect();
        assert_eq!(texts, ["One two.", "Three?", "Four five"]);
    }

    #[test]
    fn next_terminator_respects_bound() {
        let script = ReferenceScript::new("alpha beta. gamma");
        assert_eq!(script.next_terminator(0, 100), Some(10));
        assert_eq!(script.next_terminator(10, 100), Some(10));
        assert_eq!(script.next_terminator(0, 5), None);
        assert_eq!(script.next_terminator(11, 100), None);
    }

    #[test]
    fn successor_bumps_version() {
        let first = ReferenceScript::new("a");
        let second = first.successor("b");
        assert_eq!(first.version(), 0);
        assert_eq!(second.version(), 1);
    }
}
