use crate::config::MatcherConfig;
use crate::matcher::WordMatcher;
use crate::normalize::spoken_words;
use crate::script::ReferenceScript;
use crate::types::{CharSpan, MismatchRecord};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct CompareResult {
    pub current_matched_index: usize,
    pub is_correct: bool,
    pub skipped_parts: Vec<String>,
    pub skipped_ranges: Vec<CharSpan>,
    pub mismatched_words: Vec<MismatchRecord>,
}

/// One-shot alignment of `spoken_text` against `reference_text`, starting at
/// word index `last_matched_index`. Stateless; the caller carries the index
/// between calls.
pub fn compare(spoken_text: &str, reference_text: &str, last_matched_index: usize) -> CompareResult {
    compare_with(
        MatcherConfig::default(),
        spoken_text,
        reference_text,
        last_matched_index,
    )
}

pub fn compare_with(
    config: MatcherConfig,
    spoken_text: &str,
    reference_text: &str,
    last_matched_index: usize,
) -> CompareResult {
    let script = ReferenceScript::new(reference_text);
    let start = last_matched_index.min(script.words().len());
    let batch = WordMatcher::starting_at(start, config)
        .consume_batch(&script, spoken_words(spoken_text));

    CompareResult {
        current_matched_index: batch.new_cursor,
        is_correct: batch.is_fully_matched,
        skipped_parts: batch.skipped_spans.iter().map(|s| s.text.clone()).collect(),
        skipped_ranges: batch.skipped_spans.iter().map(|s| s.chars).collect(),
        mismatched_words: batch.mismatches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "첫째, 인공지능 기반 자동화로 생산성이 향상됩니다";

    #[test]
    fn correct_reading() {
        let result = compare("첫째 인공지능 기반", SCRIPT, 0);
        assert!(result.is_correct);
        assert_eq!(result.current_matched_index, 3);
        assert!(result.skipped_parts.is_empty());
    }

    #[test]
    fn reports_skipped_parts() {
        let result = compare("향상됩니다", SCRIPT, 0);
        assert!(!result.is_correct);
        assert_eq!(result.current_matched_index, 6);
        assert_eq!(result.skipped_parts, ["첫째, 인공지능 기반 자동화로 생산성이"]);
        assert_eq!(result.skipped_ranges, [CharSpan::new(0, 21)]);
    }

    #[test]
    fn resumes_from_index() {
        let result = compare("생산성이 향상됩니다", SCRIPT, 4);
        assert!(result.is_correct);
        assert_eq!(result.current_matched_index, 6);
    }

    #[test]
    fn mismatches_only() {
        let result = compare("완전히 다른 말", SCRIPT, 0);
        assert!(!result.is_correct);
        assert_eq!(result.current_matched_index, 0);
        assert!(result.skipped_ranges.is_empty());
        assert_eq!(result.mismatched_words.len(), 3);
        assert!(result.mismatched_words.iter().all(|m| m.expected_word == "첫째,"));
    }

    #[test]
    fn index_past_end_is_clamped() {
        let result = compare("anything", "one two", 99);
        assert_eq!(result.current_matched_index, 2);
        assert_eq!(result.mismatched_words[0].expected_word, "");
    }
}
