//! # Sequential word matcher
//!
//! Consumes spoken words one at a time and aligns each against a bounded
//! forward window of the reference script. The first window position whose
//! similarity clears the threshold wins, even if a later position scores
//! higher. This keeps alignment streaming (no global re-alignment) at the
//! cost of occasionally locking onto an earlier plausible word.
//!
//! Words between the cursor and a match are reported as skipped. A spoken
//! word with no match leaves the cursor where it is and is logged as a
//! mismatch; it is never retried against a later position.

use crate::config::MatcherConfig;
use crate::normalize::normalize;
use crate::script::ReferenceScript;
use crate::similarity::similarity_normalized;
use crate::types::{CharSpan, MismatchRecord, SkippedSpan, WordSpan};

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched { index: usize },
    Skipped { index: usize, span: SkippedSpan },
    Mismatch(MismatchRecord),
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        !matches!(self, Self::Mismatch(_))
    }
}

/// Aggregate result of feeding one utterance through the matcher.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BatchOutcome {
    pub new_cursor: usize,
    /// Every spoken word matched and nothing was skipped.
    pub is_fully_matched: bool,
    pub skipped_spans: Vec<SkippedSpan>,
    pub mismatches: Vec<MismatchRecord>,
}

impl BatchOutcome {
    fn trivial(cursor: usize) -> Self {
        Self {
            new_cursor: cursor,
            is_fully_matched: true,
            skipped_spans: vec![],
            mismatches: vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordMatcher {
    cursor: usize,
    config: MatcherConfig,
}

impl WordMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self::starting_at(0, config)
    }

    pub fn starting_at(cursor: usize, config: MatcherConfig) -> Self {
        Self { cursor, config }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn consume(&mut self, script: &ReferenceScript, spoken: &str) -> MatchOutcome {
        let words = script.words();
        let cursor = self.cursor.min(words.len());
        let window_end = cursor.saturating_add(self.config.window).min(words.len());
        let spoken_norm = normalize(spoken);

        let found = (cursor..window_end).find(|&i| {
            similarity_normalized(&spoken_norm, &words[i].normalized) >= self.config.threshold
        });

        match found {
            Some(index) if index == cursor => {
                self.cursor = index + 1;
                MatchOutcome::Matched { index }
            }
            Some(index) => {
                let span = SkippedSpan {
                    words: WordSpan {
                        start: cursor,
                        end: index,
                    },
                    chars: CharSpan::new(words[cursor].start, words[index - 1].end),
                    text: script.span_text(cursor, index),
                };
                self.cursor = index + 1;
                MatchOutcome::Skipped { index, span }
            }
            None => MatchOutcome::Mismatch(MismatchRecord {
                expected_word: words
                    .get(cursor)
                    .map(|w| w.text.clone())
                    .unwrap_or_default(),
                spoken_word: spoken.to_string(),
                position: cursor,
            }),
        }
    }

    pub fn consume_batch<'a>(
        &mut self,
        script: &ReferenceScript,
        spoken: impl IntoIterator<Item = &'a str>,
    ) -> BatchOutcome {
        if script.is_empty() {
            return BatchOutcome::trivial(self.cursor);
        }

        let mut outcome = BatchOutcome::trivial(self.cursor);

        for word in spoken {
            match self.consume(script, word) {
                MatchOutcome::Matched { .. } => {}
                MatchOutcome::Skipped { span, .. } => outcome.skipped_spans.push(span),
                MatchOutcome::Mismatch(record) => outcome.mismatches.push(record),
            }
        }

        outcome.new_cursor = self.cursor;
        outcome.is_fully_matched =
            outcome.mismatches.is_empty() && outcome.skipped_spans.is_empty();
        outcome
    }
}
