//! # Alignment engine
//!
//! Single owner of all live state for one presentation: the reference
//! script, the cursor, the gap set, the reconstruction trigger and any
//! suggestion on screen. Every mutation goes through one of the methods
//! below and completes synchronously, so a host that calls them from a
//! single task never observes a half-applied step.
//!
//! The engine is sans-IO. It never sleeps, spawns or talks to the network;
//! it tells the host when to arm a debounce timer ([`Schedule`]) and when to
//! send a request ([`TriggerAction::Issue`]), and the host reports back via
//! [`AlignmentEngine::on_debounce_elapsed`] and
//! [`AlignmentEngine::on_generation_result`].
//!
//! ## Utterances
//!
//! Recognizer events carry the whole utterance so far. Each event is matched
//! from the cursor position at the start of the utterance, so a revised
//! interim result replaces the previous one instead of being consumed twice.
//! Interim batches may move the cursor only when fully matched; final
//! batches commit cursor, gaps and mismatches, and start the next utterance.
//!
//! The last ~200 chars of final text are kept as left context. A new
//! utterance that opens by repeating the tail of that buffer, instead of
//! reading on from the cursor, has the repeated words dropped before
//! matching.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::EngineConfig;
use crate::gaps::GapSet;
use crate::generation::{GenerationError, GenerationReply};
use crate::matcher::{BatchOutcome, WordMatcher};
use crate::merge::{self, MergeReport, ReconstructionSuggestion};
use crate::normalize::{normalize, spoken_words};
use crate::script::ReferenceScript;
use crate::similarity::similarity_normalized;
use crate::trigger::{GapStats, ReconstructionTrigger, TriggerAction, TriggerInput};
use crate::types::{MismatchRecord, SkippedSpan, TranscriptEvent, TranscriptKind};

/// Arm a debounce timer: after `delay`, call
/// [`AlignmentEngine::on_debounce_elapsed`] with `gap_version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Schedule {
    pub gap_version: u64,
    #[serde(skip)]
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProcessOutcome {
    pub batch: BatchOutcome,
    pub kind: TranscriptKind,
    pub cursor: usize,
    pub cursor_advanced: bool,
    pub gaps_changed: bool,
    pub schedule: Option<Schedule>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionOutcome {
    Shown(ReconstructionSuggestion),
    /// The service said no bridge is needed.
    Skipped,
    /// The service failed; treated like a skip.
    Failed,
    /// The presenter moved on too far while the request was in flight.
    Stale,
    /// The script was replaced while the request was in flight.
    Superseded,
    /// The result belongs to a request that is no longer pending.
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub outcome: SuggestionOutcome,
    /// Gaps that arrived while the request was in flight may fire again.
    pub schedule: Option<Schedule>,
}

/// Read-only view pushed to the UI after every step.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct EngineSnapshot {
    pub script_version: u64,
    pub cursor: usize,
    pub cursor_offset: usize,
    pub word_count: usize,
    pub skipped: Vec<SkippedSpan>,
    pub stats: GapStats,
    pub mismatches: Vec<MismatchRecord>,
    pub pending_request: Option<u64>,
    pub suggestion: Option<ReconstructionSuggestion>,
}

pub struct AlignmentEngine {
    config: EngineConfig,
    script: ReferenceScript,
    cursor: usize,
    utterance_base: usize,
    gaps: GapSet,
    mismatches: VecDeque<MismatchRecord>,
    recent_speech: String,
    trigger: ReconstructionTrigger,
    suggestion: Option<ReconstructionSuggestion>,
}

impl AlignmentEngine {
    pub fn new(script: impl Into<String>) -> Self {
        Self::with_config(script, EngineConfig::default())
    }

    pub fn with_config(script: impl Into<String>, config: EngineConfig) -> Self {
        Self {
            trigger: ReconstructionTrigger::new(config.trigger.clone()),
            script: ReferenceScript::new(script),
            cursor: 0,
            utterance_base: 0,
            gaps: GapSet::new(),
            mismatches: VecDeque::new(),
            recent_speech: String::new(),
            suggestion: None,
            config,
        }
    }

    pub fn script(&self) -> &ReferenceScript {
        &self.script
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn cursor_offset(&self) -> usize {
        self.script.word_offset(self.cursor)
    }

    pub fn gaps(&self) -> &GapSet {
        &self.gaps
    }

    pub fn suggestion(&self) -> Option<&ReconstructionSuggestion> {
        self.suggestion.as_ref()
    }

    pub fn recent_speech(&self) -> &str {
        &self.recent_speech
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &MismatchRecord> {
        self.mismatches.iter()
    }

    /// Replace the script wholesale (initial load or a new presentation).
    /// Cursor, gaps and suggestions are discarded. A request already in
    /// flight stays pending, so no second one goes out, and its result comes
    /// back as [`SuggestionOutcome::Superseded`].
    pub fn load_script(&mut self, text: impl Into<String>) {
        self.script = self.script.successor(text);
        self.cursor = 0;
        self.utterance_base = 0;
        self.gaps.clear();
        self.mismatches.clear();
        self.recent_speech.clear();
        self.suggestion = None;
        self.trigger.reset();

        tracing::info!(
            script_version = self.script.version(),
            words = self.script.words().len(),
            "script_loaded"
        );
    }

    pub fn process(&mut self, event: &TranscriptEvent) -> ProcessOutcome {
        let words = spoken_words(&event.text);
        let restated = self.restated_prefix_len(&words);
        if restated > 0 {
            tracing::trace!(restated, "restated_words_dropped");
        }

        let mut matcher = WordMatcher::starting_at(self.utterance_base, self.config.matcher);
        let batch = matcher.consume_batch(&self.script, words[restated..].iter().copied());

        let before = self.cursor;
        let mut gaps_changed = false;

        match event.kind {
            TranscriptKind::Interim => {
                if batch.is_fully_matched {
                    self.cursor = self.cursor.max(batch.new_cursor);
                }
            }
            TranscriptKind::Final => {
                self.cursor = self.cursor.max(batch.new_cursor);
                for span in &batch.skipped_spans {
                    gaps_changed |= self.gaps.add(span.clone());
                }
                self.log_mismatches(&batch.mismatches);
                self.utterance_base = self.cursor;
                self.push_recent_speech(&event.text);
            }
        }

        if !batch.is_fully_matched {
            tracing::debug!(
                kind = ?event.kind,
                skipped = batch.skipped_spans.len(),
                mismatched = batch.mismatches.len(),
                cursor = self.cursor,
                "batch_not_fully_matched"
            );
        }

        let schedule = if gaps_changed { self.rearm() } else { None };

        ProcessOutcome {
            kind: event.kind,
            cursor: self.cursor,
            cursor_advanced: self.cursor > before,
            gaps_changed,
            schedule,
            batch,
        }
    }

    /// Number of leading spoken words that repeat the end of the final
    /// buffer. Zero when the first word reads on from the utterance start.
    fn restated_prefix_len(&self, words: &[&str]) -> usize {
        let Some(first) = words.first() else {
            return 0;
        };
        if let Some(next) = self.script.words().get(self.utterance_base)
            && similarity_normalized(&normalize(first), &next.normalized)
                >= self.config.matcher.threshold
        {
            return 0;
        }

        let tail: Vec<String> = spoken_words(&self.recent_speech)
            .into_iter()
            .map(normalize)
            .collect();
        let spoken: Vec<String> = words.iter().map(|w| normalize(w)).collect();

        (1..=spoken.len().min(tail.len()))
            .rev()
            .find(|&k| tail[tail.len() - k..] == spoken[..k])
            .unwrap_or(0)
    }

    fn log_mismatches(&mut self, records: &[MismatchRecord]) {
        self.mismatches.extend(records.iter().cloned());
        while self.mismatches.len() > self.config.mismatch_log_cap {
            self.mismatches.pop_front();
        }
    }

    fn push_recent_speech(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.recent_speech.is_empty() {
            self.recent_speech.push(' ');
        }
        self.recent_speech.push_str(text);

        let len = self.recent_speech.chars().count();
        let cap = self.config.final_buffer_chars;
        if len > cap {
            self.recent_speech = self.recent_speech.chars().skip(len - cap).collect();
        }
    }

    fn rearm(&mut self) -> Option<Schedule> {
        let input = TriggerInput {
            script: &self.script,
            gaps: &self.gaps,
            cursor_offset: self.script.word_offset(self.cursor),
            recent_speech: &self.recent_speech,
            suggestion_displayed: self.suggestion.is_some(),
        };
        let delay = self.trigger.on_gaps_changed(&input)?;
        Some(Schedule {
            gap_version: self.gaps.version(),
            delay,
        })
    }

    pub fn on_debounce_elapsed(&mut self, gap_version: u64, now: Instant) -> TriggerAction {
        let input = TriggerInput {
            script: &self.script,
            gaps: &self.gaps,
            cursor_offset: self.script.word_offset(self.cursor),
            recent_speech: &self.recent_speech,
            suggestion_displayed: self.suggestion.is_some(),
        };
        let action = self.trigger.on_quiescence(gap_version, &input, now);

        if let TriggerAction::Issue(request) = &action {
            tracing::info!(
                request_id = request.id,
                gap_version,
                issued_at_cursor = request.issued_at_cursor,
                "reconstruction_issued"
            );
        }
        action
    }

    /// Handle a finished generation call. Reads the live cursor and gap set,
    /// not whatever was captured when the request went out.
    pub fn on_generation_result(
        &mut self,
        request_id: u64,
        result: Result<GenerationReply, GenerationError>,
    ) -> Resolution {
        let Some(pending) = self.trigger.resolve(request_id) else {
            tracing::debug!(request_id, "reconstruction_result_unknown");
            return Resolution {
                outcome: SuggestionOutcome::Unknown,
                schedule: None,
            };
        };

        if pending.script_version != self.script.version() {
            tracing::debug!(
                request_id,
                issued_for = pending.script_version,
                "reconstruction_superseded"
            );
            return Resolution {
                outcome: SuggestionOutcome::Superseded,
                schedule: self.rearm(),
            };
        }

        let outcome = match result.map(GenerationReply::validated) {
            Err(error) => {
                tracing::warn!(request_id, %error, "reconstruction_failed");
                SuggestionOutcome::Failed
            }
            Ok(GenerationReply::Skip) => {
                tracing::debug!(request_id, "reconstruction_skipped");
                SuggestionOutcome::Skipped
            }
            Ok(GenerationReply::Text(text)) => {
                let live = self.cursor_offset();
                let last_end = self.gaps.last_end().unwrap_or(pending.last_span_end);

                if merge::is_stale(live, last_end, self.config.merge.stale_after_chars) {
                    tracing::debug!(request_id, live, last_end, "reconstruction_stale");
                    SuggestionOutcome::Stale
                } else {
                    let suggestion = ReconstructionSuggestion {
                        request_id,
                        text,
                        preview_offset: merge::insertion_offset(
                            &self.script,
                            live,
                            self.config.merge.terminator_search_chars,
                        ),
                    };
                    tracing::info!(request_id, offset = suggestion.preview_offset, "suggestion_shown");
                    self.suggestion = Some(suggestion.clone());
                    SuggestionOutcome::Shown(suggestion)
                }
            }
        };

        let schedule = match outcome {
            SuggestionOutcome::Shown(_) => None,
            _ => self.rearm(),
        };

        Resolution { outcome, schedule }
    }

    /// Splice the displayed suggestion into the script at the sentence end
    /// following the live cursor. The cursor keeps its word index; gap and
    /// mismatch bookkeeping start over.
    pub fn accept_suggestion(&mut self) -> Option<MergeReport> {
        let suggestion = self.suggestion.take()?;

        let offset = merge::insertion_offset(
            &self.script,
            self.cursor_offset(),
            self.config.merge.terminator_search_chars,
        );
        let (text, start) = merge::splice(&self.script, offset, &suggestion.text);

        self.script = self.script.successor(text);
        self.cursor = self.cursor.min(self.script.words().len());
        self.utterance_base = self.utterance_base.min(self.cursor);
        self.gaps.clear();
        self.mismatches.clear();
        self.trigger.reset();

        let report = MergeReport {
            request_id: suggestion.request_id,
            offset: start,
            inserted: suggestion.text,
            script_version: self.script.version(),
        };

        tracing::info!(
            request_id = report.request_id,
            offset = report.offset,
            script_version = report.script_version,
            "suggestion_merged"
        );

        Some(report)
    }

    /// Drop the displayed suggestion and the gaps it was meant to bridge.
    /// The script is untouched.
    pub fn dismiss_suggestion(&mut self) -> bool {
        let Some(suggestion) = self.suggestion.take() else {
            return false;
        };

        self.gaps.clear();
        self.mismatches.clear();
        self.trigger.reset();

        tracing::info!(request_id = suggestion.request_id, "suggestion_dismissed");
        true
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            script_version: self.script.version(),
            cursor: self.cursor,
            cursor_offset: self.cursor_offset(),
            word_count: self.script.words().len(),
            skipped: self.gaps.spans().to_vec(),
            stats: GapStats::compute(&self.gaps, &self.script),
            mismatches: self.mismatches.iter().cloned().collect(),
            pending_request: self.trigger.pending().map(|p| p.id),
            suggestion: self.suggestion.clone(),
        }
    }
}
