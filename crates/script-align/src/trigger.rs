//! Debounced policy deciding when to ask for a bridge sentence.
//!
//! The trigger holds no timers itself. The host arms a timer for the
//! duration returned by [`ReconstructionTrigger::on_gaps_changed`] and calls
//! [`ReconstructionTrigger::on_quiescence`] with the gap version the timer
//! was armed for. Every gap change re-arms, so only the timer for the latest
//! version can issue a request.

use std::time::{Duration, Instant};

use crate::config::TriggerConfig;
use crate::gaps::GapSet;
use crate::generation::ReconstructionRequest;
use crate::script::ReferenceScript;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct GapStats {
    pub total_skipped_chars: usize,
    pub skipped_sentence_count: usize,
}

impl GapStats {
    pub fn compute(gaps: &GapSet, script: &ReferenceScript) -> Self {
        let spans = gaps.char_spans();
        let skipped_sentence_count = script
            .sentences()
            .iter()
            .filter(|sentence| spans.iter().any(|span| span.contains(sentence)))
            .count();

        Self {
            total_skipped_chars: gaps.total_chars(),
            skipped_sentence_count,
        }
    }

    pub fn exceeds(&self, threshold_chars: usize) -> bool {
        self.skipped_sentence_count >= 1 || self.total_skipped_chars >= threshold_chars
    }
}

/// Everything the trigger reads from the engine. Borrowed fresh on every
/// call; the trigger never caches engine state.
pub struct TriggerInput<'a> {
    pub script: &'a ReferenceScript,
    pub gaps: &'a GapSet,
    pub cursor_offset: usize,
    pub recent_speech: &'a str,
    pub suggestion_displayed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: u64,
    pub gap_version: u64,
    pub script_version: u64,
    pub last_span_end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerAction {
    Idle,
    Issue(ReconstructionRequest),
    /// Too soon after the previous request; call again after this long.
    Defer(Duration),
}

#[derive(Debug, Clone)]
pub struct ReconstructionTrigger {
    config: TriggerConfig,
    pending: Option<PendingRequest>,
    armed_version: Option<u64>,
    attempted_version: Option<u64>,
    last_issued_at: Option<Instant>,
    next_id: u64,
}

impl ReconstructionTrigger {
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            config,
            pending: None,
            armed_version: None,
            attempted_version: None,
            last_issued_at: None,
            next_id: 1,
        }
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn should_fire(&self, input: &TriggerInput<'_>) -> bool {
        if self.pending.is_some() || input.suggestion_displayed || input.gaps.is_empty() {
            return false;
        }
        if self.attempted_version == Some(input.gaps.version()) {
            return false;
        }
        GapStats::compute(input.gaps, input.script).exceeds(self.config.threshold_chars)
    }

    /// Re-evaluate after the gap set (or anything else the fire condition
    /// reads) changed. Returns the debounce to wait before calling
    /// [`Self::on_quiescence`], or `None` if nothing should fire.
    pub fn on_gaps_changed(&mut self, input: &TriggerInput<'_>) -> Option<Duration> {
        if self.should_fire(input) {
            self.armed_version = Some(input.gaps.version());
            Some(self.config.debounce)
        } else {
            self.armed_version = None;
            None
        }
    }

    pub fn on_quiescence(
        &mut self,
        timer_version: u64,
        input: &TriggerInput<'_>,
        now: Instant,
    ) -> TriggerAction {
        if self.armed_version != Some(timer_version) || input.gaps.version() != timer_version {
            tracing::trace!(timer_version, "debounce_timer_outdated");
            return TriggerAction::Idle;
        }

        if !self.should_fire(input) {
            self.armed_version = None;
            return TriggerAction::Idle;
        }

        if let Some(last) = self.last_issued_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.config.min_spacing {
                return TriggerAction::Defer(self.config.min_spacing - elapsed);
            }
        }

        let request = self.build_request(input);
        self.pending = Some(PendingRequest {
            id: request.id,
            gap_version: timer_version,
            script_version: request.script_version,
            last_span_end: request.last_span_end,
        });
        self.armed_version = None;
        self.last_issued_at = Some(now);

        TriggerAction::Issue(request)
    }

    fn build_request(&mut self, input: &TriggerInput<'_>) -> ReconstructionRequest {
        let id = self.next_id;
        self.next_id += 1;

        let script = input.script;
        let cursor = script.clamp(input.cursor_offset);
        let context = self.config.context_chars;

        ReconstructionRequest {
            id,
            skipped_text: input.gaps.joined_text(self.config.max_prompt_spans),
            current_context: script.slice(cursor, cursor + context).to_string(),
            previous_context: script
                .slice(cursor.saturating_sub(context), cursor)
                .to_string(),
            recent_speech: input.recent_speech.to_string(),
            issued_at_cursor: cursor,
            last_span_end: input.gaps.last_end().unwrap_or(cursor),
            script_version: script.version(),
        }
    }

    /// Clear the in-flight request if `id` is the one pending. The gap
    /// version it was issued for counts as attempted and will not fire
    /// again.
    pub fn resolve(&mut self, id: u64) -> Option<PendingRequest> {
        match self.pending {
            Some(pending) if pending.id == id => {
                self.pending = None;
                self.attempted_version = Some(pending.gap_version);
                Some(pending)
            }
            _ => None,
        }
    }

    /// Forget armed and attempted state, e.g. after the script was replaced.
    /// A request in flight stays pending until [`Self::resolve`] sees it.
    pub fn reset(&mut self) {
        self.armed_version = None;
        self.attempted_version = None;
    }
}
