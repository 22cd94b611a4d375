use std::time::Duration;

/// Minimum similarity for a spoken word to match a script word.
pub const MATCH_THRESHOLD: f64 = 0.8;
/// Number of script words ahead of the cursor the matcher may look at.
pub const SEARCH_WINDOW: usize = 20;

pub const GAP_THRESHOLD_CHARS: usize = 10;
pub const DEBOUNCE: Duration = Duration::from_millis(1200);
pub const MIN_REQUEST_SPACING: Duration = Duration::from_millis(50);
pub const CONTEXT_CHARS: usize = 300;
pub const MAX_PROMPT_SPANS: usize = 5;
pub const STALE_AFTER_CHARS: usize = 500;
pub const TERMINATOR_SEARCH_CHARS: usize = 500;
pub const FINAL_BUFFER_CHARS: usize = 200;
pub const MISMATCH_LOG_CAP: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub threshold: f64,
    pub window: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: MATCH_THRESHOLD,
            window: SEARCH_WINDOW,
        }
    }
}

/// When to ask for a bridge sentence and what context to send with it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub threshold_chars: usize,
    #[serde(with = "millis")]
    pub debounce: Duration,
    #[serde(with = "millis")]
    pub min_spacing: Duration,
    pub context_chars: usize,
    pub max_prompt_spans: usize,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            threshold_chars: GAP_THRESHOLD_CHARS,
            debounce: DEBOUNCE,
            min_spacing: MIN_REQUEST_SPACING,
            context_chars: CONTEXT_CHARS,
            max_prompt_spans: MAX_PROMPT_SPANS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Drop a suggestion once the live cursor is this far past the gap.
    pub stale_after_chars: usize,
    /// How far past the cursor to look for a sentence end to insert after.
    pub terminator_search_chars: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            stale_after_chars: STALE_AFTER_CHARS,
            terminator_search_chars: TERMINATOR_SEARCH_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matcher: MatcherConfig,
    pub trigger: TriggerConfig,
    pub merge: MergeConfig,
    /// Rolling buffer of final transcript text kept as speech context.
    pub final_buffer_chars: usize,
    pub mismatch_log_cap: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matcher: MatcherConfig::default(),
            trigger: TriggerConfig::default(),
            merge: MergeConfig::default(),
            final_buffer_chars: FINAL_BUFFER_CHARS,
            mismatch_log_cap: MISMATCH_LOG_CAP,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
