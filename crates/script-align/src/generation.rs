use std::future::Future;
use std::pin::Pin;

pub type GenerationError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Token a generation service returns when no bridge sentence is needed.
pub const SKIP_MARKER: &str = "[SKIP]";

/// Sampling temperature requested from the generation service.
pub const BRIDGE_TEMPERATURE: f32 = 0.4;
/// Output length cap requested from the generation service.
pub const BRIDGE_MAX_TOKENS: u32 = 100;

/// Snapshot of engine state taken when a bridge sentence is requested.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct ReconstructionRequest {
    pub id: u64,
    /// Text of the skipped passages, capped to the first few spans.
    pub skipped_text: String,
    /// Script text starting at the live cursor.
    pub current_context: String,
    /// Script text immediately before the live cursor.
    pub previous_context: String,
    /// Most recent final transcript text.
    pub recent_speech: String,
    /// Live cursor char offset at issue time.
    pub issued_at_cursor: usize,
    /// End of the furthest gap at issue time.
    pub last_span_end: usize,
    pub script_version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationReply {
    Text(String),
    /// The service considers the gap covered by what was already said.
    Skip,
}

impl GenerationReply {
    /// Interpret raw service output. Empty output and the skip marker both
    /// mean "no suggestion"; otherwise surrounding whitespace and one pair of
    /// matching quotes are stripped.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = strip_quotes(raw.trim()).trim();

        if trimmed.is_empty()
            || trimmed.contains(SKIP_MARKER)
            || trimmed.eq_ignore_ascii_case("skip")
        {
            return Self::Skip;
        }

        Self::Text(trimmed.to_string())
    }

    /// Re-run the [`Self::from_raw`] checks on a reply from any generator.
    pub fn validated(self) -> Self {
        match self {
            Self::Text(text) => Self::from_raw(&text),
            Self::Skip => Self::Skip,
        }
    }
}

fn strip_quotes(text: &str) -> &str {
    const PAIRS: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('“', '”'), ('‘', '’')];

    for (open, close) in PAIRS {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner;
        }
    }
    text
}

/// Contract for the external service that writes bridge sentences.
///
/// An implementation receives a [`ReconstructionRequest`] and returns either a
/// single short first-person sentence that carries the speaker over the
/// skipped passage, or [`GenerationReply::Skip`]. Errors of any kind are
/// treated by the engine exactly like `Skip`; implementations should not
/// retry on their own.
///
/// Object-safe through the explicit [`BoxFuture`] return type.
pub trait BridgeGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a ReconstructionRequest,
    ) -> BoxFuture<'a, Result<GenerationReply, GenerationError>>;
}
