use hypr_script_align::{EngineSnapshot, MergeReport, ReconstructionSuggestion, TranscriptKind};

#[derive(serde::Serialize, Clone, Debug)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
#[serde(tag = "type")]
pub enum AlignmentEvent {
    #[serde(rename = "scriptLoaded")]
    ScriptLoaded {
        session_id: String,
        script_version: u64,
        word_count: usize,
    },
    #[serde(rename = "alignmentProgress")]
    Progress {
        session_id: String,
        kind: TranscriptKind,
        is_fully_matched: bool,
        snapshot: EngineSnapshot,
    },
}

#[derive(serde::Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
#[serde(rename_all = "lowercase")]
pub enum DiscardReason {
    Skipped,
    Failed,
    Stale,
    /// The script was replaced while the request was in flight.
    Superseded,
}

#[derive(serde::Serialize, Clone, Debug)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
#[serde(tag = "type")]
pub enum ReconstructionEvent {
    #[serde(rename = "reconstructionRequested")]
    Requested {
        session_id: String,
        request_id: u64,
        skipped_text: String,
    },
    #[serde(rename = "suggestionShown")]
    Suggested {
        session_id: String,
        suggestion: ReconstructionSuggestion,
    },
    #[serde(rename = "reconstructionDiscarded")]
    Discarded {
        session_id: String,
        request_id: u64,
        reason: DiscardReason,
    },
    #[serde(rename = "suggestionMerged")]
    Merged {
        session_id: String,
        report: MergeReport,
        script: String,
    },
    #[serde(rename = "suggestionDismissed")]
    Dismissed { session_id: String },
}
