use crate::config::TriggerConfig;
use crate::gaps;
use crate::generation::{BridgeGenerator, GenerationReply, ReconstructionRequest};
use crate::script::ReferenceScript;
use crate::types::CharSpan;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct ReconstructResult {
    pub reconstructed: String,
    pub skipped: bool,
}

impl ReconstructResult {
    fn skipped() -> Self {
        Self {
            reconstructed: String::new(),
            skipped: true,
        }
    }
}

/// Ask `generator` for a bridge over `skipped_ranges` of `script`, with the
/// speaker at char offset `current_index`.
///
/// Never fails: a service error comes back as `skipped: true`, the same as
/// an explicit skip.
pub async fn reconstruct(
    generator: &dyn BridgeGenerator,
    script: &str,
    skipped_ranges: &[CharSpan],
    current_index: usize,
) -> ReconstructResult {
    let script = ReferenceScript::new(script);
    let Some(request) = build_request(
        &TriggerConfig::default(),
        &script,
        skipped_ranges,
        current_index,
    ) else {
        return ReconstructResult::skipped();
    };

    match generator.generate(&request).await.map(GenerationReply::validated) {
        Ok(GenerationReply::Text(reconstructed)) => ReconstructResult {
            reconstructed,
            skipped: false,
        },
        Ok(GenerationReply::Skip) => ReconstructResult::skipped(),
        Err(error) => {
            tracing::warn!(%error, "reconstruct_failed");
            ReconstructResult::skipped()
        }
    }
}

fn build_request(
    config: &TriggerConfig,
    script: &ReferenceScript,
    skipped_ranges: &[CharSpan],
    current_index: usize,
) -> Option<ReconstructionRequest> {
    let ranges: Vec<CharSpan> = skipped_ranges
        .iter()
        .map(|r| CharSpan::new(script.clamp(r.start), script.clamp(r.end)))
        .collect();
    let ranges = gaps::union(ranges);
    if ranges.is_empty() {
        return None;
    }

    let cursor = script.clamp(current_index);
    let context = config.context_chars;
    let skipped_text = ranges
        .iter()
        .take(config.max_prompt_spans)
        .map(|r| script.slice(r.start, r.end).trim())
        .collect::<Vec<_>>()
        .join(" ");

    Some(ReconstructionRequest {
        id: 0,
        skipped_text,
        current_context: script.slice(cursor, cursor + context).to_string(),
        previous_context: script
            .slice(cursor.saturating_sub(context), cursor)
            .to_string(),
        recent_speech: String::new(),
        issued_at_cursor: cursor,
        last_span_end: ranges.iter().map(|r| r.end).max().unwrap_or(cursor),
        script_version: script.version(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::generation::{BoxFuture, GenerationError};

    struct Canned {
        reply: fn() -> Result<GenerationReply, GenerationError>,
        seen: Mutex<Vec<ReconstructionRequest>>,
    }

    impl Canned {
        fn new(reply: fn() -> Result<GenerationReply, GenerationError>) -> Self {
            Self {
                reply,
                seen: Mutex::new(vec![]),
            }
        }
    }

    impl BridgeGenerator for Canned {
        fn generate<'a>(
            &'a self,
            request: &'a ReconstructionRequest,
        ) -> BoxFuture<'a, Result<GenerationReply, GenerationError>> {
            self.seen.lock().unwrap().push(request.clone());
            let reply = (self.reply)();
            Box::pin(async move { reply })
        }
    }

    const SCRIPT: &str = "Intro line. Alpha beta gamma delta. Closing words here.";

    #[tokio::test]
    async fn returns_generated_text() {
        let generator = Canned::new(|| Ok(GenerationReply::Text("As I said, alpha.".into())));
        let result = reconstruct(&generator, SCRIPT, &[CharSpan::new(12, 28)], 29).await;

        assert_eq!(
            result,
            ReconstructResult {
                reconstructed: "As I said, alpha.".into(),
                skipped: false,
            }
        );

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[0].skipped_text, "Alpha beta gamma");
        assert_eq!(seen[0].previous_context, "Intro line. Alpha beta gamma ");
        assert_eq!(seen[0].current_context, "delta. Closing words here.");
        assert_eq!(seen[0].last_span_end, 28);
    }

    #[tokio::test]
    async fn failure_reads_as_skip() {
        let generator = Canned::new(|| Err("timed out".into()));
        let result = reconstruct(&generator, SCRIPT, &[CharSpan::new(12, 28)], 29).await;
        assert!(result.skipped);
        assert!(result.reconstructed.is_empty());
    }

    #[tokio::test]
    async fn explicit_skip() {
        let generator = Canned::new(|| Ok(GenerationReply::Skip));
        let result = reconstruct(&generator, SCRIPT, &[CharSpan::new(0, 11)], 12).await;
        assert!(result.skipped);
    }

    #[tokio::test]
    async fn blank_or_marked_text_reads_as_skip() {
        let generator = Canned::new(|| Ok(GenerationReply::Text("  \n".into())));
        let result = reconstruct(&generator, SCRIPT, &[CharSpan::new(12, 28)], 29).await;
        assert_eq!(result, ReconstructResult::skipped());

        let generator = Canned::new(|| Ok(GenerationReply::Text("[SKIP]".into())));
        let result = reconstruct(&generator, SCRIPT, &[CharSpan::new(12, 28)], 29).await;
        assert_eq!(result, ReconstructResult::skipped());
    }

    #[tokio::test]
    async fn no_ranges_does_not_call_service() {
        let generator = Canned::new(|| Ok(GenerationReply::Text("unused".into())));
        let result = reconstruct(&generator, SCRIPT, &[CharSpan::new(900, 999)], 0).await;

        assert!(result.skipped);
        assert!(generator.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn overlapping_ranges_are_merged() {
        let generator = Canned::new(|| Ok(GenerationReply::Skip));
        reconstruct(
            &generator,
            SCRIPT,
            &[CharSpan::new(18, 28), CharSpan::new(12, 22), CharSpan::new(0, 5)],
            29,
        )
        .await;

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen[0].skipped_text, "Intro Alpha beta gamma");
    }
}
