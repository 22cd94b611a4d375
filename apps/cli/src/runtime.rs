use hypr_prompter_core::{AlignmentEvent, PrompterRuntime, ReconstructionEvent};
use hypr_script_align::{BoxFuture, BridgeGenerator, GenerationError, GenerationReply, ReconstructionRequest};
use tokio::sync::mpsc;

#[derive(serde::Serialize)]
#[serde(untagged)]
pub enum PrompterEvent {
    Alignment(AlignmentEvent),
    Reconstruction(ReconstructionEvent),
}

pub struct StdoutRuntime {
    tx: mpsc::UnboundedSender<PrompterEvent>,
}

impl StdoutRuntime {
    pub fn new(tx: mpsc::UnboundedSender<PrompterEvent>) -> Self {
        Self { tx }
    }
}

impl PrompterRuntime for StdoutRuntime {
    fn emit_alignment(&self, event: AlignmentEvent) {
        let _ = self.tx.send(PrompterEvent::Alignment(event));
    }

    fn emit_reconstruction(&self, event: ReconstructionEvent) {
        let _ = self.tx.send(PrompterEvent::Reconstruction(event));
    }
}

/// Stand-in generator for `--offline`: every gap is answered with a skip.
pub struct OfflineGenerator;

impl BridgeGenerator for OfflineGenerator {
    fn generate<'a>(
        &'a self,
        _request: &'a ReconstructionRequest,
    ) -> BoxFuture<'a, Result<GenerationReply, GenerationError>> {
        Box::pin(async { Ok(GenerationReply::Skip) })
    }
}
