use crate::events::*;

pub trait PrompterRuntime: Send + Sync + 'static {
    fn emit_alignment(&self, event: AlignmentEvent);
    fn emit_reconstruction(&self, event: ReconstructionEvent);
}
