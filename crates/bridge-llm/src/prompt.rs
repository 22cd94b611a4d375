use indoc::formatdoc;

use hypr_script_align::{ReconstructionRequest, SKIP_MARKER};

pub fn system_prompt() -> String {
    formatdoc! {"
        You help a presenter who is reading a prepared script aloud and has just
        skipped part of it. Write one short sentence, in the first person and in
        the language of the script, that the presenter can say next to carry the
        skipped content over naturally.

        Rules:
        - Roughly 30 to 50 characters.
        - Never admit to skipping, forgetting or correcting anything.
        - Output only the sentence, without quotes or commentary.
        - If the skipped content needs no bridge, output exactly {SKIP_MARKER}."
    }
}

pub fn user_prompt(request: &ReconstructionRequest) -> String {
    let recent = if request.recent_speech.trim().is_empty() {
        "(nothing yet)"
    } else {
        request.recent_speech.trim()
    };

    formatdoc! {"
        Skipped passage:
        {skipped}

        Script before the presenter's position:
        {previous}

        Script from the presenter's position:
        {current}

        What the presenter said most recently:
        {recent}",
        skipped = request.skipped_text.trim(),
        previous = request.previous_context.trim(),
        current = request.current_context.trim(),
    }
}
