use hypr_script_align::TranscriptEvent;

/// One line of the stdin protocol.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Transcript(TranscriptEvent),
    Accept,
    Dismiss,
    Snapshot,
    Load(String),
    Quit,
}

pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "partial:" | "interim:" => Some(Command::Transcript(TranscriptEvent::interim(rest))),
        "final:" => Some(Command::Transcript(TranscriptEvent::final_text(rest))),
        "accept" => Some(Command::Accept),
        "dismiss" => Some(Command::Dismiss),
        "snapshot" => Some(Command::Snapshot),
        "load" if !rest.is_empty() => Some(Command::Load(rest.to_string())),
        "quit" | "exit" => Some(Command::Quit),
        // bare text is read as a final transcript
        _ => Some(Command::Transcript(TranscriptEvent::final_text(line))),
    }
}
