use crate::config::Persona;

/// Dialogue spoken by `persona` in a `Speaker: line` formatted script.
///
/// A line opens a turn when it starts with the persona's speaker label or
/// full display name followed by a colon; unlabelled lines continue the
/// current turn. Surrounding quotes are stripped and turns are joined with
/// spaces.
pub fn persona_lines(script: &str, persona: &Persona, roster: &[Persona]) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut speaking = false;

    for raw in script.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = strip_speaker(line, persona) {
            speaking = true;
            let dialogue = rest.trim().trim_matches(|c| c == '"' || c == '\'').trim();
            if !dialogue.is_empty() {
                out.push(dialogue);
            }
        } else if roster
            .iter()
            .filter(|p| p.id != persona.id)
            .any(|p| strip_speaker(line, p).is_some())
        {
            speaking = false;
        } else if speaking {
            out.push(line);
        }
    }
    out.join(" ")
}

fn strip_speaker<'a>(line: &'a str, persona: &Persona) -> Option<&'a str> {
    [persona.name.as_str(), persona.speaker_label()]
        .into_iter()
        .find_map(|label| line.strip_prefix(label)?.trim_start().strip_prefix(':'))
}
