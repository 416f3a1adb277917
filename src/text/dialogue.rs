//! Dialogue script parsing.
//!
//! A dialogue script is plain text where every spoken line looks like
//!
//! ```text
//! @1: Good morning.
//! @2(pitch=-0.1, speed=1.2): Morning! You're up early.
//! ```
//!
//! The number after `@` is the engine speaker id. The optional parameter
//! list overrides `pitch`, `intonationScale` and `speed` for that line only.
//! Parsing is best-effort: lines that do not fit are skipped and reported
//! as [`ParseDiagnostic`]s instead of failing the whole script.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::VoiceParams;

fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^@(\d+)\s*(?:\(([^)]*)\))?\s*[:：](.*)$").expect("dialogue pattern is valid")
    })
}

/// One spoken line of a dialogue script.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueLine {
    /// Position among emitted lines (skipped lines do not consume an index).
    pub line_index: usize,
    pub speaker_id: u32,
    pub text: String,
    pub pitch: Option<f64>,
    pub intonation_scale: Option<f64>,
    pub speed: Option<f64>,
}

impl DialogueLine {
    /// Voice parameters for this line, falling back to `defaults` per field.
    pub fn voice(&self, defaults: &VoiceParams) -> VoiceParams {
        VoiceParams {
            speaker_id: self.speaker_id,
            pitch: self.pitch.unwrap_or(defaults.pitch),
            intonation_scale: self.intonation_scale.unwrap_or(defaults.intonation_scale),
            speed: self.speed.unwrap_or(defaults.speed),
        }
    }
}

/// Something the parser skipped. `line_number` is 1-based in the source text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseDiagnostic {
    UnmatchedLine { line_number: usize, content: String },
    InvalidSpeaker { line_number: usize, raw: String },
    UnknownParameter { line_number: usize, key: String },
    MalformedParameter { line_number: usize, raw: String },
    EmptyText { line_number: usize },
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseDiagnostic::UnmatchedLine {
                line_number,
                content,
            } => write!(f, "line {line_number}: not a dialogue line, skipped: {content:?}"),
            ParseDiagnostic::InvalidSpeaker { line_number, raw } => {
                write!(f, "line {line_number}: speaker id {raw:?} out of range, skipped")
            }
            ParseDiagnostic::UnknownParameter { line_number, key } => {
                write!(f, "line {line_number}: unknown parameter {key:?} ignored")
            }
            ParseDiagnostic::MalformedParameter { line_number, raw } => {
                write!(f, "line {line_number}: malformed parameter {raw:?} ignored")
            }
            ParseDiagnostic::EmptyText { line_number } => {
                write!(f, "line {line_number}: no text after speaker tag, skipped")
            }
        }
    }
}

/// Result of parsing a script: accepted lines plus everything that was skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogueScript {
    pub lines: Vec<DialogueLine>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl DialogueScript {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// True when at least one non-blank line is a speaker-tagged dialogue line.
pub fn is_dialogue(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .any(|line| line_pattern().is_match(line))
}

/// Parse a dialogue script in order, skipping lines that cannot be used.
pub fn parse(text: &str) -> DialogueScript {
    let mut script = DialogueScript::default();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_number = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(caps) = line_pattern().captures(line) else {
            script.diagnostics.push(ParseDiagnostic::UnmatchedLine {
                line_number,
                content: line.to_string(),
            });
            continue;
        };

        let Ok(speaker_id) = caps[1].parse::<u32>() else {
            script.diagnostics.push(ParseDiagnostic::InvalidSpeaker {
                line_number,
                raw: caps[1].to_string(),
            });
            continue;
        };

        let spoken = caps[3].trim();
        if spoken.is_empty() {
            script
                .diagnostics
                .push(ParseDiagnostic::EmptyText { line_number });
            continue;
        }

        let mut dialogue_line = DialogueLine {
            line_index: script.lines.len(),
            speaker_id,
            text: spoken.to_string(),
            pitch: None,
            intonation_scale: None,
            speed: None,
        };
        if let Some(params) = caps.get(2) {
            apply_parameters(
                &mut dialogue_line,
                params.as_str(),
                line_number,
                &mut script.diagnostics,
            );
        }
        script.lines.push(dialogue_line);
    }

    for diagnostic in &script.diagnostics {
        log::warn!("{diagnostic}");
    }
    script
}

fn apply_parameters(
    line: &mut DialogueLine,
    params: &str,
    line_number: usize,
    diagnostics: &mut Vec<ParseDiagnostic>,
) {
    for pair in params.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let parsed = pair
            .split_once('=')
            .and_then(|(key, value)| Some((key.trim(), value.trim().parse::<f64>().ok()?)))
            .filter(|(_, value)| value.is_finite());

        let Some((key, value)) = parsed else {
            diagnostics.push(ParseDiagnostic::MalformedParameter {
                line_number,
                raw: pair.to_string(),
            });
            continue;
        };

        match key {
            "pitch" => line.pitch = Some(value),
            "intonationScale" => line.intonation_scale = Some(value),
            "speed" => line.speed = Some(value),
            _ => diagnostics.push(ParseDiagnostic::UnknownParameter {
                line_number,
                key: key.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_dialogue_from_single_tagged_line() {
        assert!(is_dialogue("Some intro\n@1: hello\n"));
        assert!(!is_dialogue("Just a monologue.\nWith two lines."));
        assert!(!is_dialogue("email me @ home: later"));
    }

    #[test]
    fn parses_parameter_overrides() {
        let script = parse("@2(pitch=-0.1, speed=1.2): text");
        assert_eq!(
            script.lines,
            vec![DialogueLine {
                line_index: 0,
                speaker_id: 2,
                text: "text".to_string(),
                pitch: Some(-0.1),
                intonation_scale: None,
                speed: Some(1.2),
            }]
        );
        assert!(script.diagnostics.is_empty());
    }

    #[test]
    fn line_index_counts_only_emitted_lines() {
        let script = parse("@1: first\n\nnot dialogue\n@3:   \n@2： second\n");
        let indexed: Vec<(usize, u32, &str)> = script
            .lines
            .iter()
            .map(|l| (l.line_index, l.speaker_id, l.text.as_str()))
            .collect();
        assert_eq!(indexed, vec![(0, 1, "first"), (1, 2, "second")]);
        assert_eq!(
            script.diagnostics,
            vec![
                ParseDiagnostic::UnmatchedLine {
                    line_number: 3,
                    content: "not dialogue".to_string()
                },
                ParseDiagnostic::EmptyText { line_number: 4 },
            ]
        );
    }

    #[test]
    fn bad_parameters_are_skipped_without_dropping_the_line() {
        let script = parse("@4(volume=2, speed=fast, pitch, intonationScale=1.5): hi");
        assert_eq!(script.lines.len(), 1);
        let line = &script.lines[0];
        assert_eq!(line.intonation_scale, Some(1.5));
        assert_eq!(line.speed, None);
        assert_eq!(line.pitch, None);
        assert_eq!(
            script.diagnostics,
            vec![
                ParseDiagnostic::UnknownParameter {
                    line_number: 1,
                    key: "volume".to_string()
                },
                ParseDiagnostic::MalformedParameter {
                    line_number: 1,
                    raw: "speed=fast".to_string()
                },
                ParseDiagnostic::MalformedParameter {
                    line_number: 1,
                    raw: "pitch".to_string()
                },
            ]
        );
    }

    #[test]
    fn oversized_speaker_id_is_reported() {
        let script = parse("@99999999999: too big\n@1: ok");
        assert_eq!(script.lines.len(), 1);
        assert!(matches!(
            script.diagnostics[0],
            ParseDiagnostic::InvalidSpeaker { line_number: 1, .. }
        ));
    }

    #[test]
    fn voice_falls_back_to_defaults() {
        let defaults = VoiceParams {
            speaker_id: 7,
            pitch: 0.05,
            intonation_scale: 1.1,
            speed: 0.9,
        };
        let line = parse("@3(speed=1.3): hey").lines.remove(0);
        assert_eq!(
            line.voice(&defaults),
            VoiceParams {
                speaker_id: 3,
                pitch: 0.05,
                intonation_scale: 1.1,
                speed: 1.3,
            }
        );
    }

    #[test]
    fn text_without_tags_parses_to_empty_script() {
        let script = parse("hello\nworld");
        assert!(script.is_empty());
        assert_eq!(script.diagnostics.len(), 2);
    }
}
