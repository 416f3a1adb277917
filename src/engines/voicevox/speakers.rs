use crate::{EngineError, Speaker};

/// Parse the body of `GET /speakers`. Fields this crate does not use
/// (`version`, `supported_features`, style `type`) are ignored.
pub fn parse_speakers(body: &[u8]) -> Result<Vec<Speaker>, EngineError> {
    serde_json::from_slice(body)
        .map_err(|e| EngineError::InvalidResponse(format!("speakers: {e}")))
}

/// Flatten speakers into `(speaker name, style name, style id)` rows sorted by id.
pub fn style_table(speakers: &[Speaker]) -> Vec<(&str, &str, u32)> {
    let mut rows: Vec<(&str, &str, u32)> = speakers
        .iter()
        .flat_map(|speaker| {
            speaker
                .styles
                .iter()
                .map(move |style| (speaker.name.as_str(), style.name.as_str(), style.id))
        })
        .collect();
    rows.sort_unstable_by_key(|&(_, _, id)| id);
    rows
}

/// Look up the style id for a speaker/style name pair.
pub fn find_style_id(speakers: &[Speaker], speaker_name: &str, style_name: &str) -> Option<u32> {
    speakers
        .iter()
        .find(|speaker| speaker.name == speaker_name)?
        .styles
        .iter()
        .find(|style| style.name == style_name)
        .map(|style| style.id)
}
