use std::fmt;
use std::path::Path;

use crate::error::{NarrateError, Result};

/// Default background amplitude relative to the voice track.
pub const DEFAULT_BGM_VOLUME: f64 = 0.05;

/// Container of the final output file, chosen from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Wav,
    Mp3,
    M4a,
    Ogg,
    Opus,
}

impl OutputFormat {
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "wav" | "wave" => Ok(OutputFormat::Wav),
            "mp3" => Ok(OutputFormat::Mp3),
            "m4a" | "aac" => Ok(OutputFormat::M4a),
            "ogg" => Ok(OutputFormat::Ogg),
            "opus" => Ok(OutputFormat::Opus),
            _ => Err(NarrateError::UnsupportedOutputFormat(extension.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| NarrateError::UnsupportedOutputFormat(path.display().to_string()))?;
        Self::from_extension(extension)
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Wav => "wav",
            OutputFormat::Mp3 => "mp3",
            OutputFormat::M4a => "m4a",
            OutputFormat::Ogg => "ogg",
            OutputFormat::Opus => "opus",
        }
    }

    /// True for lossy, compressed containers.
    pub fn is_compressed(self) -> bool {
        !matches!(self, OutputFormat::Wav)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Looping, volume and output decisions for laying a background track under
/// a voice track. The voice duration is authoritative for the output length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixPlan {
    pub voice_duration_secs: f64,
    pub bgm_duration_secs: f64,
    /// Copies of the background track played back to back. 1 means no looping.
    pub loop_count: u32,
    pub volume_ratio: f64,
    pub output_format: OutputFormat,
    pub output_is_compressed: bool,
}

impl MixPlan {
    pub fn needs_loop(&self) -> bool {
        self.loop_count > 1
    }
}

/// Compute the mix plan for a voice track of `voice_secs` over a background of `bgm_secs`.
///
/// A background shorter than the voice is repeated `ceil(voice / bgm)` times.
/// `volume_ratio` is passed through untouched.
pub fn plan(
    voice_secs: f64,
    bgm_secs: f64,
    volume_ratio: f64,
    output_extension: &str,
) -> Result<MixPlan> {
    if !voice_secs.is_finite() || voice_secs <= 0.0 {
        return Err(NarrateError::InvalidMixInput(format!(
            "voice duration must be positive, got {voice_secs}"
        )));
    }
    if !bgm_secs.is_finite() || bgm_secs <= 0.0 {
        return Err(NarrateError::InvalidMixInput(format!(
            "background duration must be positive, got {bgm_secs}"
        )));
    }
    if !volume_ratio.is_finite() || volume_ratio < 0.0 {
        return Err(NarrateError::InvalidMixInput(format!(
            "background volume must be a non-negative number, got {volume_ratio}"
        )));
    }
    let output_format = OutputFormat::from_extension(output_extension)?;

    let loop_count = if bgm_secs < voice_secs {
        let copies = (voice_secs / bgm_secs).ceil();
        if copies > f64::from(u32::MAX) {
            return Err(NarrateError::InvalidMixInput(format!(
                "background of {bgm_secs}s would need {copies} copies to cover {voice_secs}s"
            )));
        }
        copies as u32
    } else {
        1
    };

    Ok(MixPlan {
        voice_duration_secs: voice_secs,
        bgm_duration_secs: bgm_secs,
        loop_count,
        volume_ratio,
        output_format,
        output_is_compressed: output_format.is_compressed(),
    })
}
