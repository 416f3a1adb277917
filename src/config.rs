use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::audio::mix::DEFAULT_BGM_VOLUME;
use crate::error::{NarrateError, Result};
use crate::text::DEFAULT_MAX_CHUNK_CHARS;
use crate::VoiceParams;

/// Default address of a locally running VOICEVOX engine.
pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:50021";

/// Location and output normalization of the external ffmpeg tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// Sample rate of mixed and converted output.
    pub sample_rate: u32,
    /// Channel count of mixed and converted output.
    pub channels: u16,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            sample_rate: 44_100,
            channels: 2,
        }
    }
}

/// Settings for a [`Narrator`](crate::Narrator) run.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// engine_url = "http://voicevox:50021"
/// max_concurrency = 8
///
/// [voice]
/// speaker_id = 3
/// speed = 1.1
/// ```
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(default, setter(into), build_fn(validate = "Self::validate", error = "NarrateError"))]
#[serde(default)]
pub struct NarratorConfig {
    pub engine_url: String,
    /// Run-level voice, overridden per line by dialogue scripts.
    pub voice: VoiceParams,
    pub max_chunk_chars: usize,
    /// Hard ceiling on input length, checked before any engine call.
    pub max_input_chars: usize,
    /// Upper bound on synthesis calls in flight at once.
    pub max_concurrency: usize,
    pub request_timeout_secs: u64,
    pub bgm_volume: f64,
    pub ffmpeg: FfmpegConfig,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_ENGINE_URL.to_string(),
            voice: VoiceParams::default(),
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            max_input_chars: 200_000,
            max_concurrency: 4,
            request_timeout_secs: 120,
            bgm_volume: DEFAULT_BGM_VOLUME,
            ffmpeg: FfmpegConfig::default(),
        }
    }
}

impl NarratorConfig {
    pub fn builder() -> NarratorConfigBuilder {
        NarratorConfigBuilder::default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        log::info!("Loading configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        check(
            self.max_chunk_chars,
            self.max_input_chars,
            self.max_concurrency,
            self.request_timeout_secs,
            self.bgm_volume,
        )
        .map_err(NarrateError::Config)
    }
}

impl NarratorConfigBuilder {
    fn validate(&self) -> Result<()> {
        let defaults = NarratorConfig::default();
        check(
            self.max_chunk_chars.unwrap_or(defaults.max_chunk_chars),
            self.max_input_chars.unwrap_or(defaults.max_input_chars),
            self.max_concurrency.unwrap_or(defaults.max_concurrency),
            self.request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            self.bgm_volume.unwrap_or(defaults.bgm_volume),
        )
        .map_err(NarrateError::Config)
    }
}

impl From<derive_builder::UninitializedFieldError> for NarrateError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        NarrateError::Config(e.to_string())
    }
}

fn check(
    max_chunk_chars: usize,
    max_input_chars: usize,
    max_concurrency: usize,
    request_timeout_secs: u64,
    bgm_volume: f64,
) -> std::result::Result<(), String> {
    let problem = if max_chunk_chars == 0 {
        "max_chunk_chars must be at least 1".to_string()
    } else if max_input_chars == 0 {
        "max_input_chars must be at least 1".to_string()
    } else if max_concurrency == 0 {
        "max_concurrency must be at least 1".to_string()
    } else if request_timeout_secs == 0 {
        "request_timeout_secs must be at least 1".to_string()
    } else if !bgm_volume.is_finite() || bgm_volume < 0.0 {
        format!("bgm_volume must be a non-negative number, got {bgm_volume}")
    } else {
        return Ok(());
    };
    Err(problem)
}
