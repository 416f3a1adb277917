//! # narrate-rs
//!
//! A Rust library that turns long-form text or a multi-speaker dialogue
//! script into one finished audio file, delegating speech synthesis to an
//! external TTS engine.
//!
//! ## Features
//!
//! - **Segmentation**: sentence-aware chunking bounded by a character limit
//! - **Dialogue scripts**: `@<speaker>(pitch=..,speed=..): text` lines with per-line overrides
//! - **Concurrent synthesis**: bounded fan-out with deterministic reassembly order
//! - **Waveform reassembly**: format-checked WAV concatenation
//! - **Background music**: loop/volume planning executed by ffmpeg
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! narrate-rs = { version = "2026.10", features = ["voicevox"] }
//! ```
//!
//! ```ignore
//! use std::sync::Arc;
//! use narrate_rs::{engines::voicevox::VoicevoxEngine, NarrationRequest, Narrator, NarratorConfig};
//!
//! let config = NarratorConfig::default();
//! let engine = VoicevoxEngine::new(&config.engine_url)?;
//! let narrator = Narrator::new(Arc::new(engine), config)?;
//!
//! let request = NarrationRequest::new("こんにちは。今日はいい天気ですね。", "out.mp3");
//! narrator.narrate(&request).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod batch;
pub mod config;
pub mod engines;
pub mod error;
pub mod narrator;
pub mod orchestrator;
pub mod text;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use batch::{narrate_directory, BatchOptions, BatchReport};
pub use config::{FfmpegConfig, NarratorConfig, NarratorConfigBuilder};
pub use error::{EngineError, MixStage, NarrateError};
pub use narrator::{NarrationOutcome, NarrationRequest, Narrator, ScriptMode};
pub use orchestrator::{Orchestrator, SequenceKey, SynthesisResult, SynthesisUnit};

/// Voice parameters sent with every synthesis call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceParams {
    /// Engine style id (VOICEVOX calls this the speaker).
    pub speaker_id: u32,
    /// Pitch shift. 0.0 leaves the voice unchanged.
    pub pitch: f64,
    /// Intonation scale. 1.0 is the engine's natural prosody.
    pub intonation_scale: f64,
    /// Speech speed multiplier.
    pub speed: f64,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            speaker_id: 1,
            pitch: 0.0,
            intonation_scale: 1.0,
            speed: 1.0,
        }
    }
}

/// One style a speaker can be synthesized with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerStyle {
    pub name: String,
    pub id: u32,
}

/// A speaker advertised by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speaker {
    pub name: String,
    pub speaker_uuid: String,
    pub styles: Vec<SpeakerStyle>,
}

/// Common interface for external text-to-speech engines.
///
/// Implementations must be shareable across tasks: the orchestrator calls
/// `synthesize` for many units at once through an `Arc<dyn SynthesisEngine>`.
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    /// Synthesize `text` and return the engine's encoded audio (a WAV container).
    async fn synthesize(&self, text: &str, voice: &VoiceParams) -> Result<Vec<u8>, EngineError>;

    /// List the speakers and styles the engine offers.
    async fn speakers(&self) -> Result<Vec<Speaker>, EngineError>;
}
