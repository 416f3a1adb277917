//! VOICEVOX-compatible HTTP engine.
//!
//! Talks to a running VOICEVOX engine (or a compatible server such as
//! AivisSpeech or COEIROINK v1) over its REST API. Each synthesis is two
//! requests: `POST /audio_query` builds a query for the text and speaker,
//! the voice parameters are patched into it, and `POST /synthesis` renders
//! it to a WAV file.
//!
//! # System Requirements
//!
//! The engine must already be running and reachable; this crate does not
//! start or stop it. The usual way to get one is the official container:
//!
//! ```text
//! docker run --rm -p 50021:50021 voicevox/voicevox_engine:cpu-latest
//! ```
//!
//! # Parameter Mapping
//!
//! | [`VoiceParams`](crate::VoiceParams) | query field | neutral value |
//! |---|---|---|
//! | `speaker_id` | `speaker` (URL) | — |
//! | `pitch` | `pitchScale` | `0.0` |
//! | `intonation_scale` | `intonationScale` | `1.0` |
//! | `speed` | `speedScale` | `1.0` |
//!
//! # Examples
//!
//! ```rust,no_run
//! use narrate_rs::{engines::voicevox::VoicevoxEngine, SynthesisEngine, VoiceParams};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = VoicevoxEngine::new("http://127.0.0.1:50021")?;
//! println!("engine version {}", engine.version().await?);
//!
//! let voice = VoiceParams { speaker_id: 3, speed: 1.1, ..Default::default() };
//! let wav = engine.synthesize("こんにちは", &voice).await?;
//! std::fs::write("hello.wav", wav)?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod speakers;

pub use client::VoicevoxEngine;
pub use speakers::{find_style_id, style_table};
