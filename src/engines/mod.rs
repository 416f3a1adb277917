//! Speech synthesis engines.
//!
//! This module contains clients for external text-to-speech engines.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `voicevox` - VOICEVOX-compatible HTTP engine (default)

#[cfg(feature = "voicevox")]
pub mod voicevox;
