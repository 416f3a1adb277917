use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::wav::WavFormat;
use crate::orchestrator::SequenceKey;

/// Failure of a single call against the external synthesis engine.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("engine returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("engine unreachable: {0}")]
    Transport(String),
    #[error("engine sent an unexpected response: {0}")]
    InvalidResponse(String),
    #[error("engine call exceeded {0:?}")]
    Timeout(Duration),
}

/// External audio-processing step that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixStage {
    Probe,
    Loop,
    Mix,
    Convert,
}

impl fmt::Display for MixStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MixStage::Probe => "duration probe",
            MixStage::Loop => "background looping",
            MixStage::Mix => "background mixing",
            MixStage::Convert => "container conversion",
        };
        f.write_str(name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum NarrateError {
    #[error("input text is empty")]
    EmptyInput,
    #[error("input text has {chars} characters, limit is {limit}")]
    InputTooLong { chars: usize, limit: usize },
    #[error("missing {0} path")]
    MissingPath(&'static str),
    #[error("input document not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("background track not found: {}", .0.display())]
    BackgroundNotFound(PathBuf),
    #[error("unsupported output format '{0}' (expected wav, mp3, m4a, ogg or opus)")]
    UnsupportedOutputFormat(String),
    #[error("dialogue script contains no usable lines")]
    NoDialogueLines,
    #[error("invalid mix input: {0}")]
    InvalidMixInput(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("synthesis failed for unit {key}: {source}")]
    Synthesis {
        key: SequenceKey,
        #[source]
        source: EngineError,
    },
    #[error("synthesis task aborted: {0}")]
    TaskFailed(String),

    #[error("no audio buffers to combine")]
    EmptyBuffers,
    #[error("buffer {index} has format {found}, expected {expected}")]
    FormatMismatch {
        index: usize,
        expected: WavFormat,
        found: WavFormat,
    },
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("{stage} failed: {message}")]
    Mixer { stage: MixStage, message: String },
    #[error("'{program}' not found. Install ffmpeg or set ffmpeg.ffmpeg_path / ffmpeg.ffprobe_path")]
    MixerNotFound { program: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NarrateError {
    /// True for errors raised before any engine call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            NarrateError::EmptyInput
                | NarrateError::InputTooLong { .. }
                | NarrateError::MissingPath(_)
                | NarrateError::InputNotFound(_)
                | NarrateError::BackgroundNotFound(_)
                | NarrateError::UnsupportedOutputFormat(_)
                | NarrateError::NoDialogueLines
                | NarrateError::Config(_)
        )
    }
}

pub type Result<T, E = NarrateError> = std::result::Result<T, E>;
