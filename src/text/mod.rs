//! Text preparation: sentence-bounded segmentation and dialogue-script parsing.

pub mod dialogue;
pub mod segmenter;

pub use dialogue::{DialogueLine, DialogueScript, ParseDiagnostic};
pub use segmenter::{segment, DEFAULT_MAX_CHUNK_CHARS};
