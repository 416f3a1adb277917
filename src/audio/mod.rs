//! Audio stages: WAV reassembly, background-mix planning and the ffmpeg adapter.

pub mod ffmpeg;
pub mod mix;
pub mod wav;

pub use ffmpeg::FfmpegMixer;
pub use mix::{MixPlan, OutputFormat};
pub use wav::{combine, WavFormat};
