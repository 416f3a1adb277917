//! Adapter for the external ffmpeg/ffprobe tools that perform the actual
//! looping, mixing and encoding described by a [`MixPlan`].
//!
//! # System Requirements
//!
//! **ffmpeg** (with `ffprobe`) must be installed when background music or a
//! compressed output container is requested:
//! - **Linux**: `sudo apt-get install ffmpeg`
//! - **macOS**: `brew install ffmpeg`
//! - **Windows**: Download a build from <https://ffmpeg.org/download.html>

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::process::Command;

use super::mix::{MixPlan, OutputFormat};
use crate::config::FfmpegConfig;
use crate::error::{MixStage, NarrateError, Result};

pub struct FfmpegMixer {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    sample_rate: u32,
    channels: u16,
}

impl Default for FfmpegMixer {
    fn default() -> Self {
        Self::new(&FfmpegConfig::default())
    }
}

impl FfmpegMixer {
    pub fn new(config: &FfmpegConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
            sample_rate: config.sample_rate,
            channels: config.channels,
        }
    }

    /// True when both configured binaries can be executed.
    pub async fn is_available(&self) -> bool {
        for program in [&self.ffmpeg, &self.ffprobe] {
            let runs = Command::new(program)
                .arg("-version")
                .output()
                .await
                .map(|o| o.status.success())
                .unwrap_or(false);
            if !runs {
                return false;
            }
        }
        true
    }

    /// Duration of any audio file ffprobe can read, in seconds.
    pub async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let mut args = os_args(&[
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]);
        args.push(path.as_os_str().to_owned());

        let stdout = run(&self.ffprobe, &args, MixStage::Probe).await?;
        let text = String::from_utf8_lossy(&stdout);
        text.trim().parse::<f64>().map_err(|_| NarrateError::Mixer {
            stage: MixStage::Probe,
            message: format!("unreadable duration {:?} for {}", text.trim(), path.display()),
        })
    }

    /// Write `copies` back-to-back repetitions of `input` to a PCM WAV file.
    pub async fn loop_track(&self, input: &Path, copies: u32, output: &Path) -> Result<()> {
        log::info!("Looping {} x{copies}", input.display());
        run(&self.ffmpeg, &self.loop_args(input, copies, output), MixStage::Loop).await?;
        Ok(())
    }

    /// Mix `bgm` under `voice` as described by `plan`. `bgm` must already be
    /// long enough, i.e. looped when [`MixPlan::needs_loop`] is true.
    pub async fn mix(
        &self,
        voice: &Path,
        bgm: &Path,
        plan: &MixPlan,
        output: &Path,
    ) -> Result<()> {
        log::info!(
            "Mixing background at volume {} into {}",
            plan.volume_ratio,
            output.display()
        );
        run(&self.ffmpeg, &self.mix_args(voice, bgm, plan, output), MixStage::Mix).await?;
        Ok(())
    }

    /// Re-encode `input` into the container `format`.
    pub async fn convert(&self, input: &Path, format: OutputFormat, output: &Path) -> Result<()> {
        log::info!("Converting {} to {format}", input.display());
        let args = self.convert_args(input, format, output);
        run(&self.ffmpeg, &args, MixStage::Convert).await?;
        Ok(())
    }

    fn loop_args(&self, input: &Path, copies: u32, output: &Path) -> Vec<OsString> {
        let repeats = copies.saturating_sub(1).to_string();
        let mut args = os_args(&["-y", "-v", "error", "-stream_loop", repeats.as_str(), "-i"]);
        args.push(input.as_os_str().to_owned());
        args.extend(os_args(&["-c:a", "pcm_s16le"]));
        args.push(output.as_os_str().to_owned());
        args
    }

    fn mix_args(&self, voice: &Path, bgm: &Path, plan: &MixPlan, output: &Path) -> Vec<OsString> {
        let filter = format!(
            "[1:a]volume={}[bgm];[0:a][bgm]amix=inputs=2:duration=first:dropout_transition=0:normalize=0[mix]",
            plan.volume_ratio
        );
        let duration = format!("{:.3}", plan.voice_duration_secs);

        let mut args = os_args(&["-y", "-v", "error", "-i"]);
        args.push(voice.as_os_str().to_owned());
        args.push("-i".into());
        args.push(bgm.as_os_str().to_owned());
        args.extend(os_args(&[
            "-filter_complex",
            filter.as_str(),
            "-map",
            "[mix]",
            "-t",
            duration.as_str(),
        ]));
        args.extend(self.output_args(plan.output_format));
        args.push(output.as_os_str().to_owned());
        args
    }

    fn convert_args(&self, input: &Path, format: OutputFormat, output: &Path) -> Vec<OsString> {
        let mut args = os_args(&["-y", "-v", "error", "-i"]);
        args.push(input.as_os_str().to_owned());
        args.extend(self.output_args(format));
        args.push(output.as_os_str().to_owned());
        args
    }

    /// Channel/sample-rate normalization plus codec selection.
    fn output_args(&self, format: OutputFormat) -> Vec<OsString> {
        let channels = self.channels.to_string();
        let sample_rate = self.sample_rate.to_string();
        let mut args = os_args(&["-ac", channels.as_str(), "-ar", sample_rate.as_str()]);
        let codec: &[&str] = match format {
            OutputFormat::Wav => &["-c:a", "pcm_s16le"],
            OutputFormat::Mp3 => &["-c:a", "libmp3lame", "-b:a", "192k"],
            OutputFormat::M4a => &["-c:a", "aac", "-b:a", "192k"],
            OutputFormat::Ogg => &["-c:a", "libvorbis", "-q:a", "5"],
            OutputFormat::Opus => &["-c:a", "libopus", "-b:a", "128k"],
        };
        args.extend(os_args(codec));
        args
    }
}

fn os_args(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

async fn run(program: &Path, args: &[OsString], stage: MixStage) -> Result<Vec<u8>> {
    log::debug!(
        "{stage}: {} {}",
        program.display(),
        args.iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = Command::new(program)
        .args(args.iter().map(OsString::as_os_str))
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NarrateError::MixerNotFound {
                    program: program.display().to_string(),
                }
            } else {
                NarrateError::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NarrateError::Mixer {
            stage,
            message: format!("exited with code {:?}: {}", output.status.code(), stderr.trim()),
        });
    }
    Ok(output.stdout)
}
