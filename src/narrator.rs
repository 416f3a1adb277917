//! End-to-end narration of one document.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::mix::{self, MixPlan, OutputFormat};
use crate::audio::{wav, FfmpegMixer};
use crate::config::NarratorConfig;
use crate::error::{NarrateError, Result};
use crate::orchestrator::{dialogue_units, monologue_units, Orchestrator, SynthesisUnit};
use crate::text::dialogue;
use crate::SynthesisEngine;

/// How the input text was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptMode {
    Monologue,
    Dialogue,
}

/// What to narrate and where to put it.
#[derive(Debug, Clone)]
pub struct NarrationRequest {
    pub text: String,
    /// Output file; its extension selects the container.
    pub output: PathBuf,
    /// Optional background track mixed under the voice.
    pub bgm: Option<PathBuf>,
}

impl NarrationRequest {
    pub fn new(text: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            text: text.into(),
            output: output.into(),
            bgm: None,
        }
    }

    pub fn with_bgm(mut self, bgm: impl Into<PathBuf>) -> Self {
        self.bgm = Some(bgm.into());
        self
    }
}

/// Summary of a finished narration.
#[derive(Debug, Clone)]
pub struct NarrationOutcome {
    pub output: PathBuf,
    pub mode: ScriptMode,
    pub units: usize,
    pub voice_duration_secs: f64,
    pub mix_plan: Option<MixPlan>,
}

/// Runs the whole pipeline for single documents: validation, synthesis,
/// reassembly, then background mixing or container conversion.
///
/// Intermediate files live in a temporary directory next to the output and
/// the finished file is renamed into place, so a failed run never leaves a
/// partial output behind.
pub struct Narrator {
    config: NarratorConfig,
    orchestrator: Orchestrator,
    mixer: FfmpegMixer,
}

impl Narrator {
    pub fn new(engine: Arc<dyn SynthesisEngine>, config: NarratorConfig) -> Result<Self> {
        config.validate()?;
        let orchestrator =
            Orchestrator::new(engine, config.max_concurrency, config.request_timeout());
        let mixer = FfmpegMixer::new(&config.ffmpeg);
        Ok(Self {
            config,
            orchestrator,
            mixer,
        })
    }

    pub fn config(&self) -> &NarratorConfig {
        &self.config
    }

    pub fn mixer(&self) -> &FfmpegMixer {
        &self.mixer
    }

    /// Narrate the text file at `input` into `output`.
    pub async fn narrate_file(
        &self,
        input: &Path,
        output: &Path,
        bgm: Option<&Path>,
    ) -> Result<NarrationOutcome> {
        if input.as_os_str().is_empty() {
            return Err(NarrateError::MissingPath("input"));
        }
        if !is_file(input).await {
            return Err(NarrateError::InputNotFound(input.to_path_buf()));
        }
        let text = tokio::fs::read_to_string(input).await?;
        let request = NarrationRequest {
            text,
            output: output.to_path_buf(),
            bgm: bgm.map(Path::to_path_buf),
        };
        self.narrate(&request).await
    }

    pub async fn narrate(&self, request: &NarrationRequest) -> Result<NarrationOutcome> {
        let format = self.validate(request).await?;
        let (mode, units) = self.plan_units(&request.text)?;
        let unit_count = units.len();
        log::info!(
            "Narrating {} ({mode:?}, {unit_count} units)",
            request.output.display()
        );

        let voice = {
            let results = self.orchestrator.run(units).await?;
            wav::combine(results.into_iter().map(|r| r.audio).collect())?
        };
        let voice_duration_secs = wav::duration_secs(&voice)?;

        let parent = match request.output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent).await?;
        let workspace = tempfile::Builder::new()
            .prefix(".narrate-")
            .tempdir_in(&parent)?;
        let staged = workspace.path().join(format!("output.{}", format.extension()));

        let mix_plan = match &request.bgm {
            Some(bgm) => {
                let voice_path = workspace.path().join("voice.wav");
                tokio::fs::write(&voice_path, &voice).await?;
                drop(voice);

                let bgm_secs = self.mixer.probe_duration(bgm).await?;
                let plan = mix::plan(
                    voice_duration_secs,
                    bgm_secs,
                    self.config.bgm_volume,
                    format.extension(),
                )?;
                log::info!(
                    "Background {:.1}s under voice {:.1}s: {} cop{}",
                    bgm_secs,
                    voice_duration_secs,
                    plan.loop_count,
                    if plan.loop_count == 1 { "y" } else { "ies" }
                );

                let bgm_input = if plan.needs_loop() {
                    let looped = workspace.path().join("bgm_looped.wav");
                    self.mixer.loop_track(bgm, plan.loop_count, &looped).await?;
                    looped
                } else {
                    bgm.clone()
                };
                self.mixer.mix(&voice_path, &bgm_input, &plan, &staged).await?;
                Some(plan)
            }
            None if format.is_compressed() => {
                let voice_path = workspace.path().join("voice.wav");
                tokio::fs::write(&voice_path, &voice).await?;
                drop(voice);
                self.mixer.convert(&voice_path, format, &staged).await?;
                None
            }
            None => {
                tokio::fs::write(&staged, &voice).await?;
                None
            }
        };

        tokio::fs::rename(&staged, &request.output).await?;
        workspace.close()?;
        log::info!(
            "Wrote {} ({voice_duration_secs:.1}s of speech)",
            request.output.display()
        );

        Ok(NarrationOutcome {
            output: request.output.clone(),
            mode,
            units: unit_count,
            voice_duration_secs,
            mix_plan,
        })
    }

    /// Checks that must pass before any engine call.
    async fn validate(&self, request: &NarrationRequest) -> Result<OutputFormat> {
        if request.output.as_os_str().is_empty() {
            return Err(NarrateError::MissingPath("output"));
        }
        let format = OutputFormat::from_path(&request.output)?;

        if request.text.trim().is_empty() {
            return Err(NarrateError::EmptyInput);
        }
        let chars = request.text.chars().count();
        if chars > self.config.max_input_chars {
            return Err(NarrateError::InputTooLong {
                chars,
                limit: self.config.max_input_chars,
            });
        }

        if let Some(bgm) = &request.bgm {
            if bgm.as_os_str().is_empty() {
                return Err(NarrateError::MissingPath("background track"));
            }
            if !is_file(bgm).await {
                return Err(NarrateError::BackgroundNotFound(bgm.clone()));
            }
        }
        Ok(format)
    }

    fn plan_units(&self, text: &str) -> Result<(ScriptMode, Vec<SynthesisUnit>)> {
        let voice = &self.config.voice;
        let max_chars = self.config.max_chunk_chars;

        if dialogue::is_dialogue(text) {
            let script = dialogue::parse(text);
            if !script.diagnostics.is_empty() {
                log::info!(
                    "Dialogue script: {} lines accepted, {} issues",
                    script.lines.len(),
                    script.diagnostics.len()
                );
            }
            let units = dialogue_units(&script.lines, voice, max_chars);
            if units.is_empty() {
                return Err(NarrateError::NoDialogueLines);
            }
            Ok((ScriptMode::Dialogue, units))
        } else {
            let units = monologue_units(text, voice, max_chars);
            if units.is_empty() {
                return Err(NarrateError::EmptyInput);
            }
            Ok((ScriptMode::Monologue, units))
        }
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}
