//! Concurrent fan-out of synthesis units with order-preserving fan-in.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{EngineError, NarrateError, Result};
use crate::text::{segment, DialogueLine};
use crate::{SynthesisEngine, VoiceParams};

/// Position of a unit in the final audio: by line, then by chunk within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceKey {
    pub line: usize,
    pub chunk: usize,
}

impl SequenceKey {
    pub fn new(line: usize, chunk: usize) -> Self {
        Self { line, chunk }
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.line, self.chunk)
    }
}

/// One chunk of text scheduled for a single synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisUnit {
    pub key: SequenceKey,
    pub text: String,
    pub voice: VoiceParams,
}

/// Audio returned for one unit.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub key: SequenceKey,
    pub audio: Vec<u8>,
}

/// Units for a monologue: one line, one unit per non-blank chunk.
pub fn monologue_units(
    text: &str,
    voice: &VoiceParams,
    max_chunk_chars: usize,
) -> Vec<SynthesisUnit> {
    units_for_line(0, text, voice, max_chunk_chars)
}

/// Units for a dialogue script. Each line is segmented on its own and every
/// chunk inherits the line's resolved voice.
pub fn dialogue_units(
    lines: &[DialogueLine],
    defaults: &VoiceParams,
    max_chunk_chars: usize,
) -> Vec<SynthesisUnit> {
    lines
        .iter()
        .flat_map(|line| {
            units_for_line(line.line_index, &line.text, &line.voice(defaults), max_chunk_chars)
        })
        .collect()
}

fn units_for_line(
    line: usize,
    text: &str,
    voice: &VoiceParams,
    max_chunk_chars: usize,
) -> Vec<SynthesisUnit> {
    segment(text, max_chunk_chars)
        .into_iter()
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .enumerate()
        .map(|(chunk, text)| SynthesisUnit {
            key: SequenceKey::new(line, chunk),
            text: text.to_string(),
            voice: *voice,
        })
        .collect()
}

/// Dispatches units to an engine concurrently and returns results in key order.
///
/// At most `max_concurrency` calls are in flight. Each call is bounded by
/// `request_timeout`. The first failing unit aborts every outstanding call
/// and fails the whole run.
pub struct Orchestrator {
    engine: Arc<dyn SynthesisEngine>,
    max_concurrency: usize,
    request_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn SynthesisEngine>,
        max_concurrency: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            max_concurrency: max_concurrency.max(1),
            request_timeout,
        }
    }

    pub async fn run(&self, units: Vec<SynthesisUnit>) -> Result<Vec<SynthesisResult>> {
        let total = units.len();
        log::info!(
            "Dispatching {total} synthesis units (max {} in flight)",
            self.max_concurrency
        );

        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for unit in units {
            let engine = Arc::clone(&self.engine);
            let permits = Arc::clone(&permits);
            let timeout = self.request_timeout;

            tasks.spawn(async move {
                let key = unit.key;
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| NarrateError::TaskFailed(e.to_string()))?;

                log::debug!("unit {key}: synthesizing {} chars", unit.text.chars().count());
                let call = engine.synthesize(&unit.text, &unit.voice);
                let audio = tokio::time::timeout(timeout, call)
                    .await
                    .unwrap_or(Err(EngineError::Timeout(timeout)))
                    .map_err(|source| NarrateError::Synthesis { key, source })?;
                log::debug!("unit {key}: received {} bytes", audio.len());

                Ok::<_, NarrateError>(SynthesisResult { key, audio })
            });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| NarrateError::TaskFailed(e.to_string()));
            match outcome.and_then(|result| result) {
                Ok(result) => results.push(result),
                Err(e) => {
                    log::error!("Synthesis run aborted: {e}");
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        results.sort_by_key(|result| result.key);
        log::info!("All {total} synthesis units completed");
        Ok(results)
    }
}
