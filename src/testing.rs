//! Test doubles shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::{EngineError, Speaker, SpeakerStyle, SynthesisEngine, VoiceParams};

pub const TEST_SAMPLE_RATE: u32 = 24_000;

/// Encode 16-bit mono samples as an in-memory WAV file.
pub fn wav_bytes(sample_rate: u32, channels: u16, samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// WAV whose samples are the UTF-8 bytes of `text`, so tests can tell which
/// unit produced which stretch of audio.
pub fn tagged_wav(text: &str) -> Vec<u8> {
    let samples: Vec<i16> = text.bytes().map(i16::from).collect();
    wav_bytes(TEST_SAMPLE_RATE, 1, &samples)
}

/// Inverse of [`tagged_wav`], also valid for concatenations of tagged buffers.
pub fn decode_tags(wav: &[u8]) -> String {
    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let bytes: Vec<u8> = reader
        .into_samples::<i16>()
        .map(|s| s.unwrap() as u8)
        .collect();
    String::from_utf8(bytes).unwrap()
}

/// Engine that answers every call with [`tagged_wav`] after an optional
/// per-text delay, or fails for texts marked as failing.
#[derive(Default)]
pub struct ScriptedEngine {
    delays: HashMap<String, u64>,
    failing: HashSet<String>,
    padding: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, text: &str, millis: u64) -> Self {
        self.delays.insert(text.to_string(), millis);
        self
    }

    pub fn with_failure(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// Append `samples` of silence to every buffer.
    pub fn with_padding(mut self, samples: usize) -> Self {
        self.padding = samples;
        self
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SynthesisEngine for ScriptedEngine {
    async fn synthesize(&self, text: &str, _voice: &VoiceParams) -> Result<Vec<u8>, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(&millis) = self.delays.get(text) {
            tokio::time::sleep(Duration::from_millis(millis)).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(text) {
            return Err(EngineError::Status {
                status: 500,
                body: format!("cannot synthesize {text:?}"),
            });
        }
        if self.padding == 0 {
            return Ok(tagged_wav(text));
        }
        let mut samples: Vec<i16> = text.bytes().map(i16::from).collect();
        samples.resize(samples.len() + self.padding, 0);
        Ok(wav_bytes(TEST_SAMPLE_RATE, 1, &samples))
    }

    async fn speakers(&self) -> Result<Vec<Speaker>, EngineError> {
        Ok(vec![Speaker {
            name: "Test Speaker".to_string(),
            speaker_uuid: "00000000-0000-0000-0000-000000000000".to_string(),
            styles: vec![SpeakerStyle {
                name: "normal".to_string(),
                id: 1,
            }],
        }])
    }
}
