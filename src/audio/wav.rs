use std::fmt;
use std::io::Cursor;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{NarrateError, Result};

/// Format descriptor of a PCM WAV buffer. Buffers are only concatenated when
/// every field matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub sample_format: SampleFormat,
}

impl From<WavSpec> for WavFormat {
    fn from(spec: WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: spec.sample_format,
        }
    }
}

impl From<WavFormat> for WavSpec {
    fn from(format: WavFormat) -> Self {
        WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: format.bits_per_sample,
            sample_format: format.sample_format,
        }
    }
}

impl fmt::Display for WavFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.sample_format {
            SampleFormat::Int => "int",
            SampleFormat::Float => "float",
        };
        write!(
            f,
            "{}ch/{}Hz/{}-bit {kind}",
            self.channels, self.sample_rate, self.bits_per_sample
        )
    }
}

/// Decoded sample payload. Integer PCM of any width is widened to `i32`.
enum Samples {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

/// Read only the header of a WAV buffer.
pub fn read_format(bytes: &[u8]) -> Result<WavFormat> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    Ok(reader.spec().into())
}

/// Duration of a WAV buffer in seconds.
pub fn duration_secs(bytes: &[u8]) -> Result<f64> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    let sample_rate = reader.spec().sample_rate;
    if sample_rate == 0 {
        return Ok(0.0);
    }
    Ok(reader.duration() as f64 / sample_rate as f64)
}

/// Concatenate WAV buffers into one, in the given order.
///
/// A single buffer is returned untouched, without even reading its header.
/// Otherwise the first buffer's format
/// is authoritative: every header is checked before any sample is decoded, so
/// a mismatch fails without building a partial result. Each input buffer is
/// dropped as soon as its samples have been appended.
pub fn combine(buffers: Vec<Vec<u8>>) -> Result<Vec<u8>> {
    if buffers.len() <= 1 {
        return buffers.into_iter().next().ok_or(NarrateError::EmptyBuffers);
    }

    let mut formats = Vec::with_capacity(buffers.len());
    for bytes in &buffers {
        formats.push(read_format(bytes)?);
    }
    let format = formats[0];
    if let Some((index, &found)) = formats.iter().enumerate().find(|(_, f)| **f != format) {
        return Err(NarrateError::FormatMismatch {
            index,
            expected: format,
            found,
        });
    }

    let count = buffers.len();
    let mut merged = match format.sample_format {
        SampleFormat::Int => Samples::Int(Vec::new()),
        SampleFormat::Float => Samples::Float(Vec::new()),
    };
    for bytes in buffers {
        let mut reader = WavReader::new(Cursor::new(bytes.as_slice()))?;
        match &mut merged {
            Samples::Int(out) => {
                out.reserve(reader.len() as usize);
                for sample in reader.samples::<i32>() {
                    out.push(sample?);
                }
            }
            Samples::Float(out) => {
                out.reserve(reader.len() as usize);
                for sample in reader.samples::<f32>() {
                    out.push(sample?);
                }
            }
        }
    }

    let encoded = encode(format, &merged)?;
    log::debug!(
        "Combined {count} buffers into {} bytes ({format})",
        encoded.len()
    );
    Ok(encoded)
}

fn encode(format: WavFormat, samples: &Samples) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, format.into())?;
        match samples {
            Samples::Int(values) => {
                for &value in values {
                    writer.write_sample(value)?;
                }
            }
            Samples::Float(values) => {
                for &value in values {
                    writer.write_sample(value)?;
                }
            }
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{decode_tags, tagged_wav, wav_bytes, TEST_SAMPLE_RATE};

    #[test]
    fn single_buffer_passes_through_unchanged() {
        let buffer = tagged_wav("solo");
        assert_eq!(combine(vec![buffer.clone()]).unwrap(), buffer);
    }

    #[test]
    fn single_non_wav_buffer_is_not_parsed() {
        let payload = b"ID3\x03\x00\x00\x00\x00\x00\x00compressed-frame".to_vec();
        assert_eq!(combine(vec![payload.clone()]).unwrap(), payload);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(combine(Vec::new()), Err(NarrateError::EmptyBuffers)));
    }

    #[test]
    fn concatenates_samples_in_order() {
        let merged = combine(vec![tagged_wav("ab"), tagged_wav("cd"), tagged_wav("e")]).unwrap();
        assert_eq!(decode_tags(&merged), "abcde");
        assert_eq!(read_format(&merged).unwrap().sample_rate, TEST_SAMPLE_RATE);
    }

    #[test]
    fn rejects_mismatched_sample_rate() {
        let first = wav_bytes(24_000, 1, &[1, 2, 3]);
        let second = wav_bytes(44_100, 1, &[4, 5, 6]);
        match combine(vec![first, second]) {
            Err(NarrateError::FormatMismatch {
                index,
                expected,
                found,
            }) => {
                assert_eq!(index, 1);
                assert_eq!(expected.sample_rate, 24_000);
                assert_eq!(found.sample_rate, 44_100);
            }
            other => panic!("expected format mismatch, got {other:?}"),
        }
    }

    #[test]
    fn rejects_mismatched_channel_count_at_later_index() {
        let mono = wav_bytes(24_000, 1, &[0; 4]);
        let stereo = wav_bytes(24_000, 2, &[0; 4]);
        let err = combine(vec![mono.clone(), mono, stereo]).unwrap_err();
        assert!(matches!(err, NarrateError::FormatMismatch { index: 2, .. }));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = combine(vec![b"not a wav".to_vec(), tagged_wav("x")]).unwrap_err();
        assert!(matches!(err, NarrateError::Wav(_)));
    }

    #[test]
    fn duration_counts_frames_not_samples() {
        let stereo = wav_bytes(8_000, 2, &[0; 16_000]);
        assert!((duration_secs(&stereo).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn float_buffers_round_trip_through_combine() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let make = |values: &[f32]| {
            let mut cursor = Cursor::new(Vec::new());
            {
                let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
                for &v in values {
                    writer.write_sample(v).unwrap();
                }
                writer.finalize().unwrap();
            }
            cursor.into_inner()
        };

        let merged = combine(vec![make(&[0.25, -0.5]), make(&[0.75])]).unwrap();
        let samples: Vec<f32> = WavReader::new(Cursor::new(merged))
            .unwrap()
            .into_samples::<f32>()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples, vec![0.25, -0.5, 0.75]);
    }
}
