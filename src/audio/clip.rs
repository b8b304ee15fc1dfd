use std::path::Path;

use hound::{SampleFormat, WavReader};
use tracing::debug;

use super::extract::{decode_to_wav, is_wav};
use super::AudioBuffer;
use crate::error::{NarrateError, Result};

/// Read a WAV file into 16-bit PCM, keeping its own sample rate and channels.
pub fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let reader = WavReader::open(path).map_err(|e| {
        NarrateError::AudioDecode(format!("Failed to open WAV {}: {e}", path.display()))
    })?;

    let spec = reader.spec();
    let decode_err =
        |e: hound::Error| NarrateError::AudioDecode(format!("{}: {e}", path.display()));

    let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_err)?,
        (SampleFormat::Int, 8) => reader
            .into_samples::<i8>()
            .map(|s| s.map(|v| (v as i16) << 8))
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_err)?,
        (SampleFormat::Int, bits) if bits > 16 && bits <= 32 => {
            let shift = bits - 16;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<std::result::Result<_, _>>()
                .map_err(decode_err)?
        }
        (SampleFormat::Float, _) => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_err)?,
        (_, bits) => {
            return Err(NarrateError::AudioDecode(format!(
                "{}: unsupported bit depth {}",
                path.display(),
                bits
            )))
        }
    };

    Ok(AudioBuffer {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Load a synthesized clip in the layout of the track being rendered.
///
/// WAV files already in that layout are read directly. Anything else goes
/// through FFmpeg, which only converts the sample format and never changes
/// the clip's duration.
pub fn load_clip(path: &Path, sample_rate: u32, channels: u16) -> Result<AudioBuffer> {
    if !path.exists() {
        return Err(NarrateError::FileNotFound(path.display().to_string()));
    }

    if is_wav(path) {
        let buffer = read_wav(path)?;
        if buffer.same_layout(sample_rate, channels) {
            return Ok(buffer);
        }
        debug!(
            "Clip {} is {} Hz / {} ch, converting",
            path.display(),
            buffer.sample_rate,
            buffer.channels
        );
    }

    let converted = tempfile::Builder::new()
        .prefix("narrate_clip_")
        .suffix(".wav")
        .tempfile()?;
    decode_to_wav(path, converted.path(), sample_rate, channels)?;
    read_wav(converted.path())
}
