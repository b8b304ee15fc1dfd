use std::path::Path;
use std::process::Command;

use hound::WavReader;
use tracing::debug;

use crate::error::{NarrateError, Result};

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| {
            NarrateError::Media(format!(
                "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(NarrateError::Media("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map_err(|e| {
            NarrateError::Media(format!(
                "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(NarrateError::Media("FFprobe check failed".to_string()));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Get the duration of any media file in seconds using FFprobe.
pub fn probe_duration(input: &Path) -> Result<f64> {
    if !input.exists() {
        return Err(NarrateError::FileNotFound(input.display().to_string()));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| NarrateError::Media(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(NarrateError::Media(format!("FFprobe failed: {stderr}")));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    duration_str.trim().parse::<f64>().map_err(|e| {
        NarrateError::Media(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })
}

/// Duration of a WAV file in seconds, read from its header.
pub fn wav_duration(input: &Path) -> Result<f64> {
    let reader = WavReader::open(input).map_err(|e| {
        NarrateError::AudioDecode(format!("Failed to open WAV {}: {e}", input.display()))
    })?;
    let spec = reader.spec();
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

/// Media duration in seconds, reading WAV headers directly and probing anything else.
pub fn media_duration(input: &Path) -> Result<f64> {
    if is_wav(input) {
        wav_duration(input)
    } else {
        probe_duration(input)
    }
}

pub(crate) fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Decode any audio file into 16-bit PCM WAV with the given layout.
pub fn decode_to_wav(input: &Path, output: &Path, sample_rate: u32, channels: u16) -> Result<()> {
    if !input.exists() {
        return Err(NarrateError::FileNotFound(input.display().to_string()));
    }

    debug!(
        "Decoding {} to {} Hz / {} ch WAV",
        input.display(),
        sample_rate,
        channels
    );

    let output_status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar"])
        .arg(sample_rate.to_string())
        .arg("-ac")
        .arg(channels.to_string())
        .args(["-f", "wav"])
        .arg(output)
        .output()
        .map_err(|e| NarrateError::AudioDecode(format!("Failed to run FFmpeg: {e}")))?;

    if !output_status.status.success() {
        let stderr = String::from_utf8_lossy(&output_status.stderr);
        return Err(NarrateError::AudioDecode(format!(
            "FFmpeg could not decode {}: {}",
            input.display(),
            stderr.trim()
        )));
    }

    Ok(())
}

/// Encode a WAV file to MP3 at a fixed bitrate.
pub fn encode_mp3(input: &Path, output: &Path, bitrate: &str) -> Result<()> {
    debug!("Encoding {} to MP3 at {}", input.display(), bitrate);

    let output_status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(input)
        .args(["-vn", "-codec:a", "libmp3lame", "-b:a", bitrate, "-f", "mp3"])
        .arg(output)
        .output()
        .map_err(|e| NarrateError::Media(format!("Failed to run FFmpeg: {e}")))?;

    if !output_status.status.success() {
        let stderr = String::from_utf8_lossy(&output_status.stderr);
        return Err(NarrateError::Media(format!(
            "FFmpeg MP3 encoding failed: {}",
            stderr.trim()
        )));
    }

    Ok(())
}
