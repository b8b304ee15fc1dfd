use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use hound::WavWriter;
use regex::Regex;
use tempfile::NamedTempFile;
use tracing::info;

use crate::audio::{encode_mp3, AudioBuffer};
use crate::config::AudioFormat;
use crate::error::{NarrateError, Result};

/// Make a base name safe to use in a file name.
pub fn clean_filename(name: &str) -> String {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    static REPEATED: OnceLock<Regex> = OnceLock::new();

    let invalid = INVALID.get_or_init(|| Regex::new(r"[^\w\-.]").expect("Invalid regex"));
    let repeated = REPEATED.get_or_init(|| Regex::new(r"_+").expect("Invalid regex"));

    let replaced = invalid.replace_all(name, "_");
    let collapsed = repeated.replace_all(&replaced, "_");
    let cleaned = collapsed.trim_matches(|c| c == '_' || c == '-');

    if cleaned.is_empty() {
        "narration".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `<dir>/<base>_narrated_audio.<ext>`
pub fn output_path(output_dir: &Path, base_name: &str, format: AudioFormat) -> PathBuf {
    output_dir.join(format!(
        "{}_narrated_audio.{}",
        clean_filename(base_name),
        format.extension()
    ))
}

/// Write the rendered track and return its published path.
///
/// `format` is matched case-insensitively against `mp3` and `wav`. The file
/// is written next to its destination and renamed into place only once
/// complete, so a failed export never leaves a partial file behind.
pub fn export(
    buffer: &AudioBuffer,
    output_dir: &Path,
    base_name: &str,
    format: &str,
    mp3_bitrate: &str,
) -> Result<PathBuf> {
    let format: AudioFormat = format.parse()?;
    let path = output_path(output_dir, base_name, format);
    let export_err = |source: io::Error| NarrateError::Export {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(output_dir).map_err(export_err)?;

    let wav = write_wav_temp(buffer, output_dir).map_err(export_err)?;

    let staged = match format {
        AudioFormat::Wav => wav,
        AudioFormat::Mp3 => {
            let mp3 = tempfile::Builder::new()
                .prefix(".narrate_")
                .suffix(".mp3")
                .tempfile_in(output_dir)
                .map_err(export_err)?;
            encode_mp3(wav.path(), mp3.path(), mp3_bitrate)
                .map_err(|e| export_err(io::Error::other(e.to_string())))?;
            mp3
        }
    };

    staged.persist(&path).map_err(|e| export_err(e.error))?;

    info!(
        "Exported {:.3}s of narration to {}",
        buffer.duration_secs(),
        path.display()
    );
    Ok(path)
}

fn write_wav_temp(buffer: &AudioBuffer, dir: &Path) -> io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(".narrate_")
        .suffix(".wav")
        .tempfile_in(dir)?;

    let mut writer =
        WavWriter::new(BufWriter::new(file.as_file_mut()), buffer.wav_spec()).map_err(hound_io)?;
    for &sample in &buffer.samples {
        writer.write_sample(sample).map_err(hound_io)?;
    }
    writer.finalize().map_err(hound_io)?;

    Ok(file)
}

fn hound_io(err: hound::Error) -> io::Error {
    match err {
        hound::Error::IoError(e) => e,
        other => io::Error::other(other.to_string()),
    }
}
