use tracing::{debug, info};

use super::{degrade, TimelineItem};
use crate::audio::{load_clip, AudioBuffer};

/// Length of the track rendered from an empty timeline.
pub const PLACEHOLDER_MS: u64 = 10;

fn silence_ms(duration_sec: f64) -> u64 {
    if duration_sec.is_finite() && duration_sec > 0.0 {
        (duration_sec * 1000.0).floor() as u64
    } else {
        0
    }
}

/// Concatenate the timeline into one buffer, in order.
///
/// Clips are appended as decoded, without stretching. A clip that fails to
/// load is replaced by silence of its nominal length.
pub fn render(items: &[TimelineItem], sample_rate: u32, channels: u16) -> AudioBuffer {
    if items.is_empty() {
        info!("Timeline is empty, rendering {}ms placeholder", PLACEHOLDER_MS);
        return AudioBuffer::silent(PLACEHOLDER_MS, sample_rate, channels);
    }

    let mut buffer = AudioBuffer::empty(sample_rate, channels);
    for item in items {
        append_item(&mut buffer, item);
    }

    info!(
        "Rendered {} timeline items into {:.3}s of audio",
        items.len(),
        buffer.duration_secs()
    );
    buffer
}

fn append_item(buffer: &mut AudioBuffer, item: &TimelineItem) {
    match item {
        TimelineItem::Silence { duration_sec } => {
            buffer.append_silence(silence_ms(*duration_sec));
        }
        TimelineItem::Speech {
            duration_sec,
            audio_file_path,
        } => match load_clip(audio_file_path, buffer.sample_rate, buffer.channels) {
            Ok(clip) => {
                debug!(
                    "Appending {} ({:.3}s)",
                    audio_file_path.display(),
                    clip.duration_secs()
                );
                buffer.append(&clip);
            }
            Err(e) => {
                if let Some(substitute) =
                    degrade(audio_file_path.display(), e, Some(*duration_sec))
                {
                    append_item(buffer, &substitute);
                }
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::path::{Path, PathBuf};

    fn write_tone(path: &Path, millis: u32) {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 24_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for i in 0..(millis * 24) {
            writer.write_sample(((i % 50) as i16) + 1).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_empty_timeline_renders_placeholder() {
        let buffer = render(&[], 24_000, 1);
        assert_eq!(buffer.duration_ms(), PLACEHOLDER_MS);
        assert!(buffer.samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_silence_is_floored_to_milliseconds() {
        let items = vec![TimelineItem::Silence {
            duration_sec: 0.2509,
        }];
        let buffer = render(&items, 24_000, 1);
        assert_eq!(buffer.duration_ms(), 250);
    }

    #[test]
    fn test_speech_is_appended_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("one.wav");
        write_tone(&clip, 500);

        let items = vec![
            TimelineItem::Silence { duration_sec: 0.1 },
            TimelineItem::Speech {
                // Nominal length differs from the file; the file wins.
                duration_sec: 2.0,
                audio_file_path: clip,
            },
        ];
        let buffer = render(&items, 24_000, 1);

        assert_eq!(buffer.duration_ms(), 600);
        assert!(buffer.samples[..2400].iter().all(|&s| s == 0));
        assert_eq!(buffer.samples[2400], 1);
    }

    #[test]
    fn test_undecodable_clip_becomes_silence() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.wav");
        std::fs::write(&broken, b"not audio").unwrap();

        let items = vec![
            TimelineItem::Speech {
                duration_sec: 1.5,
                audio_file_path: broken,
            },
            TimelineItem::Speech {
                duration_sec: 0.25,
                audio_file_path: PathBuf::from("/nonexistent/gone.wav"),
            },
        ];
        let buffer = render(&items, 24_000, 1);
        assert_eq!(buffer.duration_ms(), 1750);
    }
}
