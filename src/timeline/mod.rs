pub mod export;
pub mod render;

pub use export::{clean_filename, export, output_path};
pub use render::render;

use std::fmt::Display;
use std::fs::File;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::script::ValidatedSegment;
use crate::tts::TtsResults;

/// Gaps shorter than this are absorbed instead of emitting silence.
pub const MIN_GAP_SECS: f64 = 0.01;

/// Overlap beyond this is reported. It is never corrected here.
pub const OVERLAP_WARN_SECS: f64 = 0.1;

/// One ordered unit of the narration track.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineItem {
    Silence { duration_sec: f64 },
    Speech { duration_sec: f64, audio_file_path: PathBuf },
}

impl TimelineItem {
    pub fn duration_sec(&self) -> f64 {
        match self {
            TimelineItem::Silence { duration_sec } => *duration_sec,
            TimelineItem::Speech { duration_sec, .. } => *duration_sec,
        }
    }
}

/// Shared recovery for clips that cannot be used.
///
/// Logs the cause and returns the replacement item: nothing when
/// `substitute` is `None`, otherwise silence of that length.
pub(crate) fn degrade(
    what: impl Display,
    cause: impl Display,
    substitute: Option<f64>,
) -> Option<TimelineItem> {
    match substitute {
        None => {
            warn!("{}: {}, skipping", what, cause);
            None
        }
        Some(duration_sec) => {
            warn!(
                "{}: {}, substituting {:.3}s of silence",
                what, cause, duration_sec
            );
            Some(TimelineItem::Silence { duration_sec })
        }
    }
}

/// Interleave speech clips and silence so each clip starts at its segment.
///
/// The synthesized duration, not the scripted one, advances the running
/// position, so later segments may drift from the script.
pub fn build_timeline(segments: &[ValidatedSegment], tts: &TtsResults) -> Vec<TimelineItem> {
    let mut ordered: Vec<&ValidatedSegment> = segments.iter().collect();
    ordered.sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));

    let mut items = Vec::with_capacity(ordered.len() * 2);
    let mut current_sec = 0.0_f64;

    for segment in ordered {
        let what = format!("Segment {}", segment.id);

        let Some(result) = tts.get(&segment.id) else {
            items.extend(degrade(&what, "no synthesized speech", None));
            continue;
        };

        let gap = segment.start_sec - current_sec;
        if gap > MIN_GAP_SECS {
            items.push(TimelineItem::Silence { duration_sec: gap });
        } else if gap < -OVERLAP_WARN_SECS {
            warn!(
                "{} overlaps previous speech by {:.3}s",
                what,
                -gap
            );
        }
        current_sec = segment.start_sec;

        match File::open(&result.audio_file_path) {
            Ok(_) => items.push(TimelineItem::Speech {
                duration_sec: result.duration_sec,
                audio_file_path: result.audio_file_path.clone(),
            }),
            Err(e) => items.extend(degrade(
                format!("{} ({})", what, result.audio_file_path.display()),
                e,
                Some(result.duration_sec),
            )),
        }

        current_sec += result.duration_sec;
    }

    debug!(
        "Built timeline with {} items, {:.3}s nominal",
        items.len(),
        total_duration(&items)
    );
    items
}

/// Sum of item durations.
pub fn total_duration(items: &[TimelineItem]) -> f64 {
    items.iter().map(TimelineItem::duration_sec).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::TtsResult;
    use std::path::Path;

    fn segment(id: usize, start: f64, end: f64) -> ValidatedSegment {
        ValidatedSegment {
            id,
            start_sec: start,
            end_sec: end,
            text: format!("Line {}", id),
        }
    }

    fn result(id: usize, path: &Path, duration: f64) -> TtsResult {
        TtsResult {
            segment_id: id,
            audio_file_path: path.to_path_buf(),
            duration_sec: duration,
            text_segment: String::new(),
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_gaps_become_silence() {
        let dir = tempfile::tempdir().unwrap();
        let segments = vec![segment(1, 1.0, 4.0), segment(2, 5.0, 9.5), segment(3, 10.0, 12.0)];
        let mut tts = TtsResults::new();
        for (id, d) in [(1, 3.0), (2, 4.5), (3, 2.0)] {
            let path = touch(dir.path(), &format!("{}.wav", id));
            tts.insert(id, result(id, &path, d));
        }

        let items = build_timeline(&segments, &tts);
        let kinds: Vec<bool> = items
            .iter()
            .map(|i| matches!(i, TimelineItem::Speech { .. }))
            .collect();

        assert_eq!(kinds, vec![false, true, false, true, false, true]);
        assert!((total_duration(&items) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_result_is_skipped_without_gap() {
        let dir = tempfile::tempdir().unwrap();
        let path = touch(dir.path(), "1.wav");
        let segments = vec![segment(1, 0.0, 2.0), segment(2, 2.0, 4.0)];
        let mut tts = TtsResults::new();
        tts.insert(1, result(1, &path, 2.0));

        let items = build_timeline(&segments, &tts);
        assert_eq!(items.len(), 1);
        assert!((total_duration(&items) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_unreadable_file_becomes_silence() {
        let segments = vec![segment(1, 0.0, 2.0)];
        let mut tts = TtsResults::new();
        tts.insert(1, result(1, Path::new("/nonexistent/1.wav"), 1.75));

        let items = build_timeline(&segments, &tts);
        assert_eq!(items, vec![TimelineItem::Silence { duration_sec: 1.75 }]);
    }

    #[test]
    fn test_small_gap_and_overlap_emit_no_silence() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.wav");
        let b = touch(dir.path(), "b.wav");
        let segments = vec![segment(1, 0.005, 1.0), segment(2, 1.0, 2.0)];
        let mut tts = TtsResults::new();
        tts.insert(1, result(1, &a, 1.5));
        tts.insert(2, result(2, &b, 1.0));

        let items = build_timeline(&segments, &tts);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| matches!(i, TimelineItem::Speech { .. })));
    }

    #[test]
    fn test_segments_sorted_by_start() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.wav");
        let b = touch(dir.path(), "b.wav");
        let segments = vec![segment(2, 3.0, 4.0), segment(1, 0.0, 1.0)];
        let mut tts = TtsResults::new();
        tts.insert(1, result(1, &a, 1.0));
        tts.insert(2, result(2, &b, 1.0));

        let items = build_timeline(&segments, &tts);
        assert_eq!(
            items[0],
            TimelineItem::Speech {
                duration_sec: 1.0,
                audio_file_path: a
            }
        );
        assert_eq!(items[1], TimelineItem::Silence { duration_sec: 2.0 });
    }

    #[test]
    fn test_degrade_without_substitute() {
        assert_eq!(degrade("x", "y", None), None);
        assert_eq!(
            degrade("x", "y", Some(0.5)),
            Some(TimelineItem::Silence { duration_sec: 0.5 })
        );
    }
}
