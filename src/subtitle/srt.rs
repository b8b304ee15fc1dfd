// SRT subtitle format
use super::{clean_cue_text, SubtitleFormatter};
use crate::script::{format_timestamp, ValidatedSegment};

pub struct SrtFormatter;

impl SubtitleFormatter for SrtFormatter {
    fn format(&self, segments: &[ValidatedSegment]) -> String {
        segments
            .iter()
            .map(|segment| {
                format!(
                    "{}\n{} --> {}\n{}\n",
                    segment.id,
                    format_timestamp(segment.start_sec, ','),
                    format_timestamp(segment.end_sec, ','),
                    clean_cue_text(&segment.text)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn extension(&self) -> &'static str {
        "srt"
    }
}

/// Render validated segments as SubRip text. The cue index is the segment id.
pub fn to_srt(segments: &[ValidatedSegment]) -> String {
    SrtFormatter.format(segments)
}
