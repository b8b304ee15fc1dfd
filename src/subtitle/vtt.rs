// WebVTT subtitle format
use super::{clean_cue_text, SubtitleFormatter};
use crate::script::{format_timestamp, ValidatedSegment};

pub struct VttFormatter;

impl SubtitleFormatter for VttFormatter {
    fn format(&self, segments: &[ValidatedSegment]) -> String {
        let mut output = String::from("WEBVTT\n\n");

        for segment in segments {
            output.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                segment.id,
                format_timestamp(segment.start_sec, '.'),
                format_timestamp(segment.end_sec, '.'),
                clean_cue_text(&segment.text)
            ));
        }

        output
    }

    fn extension(&self) -> &'static str {
        "vtt"
    }
}
