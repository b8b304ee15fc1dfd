pub mod srt;
pub mod vtt;

pub use srt::{to_srt, SrtFormatter};
pub use vtt::VttFormatter;

use crate::config::SubtitleFormat;
use crate::script::ValidatedSegment;

/// Longest cue text written to a subtitle file, in characters.
pub const MAX_CUE_CHARS: usize = 250;

pub trait SubtitleFormatter {
    fn format(&self, segments: &[ValidatedSegment]) -> String;
    fn extension(&self) -> &'static str;
}

pub fn create_formatter(format: SubtitleFormat) -> Box<dyn SubtitleFormatter> {
    match format {
        SubtitleFormat::Srt => Box::new(SrtFormatter),
        SubtitleFormat::Vtt => Box::new(VttFormatter),
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Trim every line, drop blank ones, and cap the cue length.
///
/// Lone `\r` and the Unicode line and paragraph separators break lines too.
pub(crate) fn clean_cue_text(text: &str) -> String {
    let joined = text
        .split(is_line_break)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    joined.chars().take(MAX_CUE_CHARS).collect()
}
