pub mod reconcile;
pub mod timestamp;

pub use reconcile::{reconcile, ReconcileState};
pub use timestamp::{format_timestamp, parse_timestamp};

use serde::{Deserialize, Serialize};

/// Minimum duration given to a segment whose timing had to be repaired.
pub const MIN_SEGMENT_SECS: f64 = 0.1;

/// Overlap with the previous segment that is accepted without correction.
pub const OVERLAP_TOLERANCE_SECS: f64 = 0.5;

/// How far past the end of the video a segment may run before it is clamped.
pub const DURATION_LEEWAY_SECS: f64 = 5.0;

/// A narration unit with repaired timing, ready for subtitles and speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedSegment {
    /// 1-based position of the element in the raw script, counting dropped ones.
    pub id: usize,
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
}

impl ValidatedSegment {
    pub fn duration_sec(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}
