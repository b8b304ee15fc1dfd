use super::timestamp::parse_timestamp;
use super::{
    ValidatedSegment, DURATION_LEEWAY_SECS, MIN_SEGMENT_SECS, OVERLAP_TOLERANCE_SECS,
};
use crate::error::{NarrateError, Result};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

const REQUIRED_KEYS: [&str; 3] = ["start_time", "end_time", "narration_text"];

/// One untrusted script element after its shape has been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    pub start_time: String,
    pub end_time: String,
    pub narration_text: String,
}

impl RawSegment {
    /// Check that `value` is an object carrying the three string fields.
    fn from_value(segment: usize, value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| NarrateError::SegmentSchema {
            segment,
            message: format!("expected an object, got {}", json_kind(value)),
        })?;

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(NarrateError::SegmentSchema {
                segment,
                message: format!("missing keys: {}", missing.join(", ")),
            });
        }

        let start_time = string_field(segment, object, "start_time")?;
        let end_time = string_field(segment, object, "end_time")?;
        let narration_text = string_field(segment, object, "narration_text")?;

        Ok(Self {
            start_time,
            end_time,
            narration_text,
        })
    }
}

fn string_field(segment: usize, object: &Map<String, Value>, key: &str) -> Result<String> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(NarrateError::SegmentSchema {
            segment,
            message: format!("{} must be a string, got {}", key, json_kind(other)),
        }),
        None => Err(NarrateError::SegmentSchema {
            segment,
            message: format!("missing keys: {}", key),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Carry threaded through the reconciliation fold.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReconcileState {
    /// End time of the most recently emitted segment.
    pub last_end_sec: f64,
}

impl ReconcileState {
    /// Repair one segment's timing and return it with the next carry.
    ///
    /// Corrections are local: the segment may move forward to clear the
    /// previous one, but emitted segments are never revisited.
    pub fn correct(
        self,
        id: usize,
        mut start_sec: f64,
        mut end_sec: f64,
        text: String,
        video_duration_sec: f64,
    ) -> Result<(ValidatedSegment, ReconcileState)> {
        if start_sec < 0.0 {
            warn!(
                "Segment {}: start time ({:.3}s) is negative, clamping to 0",
                id, start_sec
            );
            start_sec = 0.0;
        }
        if end_sec < 0.0 {
            warn!(
                "Segment {}: end time ({:.3}s) is negative, giving it a minimal duration",
                id, end_sec
            );
            end_sec = start_sec + MIN_SEGMENT_SECS;
        }

        if start_sec >= end_sec {
            if end_sec >= start_sec - MIN_SEGMENT_SECS {
                warn!(
                    "Segment {}: start time ({:.3}s) is not before end time ({:.3}s), extending end",
                    id, start_sec, end_sec
                );
                end_sec = start_sec + MIN_SEGMENT_SECS;
            } else {
                return Err(NarrateError::SegmentOrdering {
                    segment: id,
                    start: start_sec,
                    end: end_sec,
                });
            }
        }

        if end_sec >= video_duration_sec + DURATION_LEEWAY_SECS {
            warn!(
                "Segment {}: end time ({:.3}s) runs {}s or more past the video ({:.3}s), clamping",
                id, end_sec, DURATION_LEEWAY_SECS, video_duration_sec
            );
            end_sec = video_duration_sec;
            if start_sec >= end_sec {
                start_sec = (end_sec - MIN_SEGMENT_SECS).max(0.0);
            }
        }

        if start_sec < self.last_end_sec - OVERLAP_TOLERANCE_SECS {
            warn!(
                "Segment {}: start time ({:.3}s) overlaps previous segment ending at {:.3}s, moving start",
                id, start_sec, self.last_end_sec
            );
            start_sec = self.last_end_sec;
            if start_sec >= end_sec {
                end_sec = start_sec + MIN_SEGMENT_SECS;
            }
        }

        let segment = ValidatedSegment {
            id,
            start_sec,
            end_sec,
            text,
        };
        Ok((segment, ReconcileState { last_end_sec: end_sec }))
    }
}

/// Parse and repair a raw narration script.
///
/// `raw_json` must be a JSON array of objects with string `start_time`,
/// `end_time` and `narration_text` fields. Elements whose text is blank are
/// dropped, but ids keep counting every input element. Any schema, timestamp
/// or ordering problem aborts the whole call.
pub fn reconcile(raw_json: &str, video_duration_sec: f64) -> Result<Vec<ValidatedSegment>> {
    if !video_duration_sec.is_finite() || video_duration_sec <= 0.0 {
        return Err(NarrateError::InvalidVideoDuration(video_duration_sec));
    }

    info!("Parsing and validating narration script");

    let root: Value = serde_json::from_str(raw_json).map_err(|e| {
        error!("Invalid JSON in narration script: {}", e);
        debug!(
            "Problematic script: {}...",
            raw_json.chars().take(500).collect::<String>()
        );
        NarrateError::MalformedInput(format!("failed to decode JSON: {e}"))
    })?;

    let elements = match root {
        Value::Array(elements) => elements,
        other => {
            return Err(NarrateError::MalformedInput(format!(
                "expected a list of narration segments, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut state = ReconcileState::default();
    let mut segments = Vec::with_capacity(elements.len());

    for (index, element) in elements.iter().enumerate() {
        let id = index + 1;
        let raw = RawSegment::from_value(id, element)?;

        let text = raw.narration_text.trim();
        if text.is_empty() {
            warn!("Segment {} has empty narration text, skipping", id);
            continue;
        }

        let start_sec = parse_field(id, &raw.start_time)?;
        let end_sec = parse_field(id, &raw.end_time)?;

        let (segment, next) =
            state.correct(id, start_sec, end_sec, text.to_string(), video_duration_sec)?;
        segments.push(segment);
        state = next;
    }

    if segments.is_empty() {
        warn!("No narration segments left after validation");
    }

    info!("Validated {} narration segments", segments.len());
    Ok(segments)
}

/// Largest timestamp magnitude accepted, in seconds.
const MAX_TIMESTAMP_SECS: f64 = u32::MAX as f64;

fn parse_field(segment: usize, value: &str) -> Result<f64> {
    parse_timestamp(value)
        .filter(|secs| secs.abs() <= MAX_TIMESTAMP_SECS)
        .ok_or_else(|| NarrateError::TimestampFormat {
            segment,
            value: value.to_string(),
        })
}
