// Timestamp grammar shared by scripts and subtitle output
use regex::Regex;
use std::sync::OnceLock;

fn timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(-)?(?:(?:(\d+):)?(\d+):)?(\d+)(?:([,.])(\d+))?$").expect("Invalid regex")
    })
}

/// Parse a script timestamp into seconds.
///
/// Accepts `HH:MM:SS,mmm` plus the looser `HH:MM:SS.mmm`, `MM:SS.mmm` and
/// `SS.mmm` forms, each with or without a fraction. After a `,` the digits
/// count whole milliseconds (`01,5` is 1.005s); after a `.` they are a decimal
/// fraction. A leading `-` negates the whole value. Returns `None` when the
/// text matches none of these.
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let cap = timestamp_re().captures(text.trim())?;

    let field = |i: usize| -> Option<f64> {
        match cap.get(i) {
            Some(m) => m.as_str().parse::<u64>().ok().map(|v| v as f64),
            None => Some(0.0),
        }
    };

    let hours = field(2)?;
    let minutes = field(3)?;
    let seconds = field(4)?;
    let fraction = match (cap.get(5).map(|m| m.as_str()), cap.get(6)) {
        (Some(","), Some(m)) => m.as_str().parse::<u64>().ok()? as f64 / 1000.0,
        (_, Some(m)) => format!("0.{}", m.as_str()).parse::<f64>().ok()?,
        _ => 0.0,
    };

    let total = hours * 3600.0 + minutes * 60.0 + seconds + fraction;
    if cap.get(1).is_some() {
        Some(-total)
    } else {
        Some(total)
    }
}

/// Format seconds as `HH:MM:SS<sep>mmm`.
///
/// Rounds to whole microseconds before truncating to milliseconds so values
/// like `10.257` do not print as `10,256`. Negative input prints as zero.
pub fn format_timestamp(secs: f64, separator: char) -> String {
    let micros = (secs.max(0.0) * 1_000_000.0).round() as u64;
    let total_secs = micros / 1_000_000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = (micros % 1_000_000) / 1000;
    format!(
        "{:02}:{:02}:{:02}{}{:03}",
        hours, minutes, seconds, separator, millis
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parse_primary_form() {
        assert!(approx(parse_timestamp("00:00:01,500").unwrap(), 1.5));
        assert!(approx(parse_timestamp("01:01:01,123").unwrap(), 3661.123));
    }

    #[test]
    fn test_parse_fallback_forms() {
        assert!(approx(parse_timestamp("00:00:10.250").unwrap(), 10.25));
        assert!(approx(parse_timestamp("02:03.5").unwrap(), 123.5));
        assert!(approx(parse_timestamp("7.25").unwrap(), 7.25));
        assert!(approx(parse_timestamp("00:01:05").unwrap(), 65.0));
        assert!(approx(parse_timestamp("01:05").unwrap(), 65.0));
        assert!(approx(parse_timestamp("42").unwrap(), 42.0));
        assert!(approx(parse_timestamp("  00:00:03,000 ").unwrap(), 3.0));
    }

    #[test]
    fn test_parse_comma_field_counts_milliseconds() {
        assert!(approx(parse_timestamp("00:00:01,50").unwrap(), 1.050));
        assert!(approx(parse_timestamp("00:00:01,5").unwrap(), 1.005));
        assert!(approx(parse_timestamp("00:00:01,050").unwrap(), 1.050));
        assert!(approx(parse_timestamp("00:00:01.5").unwrap(), 1.5));
    }

    #[test]
    fn test_parse_negative() {
        assert!(approx(parse_timestamp("-00:00:02,000").unwrap(), -2.0));
        assert!(approx(parse_timestamp("-1.5").unwrap(), -1.5));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_timestamp("00-00-05,000").is_none());
        assert!(parse_timestamp("00-00-01:000").is_none());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("1:2:3:4").is_none());
        assert!(parse_timestamp("abc").is_none());
        assert!(parse_timestamp("00:00:01,").is_none());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1.5, ','), "00:00:01,500");
        assert_eq!(format_timestamp(3661.123, ','), "01:01:01,123");
        assert_eq!(format_timestamp(10.257, ','), "00:00:10,257");
        assert_eq!(format_timestamp(1.5, '.'), "00:00:01.500");
        assert_eq!(format_timestamp(-3.0, ','), "00:00:00,000");
    }

    #[test]
    fn test_round_trip_within_millisecond() {
        for text in ["00:00:01,503", "00:12:34,567", "02:00:00,001", "00:00:10,257"] {
            let secs = parse_timestamp(text).unwrap();
            assert_eq!(format_timestamp(secs, ','), text);
        }
    }
}
