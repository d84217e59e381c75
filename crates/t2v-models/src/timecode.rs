//! Subtitle timecode parsing and formatting.
//!
//! Subtitle documents use the `HH:MM:SS,mmm` format: hours, minutes,
//! seconds and milliseconds, with a comma before the millisecond field.

use thiserror::Error;

/// Timecode parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimecodeError {
    /// The text does not match `HH:MM:SS,mmm`.
    #[error("Malformed timecode '{0}', expected HH:MM:SS,mmm")]
    Malformed(String),
}

/// Parse an `HH:MM:SS,mmm` timecode into seconds.
///
/// Hours are passed through unchecked and may exceed 24. Minutes and
/// seconds must be below 60.
///
/// # Examples
/// ```
/// use t2v_models::timecode::parse_timecode;
/// assert_eq!(parse_timecode("00:01:30,000").unwrap(), 90.0);
/// assert!((parse_timecode("00:00:02,300").unwrap() - 2.3).abs() < 1e-9);
/// ```
pub fn parse_timecode(text: &str) -> Result<f64, TimecodeError> {
    let malformed = || TimecodeError::Malformed(text.to_string());

    let (clock, millis) = text.split_once(',').ok_or_else(malformed)?;
    let mut fields = clock.split(':');
    let parts = (fields.next(), fields.next(), fields.next(), fields.next());
    let (hours, minutes, seconds) = match parts {
        (Some(h), Some(m), Some(s), None) => (h, m, s),
        _ => return Err(malformed()),
    };

    if hours.len() < 2 || minutes.len() != 2 || seconds.len() != 2 || millis.len() != 3 {
        return Err(malformed());
    }

    let hours = parse_digits(hours).ok_or_else(malformed)?;
    let minutes = parse_digits(minutes).ok_or_else(malformed)?;
    let seconds = parse_digits(seconds).ok_or_else(malformed)?;
    let millis = parse_digits(millis).ok_or_else(malformed)?;

    if minutes >= 60 || seconds >= 60 {
        return Err(malformed());
    }

    Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds as f64 + millis as f64 / 1000.0)
}

/// Parse an all-ASCII-digit field. Signs and whitespace are rejected.
fn parse_digits(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

/// Format seconds as an `HH:MM:SS,mmm` timecode, rounding to the nearest
/// millisecond. Negative input is clamped to zero.
pub fn format_timecode(total_secs: f64) -> String {
    let total_ms = (total_secs.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let m = (total_sec / 60) % 60;
    let h = total_sec / 3600;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timecode_components() {
        assert_eq!(parse_timecode("00:00:00,000").unwrap(), 0.0);
        assert_eq!(parse_timecode("00:01:00,000").unwrap(), 60.0);
        assert_eq!(parse_timecode("01:00:00,000").unwrap(), 3600.0);
        let value = parse_timecode("01:30:45,250").unwrap();
        assert!((value - 5445.25).abs() < 1e-9);
    }

    #[test]
    fn test_parse_timecode_hours_passthrough() {
        assert_eq!(parse_timecode("25:00:00,000").unwrap(), 90000.0);
        assert_eq!(parse_timecode("100:00:00,000").unwrap(), 360000.0);
    }

    #[test]
    fn test_parse_timecode_round_trip() {
        let cases = [
            (0u64, 0u64, 0u64, 0u64),
            (0, 0, 2, 300),
            (1, 59, 59, 999),
            (12, 5, 7, 1),
            (99, 30, 0, 500),
        ];
        for &(h, m, s, ms) in &cases {
            let text = format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms);
            let expected = h as f64 * 3600.0 + m as f64 * 60.0 + s as f64 + ms as f64 / 1000.0;
            let parsed = parse_timecode(&text).unwrap();
            assert!((parsed - expected).abs() < 1e-9, "{} parsed as {}", text, parsed);
        }
    }

    #[test]
    fn test_parse_timecode_rejects_malformed() {
        for bad in [
            "",
            "00:00:00",
            "00:00:00.000",
            "0:00:00,000",
            "00:0:00,000",
            "00:00:00,00",
            "00:00:60,000",
            "00:60:00,000",
            "00:00:-1,000",
            "aa:00:00,000",
            "00:00:00:00,000",
            " 00:00:00,000",
        ] {
            assert!(
                matches!(parse_timecode(bad), Err(TimecodeError::Malformed(_))),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_format_timecode() {
        assert_eq!(format_timecode(0.0), "00:00:00,000");
        assert_eq!(format_timecode(2.3), "00:00:02,300");
        assert_eq!(format_timecode(3661.5), "01:01:01,500");
        assert_eq!(format_timecode(-4.0), "00:00:00,000");
    }

    #[test]
    fn test_format_then_parse() {
        let value = 754.321;
        let parsed = parse_timecode(&format_timecode(value)).unwrap();
        assert!((parsed - value).abs() < 0.0005);
    }
}
