//! Translation results as they arrive from the upstream pipeline

use serde::{Deserialize, Serialize};

/// One finished utterance: transcription, translation and where it sits in
/// the source stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    /// (start, end) in seconds from the beginning of the stream
    pub time_range: (f64, f64),
    #[serde(default)]
    pub transcribed_text: Option<String>,
    #[serde(default)]
    pub translated_text: Option<String>,
}

impl TranslationResult {
    pub fn new(
        time_range: (f64, f64),
        transcribed_text: Option<String>,
        translated_text: Option<String>,
    ) -> Self {
        Self {
            time_range,
            transcribed_text,
            translated_text,
        }
    }

    /// `"H:MM:SS,mmm --> H:MM:SS,mmm"` for this result's time range
    pub fn timestamp_text(&self) -> String {
        format!(
            "{} --> {}",
            format_seconds(self.time_range.0),
            format_seconds(self.time_range.1)
        )
    }
}

/// Format seconds as `H:MM:SS,mmm`
///
/// Hours are not zero padded and are not wrapped at 24. Negative and
/// non-finite inputs clamp to zero.
pub fn format_seconds(seconds: f64) -> String {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };

    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    format!("{}:{:02}:{:02},{:03}", hours, mins, secs, ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "0:00:00,000");
        assert_eq!(format_seconds(5.0), "0:00:05,000");
        assert_eq!(format_seconds(7.25), "0:00:07,250");
        assert_eq!(format_seconds(61.5), "0:01:01,500");
        assert_eq!(format_seconds(3723.004), "1:02:03,004");
        assert_eq!(format_seconds(90000.0), "25:00:00,000");
    }

    #[test]
    fn test_format_seconds_rounds_float_noise() {
        // 0.1 + 0.2 is 0.30000000000000004
        assert_eq!(format_seconds(0.1 + 0.2), "0:00:00,300");
        assert_eq!(format_seconds(59.9999), "0:01:00,000");
    }

    #[test]
    fn test_format_seconds_clamps_invalid() {
        assert_eq!(format_seconds(-3.0), "0:00:00,000");
        assert_eq!(format_seconds(f64::NAN), "0:00:00,000");
    }

    #[test]
    fn test_timestamp_text() {
        let result = TranslationResult::new((5.0, 7.25), None, Some("Hello".into()));
        assert_eq!(result.timestamp_text(), "0:00:05,000 --> 0:00:07,250");
    }

    #[test]
    fn test_deserialize_with_missing_text() {
        let result: TranslationResult =
            serde_json::from_str(r#"{"time_range": [1.0, 2.5], "translated_text": "Hi"}"#).unwrap();
        assert_eq!(result.time_range, (1.0, 2.5));
        assert_eq!(result.transcribed_text, None);
        assert_eq!(result.translated_text.as_deref(), Some("Hi"));
    }
}
