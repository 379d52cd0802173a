//! Confidence normalisation for the prediction stream.
//!
//! The upstream predictor may express confidence as a fraction (`0.42`), a percentage
//! (`75`) or either of those as a string. Everything is reduced to a fraction in `[0, 1]`.

use serde_json::Value;

/// Normalise a raw confidence field.
///
/// Absent, null, unparseable or non-numeric values resolve to `0.0` instead of
/// rejecting the surrounding prediction.
pub fn normalize_confidence(raw: Option<&Value>) -> f64 {
    match raw {
        Some(Value::Number(number)) => number.as_f64().map_or(0.0, normalize_number),
        Some(Value::String(text)) => normalize_text(text),
        _ => 0.0,
    }
}

/// Values above 1 are percentages: clamped to `[0, 100]` then scaled down. Anything
/// else is clamped to `[0, 1]` directly.
pub fn normalize_number(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }

    if value > 1.0 {
        value.clamp(0.0, 100.0) / 100.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Parse a textual confidence (e.g. `"60"`, `"0.6"`, `"60%"`) and normalise it.
pub fn normalize_text(text: &str) -> f64 {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();

    match trimmed.parse::<f64>() {
        Ok(value) if !value.is_nan() => normalize_number(value),
        _ => 0.0,
    }
}

/// Qualitative band of a normalised confidence, as shown next to the gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    /// Band a fraction in `[0, 1]` on its rounded percentage.
    pub fn from_confidence(confidence: f64) -> Self {
        match confidence_percentage(confidence) {
            80.. => ConfidenceLevel::VeryHigh,
            60..80 => ConfidenceLevel::High,
            40..60 => ConfidenceLevel::Medium,
            20..40 => ConfidenceLevel::Low,
            _ => ConfidenceLevel::VeryLow,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "Very High Confidence",
            ConfidenceLevel::High => "High Confidence",
            ConfidenceLevel::Medium => "Medium Confidence",
            ConfidenceLevel::Low => "Low Confidence",
            ConfidenceLevel::VeryLow => "Very Low Confidence",
        }
    }
}

/// Rounded percentage of a normalised confidence.
pub fn confidence_percentage(confidence: f64) -> u8 {
    (normalize_number(confidence) * 100.0).round() as u8
}
