//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Supported dashboard languages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Hindi,
    Assamese,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Assamese => "as",
        }
    }

    /// Detect the language of a farmer's message from a few common words
    pub fn detect(message: &str) -> Self {
        const HINDI: &[&str] = &[
            "कैसे", "क्या", "मुझे", "चाय", "पानी", "मिट्टी", "कीड़े", "बीमारी", "सिंचाई",
        ];
        const ASSAMESE: &[&str] = &["কেনেকৈ", "কি", "চাহ", "পানী", "মাটি"];

        if HINDI.iter().any(|w| message.contains(w)) {
            Language::Hindi
        } else if ASSAMESE.iter().any(|w| message.contains(w)) {
            Language::Assamese
        } else {
            Language::English
        }
    }
}

/// Coarse three-level risk label
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// Parse a label as produced by the risk models ("Low", "medium", "2", ...)
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" | "0" => Some(RiskLevel::Low),
            "medium" | "1" => Some(RiskLevel::Medium),
            "high" | "2" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Four-step status label used by the health, crop and composite scorers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScoreStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Unknown,
}

impl ScoreStatus {
    /// Bucket a 0-100 score (>=85 excellent, >=70 good, >=50 fair)
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            ScoreStatus::Excellent
        } else if score >= 70.0 {
            ScoreStatus::Good
        } else if score >= 50.0 {
            ScoreStatus::Fair
        } else {
            ScoreStatus::Poor
        }
    }
}

/// Clamp a score into [0, 100]
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Clamp a fraction or confidence into [0, 1]
pub fn clamp_fraction(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Round to a fixed number of decimal places
pub fn round_dp(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_score(120.0), 100.0);
        assert_eq!(clamp_score(-3.0), 0.0);
        assert_eq!(clamp_score(f64::NAN), 0.0);
        assert_eq!(clamp_fraction(1.4), 1.0);
        assert_eq!(clamp_fraction(0.25), 0.25);
    }

    #[test]
    fn test_round_dp() {
        assert_eq!(round_dp(0.12345, 3), 0.123);
        assert_eq!(round_dp(72.25, 1), 72.3);
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::detect("how do I water my tea?"), Language::English);
        assert_eq!(Language::detect("मुझे पानी कब देना चाहिए"), Language::Hindi);
        assert_eq!(Language::detect("চাহ গছত পানী"), Language::Assamese);
    }

    #[test]
    fn test_risk_level_parse() {
        assert_eq!(RiskLevel::parse("High"), Some(RiskLevel::High));
        assert_eq!(RiskLevel::parse("1"), Some(RiskLevel::Medium));
        assert_eq!(RiskLevel::parse("unknown"), None);
    }
}
