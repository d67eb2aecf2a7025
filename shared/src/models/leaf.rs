//! Leaf scan models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::clamp_fraction;

/// Leaf grade produced by the surface rules or the fusion step
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LeafGrade {
    Healthy,
    Stressed,
    Diseased,
    Uncertain,
}

impl LeafGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeafGrade::Healthy => "Healthy",
            LeafGrade::Stressed => "Stressed",
            LeafGrade::Diseased => "Diseased",
            LeafGrade::Uncertain => "Uncertain",
        }
    }

    /// Parse a stored grade; anything unrecognised is `Uncertain`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthy" => LeafGrade::Healthy,
            "stressed" => LeafGrade::Stressed,
            "diseased" => LeafGrade::Diseased,
            _ => LeafGrade::Uncertain,
        }
    }
}

impl std::fmt::Display for LeafGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity of visible damage on the leaf surface
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::High => "High",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Severity::High,
            "moderate" => Severity::Moderate,
            _ => Severity::Low,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which signal decided the final grade
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DecisionSource {
    #[serde(rename = "CNN")]
    Cnn,
    #[serde(rename = "RULE_BASED")]
    RuleBased,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionSource::Cnn => "CNN",
            DecisionSource::RuleBased => "RULE_BASED",
        }
    }
}

/// Classifier confidence tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "High",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::Low => "Low",
        }
    }
}

/// Colour-mass fractions of a cropped leaf image
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SurfaceAnalysis {
    pub green: f64,
    pub yellow: f64,
    pub brown: f64,
    pub dark: f64,
}

impl SurfaceAnalysis {
    /// Build an analysis with every fraction clamped to [0, 1]
    pub fn new(green: f64, yellow: f64, brown: f64, dark: f64) -> Self {
        Self {
            green: clamp_fraction(green),
            yellow: clamp_fraction(yellow),
            brown: clamp_fraction(brown),
            dark: clamp_fraction(dark),
        }
    }

    pub fn channel(&self, channel: SurfaceChannel) -> f64 {
        match channel {
            SurfaceChannel::Green => self.green,
            SurfaceChannel::Yellow => self.yellow,
            SurfaceChannel::Brown => self.brown,
            SurfaceChannel::Dark => self.dark,
        }
    }

    pub fn total(&self) -> f64 {
        self.green + self.yellow + self.brown + self.dark
    }
}

/// One colour class of the surface analysis
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceChannel {
    Green,
    Yellow,
    Brown,
    Dark,
}

/// Output of the pretrained leaf classifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierOutput {
    /// Predicted class, "Healthy" or a named disease
    pub label: String,
    /// Confidence in percent (0-100)
    pub confidence_pct: u8,
}

impl ClassifierOutput {
    pub fn new(label: impl Into<String>, confidence_pct: u8) -> Self {
        Self {
            label: label.into(),
            confidence_pct: confidence_pct.min(100),
        }
    }

    /// Build from a class probability, truncating to whole percent
    pub fn from_probability(label: impl Into<String>, probability: f64) -> Self {
        let pct = (clamp_fraction(probability) * 100.0).floor() as u8;
        Self::new(label, pct)
    }

    pub fn is_healthy(&self) -> bool {
        self.label.trim().eq_ignore_ascii_case("healthy")
    }
}

/// Bounding box in original-image pixel coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

/// One disease region reported by the localizer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiseaseDetection {
    pub disease_name: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
}

/// Result of the fusion step for one leaf image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeafDecision {
    pub rule_grade: LeafGrade,
    pub final_grade: LeafGrade,
    pub disease_type: Option<String>,
    /// Raw classifier label, `None` when the classifier was unavailable
    pub cnn_prediction: Option<String>,
    pub confidence_pct: u8,
    pub confidence_level: ConfidenceLevel,
    pub severity: Severity,
    pub decision_source: DecisionSource,
}

impl LeafDecision {
    /// Confidence as a [0, 1] fraction rounded to two places
    pub fn confidence_fraction(&self) -> f64 {
        crate::types::round_dp(f64::from(self.confidence_pct) / 100.0, 2)
    }
}

/// Persisted audit record of one leaf scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafScanRecord {
    pub id: Uuid,
    pub farm_id: String,
    pub grade: LeafGrade,
    pub disease_type: Option<String>,
    pub cnn_prediction: Option<String>,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub severity: Severity,
    pub surface_analysis: SurfaceAnalysis,
    pub decision_source: DecisionSource,
    pub filename: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

/// Minimal view of a scan used by the crop-health scorer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanSummary {
    pub grade: LeafGrade,
    pub disease_type: Option<String>,
    /// Confidence fraction in [0, 1]
    pub confidence: f64,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanned_at: Option<DateTime<Utc>>,
}

impl From<&LeafScanRecord> for ScanSummary {
    fn from(r: &LeafScanRecord) -> Self {
        ScanSummary {
            grade: r.grade,
            disease_type: r.disease_type.clone(),
            confidence: r.confidence,
            severity: r.severity,
            scanned_at: Some(r.scanned_at),
        }
    }
}
