//! Leaf decision fusion
//!
//! The surface heuristics are expressed as ordered rule tables: the first rule
//! whose condition holds decides the outcome. The fusion policy then decides
//! whether the classifier or the rule grade is authoritative.

use crate::config::{ConfidenceTiers, LeafRuleThresholds, ScoringConfig, SeverityThresholds};
use crate::models::{
    ClassifierOutput, ConfidenceLevel, DecisionSource, LeafDecision, LeafGrade, Severity,
    SurfaceAnalysis, SurfaceChannel,
};

/// Disease label used when the surface rules flag a leaf the classifier calls healthy
pub const SURFACE_DETECTED_DISEASE: &str = "surface-detected disease";

/// Fires when any listed channel is strictly above its threshold
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRule<T> {
    pub any_above: Vec<(SurfaceChannel, f64)>,
    pub outcome: T,
}

impl<T> SurfaceRule<T> {
    pub fn new(any_above: Vec<(SurfaceChannel, f64)>, outcome: T) -> Self {
        Self { any_above, outcome }
    }

    pub fn matches(&self, surface: &SurfaceAnalysis) -> bool {
        self.any_above
            .iter()
            .any(|(channel, threshold)| surface.channel(*channel) > *threshold)
    }
}

/// Ordered list of rules with a fallback outcome
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable<T> {
    pub rules: Vec<SurfaceRule<T>>,
    pub fallback: T,
}

impl<T: Copy> RuleTable<T> {
    pub fn evaluate(&self, surface: &SurfaceAnalysis) -> T {
        self.rules
            .iter()
            .find(|rule| rule.matches(surface))
            .map(|rule| rule.outcome)
            .unwrap_or(self.fallback)
    }
}

/// Diseased, then stressed, then healthy, else uncertain
pub fn grade_rules(t: &LeafRuleThresholds) -> RuleTable<LeafGrade> {
    RuleTable {
        rules: vec![
            SurfaceRule::new(
                vec![
                    (SurfaceChannel::Brown, t.brown_diseased),
                    (SurfaceChannel::Dark, t.dark_diseased),
                ],
                LeafGrade::Diseased,
            ),
            SurfaceRule::new(
                vec![(SurfaceChannel::Yellow, t.yellow_stressed)],
                LeafGrade::Stressed,
            ),
            SurfaceRule::new(
                vec![(SurfaceChannel::Green, t.green_healthy)],
                LeafGrade::Healthy,
            ),
        ],
        fallback: LeafGrade::Uncertain,
    }
}

pub fn severity_rules(t: &SeverityThresholds) -> RuleTable<Severity> {
    RuleTable {
        rules: vec![
            SurfaceRule::new(
                vec![
                    (SurfaceChannel::Brown, t.brown_high),
                    (SurfaceChannel::Dark, t.dark_high),
                ],
                Severity::High,
            ),
            SurfaceRule::new(
                vec![
                    (SurfaceChannel::Brown, t.brown_moderate),
                    (SurfaceChannel::Yellow, t.yellow_moderate),
                ],
                Severity::Moderate,
            ),
        ],
        fallback: Severity::Low,
    }
}

pub fn rule_grade(surface: &SurfaceAnalysis, config: &ScoringConfig) -> LeafGrade {
    grade_rules(&config.leaf_rules).evaluate(surface)
}

pub fn severity(surface: &SurfaceAnalysis, config: &ScoringConfig) -> Severity {
    severity_rules(&config.severity).evaluate(surface)
}

pub fn confidence_level(confidence_pct: u8, tiers: &ConfidenceTiers) -> ConfidenceLevel {
    if confidence_pct >= tiers.high {
        ConfidenceLevel::High
    } else if confidence_pct >= tiers.medium {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

/// Combine the classifier output with the surface rules into one decision.
///
/// A healthy classifier verdict defers to the rule grade; a named disease from
/// the classifier is always final. Without a classifier the rule grade stands
/// alone with zero confidence.
pub fn fuse(
    classifier: Option<&ClassifierOutput>,
    surface: &SurfaceAnalysis,
    config: &ScoringConfig,
) -> LeafDecision {
    let rule = rule_grade(surface, config);
    let severity = severity(surface, config);
    let confidence_pct = classifier.map(|c| c.confidence_pct).unwrap_or(0);

    let (final_grade, disease_type, decision_source) = match classifier {
        Some(output) if !output.is_healthy() => (
            LeafGrade::Diseased,
            Some(output.label.clone()),
            DecisionSource::Cnn,
        ),
        _ => {
            let disease =
                (rule != LeafGrade::Healthy).then(|| SURFACE_DETECTED_DISEASE.to_string());
            (rule, disease, DecisionSource::RuleBased)
        }
    };

    LeafDecision {
        rule_grade: rule,
        final_grade,
        disease_type,
        cnn_prediction: classifier.map(|c| c.label.clone()),
        confidence_pct,
        confidence_level: confidence_level(confidence_pct, &config.confidence),
        severity,
        decision_source,
    }
}
