//! Composite score and action-plan models

use serde::{Deserialize, Serialize};

use crate::models::{Factor, FactorStatus, MarketSignal};
use crate::types::{RiskLevel, ScoreStatus};

/// Environmental sub-score of the action plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentalScore {
    pub score: f64,
    pub status: ScoreStatus,
    pub factors: std::collections::BTreeMap<Factor, FactorStatus>,
}

/// Crop-health sub-score from recent leaf scans
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropHealthScore {
    pub score: f64,
    pub status: ScoreStatus,
    pub scans_analyzed: usize,
    pub disease_count: usize,
    pub high_severity_count: usize,
}

/// Demand level wording for the market sub-score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DemandLevel {
    High,
    Medium,
    Low,
}

/// How favourable the market looks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarketOutlook {
    Favorable,
    Cautious,
    Unfavorable,
    Neutral,
    Unknown,
}

/// Market-opportunity sub-score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketOpportunityScore {
    pub score: f64,
    pub status: MarketOutlook,
    pub signal: MarketSignal,
    pub demand_level: DemandLevel,
}

/// Weighted blend of the three sub-scores
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CompositeScore {
    pub environmental_score: f64,
    pub crop_health_score: f64,
    pub market_score: f64,
    pub composite: f64,
}

/// Discrete outcome tier selected by the composite score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompositeTier {
    /// Inclusive lower bound of the composite score
    pub min_score: f64,
    pub yield_change: String,
    pub profit_change: String,
    pub risk_level: RiskLevel,
}

/// Projected outcome of following the plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectedOutcome {
    #[serde(rename = "yieldChange")]
    pub yield_change: String,
    #[serde(rename = "profitChange")]
    pub profit_change: String,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
    #[serde(rename = "harvestTiming", skip_serializing_if = "Option::is_none")]
    pub harvest_timing: Option<String>,
}

/// Priority label on a recommended action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// One recommended action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendedAction {
    pub action: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_benefit: Option<String>,
}

/// Recommendations grouped by time horizon
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StrategicRecommendations {
    /// 0-3 days
    pub immediate_actions: Vec<RecommendedAction>,
    /// 1-2 weeks
    pub short_term_strategy: Vec<RecommendedAction>,
    /// 2-4 weeks
    pub market_timing: Vec<RecommendedAction>,
    /// 1-3 months
    pub long_term_planning: Vec<RecommendedAction>,
}

impl StrategicRecommendations {
    pub fn total(&self) -> usize {
        self.immediate_actions.len()
            + self.short_term_strategy.len()
            + self.market_timing.len()
            + self.long_term_planning.len()
    }
}
