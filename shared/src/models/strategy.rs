//! Selling-strategy and action-simulator models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::MarketSignal;
use crate::types::RiskLevel;

/// The three selling strategies, in their fixed index order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    ImmediateSale,
    DelayedSale,
    QualityPremium,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::ImmediateSale,
        StrategyKind::DelayedSale,
        StrategyKind::QualityPremium,
    ];

    pub fn index(&self) -> usize {
        match self {
            StrategyKind::ImmediateSale => 0,
            StrategyKind::DelayedSale => 1,
            StrategyKind::QualityPremium => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn title(&self) -> &'static str {
        match self {
            StrategyKind::ImmediateSale => "Immediate Sale at Current Market Rate",
            StrategyKind::DelayedSale => "Wait for Peak Demand Window",
            StrategyKind::QualityPremium => "Quality Improvement + Premium Sale",
        }
    }
}

/// Numeric outcome of one selling strategy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyOutcome {
    pub kind: StrategyKind,
    pub price_per_kg: Decimal,
    pub expected_revenue: Decimal,
    /// Profit relative to selling everything today
    pub profit_change: Decimal,
    /// Yield change in percent caused by the strategy
    pub yield_impact_pct: Decimal,
}

/// Inputs of the selling simulator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SellingInput {
    pub yield_kg: Decimal,
    pub current_price: Decimal,
    pub forecast_price: Decimal,
    /// Number of price points behind `current_price` / `forecast_price`
    pub history_points: usize,
}

/// Low / medium / high label on a risk factor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FactorSeverity {
    Low,
    Medium,
    High,
}

/// One risk factor shown next to a selling plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactor {
    pub factor: String,
    pub description: String,
    pub severity: FactorSeverity,
}

/// Revenue comparison against selling immediately
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueComparison {
    pub base_revenue: Decimal,
    pub selected_revenue: Decimal,
    pub revenue_difference: Decimal,
    pub revenue_diff_pct: Decimal,
}

/// Projected outcome of the selected selling strategy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SellingProjection {
    #[serde(rename = "yieldChange")]
    pub yield_change: String,
    #[serde(rename = "profitChange")]
    pub profit_change: Decimal,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
    #[serde(rename = "harvestTiming")]
    pub harvest_timing: String,
}

/// Outcome of doing nothing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoActionOutcome {
    #[serde(rename = "yieldChange")]
    pub yield_change: String,
    #[serde(rename = "profitChange")]
    pub profit_change: Decimal,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
}

/// Market conditions a selling plan is framed against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MarketConditions {
    pub signal: MarketSignal,
    pub volatility: f64,
    pub demand_index: f64,
}

/// Three strategies plus framing for the selected one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SellingPlan {
    pub strategies: Vec<StrategyOutcome>,
    pub selected_approach: usize,
    pub projected_outcomes: SellingProjection,
    pub no_action_outcomes: NoActionOutcome,
    pub comparison: RevenueComparison,
    pub risk_factors: Vec<RiskFactor>,
}

/// Inputs of the farmer action simulator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulatorInput {
    /// Commercial leaf grade ("A", "B", ...)
    pub leaf_grade: String,
    pub leaf_confidence: f64,
    pub health_score: u8,
    pub pest_risk: RiskLevel,
    pub drought_risk: RiskLevel,
    pub market_signal: MarketSignal,
    pub market_demand: f64,
    pub volatility: f64,
}

/// Directional impact of the recommended farmer action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulatorOutcome {
    pub expected_yield_change_pct: i32,
    pub estimated_profit_change: i32,
    pub risk_level: RiskLevel,
    pub recommended_harvest_shift_days: i32,
    pub explanation: Vec<String>,
}
