//! Scoring configuration
//!
//! Every threshold, weight and base score used by the scorers lives in one
//! immutable `ScoringConfig` that is injected into each scorer. The defaults
//! reproduce the tuned constants; a deployment can override any of them from
//! its configuration file without code changes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ScoringError, ScoringResult};
use crate::models::{CompositeTier, Factor};
use crate::types::RiskLevel;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Closed optimal range for one environmental factor, plus its weight
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct IdealBand {
    pub low: f64,
    pub high: f64,
    pub weight: f64,
}

impl IdealBand {
    pub const fn new(low: f64, high: f64, weight: f64) -> Self {
        Self { low, high, weight }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.low <= value && value <= self.high
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

/// Ideal bands of the four tracked factors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdealBands {
    pub soil_moisture: IdealBand,
    pub temperature: IdealBand,
    pub humidity: IdealBand,
    pub rainfall_7d: IdealBand,
}

impl IdealBands {
    pub fn band(&self, factor: Factor) -> &IdealBand {
        match factor {
            Factor::SoilMoisture => &self.soil_moisture,
            Factor::Temperature => &self.temperature,
            Factor::Humidity => &self.humidity,
            Factor::Rainfall7d => &self.rainfall_7d,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, &IdealBand)> {
        Factor::ALL.into_iter().map(move |f| (f, self.band(f)))
    }

    pub fn weight_sum(&self) -> f64 {
        self.iter().map(|(_, b)| b.weight).sum()
    }
}

impl Default for IdealBands {
    fn default() -> Self {
        Self {
            soil_moisture: IdealBand::new(55.0, 65.0, 0.35),
            temperature: IdealBand::new(18.0, 26.0, 0.25),
            humidity: IdealBand::new(65.0, 75.0, 0.20),
            rainfall_7d: IdealBand::new(40.0, 80.0, 0.20),
        }
    }
}

/// Surface-fraction thresholds for the rule-based leaf grade
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeafRuleThresholds {
    pub brown_diseased: f64,
    pub dark_diseased: f64,
    pub yellow_stressed: f64,
    pub green_healthy: f64,
}

impl Default for LeafRuleThresholds {
    fn default() -> Self {
        Self {
            brown_diseased: 0.08,
            dark_diseased: 0.05,
            yellow_stressed: 0.15,
            green_healthy: 0.6,
        }
    }
}

/// Surface-fraction thresholds for leaf severity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeverityThresholds {
    pub brown_high: f64,
    pub dark_high: f64,
    pub brown_moderate: f64,
    pub yellow_moderate: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            brown_high: 0.15,
            dark_high: 0.1,
            brown_moderate: 0.08,
            yellow_moderate: 0.2,
        }
    }
}

/// Classifier confidence tiers, in percent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceTiers {
    pub high: u8,
    pub medium: u8,
}

impl Default for ConfidenceTiers {
    fn default() -> Self {
        Self {
            high: 90,
            medium: 75,
        }
    }
}

/// Inclusive HSV range on the OpenCV scale (H 0-180, S and V 0-255)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| self.lower[i] <= hsv[i] && hsv[i] <= self.upper[i])
    }
}

/// Colour ranges that define the four surface classes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurfaceColorTable {
    pub green: HsvRange,
    pub yellow: HsvRange,
    pub brown: HsvRange,
    /// Dark tissue is matched on value only
    pub dark_max_value: u8,
}

impl Default for SurfaceColorTable {
    fn default() -> Self {
        Self {
            green: HsvRange::new([35, 40, 40], [90, 255, 255]),
            yellow: HsvRange::new([15, 40, 40], [35, 255, 255]),
            brown: HsvRange::new([5, 60, 40], [25, 255, 160]),
            dark_max_value: 50,
        }
    }
}

/// Market signal thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketThresholds {
    /// Multiplier applied to the absolute % price change
    pub demand_multiplier: f64,
    pub demand_cap: f64,
    /// Demand index at or above which a calm market is an opportunity
    pub demand_opportunity: f64,
    /// Volatility (%) at or above which the market is risky
    pub volatility_risk: f64,
    pub volatility_window: usize,
    pub min_points: usize,
}

impl Default for MarketThresholds {
    fn default() -> Self {
        Self {
            demand_multiplier: 5.0,
            demand_cap: 100.0,
            demand_opportunity: 20.0,
            volatility_risk: 3.0,
            volatility_window: 7,
            min_points: 3,
        }
    }
}

/// Weights of the composite action-readiness score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompositeWeights {
    pub environmental: f64,
    pub crop_health: f64,
    pub market: f64,
}

impl CompositeWeights {
    pub fn sum(&self) -> f64 {
        self.environmental + self.crop_health + self.market
    }
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            environmental: 0.40,
            crop_health: 0.35,
            market: 0.25,
        }
    }
}

/// Per-scan scoring table for the crop-health score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CropScoreTable {
    pub healthy: f64,
    pub stressed: f64,
    pub diseased: f64,
    pub other: f64,
    pub high_severity_discount: f64,
    pub moderate_severity_discount: f64,
    pub low_severity_discount: f64,
    /// Score used when there are no scans in the lookback window
    pub no_scan_score: f64,
    pub lookback_days: i64,
}

impl Default for CropScoreTable {
    fn default() -> Self {
        Self {
            healthy: 100.0,
            stressed: 60.0,
            diseased: 30.0,
            other: 50.0,
            high_severity_discount: 0.7,
            moderate_severity_discount: 0.85,
            low_severity_discount: 1.0,
            no_scan_score: 70.0,
            lookback_days: 7,
        }
    }
}

/// Base scores and adjustments for the market-opportunity score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketScoreTable {
    pub opportunity: f64,
    pub neutral: f64,
    pub watch: f64,
    pub risk: f64,
    pub demand_high: f64,
    pub demand_low: f64,
    pub demand_adjustment: f64,
    pub trend_threshold_pct: f64,
    pub trend_adjustment: f64,
    pub no_data_score: f64,
}

impl Default for MarketScoreTable {
    fn default() -> Self {
        Self {
            opportunity: 85.0,
            neutral: 60.0,
            watch: 50.0,
            risk: 35.0,
            demand_high: 60.0,
            demand_low: 30.0,
            demand_adjustment: 10.0,
            trend_threshold_pct: 5.0,
            trend_adjustment: 5.0,
            no_data_score: 50.0,
        }
    }
}

/// Parameters of the selling-strategy simulator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SellingParameters {
    pub premium_multiplier: Decimal,
    pub processing_cost_per_kg: Decimal,
    pub premium_yield_penalty_pct: Decimal,
    /// Revenue lost by taking no action, in percent of immediate revenue
    pub no_action_loss_pct: Decimal,
    pub window_start_days: i64,
    pub window_end_days: i64,
}

impl Default for SellingParameters {
    fn default() -> Self {
        Self {
            premium_multiplier: Decimal::new(118, 2),
            processing_cost_per_kg: Decimal::from(5),
            premium_yield_penalty_pct: Decimal::from(-2),
            no_action_loss_pct: Decimal::from(2),
            window_start_days: 7,
            window_end_days: 12,
        }
    }
}

/// Default composite tiers, best first
pub fn default_composite_tiers() -> Vec<CompositeTier> {
    vec![
        CompositeTier {
            min_score: 80.0,
            yield_change: "+8-12%".to_string(),
            profit_change: "+₹5,000-8,000".to_string(),
            risk_level: RiskLevel::Low,
        },
        CompositeTier {
            min_score: 65.0,
            yield_change: "+4-7%".to_string(),
            profit_change: "+₹2,500-4,500".to_string(),
            risk_level: RiskLevel::Low,
        },
        CompositeTier {
            min_score: 50.0,
            yield_change: "+1-3%".to_string(),
            profit_change: "+₹500-2,000".to_string(),
            risk_level: RiskLevel::Medium,
        },
        CompositeTier {
            min_score: 0.0,
            yield_change: "-2-0%".to_string(),
            profit_change: "-₹1,000-0".to_string(),
            risk_level: RiskLevel::High,
        },
    ]
}

/// All constant tables used by the scorers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub bands: IdealBands,
    pub leaf_rules: LeafRuleThresholds,
    pub severity: SeverityThresholds,
    pub confidence: ConfidenceTiers,
    pub surface_colors: SurfaceColorTable,
    pub market: MarketThresholds,
    pub composite: CompositeWeights,
    pub crop: CropScoreTable,
    pub market_score: MarketScoreTable,
    /// Tiers ordered best first; the last one must catch everything
    pub tiers: Vec<CompositeTier>,
    pub selling: SellingParameters,
    /// Health score at or below which a smart alert fires
    pub alert_health_threshold: u8,
    /// Environmental score used when no readings are available
    pub no_reading_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            bands: IdealBands::default(),
            leaf_rules: LeafRuleThresholds::default(),
            severity: SeverityThresholds::default(),
            confidence: ConfidenceTiers::default(),
            surface_colors: SurfaceColorTable::default(),
            market: MarketThresholds::default(),
            composite: CompositeWeights::default(),
            crop: CropScoreTable::default(),
            market_score: MarketScoreTable::default(),
            tiers: default_composite_tiers(),
            selling: SellingParameters::default(),
            alert_health_threshold: 60,
            no_reading_score: 50.0,
        }
    }
}

impl ScoringConfig {
    /// Check the structural invariants of the tables.
    ///
    /// Weight tables must sum to 1.0 and every band must have positive width.
    pub fn validate(&self) -> ScoringResult<()> {
        for (factor, band) in self.bands.iter() {
            if !(band.high > band.low) {
                return Err(ScoringError::DegenerateBand {
                    factor: factor.to_string(),
                });
            }
            if !(0.0..=1.0).contains(&band.weight) {
                return Err(ScoringError::InvalidConfig(format!(
                    "weight of {} must be within [0, 1]",
                    factor
                )));
            }
        }

        let band_sum = self.bands.weight_sum();
        if (band_sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ScoringError::InvalidConfig(format!(
                "ideal-band weights sum to {}, expected 1.0",
                band_sum
            )));
        }

        let composite_sum = self.composite.sum();
        if (composite_sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ScoringError::InvalidConfig(format!(
                "composite weights sum to {}, expected 1.0",
                composite_sum
            )));
        }

        if self.market.min_points < 3 {
            return Err(ScoringError::InvalidConfig(
                "market.min_points must be at least 3".to_string(),
            ));
        }
        if self.market.volatility_window < 2 {
            return Err(ScoringError::InvalidConfig(
                "market.volatility_window must be at least 2".to_string(),
            ));
        }

        if self.tiers.is_empty() {
            return Err(ScoringError::InvalidConfig(
                "at least one composite tier is required".to_string(),
            ));
        }
        if self
            .tiers
            .windows(2)
            .any(|pair| pair[0].min_score < pair[1].min_score)
        {
            return Err(ScoringError::InvalidConfig(
                "composite tiers must be ordered best first".to_string(),
            ));
        }

        if self.confidence.medium > self.confidence.high {
            return Err(ScoringError::InvalidConfig(
                "confidence.medium must not exceed confidence.high".to_string(),
            ));
        }

        Ok(())
    }
}
