//! Crop, market and environmental sub-scores and their weighted blend

use crate::config::{CompositeWeights, ScoringConfig};
use crate::error::ScoringResult;
use crate::models::{
    CompositeScore, CompositeTier, CropHealthScore, DemandLevel, EnvironmentalReading,
    EnvironmentalScore, LeafGrade, MarketOpportunityScore, MarketOutlook, MarketSignal,
    MarketSnapshot, ProjectedOutcome, ScanSummary, Severity,
};
use crate::scoring::environment::assess_environment;
use crate::types::{clamp_fraction, clamp_score, round_dp, ScoreStatus};

/// Environmental sub-score: the health score of the (averaged) reading
pub fn environmental_score(
    reading: Option<&EnvironmentalReading>,
    config: &ScoringConfig,
) -> ScoringResult<EnvironmentalScore> {
    let Some(reading) = reading else {
        return Ok(EnvironmentalScore {
            score: config.no_reading_score,
            status: ScoreStatus::Unknown,
            factors: Default::default(),
        });
    };

    let assessment = assess_environment(reading, config)?;
    let score = f64::from(assessment.health_score);
    Ok(EnvironmentalScore {
        score,
        status: ScoreStatus::from_score(score),
        factors: assessment.score_explanation,
    })
}

/// Average of per-scan scores over the supplied scans
pub fn crop_health_score(scans: &[ScanSummary], config: &ScoringConfig) -> CropHealthScore {
    let table = &config.crop;
    if scans.is_empty() {
        return CropHealthScore {
            score: table.no_scan_score,
            status: ScoreStatus::Unknown,
            scans_analyzed: 0,
            disease_count: 0,
            high_severity_count: 0,
        };
    }

    let mut disease_count = 0;
    let mut high_severity_count = 0;
    let mut total = 0.0;

    for scan in scans {
        let base = match scan.grade {
            LeafGrade::Healthy => table.healthy,
            LeafGrade::Stressed => table.stressed,
            LeafGrade::Diseased => {
                disease_count += 1;
                table.diseased
            }
            LeafGrade::Uncertain => table.other,
        };
        let discount = match scan.severity {
            Severity::High => {
                high_severity_count += 1;
                table.high_severity_discount
            }
            Severity::Moderate => table.moderate_severity_discount,
            Severity::Low => table.low_severity_discount,
        };
        total += base * clamp_fraction(scan.confidence) * discount;
    }

    let score = clamp_score(round_dp(total / scans.len() as f64, 1));
    CropHealthScore {
        score,
        status: ScoreStatus::from_score(score),
        scans_analyzed: scans.len(),
        disease_count,
        high_severity_count,
    }
}

fn demand_level(demand: f64) -> DemandLevel {
    if demand > 60.0 {
        DemandLevel::High
    } else if demand > 30.0 {
        DemandLevel::Medium
    } else {
        DemandLevel::Low
    }
}

/// Signal base score adjusted for demand extremes and price-trend magnitude
pub fn market_opportunity_score(
    snapshot: Option<&MarketSnapshot>,
    config: &ScoringConfig,
) -> MarketOpportunityScore {
    let table = &config.market_score;
    let Some(snapshot) = snapshot else {
        return MarketOpportunityScore {
            score: table.no_data_score,
            status: MarketOutlook::Unknown,
            signal: MarketSignal::Neutral,
            demand_level: DemandLevel::Medium,
        };
    };

    let (mut score, status) = match snapshot.signal {
        MarketSignal::Opportunity => (table.opportunity, MarketOutlook::Favorable),
        MarketSignal::Watch => (table.watch, MarketOutlook::Cautious),
        MarketSignal::Risk => (table.risk, MarketOutlook::Unfavorable),
        MarketSignal::Neutral => (table.neutral, MarketOutlook::Neutral),
    };

    if snapshot.demand_index > table.demand_high {
        score += table.demand_adjustment;
    } else if snapshot.demand_index < table.demand_low {
        score -= table.demand_adjustment;
    }

    if snapshot.price_change_pct > table.trend_threshold_pct {
        score += table.trend_adjustment;
    } else if snapshot.price_change_pct < -table.trend_threshold_pct {
        score -= table.trend_adjustment;
    }

    MarketOpportunityScore {
        score: clamp_score(score),
        status,
        signal: snapshot.signal,
        demand_level: demand_level(snapshot.demand_index),
    }
}

/// Weighted blend of the three sub-scores, rounded to one decimal
pub fn composite(env: f64, crop: f64, market: f64, weights: &CompositeWeights) -> CompositeScore {
    let env = clamp_score(env);
    let crop = clamp_score(crop);
    let market = clamp_score(market);
    let blended =
        weights.environmental * env + weights.crop_health * crop + weights.market * market;

    CompositeScore {
        environmental_score: env,
        crop_health_score: crop,
        market_score: market,
        composite: clamp_score(round_dp(blended, 1)),
    }
}

/// First tier whose lower bound the score reaches; the last tier catches the rest
pub fn tier_for(score: f64, tiers: &[CompositeTier]) -> Option<&CompositeTier> {
    tiers
        .iter()
        .find(|tier| score >= tier.min_score)
        .or_else(|| tiers.last())
}

/// Harvest shift suggested by the market signal
pub fn harvest_timing(signal: Option<MarketSignal>) -> &'static str {
    match signal {
        Some(MarketSignal::Opportunity) => "+7 days",
        Some(MarketSignal::Risk) => "-3 days",
        _ => "No change",
    }
}

/// Tiered projection for a composite score
pub fn projected_outcome(
    score: &CompositeScore,
    signal: Option<MarketSignal>,
    config: &ScoringConfig,
) -> Option<ProjectedOutcome> {
    let tier = tier_for(score.composite, &config.tiers)?;
    Some(ProjectedOutcome {
        yield_change: tier.yield_change.clone(),
        profit_change: tier.profit_change.clone(),
        risk_level: tier.risk_level,
        harvest_timing: Some(harvest_timing(signal).to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskLevel;

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    fn scan(grade: LeafGrade, confidence: f64, severity: Severity) -> ScanSummary {
        ScanSummary {
            grade,
            disease_type: None,
            confidence,
            severity,
            scanned_at: None,
        }
    }

    fn snapshot(signal: MarketSignal, demand: f64, change: f64) -> MarketSnapshot {
        MarketSnapshot {
            current_price: 200.0,
            prev_price: 200.0,
            price_change_pct: change,
            recent_window: vec![200.0; 7],
            demand_index: demand,
            prev_demand_index: 0.0,
            volatility: 1.0,
            prev_volatility: 1.0,
            signal,
        }
    }

    #[test]
    fn test_environmental_defaults_without_reading() {
        let score = environmental_score(None, &config()).unwrap();
        assert_eq!(score.score, 50.0);
        assert_eq!(score.status, ScoreStatus::Unknown);
    }

    #[test]
    fn test_environmental_uses_health_score() {
        let reading = EnvironmentalReading::new(60.0, 22.0, 70.0, 60.0);
        let score = environmental_score(Some(&reading), &config()).unwrap();
        assert_eq!(score.score, 100.0);
        assert_eq!(score.status, ScoreStatus::Excellent);
        assert_eq!(score.factors.len(), 4);
    }

    #[test]
    fn test_crop_score_without_scans() {
        let score = crop_health_score(&[], &config());
        assert_eq!(score.score, 70.0);
        assert_eq!(score.scans_analyzed, 0);
    }

    #[test]
    fn test_crop_score_weighting() {
        let scans = vec![
            scan(LeafGrade::Healthy, 0.9, Severity::Low),
            scan(LeafGrade::Diseased, 0.8, Severity::High),
        ];
        // (100*0.9 + 30*0.8*0.7) / 2 = (90 + 16.8) / 2
        let score = crop_health_score(&scans, &config());
        assert_eq!(score.score, 53.4);
        assert_eq!(score.status, ScoreStatus::Fair);
        assert_eq!(score.disease_count, 1);
        assert_eq!(score.high_severity_count, 1);
    }

    #[test]
    fn test_crop_score_moderate_discount() {
        let scans = vec![scan(LeafGrade::Stressed, 1.0, Severity::Moderate)];
        assert_eq!(crop_health_score(&scans, &config()).score, 51.0);
    }

    #[test]
    fn test_market_score_adjustments() {
        let c = config();
        assert_eq!(market_opportunity_score(None, &c).score, 50.0);

        let strong = snapshot(MarketSignal::Opportunity, 70.0, 8.0);
        let score = market_opportunity_score(Some(&strong), &c);
        assert_eq!(score.score, 100.0);
        assert_eq!(score.status, MarketOutlook::Favorable);
        assert_eq!(score.demand_level, DemandLevel::High);

        let weak = snapshot(MarketSignal::Risk, 10.0, -8.0);
        let score = market_opportunity_score(Some(&weak), &c);
        assert_eq!(score.score, 20.0);
        assert_eq!(score.demand_level, DemandLevel::Low);

        let calm = snapshot(MarketSignal::Watch, 40.0, 0.0);
        assert_eq!(market_opportunity_score(Some(&calm), &c).score, 50.0);
    }

    #[test]
    fn test_composite_blend() {
        let score = composite(80.0, 60.0, 50.0, &CompositeWeights::default());
        // 32 + 21 + 12.5
        assert_eq!(score.composite, 65.5);
        assert_eq!(composite(100.0, 100.0, 100.0, &CompositeWeights::default()).composite, 100.0);
        assert_eq!(composite(0.0, 0.0, 0.0, &CompositeWeights::default()).composite, 0.0);
    }

    #[test]
    fn test_tiers() {
        let c = config();
        assert_eq!(tier_for(80.0, &c.tiers).unwrap().yield_change, "+8-12%");
        assert_eq!(tier_for(79.9, &c.tiers).unwrap().yield_change, "+4-7%");
        assert_eq!(tier_for(50.0, &c.tiers).unwrap().risk_level, RiskLevel::Medium);
        assert_eq!(tier_for(49.9, &c.tiers).unwrap().risk_level, RiskLevel::High);
        assert_eq!(tier_for(-1.0, &c.tiers).unwrap().profit_change, "-₹1,000-0");
    }

    #[test]
    fn test_projected_outcome_harvest_timing() {
        let c = config();
        let score = composite(90.0, 90.0, 90.0, &c.composite);
        let outcome = projected_outcome(&score, Some(MarketSignal::Opportunity), &c).unwrap();
        assert_eq!(outcome.harvest_timing.as_deref(), Some("+7 days"));
        assert_eq!(outcome.risk_level, RiskLevel::Low);
        assert_eq!(harvest_timing(Some(MarketSignal::Risk)), "-3 days");
        assert_eq!(harvest_timing(None), "No change");
    }
}
