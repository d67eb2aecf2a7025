//! Tests for the action plan scorers
//! Verifies the sub-scores, the composite blend and the projected outcome tiers

use proptest::prelude::*;
use shared::{
    composite, crop_health_score, environmental_score, harvest_timing, market_opportunity_score,
    projected_outcome, tier_for, DemandLevel, EnvironmentalReading, LeafGrade, MarketOutlook,
    MarketSignal, MarketSnapshot, RiskLevel, ScanSummary, ScoreStatus, ScoringConfig, Severity,
};

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

fn snapshot(signal: MarketSignal, demand_index: f64, price_change_pct: f64) -> MarketSnapshot {
    MarketSnapshot {
        current_price: 210.0,
        prev_price: 205.0,
        price_change_pct,
        recent_window: vec![200.0, 205.0, 210.0],
        demand_index,
        prev_demand_index: demand_index,
        volatility: 1.0,
        prev_volatility: 1.0,
        signal,
    }
}

// =============================================================================
// Sub-scores
// =============================================================================

mod sub_scores {
    use super::*;

    #[test]
    fn environmental_without_reading() {
        let score = environmental_score(None, &config()).unwrap();
        assert_eq!(score.score, 50.0);
        assert_eq!(score.status, ScoreStatus::Unknown);
    }

    #[test]
    fn environmental_is_health_score() {
        let reading = EnvironmentalReading::new(45.0, 22.0, 70.0, 60.0);
        let score = environmental_score(Some(&reading), &config()).unwrap();
        assert_eq!(score.score, 65.0);
        assert_eq!(score.status, ScoreStatus::Fair);
    }

    #[test]
    fn crop_health_without_scans() {
        let score = crop_health_score(&[], &config());
        assert_eq!(score.score, 70.0);
        assert_eq!(score.status, ScoreStatus::Unknown);
        assert_eq!(score.scans_analyzed, 0);
    }

    #[test]
    fn crop_health_discounts_severity_and_confidence() {
        let scans = vec![
            scan(LeafGrade::Healthy, 1.0, Severity::Low),
            scan(LeafGrade::Diseased, 0.8, Severity::High),
        ];
        let score = crop_health_score(&scans, &config());
        // (100 + 30 * 0.8 * 0.7) / 2
        assert_eq!(score.score, 58.4);
        assert_eq!(score.disease_count, 1);
        assert_eq!(score.high_severity_count, 1);
        assert_eq!(score.scans_analyzed, 2);
    }

    #[test]
    fn market_without_snapshot() {
        let score = market_opportunity_score(None, &config());
        assert_eq!(score.score, 50.0);
        assert_eq!(score.status, MarketOutlook::Unknown);
        assert_eq!(score.signal, MarketSignal::Neutral);
    }

    #[test]
    fn market_rewards_strong_demand() {
        let snap = snapshot(MarketSignal::Opportunity, 70.0, 2.0);
        let score = market_opportunity_score(Some(&snap), &config());
        assert_eq!(score.score, 95.0);
        assert_eq!(score.status, MarketOutlook::Favorable);
        assert_eq!(score.demand_level, DemandLevel::High);
    }

    #[test]
    fn market_penalizes_weak_falling_risk() {
        let snap = snapshot(MarketSignal::Risk, 10.0, -8.0);
        let score = market_opportunity_score(Some(&snap), &config());
        assert_eq!(score.score, 20.0);
        assert_eq!(score.status, MarketOutlook::Unfavorable);
        assert_eq!(score.demand_level, DemandLevel::Low);
    }
}

// =============================================================================
// Composite and tiers
// =============================================================================

mod composite_score {
    use super::*;

    #[test]
    fn weighted_blend() {
        let score = composite(80.0, 70.0, 50.0, &config().composite);
        assert_eq!(score.composite, 69.0);
        assert_eq!(score.environmental_score, 80.0);
    }

    #[test]
    fn inputs_clamped() {
        let score = composite(150.0, -10.0, 50.0, &config().composite);
        assert_eq!(score.environmental_score, 100.0);
        assert_eq!(score.crop_health_score, 0.0);
        assert_eq!(score.composite, 52.5);
    }

    #[test]
    fn tier_boundaries() {
        let tiers = &config().tiers;
        assert_eq!(tier_for(80.0, tiers).unwrap().yield_change, "+8-12%");
        assert_eq!(tier_for(79.9, tiers).unwrap().yield_change, "+4-7%");
        assert_eq!(tier_for(50.0, tiers).unwrap().yield_change, "+1-3%");
        assert_eq!(tier_for(0.0, tiers).unwrap().risk_level, RiskLevel::High);
        assert!(tier_for(50.0, &[]).is_none());
    }

    #[test]
    fn harvest_timing_follows_signal() {
        assert_eq!(harvest_timing(Some(MarketSignal::Opportunity)), "+7 days");
        assert_eq!(harvest_timing(Some(MarketSignal::Risk)), "-3 days");
        assert_eq!(harvest_timing(Some(MarketSignal::Watch)), "No change");
        assert_eq!(harvest_timing(None), "No change");
    }

    #[test]
    fn projection_for_good_composite() {
        let score = composite(80.0, 70.0, 50.0, &config().composite);
        let outcome =
            projected_outcome(&score, Some(MarketSignal::Opportunity), &config()).unwrap();
        assert_eq!(outcome.yield_change, "+4-7%");
        assert_eq!(outcome.profit_change, "+₹2,500-4,500");
        assert_eq!(outcome.risk_level, RiskLevel::Low);
        assert_eq!(outcome.harvest_timing.as_deref(), Some("+7 days"));
    }
}

// =============================================================================
// Properties
// =============================================================================

mod properties {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn composite_in_range(env in -50.0..150.0f64, crop in -50.0..150.0f64, market in -50.0..150.0f64) {
            let score = composite(env, crop, market, &config().composite);
            prop_assert!((0.0..=100.0).contains(&score.composite));
        }

        #[test]
        fn every_score_has_a_tier(score in 0.0..=100.0f64) {
            prop_assert!(tier_for(score, &config().tiers).is_some());
        }

        #[test]
        fn crop_health_in_range(confidences in prop::collection::vec(0.0..=1.0f64, 1..10)) {
            let scans: Vec<ScanSummary> = confidences
                .iter()
                .map(|c| scan(LeafGrade::Stressed, *c, Severity::Moderate))
                .collect();
            let score = crop_health_score(&scans, &config());
            prop_assert!((0.0..=100.0).contains(&score.score));
            prop_assert_eq!(score.disease_count, 0);
        }
    }
}
