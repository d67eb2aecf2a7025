//! Farmer action simulator

use crate::models::{MarketSignal, SimulatorInput, SimulatorOutcome};
use crate::types::RiskLevel;

const YIELD_RANGE: (i32, i32) = (-10, 20);
const PROFIT_RANGE: (i32, i32) = (-3000, 8000);

/// Directional yield and profit impact of acting on the current signals.
///
/// Leaf grade sets the baseline, field risk adjusts yield and the market
/// signal adjusts profit and harvest timing.
pub fn simulate_action(input: &SimulatorInput) -> SimulatorOutcome {
    let (mut yield_change, mut profit_change) = match input.leaf_grade.trim() {
        "A" => (10, 3000),
        "B" => (6, 1500),
        _ => (2, 500),
    };

    let risk_level = if input.pest_risk == RiskLevel::High || input.drought_risk == RiskLevel::High
    {
        yield_change -= 5;
        RiskLevel::High
    } else if input.health_score > 80 {
        yield_change += 4;
        RiskLevel::Low
    } else {
        RiskLevel::Medium
    };

    let harvest_shift = match input.market_signal {
        MarketSignal::Opportunity => {
            profit_change += 2000;
            7
        }
        MarketSignal::Risk => {
            profit_change -= 1500;
            -3
        }
        _ => 0,
    };

    SimulatorOutcome {
        expected_yield_change_pct: yield_change.clamp(YIELD_RANGE.0, YIELD_RANGE.1),
        estimated_profit_change: profit_change.clamp(PROFIT_RANGE.0, PROFIT_RANGE.1),
        risk_level,
        recommended_harvest_shift_days: harvest_shift,
        explanation: vec![
            "Simulation combines leaf quality, field risk, and market signals".to_string(),
            "Rule-based engine used for transparent decision support".to_string(),
            "Values represent estimated directional impact, not guarantees".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(grade: &str, health: u8, pest: RiskLevel, signal: MarketSignal) -> SimulatorInput {
        SimulatorInput {
            leaf_grade: grade.to_string(),
            leaf_confidence: 0.9,
            health_score: health,
            pest_risk: pest,
            drought_risk: RiskLevel::Low,
            market_signal: signal,
            market_demand: 40.0,
            volatility: 1.0,
        }
    }

    #[test]
    fn test_best_case() {
        let out = simulate_action(&input("A", 90, RiskLevel::Low, MarketSignal::Opportunity));
        assert_eq!(out.expected_yield_change_pct, 14);
        assert_eq!(out.estimated_profit_change, 5000);
        assert_eq!(out.risk_level, RiskLevel::Low);
        assert_eq!(out.recommended_harvest_shift_days, 7);
    }

    #[test]
    fn test_high_field_risk() {
        let out = simulate_action(&input("C", 90, RiskLevel::High, MarketSignal::Risk));
        assert_eq!(out.expected_yield_change_pct, -3);
        assert_eq!(out.estimated_profit_change, -1000);
        assert_eq!(out.risk_level, RiskLevel::High);
        assert_eq!(out.recommended_harvest_shift_days, -3);
    }

    #[test]
    fn test_middling_health_is_medium_risk() {
        let out = simulate_action(&input("B", 70, RiskLevel::Medium, MarketSignal::Watch));
        assert_eq!(out.expected_yield_change_pct, 6);
        assert_eq!(out.estimated_profit_change, 1500);
        assert_eq!(out.risk_level, RiskLevel::Medium);
        assert_eq!(out.recommended_harvest_shift_days, 0);
        assert_eq!(out.explanation.len(), 3);
    }

    #[test]
    fn test_outputs_stay_in_range() {
        for grade in ["A", "B", "C"] {
            for signal in [MarketSignal::Opportunity, MarketSignal::Risk, MarketSignal::Neutral] {
                for pest in [RiskLevel::Low, RiskLevel::High] {
                    let out = simulate_action(&input(grade, 95, pest, signal));
                    assert!((-10..=20).contains(&out.expected_yield_change_pct));
                    assert!((-3000..=8000).contains(&out.estimated_profit_change));
                }
            }
        }
    }
}
