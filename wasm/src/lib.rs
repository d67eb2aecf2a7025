//! WebAssembly module for the Tea Farm Advisor dashboard
//!
//! Provides client-side computation for:
//! - Field health score and stress breakdown of a manual reading
//! - Leaf grade fusion from surface fractions and a classifier verdict
//! - Market signal of a price history
//! - Selling strategies and the farmer action simulator
//!
//! Every binding takes and returns JSON strings and uses the default scoring
//! configuration, so the dashboard sees the same numbers the server would.

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

use shared::{
    analyze_market, assess_environment, fuse, simulate_action, simulate_selling, ScoringConfig,
};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages in browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js(result: Result<String, String>) -> Result<String, JsValue> {
    result.map_err(|e| JsValue::from_str(&e))
}

fn parse_reading(reading_json: &str) -> Result<EnvironmentalReading, String> {
    let input: ReadingInput = serde_json::from_str(reading_json)
        .map_err(|e| format!("Invalid reading JSON: {}", e))?;
    EnvironmentalReading::try_from(input).map_err(|e| e.to_string())
}

fn health_assessment_json(reading_json: &str) -> Result<String, String> {
    let reading = parse_reading(reading_json)?;
    let assessment =
        assess_environment(&reading, &ScoringConfig::default()).map_err(|e| e.to_string())?;
    serde_json::to_string(&assessment).map_err(|e| e.to_string())
}

/// Health score, risk score and per-factor stress of a reading
#[wasm_bindgen]
pub fn assess_reading(reading_json: &str) -> Result<String, JsValue> {
    to_js(health_assessment_json(reading_json))
}

/// Health score (0-100) of a reading, or 0 when it does not validate
#[wasm_bindgen]
pub fn calculate_health_score(reading_json: &str) -> u8 {
    parse_reading(reading_json)
        .and_then(|r| {
            assess_environment(&r, &ScoringConfig::default()).map_err(|e| e.to_string())
        })
        .map(|a| a.health_score)
        .unwrap_or(0)
}

fn leaf_decision_json(
    classifier_label: Option<String>,
    classifier_confidence_pct: u8,
    green: f64,
    yellow: f64,
    brown: f64,
    dark: f64,
) -> Result<String, String> {
    let surface = SurfaceAnalysis::new(green, yellow, brown, dark);
    validate_surface(&surface).map_err(|e| e.to_string())?;
    let classifier =
        classifier_label.map(|label| ClassifierOutput::new(label, classifier_confidence_pct));
    let decision = fuse(classifier.as_ref(), &surface, &ScoringConfig::default());
    serde_json::to_string(&decision).map_err(|e| e.to_string())
}

/// Fuse a classifier verdict (if any) with the surface fractions
#[wasm_bindgen]
pub fn fuse_leaf_decision(
    classifier_label: Option<String>,
    classifier_confidence_pct: u8,
    green: f64,
    yellow: f64,
    brown: f64,
    dark: f64,
) -> Result<String, JsValue> {
    to_js(leaf_decision_json(
        classifier_label,
        classifier_confidence_pct,
        green,
        yellow,
        brown,
        dark,
    ))
}

fn market_snapshot_json(prices_json: &str) -> Result<String, String> {
    let prices: Vec<f64> = serde_json::from_str(prices_json)
        .map_err(|e| format!("Invalid prices JSON: {}", e))?;
    let snapshot = analyze_market(&prices, &ScoringConfig::default()).map_err(|e| e.to_string())?;
    serde_json::to_string(&snapshot).map_err(|e| e.to_string())
}

/// Demand, volatility and signal of a price history, oldest first
#[wasm_bindgen]
pub fn analyze_price_history(prices_json: &str) -> Result<String, JsValue> {
    to_js(market_snapshot_json(prices_json))
}

fn selling_strategies_json(
    yield_kg: f64,
    current_price: f64,
    forecast_price: f64,
    history_points: usize,
) -> Result<String, String> {
    let decimal = |value: f64, field: &str| {
        Decimal::try_from(value).map_err(|_| format!("{} is not a finite number", field))
    };
    let input = SellingInput {
        yield_kg: decimal(yield_kg, "yield_kg")?,
        current_price: decimal(current_price, "current_price")?,
        forecast_price: decimal(forecast_price, "forecast_price")?,
        history_points,
    };
    let strategies =
        simulate_selling(&input, &ScoringConfig::default()).map_err(|e| e.to_string())?;
    serde_json::to_string(&strategies).map_err(|e| e.to_string())
}

/// Revenue of the three selling strategies for an expected yield
#[wasm_bindgen]
pub fn calculate_selling_strategies(
    yield_kg: f64,
    current_price: f64,
    forecast_price: f64,
    history_points: usize,
) -> Result<String, JsValue> {
    to_js(selling_strategies_json(
        yield_kg,
        current_price,
        forecast_price,
        history_points,
    ))
}

fn simulation_json(input_json: &str) -> Result<String, String> {
    let input: SimulatorInput = serde_json::from_str(input_json)
        .map_err(|e| format!("Invalid simulator JSON: {}", e))?;
    serde_json::to_string(&simulate_action(&input)).map_err(|e| e.to_string())
}

/// Yield, profit and harvest-timing impact of the recommended action
#[wasm_bindgen]
pub fn simulate_farmer_action(input_json: &str) -> Result<String, JsValue> {
    to_js(simulation_json(input_json))
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDEAL_READING: &str =
        r#"{"soil_moisture": 60, "temperature": 22, "humidity": 70, "rainfall_7d": 60}"#;

    #[test]
    fn test_health_score_ideal_reading() {
        assert_eq!(calculate_health_score(IDEAL_READING), 100);
    }

    #[test]
    fn test_health_score_invalid_reading() {
        assert_eq!(calculate_health_score(r#"{"soil_moisture": 60}"#), 0);
        assert_eq!(calculate_health_score("not json"), 0);
    }

    #[test]
    fn test_assessment_has_no_stressed_factors() {
        let json = health_assessment_json(IDEAL_READING).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["risk_score"], 0);
        assert!(value["stressed_factors"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_leaf_fusion_without_classifier() {
        let json = leaf_decision_json(None, 0, 0.9, 0.02, 0.01, 0.0).unwrap();
        let decision: LeafDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(decision.final_grade, LeafGrade::Healthy);
        assert_eq!(decision.confidence_pct, 0);
        assert!(decision.cnn_prediction.is_none());
    }

    #[test]
    fn test_leaf_fusion_classifier_disease_is_final() {
        let json =
            leaf_decision_json(Some("Blister Blight".to_string()), 91, 0.9, 0.02, 0.01, 0.0)
                .unwrap();
        let decision: LeafDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(decision.final_grade, LeafGrade::Diseased);
        assert_eq!(decision.disease_type.as_deref(), Some("Blister Blight"));
    }

    #[test]
    fn test_market_needs_enough_points() {
        assert!(market_snapshot_json("[200.0, 201.0]").is_err());
        assert!(market_snapshot_json("oops").is_err());
    }

    #[test]
    fn test_selling_strategies_immediate_sale() {
        let json = selling_strategies_json(1000.0, 213.0, 220.0, 12).unwrap();
        let strategies: Vec<StrategyOutcome> = serde_json::from_str(&json).unwrap();
        assert_eq!(strategies.len(), 3);
        assert_eq!(strategies[0].kind, StrategyKind::ImmediateSale);
        assert_eq!(strategies[0].expected_revenue, Decimal::from(213_000));
    }

    #[test]
    fn test_selling_strategies_rejects_zero_yield() {
        assert!(selling_strategies_json(0.0, 213.0, 220.0, 12).is_err());
    }

    #[test]
    fn test_selling_strategies_rejects_overflowing_yield() {
        assert!(selling_strategies_json(1e27, 200.0, 220.0, 12).is_err());
    }
}
