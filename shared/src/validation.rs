//! Validation utilities for farm inputs
//!
//! Every check returns a `ScoringError` naming the offending field so the
//! boundary layer can surface it without guessing.

use rust_decimal::Decimal;

use crate::error::{ScoringError, ScoringResult};
use crate::models::{EnvironmentalReading, StrategyKind, SurfaceAnalysis};

// ============================================================================
// Sensor Readings
// ============================================================================

fn check_range(field: &str, value: f64, min: f64, max: f64) -> ScoringResult<()> {
    if !value.is_finite() {
        return Err(ScoringError::invalid(field, "must be a finite number"));
    }
    if value < min || value > max {
        return Err(ScoringError::invalid(
            field,
            format!("must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// Validate that every reading value is finite and physically plausible
pub fn validate_reading(reading: &EnvironmentalReading) -> ScoringResult<()> {
    check_range("soil_moisture", reading.soil_moisture, 0.0, 100.0)?;
    check_range("temperature", reading.temperature, -50.0, 70.0)?;
    check_range("humidity", reading.humidity, 0.0, 100.0)?;
    check_range("rainfall_7d", reading.rainfall_7d, 0.0, 5000.0)?;
    check_range("soil_ph", reading.soil_ph, 0.0, 14.0)?;
    if let Some(rain) = reading.rainfall_last_24h {
        check_range("rainfall_last_24h", rain, 0.0, 1000.0)?;
    }
    Ok(())
}

// ============================================================================
// Leaf Scans
// ============================================================================

/// Surface fractions must each lie in [0, 1] and sum to at most 1
pub fn validate_surface(surface: &SurfaceAnalysis) -> ScoringResult<()> {
    for (field, value) in [
        ("green", surface.green),
        ("yellow", surface.yellow),
        ("brown", surface.brown),
        ("dark", surface.dark),
    ] {
        check_range(field, value, 0.0, 1.0)?;
    }
    if surface.total() > 1.0 + 1e-9 {
        return Err(ScoringError::invalid(
            "surface_analysis",
            "fractions must sum to at most 1",
        ));
    }
    Ok(())
}

// ============================================================================
// Market and Selling
// ============================================================================

/// Validate yield quantity (kg) is positive
pub fn validate_yield(yield_kg: Decimal) -> ScoringResult<()> {
    if yield_kg <= Decimal::ZERO {
        return Err(ScoringError::invalid("yield_kg", "yield must be greater than 0"));
    }
    Ok(())
}

/// Price history must be long enough and contain only positive finite prices
pub fn validate_price_history(prices: &[f64], min_points: usize) -> ScoringResult<()> {
    if prices.len() < min_points {
        return Err(ScoringError::InsufficientData {
            required: min_points,
            available: prices.len(),
        });
    }
    if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
        return Err(ScoringError::invalid(
            "price_history",
            "prices must be positive finite numbers",
        ));
    }
    Ok(())
}

pub fn validate_selected_approach(index: usize) -> ScoringResult<StrategyKind> {
    StrategyKind::from_index(index)
        .ok_or_else(|| ScoringError::invalid("selected_approach", "must be 0, 1 or 2"))
}
