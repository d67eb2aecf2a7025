//! Selling-strategy simulator
//!
//! Money is carried as `Decimal` so revenues stay exact to the paisa.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use crate::config::{ScoringConfig, SellingParameters};
use crate::error::{ScoringError, ScoringResult};
use crate::models::{
    FactorSeverity, MarketConditions, MarketSignal, NoActionOutcome, RevenueComparison,
    RiskFactor, SellingInput, SellingPlan, SellingProjection, StrategyKind, StrategyOutcome,
};
use crate::types::RiskLevel;
use crate::validation::{validate_selected_approach, validate_yield};

fn money(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Multiplication that reports overflow against `field` instead of panicking
fn product(a: Decimal, b: Decimal, field: &str) -> ScoringResult<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| ScoringError::invalid(field, "value too large"))
}

fn validate_input(input: &SellingInput, min_points: usize) -> ScoringResult<()> {
    validate_yield(input.yield_kg)?;
    if input.history_points < min_points {
        return Err(ScoringError::InsufficientData {
            required: min_points,
            available: input.history_points,
        });
    }
    if input.current_price <= Decimal::ZERO {
        return Err(ScoringError::invalid("current_price", "price must be greater than 0"));
    }
    if input.forecast_price < Decimal::ZERO {
        return Err(ScoringError::invalid("forecast_price", "price cannot be negative"));
    }
    Ok(())
}

/// Outcomes of the three strategies, in index order
pub fn simulate_selling(
    input: &SellingInput,
    config: &ScoringConfig,
) -> ScoringResult<Vec<StrategyOutcome>> {
    validate_input(input, config.market.min_points)?;
    let p: &SellingParameters = &config.selling;
    let SellingInput {
        yield_kg,
        current_price,
        forecast_price,
        ..
    } = *input;

    let immediate = StrategyOutcome {
        kind: StrategyKind::ImmediateSale,
        price_per_kg: current_price,
        expected_revenue: money(product(yield_kg, current_price, "yield_kg")?),
        profit_change: Decimal::ZERO,
        yield_impact_pct: Decimal::ZERO,
    };

    let delayed = StrategyOutcome {
        kind: StrategyKind::DelayedSale,
        price_per_kg: money(forecast_price),
        expected_revenue: money(product(yield_kg, forecast_price, "yield_kg")?),
        profit_change: money(product(yield_kg, forecast_price - current_price, "yield_kg")?),
        yield_impact_pct: Decimal::ZERO,
    };

    let premium_price = product(current_price, p.premium_multiplier, "current_price")?;
    let premium_gain = product(
        product(yield_kg, current_price, "yield_kg")?,
        p.premium_multiplier - Decimal::ONE,
        "yield_kg",
    )?;
    let processing_cost = product(yield_kg, p.processing_cost_per_kg, "yield_kg")?;
    let premium = StrategyOutcome {
        kind: StrategyKind::QualityPremium,
        price_per_kg: money(premium_price),
        expected_revenue: money(product(yield_kg, premium_price, "yield_kg")?),
        profit_change: money(
            premium_gain
                .checked_sub(processing_cost)
                .ok_or_else(|| ScoringError::invalid("yield_kg", "value too large"))?,
        ),
        yield_impact_pct: p.premium_yield_penalty_pct,
    };

    Ok(vec![immediate, delayed, premium])
}

/// Selling window label, e.g. "Mar 08 – Mar 13"
pub fn selling_window(today: NaiveDate, params: &SellingParameters) -> String {
    let start = today + Duration::days(params.window_start_days);
    let end = today + Duration::days(params.window_end_days);
    format!("{} – {}", start.format("%b %d"), end.format("%b %d"))
}

fn projection(
    kind: StrategyKind,
    outcome: &StrategyOutcome,
    market: &MarketConditions,
    config: &ScoringConfig,
) -> SellingProjection {
    let calm = market.volatility < config.market.volatility_risk;
    let (risk_level, yield_change) = match kind {
        StrategyKind::ImmediateSale => (RiskLevel::Low, "0%"),
        StrategyKind::DelayedSale => (
            if calm { RiskLevel::Low } else { RiskLevel::Medium },
            if market.signal == MarketSignal::Opportunity {
                "+0-2%"
            } else {
                "-1-0%"
            },
        ),
        StrategyKind::QualityPremium => (RiskLevel::Medium, "-2-0%"),
    };

    let harvest_timing = match (kind, market.signal) {
        (StrategyKind::DelayedSale, MarketSignal::Opportunity) => "+7 days",
        (StrategyKind::ImmediateSale, MarketSignal::Risk) => "-3 days",
        _ => "No change",
    };

    SellingProjection {
        yield_change: yield_change.to_string(),
        profit_change: outcome.profit_change,
        risk_level,
        harvest_timing: harvest_timing.to_string(),
    }
}

fn risk_factors(
    kind: StrategyKind,
    input: &SellingInput,
    market: &MarketConditions,
    window: &str,
    config: &ScoringConfig,
) -> Vec<RiskFactor> {
    let volatile = market.volatility >= config.market.volatility_risk;
    let volatility = RiskFactor {
        factor: "Market Price Volatility".to_string(),
        description: format!(
            "Market volatility is {:.2}%. {}.",
            market.volatility,
            if volatile {
                "High volatility increases price uncertainty"
            } else {
                "Stable market conditions with low volatility"
            }
        ),
        severity: if volatile {
            FactorSeverity::High
        } else {
            FactorSeverity::Low
        },
    };

    let processing_cost = (input.yield_kg * config.selling.processing_cost_per_kg).trunc();
    let strategy = match kind {
        StrategyKind::ImmediateSale => RiskFactor {
            factor: "Immediate Sale Risk".to_string(),
            description: "Selling immediately may miss potential price increases if market improves."
                .to_string(),
            severity: FactorSeverity::Low,
        },
        StrategyKind::DelayedSale => RiskFactor {
            factor: "Storage Risk".to_string(),
            description: format!(
                "Storing tea for {} requires proper facilities to prevent quality degradation.",
                window
            ),
            severity: FactorSeverity::Medium,
        },
        StrategyKind::QualityPremium => RiskFactor {
            factor: "Processing Risk".to_string(),
            description: format!(
                "Processing investment of ₹{} required with {}% yield loss risk during processing.",
                processing_cost,
                config.selling.premium_yield_penalty_pct.abs()
            ),
            severity: FactorSeverity::Medium,
        },
    };

    let (demand_text, demand_severity) = if market.demand_index >= 60.0 {
        ("Strong demand supports stable pricing", FactorSeverity::Low)
    } else if market.demand_index >= 30.0 {
        ("Moderate demand may lead to price pressure", FactorSeverity::Medium)
    } else {
        ("Low demand increases selling difficulty", FactorSeverity::High)
    };
    let demand = RiskFactor {
        factor: "Demand Fluctuation".to_string(),
        description: format!(
            "Current demand index at {}/100. {}.",
            market.demand_index.round(),
            demand_text
        ),
        severity: demand_severity,
    };

    vec![volatility, strategy, demand]
}

/// All three strategies plus the framing of the selected one
pub fn plan_selling(
    input: &SellingInput,
    selected_approach: usize,
    market: &MarketConditions,
    today: NaiveDate,
    config: &ScoringConfig,
) -> ScoringResult<SellingPlan> {
    let kind = validate_selected_approach(selected_approach)?;
    let strategies = simulate_selling(input, config)?;
    let selected = &strategies[kind.index()];

    let base_revenue = strategies[StrategyKind::ImmediateSale.index()].expected_revenue;
    let selected_revenue = selected.expected_revenue;
    let difference = selected_revenue - base_revenue;
    let diff_pct = difference
        .checked_div(base_revenue)
        .map(|ratio| (ratio * Decimal::ONE_HUNDRED).round_dp(1))
        .unwrap_or(Decimal::ZERO);

    let no_action_loss = money(
        product(base_revenue, config.selling.no_action_loss_pct, "yield_kg")? / Decimal::ONE_HUNDRED,
    );

    let window = selling_window(today, &config.selling);

    Ok(SellingPlan {
        projected_outcomes: projection(kind, selected, market, config),
        no_action_outcomes: NoActionOutcome {
            yield_change: "-2-0%".to_string(),
            profit_change: -no_action_loss,
            risk_level: RiskLevel::Medium,
        },
        comparison: RevenueComparison {
            base_revenue,
            selected_revenue,
            revenue_difference: difference,
            revenue_diff_pct: diff_pct,
        },
        risk_factors: risk_factors(kind, input, market, &window, config),
        selected_approach,
        strategies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn input(yield_kg: i64, current: i64, forecast: i64) -> SellingInput {
        SellingInput {
            yield_kg: Decimal::from(yield_kg),
            current_price: Decimal::from(current),
            forecast_price: Decimal::from(forecast),
            history_points: 10,
        }
    }

    fn calm_opportunity() -> MarketConditions {
        MarketConditions {
            signal: MarketSignal::Opportunity,
            volatility: 1.2,
            demand_index: 45.0,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_three_strategies() {
        let outcomes = simulate_selling(&input(100, 200, 220), &ScoringConfig::default()).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].expected_revenue, Decimal::from(20000));
        assert_eq!(outcomes[1].expected_revenue, Decimal::from(22000));
        assert_eq!(outcomes[1].profit_change, Decimal::from(2000));
        assert_eq!(outcomes[2].price_per_kg, Decimal::from(236));
        assert_eq!(outcomes[2].expected_revenue, Decimal::from(23600));
        assert_eq!(outcomes[2].profit_change, Decimal::from(3100));
        assert_eq!(outcomes[2].yield_impact_pct, Decimal::from(-2));
    }

    #[test]
    fn test_rejects_non_positive_yield() {
        let config = ScoringConfig::default();
        assert!(matches!(
            simulate_selling(&input(0, 200, 220), &config),
            Err(ScoringError::InvalidInput { .. })
        ));
        assert!(simulate_selling(&input(-5, 200, 220), &config).is_err());
    }

    #[test]
    fn test_huge_yield_reports_overflow() {
        let huge = SellingInput {
            yield_kg: Decimal::from_str("1000000000000000000000000000").unwrap(),
            ..input(1, 200, 220)
        };
        assert_eq!(
            simulate_selling(&huge, &ScoringConfig::default()),
            Err(ScoringError::invalid("yield_kg", "value too large"))
        );
        assert!(plan_selling(&huge, 0, &calm_opportunity(), today(), &ScoringConfig::default())
            .is_err());
    }

    #[test]
    fn test_rejects_short_history() {
        let mut short = input(100, 200, 220);
        short.history_points = 2;
        assert_eq!(
            simulate_selling(&short, &ScoringConfig::default()),
            Err(ScoringError::InsufficientData {
                required: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_plan_for_delayed_sale() {
        let plan = plan_selling(
            &input(100, 200, 220),
            1,
            &calm_opportunity(),
            today(),
            &ScoringConfig::default(),
        )
        .unwrap();

        assert_eq!(plan.selected_approach, 1);
        assert_eq!(plan.projected_outcomes.harvest_timing, "+7 days");
        assert_eq!(plan.projected_outcomes.risk_level, RiskLevel::Low);
        assert_eq!(plan.projected_outcomes.yield_change, "+0-2%");
        assert_eq!(plan.comparison.revenue_difference, Decimal::from(2000));
        assert_eq!(plan.comparison.revenue_diff_pct, Decimal::from(10));
        assert_eq!(plan.no_action_outcomes.profit_change, Decimal::from(-400));
        assert_eq!(plan.risk_factors.len(), 3);
        assert_eq!(plan.risk_factors[1].factor, "Storage Risk");
        assert!(plan.risk_factors[1].description.contains("Mar 08 – Mar 13"));
        assert_eq!(plan.risk_factors[2].severity, FactorSeverity::Medium);
    }

    #[test]
    fn test_immediate_sale_in_risky_market() {
        let market = MarketConditions {
            signal: MarketSignal::Risk,
            volatility: 4.5,
            demand_index: 10.0,
        };
        let plan =
            plan_selling(&input(50, 180, 170), 0, &market, today(), &ScoringConfig::default())
                .unwrap();
        assert_eq!(plan.projected_outcomes.harvest_timing, "-3 days");
        assert_eq!(plan.projected_outcomes.profit_change, Decimal::ZERO);
        assert_eq!(plan.risk_factors[0].severity, FactorSeverity::High);
        assert_eq!(plan.risk_factors[2].severity, FactorSeverity::High);
    }

    #[test]
    fn test_selected_approach_out_of_range() {
        let result = plan_selling(
            &input(100, 200, 220),
            3,
            &calm_opportunity(),
            today(),
            &ScoringConfig::default(),
        );
        assert!(matches!(result, Err(ScoringError::InvalidInput { .. })));
    }

    #[test]
    fn test_selling_window_label() {
        assert_eq!(
            selling_window(today(), &SellingParameters::default()),
            "Mar 08 – Mar 13"
        );
    }
}
