//! Selling strategies and the farmer action simulator

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    market_display_name, plan_selling, round_dp, selling_window, simulate_action,
    MarketConditions, MarketSignal, NoActionOutcome, Priority, RevenueComparison, RiskFactor,
    ScoringConfig, SellingInput, SellingProjection, SimulatorInput, SimulatorOutcome,
    StrategyKind, StrategyOutcome,
};

use crate::error::{AppError, AppResult};
use crate::services::market::MarketService;

/// Harvest to sell and the strategy the farmer is looking at
#[derive(Debug, Deserialize)]
pub struct YieldInput {
    pub yield_kg: Decimal,
    #[serde(default)]
    pub selected_approach: usize,
}

/// One strategy as shown on the planner
#[derive(Debug, Clone, Serialize)]
pub struct StrategyCard {
    pub title: &'static str,
    pub description: String,
    pub expected_revenue: Decimal,
    pub revenue_display: String,
    pub timing: String,
    pub priority: Priority,
    pub price_per_kg: Decimal,
    pub yield_impact: Decimal,
    pub profit_change: Decimal,
}

/// Market numbers the strategies were computed from
#[derive(Debug, Clone, Serialize)]
pub struct StrategyMarketData {
    pub current_price: f64,
    pub forecast_price: f64,
    pub price_change_pct: f64,
    pub forecast_increase_pct: f64,
    pub volatility: f64,
    pub signal: MarketSignal,
    pub demand_index: f64,
    pub selling_window: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct YieldStrategyReport {
    pub strategies: Vec<StrategyCard>,
    pub selected_approach: usize,
    pub market_data: StrategyMarketData,
    pub projected_outcomes: SellingProjection,
    pub no_action_outcomes: NoActionOutcome,
    pub comparison: RevenueComparison,
    pub risk_factors: Vec<RiskFactor>,
}

/// Whole rupees with thousands separators, e.g. `₹1,234,567`
pub fn format_rupees(amount: Decimal) -> String {
    let whole = amount.trunc().abs().to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if amount < Decimal::ZERO && amount.trunc() != Decimal::ZERO {
        format!("-₹{}", grouped)
    } else {
        format!("₹{}", grouped)
    }
}

fn to_money(value: f64, field: &str) -> AppResult<Decimal> {
    Decimal::try_from(value)
        .map(|d| d.round_dp(2))
        .map_err(|_| AppError::Internal(format!("{} is not representable: {}", field, value)))
}

struct CardContext<'a> {
    market: &'a str,
    yield_kg: Decimal,
    signal: MarketSignal,
    window: &'a str,
    forecast_increase_pct: f64,
    processing_cost: Decimal,
    premium_pct: Decimal,
}

fn card(outcome: &StrategyOutcome, ctx: &CardContext<'_>) -> StrategyCard {
    let risk = ctx.signal == MarketSignal::Risk;
    let revenue = format_rupees(outcome.expected_revenue);

    let (description, revenue_display, timing, priority) = match outcome.kind {
        StrategyKind::ImmediateSale => (
            format!(
                "Sell {} kg immediately at current {} market rate of ₹{}/kg. This approach \
                 minimizes storage costs and provides immediate cash flow. Best for farmers \
                 needing quick liquidity.",
                ctx.yield_kg, ctx.market, outcome.price_per_kg
            ),
            revenue,
            "Immediate (1-2 days)".to_string(),
            if risk { Priority::High } else { Priority::Medium },
        ),
        StrategyKind::DelayedSale => (
            format!(
                "Store yield and sell during {} when {} prices are forecasted to reach ₹{:.2}/kg. \
                 Implement proper storage to maintain quality. Expected price increase of {:+.1}%.",
                ctx.window, ctx.market, outcome.price_per_kg, ctx.forecast_increase_pct
            ),
            format!("{} ({:+.1}%)", revenue, ctx.forecast_increase_pct),
            ctx.window.to_string(),
            if ctx.signal == MarketSignal::Opportunity {
                Priority::High
            } else {
                Priority::Medium
            },
        ),
        StrategyKind::QualityPremium => (
            format!(
                "Invest in post-harvest processing to improve grade quality. Target premium {} \
                 buyers willing to pay 15-20% more (₹{:.2}/kg) for superior quality tea. Requires \
                 additional processing time and investment of ~{}.",
                ctx.market,
                outcome.price_per_kg,
                format_rupees(ctx.processing_cost)
            ),
            format!("{} (+{}%)", revenue, ctx.premium_pct),
            "7-14 days (processing time)".to_string(),
            if risk { Priority::Low } else { Priority::High },
        ),
    };

    StrategyCard {
        title: outcome.kind.title(),
        description,
        expected_revenue: outcome.expected_revenue,
        revenue_display,
        timing,
        priority,
        price_per_kg: outcome.price_per_kg,
        yield_impact: outcome.yield_impact_pct,
        profit_change: outcome.profit_change,
    }
}

#[derive(Clone)]
pub struct StrategyService {
    market: MarketService,
    scoring: Arc<ScoringConfig>,
}

impl StrategyService {
    pub fn new(market: MarketService, scoring: Arc<ScoringConfig>) -> Self {
        Self { market, scoring }
    }

    /// Three selling strategies against the current primary-market state
    pub fn calculate(&self, input: &YieldInput, today: NaiveDate) -> AppResult<YieldStrategyReport> {
        let snapshot = self.market.snapshot()?;
        let forecast = self
            .market
            .next_week_forecast()
            .unwrap_or(snapshot.current_price);
        let current_price = to_money(snapshot.current_price, "current_price")?;
        let forecast_price = to_money(forecast, "forecast_price")?;

        let selling_input = SellingInput {
            yield_kg: input.yield_kg,
            current_price,
            forecast_price,
            history_points: self.market.history_points(),
        };
        let conditions = MarketConditions {
            signal: snapshot.signal,
            volatility: snapshot.volatility,
            demand_index: snapshot.demand_index,
        };
        let plan = plan_selling(
            &selling_input,
            input.selected_approach,
            &conditions,
            today,
            &self.scoring,
        )?;

        let window = selling_window(today, &self.scoring.selling);
        let forecast_increase_pct = (forecast - snapshot.current_price) / snapshot.current_price * 100.0;
        let market = market_display_name(self.market.primary_market());
        let ctx = CardContext {
            market: &market,
            yield_kg: input.yield_kg,
            signal: snapshot.signal,
            window: &window,
            forecast_increase_pct,
            processing_cost: (input.yield_kg * self.scoring.selling.processing_cost_per_kg).trunc(),
            premium_pct: ((self.scoring.selling.premium_multiplier - Decimal::ONE)
                * Decimal::ONE_HUNDRED)
                .normalize(),
        };

        tracing::debug!(
            "Yield strategy for {} kg: signal={} selected={}",
            input.yield_kg,
            snapshot.signal,
            input.selected_approach
        );

        Ok(YieldStrategyReport {
            strategies: plan.strategies.iter().map(|o| card(o, &ctx)).collect(),
            selected_approach: plan.selected_approach,
            market_data: StrategyMarketData {
                current_price: round_dp(snapshot.current_price, 2),
                forecast_price: round_dp(forecast, 2),
                price_change_pct: round_dp(snapshot.price_change_pct, 1),
                forecast_increase_pct: round_dp(forecast_increase_pct, 1),
                volatility: round_dp(snapshot.volatility, 2),
                signal: snapshot.signal,
                demand_index: round_dp(snapshot.demand_index, 0),
                selling_window: window,
            },
            projected_outcomes: plan.projected_outcomes,
            no_action_outcomes: plan.no_action_outcomes,
            comparison: plan.comparison,
            risk_factors: plan.risk_factors,
        })
    }
}

/// Directional outcome of the recommended farmer action
pub fn simulate(input: &SimulatorInput) -> SimulatorOutcome {
    let outcome = simulate_action(input);
    tracing::debug!(
        "Simulated action: yield {}% profit {} risk {}",
        outcome.expected_yield_change_pct,
        outcome.estimated_profit_change,
        outcome.risk_level
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::Recommender;
    use crate::services::market::tests::sample_data;
    use crate::services::market::MarketData;

    fn service(data: MarketData) -> StrategyService {
        let scoring = Arc::new(ScoringConfig::default());
        let market = MarketService::new(Arc::new(data), scoring.clone(), Recommender::disabled());
        StrategyService::new(market, scoring)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_format_rupees() {
        assert_eq!(format_rupees(Decimal::new(123456789, 2)), "₹1,234,567");
        assert_eq!(format_rupees(Decimal::from(999)), "₹999");
        assert_eq!(format_rupees(Decimal::from(1000)), "₹1,000");
        assert_eq!(format_rupees(Decimal::from(-2130)), "-₹2,130");
        assert_eq!(format_rupees(Decimal::ZERO), "₹0");
    }

    #[test]
    fn test_strategy_cards() {
        let input = YieldInput {
            yield_kg: Decimal::from(1000),
            selected_approach: 2,
        };
        let report = service(sample_data()).calculate(&input, today()).unwrap();

        assert_eq!(report.strategies.len(), 3);
        let immediate = &report.strategies[0];
        assert_eq!(immediate.expected_revenue, Decimal::from(213_000));
        assert_eq!(immediate.revenue_display, "₹213,000");
        assert_eq!(immediate.timing, "Immediate (1-2 days)");

        let premium = &report.strategies[2];
        assert_eq!(premium.price_per_kg, Decimal::new(25134, 2));
        assert_eq!(premium.revenue_display, "₹251,340 (+18%)");
        assert!(premium.description.contains("~₹5,000"));

        assert_eq!(report.market_data.selling_window, "Mar 08 – Mar 13");
        assert_eq!(report.comparison.revenue_diff_pct, Decimal::from(18));
        assert_eq!(report.risk_factors.len(), 3);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let svc = service(sample_data());
        let zero = YieldInput {
            yield_kg: Decimal::ZERO,
            selected_approach: 0,
        };
        assert!(matches!(svc.calculate(&zero, today()), Err(AppError::Validation { .. })));

        let out_of_range = YieldInput {
            yield_kg: Decimal::from(10),
            selected_approach: 3,
        };
        assert!(matches!(
            svc.calculate(&out_of_range, today()),
            Err(AppError::Validation { .. })
        ));
    }

    #[test]
    fn test_requires_market_data() {
        let svc = service(MarketData::new(None, "guwahati"));
        let input = YieldInput {
            yield_kg: Decimal::from(10),
            selected_approach: 0,
        };
        assert!(matches!(
            svc.calculate(&input, today()),
            Err(AppError::MarketDataUnavailable)
        ));
    }
}
