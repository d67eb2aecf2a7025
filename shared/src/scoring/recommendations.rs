//! Rule-based strategic recommendations over four time horizons

use crate::models::{
    CropHealthScore, EnvironmentalReading, EnvironmentalScore, LeafGrade, MarketOpportunityScore,
    MarketSignal, MarketSnapshot, Priority, RecommendedAction, ScanSummary, Severity,
    StrategicRecommendations,
};
use crate::types::round_dp;

/// Raw inputs the recommendation rules look at besides the sub-scores
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanContext<'a> {
    pub reading: Option<&'a EnvironmentalReading>,
    pub scans: &'a [ScanSummary],
    pub market: Option<&'a MarketSnapshot>,
    pub forecast_price: Option<f64>,
}

fn action(action: &str, reason: String) -> RecommendedAction {
    RecommendedAction {
        action: action.to_string(),
        reason,
        priority: None,
        timeline: None,
        expected_benefit: None,
    }
}

fn with_priority(mut rec: RecommendedAction, priority: Priority) -> RecommendedAction {
    rec.priority = Some(priority);
    rec
}

fn with_timeline(mut rec: RecommendedAction, timeline: &str) -> RecommendedAction {
    rec.timeline = Some(timeline.to_string());
    rec
}

fn with_benefit(mut rec: RecommendedAction, benefit: String) -> RecommendedAction {
    rec.expected_benefit = Some(benefit);
    rec
}

/// Field actions for the next 0-3 days
fn immediate_actions(ctx: &PlanContext<'_>) -> Vec<RecommendedAction> {
    let mut actions = Vec::new();

    if let Some(r) = ctx.reading {
        if r.soil_moisture < 50.0 {
            actions.push(with_priority(
                action(
                    "Increase irrigation immediately",
                    format!(
                        "Soil moisture at {}% is below optimal range (55-65%)",
                        r.soil_moisture
                    ),
                ),
                Priority::High,
            ));
        } else if r.soil_moisture > 70.0 {
            actions.push(with_priority(
                action(
                    "Reduce irrigation and improve drainage",
                    format!(
                        "Soil moisture at {}% is above optimal range, risk of root rot",
                        r.soil_moisture
                    ),
                ),
                Priority::High,
            ));
        }

        if r.temperature > 28.0 {
            actions.push(with_priority(
                action(
                    "Implement shade management and increase irrigation",
                    format!(
                        "Temperature at {}°C exceeds optimal range (18-26°C)",
                        r.temperature
                    ),
                ),
                Priority::Medium,
            ));
        }

        if r.humidity < 60.0 {
            actions.push(with_priority(
                action(
                    "Increase misting or irrigation to raise humidity",
                    format!("Humidity at {}% is below optimal range (65-75%)", r.humidity),
                ),
                Priority::Medium,
            ));
        }
    }

    let diseased = ctx
        .scans
        .iter()
        .filter(|s| s.grade == LeafGrade::Diseased)
        .count();
    let high_severity = ctx
        .scans
        .iter()
        .filter(|s| s.grade == LeafGrade::Diseased && s.severity == Severity::High)
        .count();

    if high_severity > 0 {
        actions.push(with_priority(
            action(
                "Apply targeted fungicide treatment immediately",
                format!("Detected {} high-severity disease cases", high_severity),
            ),
            Priority::Critical,
        ));
    } else if diseased > 0 {
        actions.push(with_priority(
            action(
                "Inspect affected plants and apply preventive treatment",
                format!("Detected {} diseased leaf samples", diseased),
            ),
            Priority::High,
        ));
    }

    actions
}

/// Crop programme for the next 1-2 weeks
fn short_term_strategy(
    env: &EnvironmentalScore,
    crop: &CropHealthScore,
) -> Vec<RecommendedAction> {
    let mut actions = Vec::new();

    if crop.score < 70.0 {
        actions.push(with_timeline(
            action(
                "Implement intensive crop monitoring program",
                format!("Crop health score at {}/100 requires attention", crop.score),
            ),
            "1-2 weeks",
        ));
    }

    if env.score >= 80.0 && crop.score >= 75.0 {
        actions.push(with_timeline(
            action(
                "Optimize fertilization schedule for maximum yield",
                "Environmental and crop conditions are favorable for growth acceleration"
                    .to_string(),
            ),
            "1-2 weeks",
        ));
    }

    actions
}

/// Harvest and selling timing for the next 2-4 weeks
fn market_timing(ctx: &PlanContext<'_>) -> Vec<RecommendedAction> {
    let Some(market) = ctx.market else {
        return Vec::new();
    };

    let rec = match market.signal {
        MarketSignal::Opportunity => {
            let current = market.current_price;
            match ctx.forecast_price {
                Some(forecast) if forecast > current && current > 0.0 => with_benefit(
                    action(
                        "Delay harvest by 7-10 days to capture price increase",
                        format!(
                            "Forecast shows price increase from ₹{} to ₹{}",
                            round_dp(current, 2),
                            round_dp(forecast, 2)
                        ),
                    ),
                    format!(
                        "+{}% revenue",
                        round_dp((forecast - current) / current * 100.0, 1)
                    ),
                ),
                _ => with_benefit(
                    action(
                        "Prepare for harvest within optimal window",
                        "Market demand is strong, prices stable".to_string(),
                    ),
                    "Capture current favorable pricing".to_string(),
                ),
            }
        }
        MarketSignal::Risk => with_benefit(
            action(
                "Accelerate harvest if crop is ready",
                "Market volatility is high, secure current prices".to_string(),
            ),
            "Avoid potential price decline".to_string(),
        ),
        MarketSignal::Watch => with_benefit(
            action(
                "Monitor market daily, maintain flexible harvest schedule",
                "Low demand and stable prices suggest waiting for better conditions".to_string(),
            ),
            "Optimize timing for demand recovery".to_string(),
        ),
        MarketSignal::Neutral => return Vec::new(),
    };

    vec![rec]
}

/// Investments for the next 1-3 months
fn long_term_planning(
    env: &EnvironmentalScore,
    crop: &CropHealthScore,
    market: &MarketOpportunityScore,
) -> Vec<RecommendedAction> {
    let mut actions = Vec::new();

    if env.score < 60.0 {
        actions.push(with_timeline(
            action(
                "Invest in soil improvement and irrigation infrastructure",
                "Environmental conditions are suboptimal for sustained productivity".to_string(),
            ),
            "1-3 months",
        ));
    }

    if crop.disease_count > 0 {
        actions.push(with_timeline(
            action(
                "Implement integrated pest management (IPM) program",
                format!(
                    "Disease detected in {} scans, preventive measures needed",
                    crop.disease_count
                ),
            ),
            "Ongoing",
        ));
    }

    if market.score >= 70.0 {
        actions.push(with_timeline(
            action(
                "Consider expanding production capacity",
                "Market conditions are favorable for growth".to_string(),
            ),
            "2-3 months",
        ));
    }

    actions
}

/// Build recommendations for all four horizons
pub fn strategic_recommendations(
    env: &EnvironmentalScore,
    crop: &CropHealthScore,
    market: &MarketOpportunityScore,
    ctx: &PlanContext<'_>,
) -> StrategicRecommendations {
    StrategicRecommendations {
        immediate_actions: immediate_actions(ctx),
        short_term_strategy: short_term_strategy(env, crop),
        market_timing: market_timing(ctx),
        long_term_planning: long_term_planning(env, crop, market),
    }
}
