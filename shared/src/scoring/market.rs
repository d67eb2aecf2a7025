//! Market signal classification and price forecasting

use chrono::{Datelike, Duration, NaiveDate};

use crate::config::{MarketThresholds, ScoringConfig};
use crate::error::{ScoringError, ScoringResult};
use crate::models::{
    LocationPriceSummary, MarketSignal, MarketSnapshot, MonthlyMarketStat, PriceForecast,
    PricePoint, PricePointKind, PriceTrend, SellRecommendation, TrendModel,
};
use crate::types::round_dp;

/// Actual points shown on the price chart
pub const SERIES_ACTUAL_POINTS: usize = 10;
/// Weekly forecast points appended to the price chart
pub const SERIES_FORECAST_POINTS: usize = 5;
/// Months covered by the demand/volatility chart
pub const MONTHLY_WINDOW: usize = 12;

fn require_finite(prices: &[f64]) -> ScoringResult<()> {
    if prices.iter().all(|p| p.is_finite()) {
        Ok(())
    } else {
        Err(ScoringError::invalid("price_history", "prices must be finite numbers"))
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Signed percent change from `prev` to `current`
pub fn pct_change(prev: f64, current: f64) -> ScoringResult<f64> {
    if prev == 0.0 {
        return Err(ScoringError::invalid("price_history", "previous price is zero"));
    }
    Ok((current - prev) / prev * 100.0)
}

/// Absolute percent move scaled into a 0-100 demand proxy
pub fn demand_index(prev: f64, current: f64, thresholds: &MarketThresholds) -> ScoringResult<f64> {
    let change = pct_change(prev, current)?.abs();
    Ok((change * thresholds.demand_multiplier).min(thresholds.demand_cap))
}

/// Sample standard deviation over mean, in percent
pub fn volatility(window: &[f64]) -> ScoringResult<f64> {
    if window.len() < 2 {
        return Err(ScoringError::InsufficientData {
            required: 2,
            available: window.len(),
        });
    }
    let m = mean(window);
    if m == 0.0 {
        return Err(ScoringError::ZeroMeanWindow);
    }
    let variance =
        window.iter().map(|p| (p - m).powi(2)).sum::<f64>() / (window.len() - 1) as f64;
    Ok(variance.sqrt() / m * 100.0)
}

/// Condition on one axis of the signal table
#[derive(Debug, Clone, Copy, PartialEq)]
enum Bound {
    Below,
    AtLeast,
    Any,
}

impl Bound {
    fn admits(&self, value: f64, threshold: f64) -> bool {
        match self {
            Bound::Below => value < threshold,
            Bound::AtLeast => value >= threshold,
            Bound::Any => true,
        }
    }
}

/// Demand bound, volatility bound, signal; checked top to bottom
const SIGNAL_TABLE: [(Bound, Bound, MarketSignal); 3] = [
    (Bound::Below, Bound::Below, MarketSignal::Watch),
    (Bound::AtLeast, Bound::Below, MarketSignal::Opportunity),
    (Bound::Any, Bound::AtLeast, MarketSignal::Risk),
];

pub fn classify_signal(demand: f64, volatility: f64, thresholds: &MarketThresholds) -> MarketSignal {
    SIGNAL_TABLE
        .iter()
        .find(|(d, v, _)| {
            d.admits(demand, thresholds.demand_opportunity)
                && v.admits(volatility, thresholds.volatility_risk)
        })
        .map(|(_, _, signal)| *signal)
        .unwrap_or(MarketSignal::Neutral)
}

/// Derive the market state from an ordered price history, oldest first
pub fn analyze_market(prices: &[f64], config: &ScoringConfig) -> ScoringResult<MarketSnapshot> {
    let t = &config.market;
    if prices.len() < t.min_points {
        return Err(ScoringError::InsufficientData {
            required: t.min_points,
            available: prices.len(),
        });
    }
    require_finite(prices)?;

    let n = prices.len();
    let current_price = prices[n - 1];
    let prev_price = prices[n - 2];

    let price_change_pct = pct_change(prev_price, current_price)?;
    let demand = demand_index(prev_price, current_price, t)?;
    let prev_demand = demand_index(prices[n - 3], prev_price, t)?;

    let w = t.volatility_window;
    let recent_window = prices[n.saturating_sub(w)..].to_vec();
    let vol = volatility(&recent_window)?;
    let prev_vol = if n >= 2 * w {
        volatility(&prices[n - 2 * w..n - w])?
    } else {
        vol
    };

    Ok(MarketSnapshot {
        current_price,
        prev_price,
        price_change_pct,
        recent_window,
        demand_index: demand,
        prev_demand_index: prev_demand,
        volatility: vol,
        prev_volatility: prev_vol,
        signal: classify_signal(demand, vol, t),
    })
}

impl TrendModel {
    /// `last_price + slope * steps`
    pub fn forecast(&self, steps: usize) -> f64 {
        self.last_price + self.slope * steps as f64
    }

    /// Least-squares line over the series index, anchored on the last price
    pub fn fit(prices: &[f64]) -> ScoringResult<Self> {
        if prices.len() < 2 {
            return Err(ScoringError::InsufficientData {
                required: 2,
                available: prices.len(),
            });
        }
        require_finite(prices)?;

        let n = prices.len() as f64;
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = mean(prices);
        let (num, den) = prices
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(num, den), (i, y)| {
                let dx = i as f64 - x_mean;
                (num + dx * (y - y_mean), den + dx * dx)
            });

        Ok(TrendModel {
            last_price: prices[prices.len() - 1],
            slope: num / den,
        })
    }
}

/// Forecast one step per history point and compare with the history mean
pub fn price_forecast(model: &TrendModel, history: &[f64]) -> ScoringResult<PriceForecast> {
    if history.is_empty() {
        return Err(ScoringError::MissingField("price_history".to_string()));
    }
    require_finite(history)?;

    let forecast = model.forecast(history.len());
    let recommendation = if forecast > mean(history) {
        SellRecommendation::Sell
    } else {
        SellRecommendation::Hold
    };

    Ok(PriceForecast {
        forecast_price: round_dp(forecast, 2),
        recommendation,
    })
}

/// Last actual prices followed by weekly forecast points from a fitted slope
pub fn price_series(history: &[(NaiveDate, f64)]) -> ScoringResult<Vec<PricePoint>> {
    let start = history.len().saturating_sub(SERIES_ACTUAL_POINTS);
    let recent = &history[start..];
    let prices: Vec<f64> = recent.iter().map(|(_, p)| *p).collect();
    let model = TrendModel::fit(&prices)?;

    let mut series: Vec<PricePoint> = recent
        .iter()
        .map(|(date, price)| PricePoint {
            date: *date,
            price: round_dp(*price, 2),
            kind: PricePointKind::Actual,
        })
        .collect();

    let (last_date, _) = recent[recent.len() - 1];
    for step in 1..=SERIES_FORECAST_POINTS {
        series.push(PricePoint {
            date: last_date + Duration::weeks(step as i64),
            price: round_dp(model.forecast(step), 2),
            kind: PricePointKind::Forecast,
        });
    }

    Ok(series)
}

/// Compare the latest price with the previous one using a ±1% dead band
pub fn price_trend(current: f64, prev: f64) -> PriceTrend {
    if current > prev * 1.01 {
        PriceTrend::Up
    } else if current < prev * 0.99 {
        PriceTrend::Down
    } else {
        PriceTrend::Stable
    }
}

/// Display name of a market column: "guwahati" -> "Guwahati", "tea_serve" -> "Tea Serve"
pub fn market_display_name(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Average, range, latest price and trend of one market column
pub fn location_summary(market: &str, prices: &[f64]) -> Option<LocationPriceSummary> {
    let current = *prices.last()?;
    let prev = if prices.len() > 1 {
        prices[prices.len() - 2]
    } else {
        current
    };
    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(LocationPriceSummary {
        location: market_display_name(market),
        avg_price: round_dp(mean(prices), 2),
        current_price: round_dp(current, 2),
        min_price: round_dp(min, 2),
        max_price: round_dp(max, 2),
        trend: price_trend(current, prev),
    })
}

/// Monthly sample count and volatility for the last twelve months.
///
/// Rows without a price still open their month; a month with fewer than two
/// prices reports zero volatility.
pub fn monthly_demand_volatility(rows: &[(NaiveDate, Option<f64>)]) -> Vec<MonthlyMarketStat> {
    let mut months: std::collections::BTreeMap<(i32, u32), Vec<f64>> = Default::default();
    for (date, price) in rows {
        let bucket = months.entry((date.year(), date.month())).or_default();
        if let Some(p) = price {
            bucket.push(*p);
        }
    }

    let skip = months.len().saturating_sub(MONTHLY_WINDOW);
    months
        .into_iter()
        .skip(skip)
        .map(|((year, month), prices)| {
            let label = NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format("%b %Y").to_string())
                .unwrap_or_default();
            MonthlyMarketStat {
                month: label,
                demand: prices.len() as u32 * 100,
                volatility: volatility(&prices).map(|v| round_dp(v, 2)).unwrap_or(0.0),
            }
        })
        .collect()
}

/// Canned explanation of a market signal
pub fn signal_message(snapshot: &MarketSnapshot) -> String {
    let demand = snapshot.demand_index as i64;
    match snapshot.signal {
        MarketSignal::Watch => format!(
            "Demand pressure remains very low ({}/100) while price volatility is stable. \
             Avoid aggressive production or inventory buildup. \
             Maintain current supply and monitor for early demand recovery.",
            demand
        ),
        MarketSignal::Opportunity => format!(
            "Demand is showing recovery signals ({}/100) with stable prices. \
             Gradual production scaling may help capture upside.",
            demand
        ),
        MarketSignal::Risk => format!(
            "Market volatility is elevated ({:.2}%). \
             Price instability increases short-term risk. \
             Consider quicker sales cycles and cautious pricing.",
            snapshot.volatility
        ),
        MarketSignal::Neutral => {
            "Market conditions are mixed. Continue monitoring closely.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> MarketThresholds {
        MarketThresholds::default()
    }

    #[test]
    fn test_signal_table() {
        let t = thresholds();
        assert_eq!(classify_signal(15.0, 1.0, &t), MarketSignal::Watch);
        assert_eq!(classify_signal(25.0, 1.0, &t), MarketSignal::Opportunity);
        assert_eq!(classify_signal(20.0, 2.99, &t), MarketSignal::Opportunity);
        assert_eq!(classify_signal(0.0, 5.0, &t), MarketSignal::Risk);
        assert_eq!(classify_signal(100.0, 3.0, &t), MarketSignal::Risk);
        assert_eq!(classify_signal(f64::NAN, f64::NAN, &t), MarketSignal::Neutral);
    }

    #[test]
    fn test_demand_index_capped() {
        let t = thresholds();
        assert!((demand_index(100.0, 102.0, &t).unwrap() - 10.0).abs() < 1e-9);
        assert!((demand_index(100.0, 98.0, &t).unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(demand_index(100.0, 150.0, &t).unwrap(), 100.0);
        assert_eq!(demand_index(100.0, 100.0, &t).unwrap(), 0.0);
    }

    #[test]
    fn test_volatility_sample_stdev() {
        // values 1..=5: sample stdev sqrt(2.5), mean 3
        let v = volatility(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((v - 2.5f64.sqrt() / 3.0 * 100.0).abs() < 1e-9);
        assert_eq!(volatility(&[5.0, 5.0, 5.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_volatility_guards() {
        assert_eq!(volatility(&[0.0, 0.0]), Err(ScoringError::ZeroMeanWindow));
        assert!(matches!(
            volatility(&[1.0]),
            Err(ScoringError::InsufficientData { required: 2, available: 1 })
        ));
    }

    #[test]
    fn test_analyze_requires_three_points() {
        let config = ScoringConfig::default();
        assert_eq!(
            analyze_market(&[200.0, 201.0], &config),
            Err(ScoringError::InsufficientData {
                required: 3,
                available: 2
            })
        );
    }

    #[test]
    fn test_analyze_flat_market_is_watch() {
        let config = ScoringConfig::default();
        let snapshot = analyze_market(&[200.0; 10], &config).unwrap();
        assert_eq!(snapshot.demand_index, 0.0);
        assert_eq!(snapshot.volatility, 0.0);
        assert_eq!(snapshot.prev_volatility, 0.0);
        assert_eq!(snapshot.recent_window.len(), 7);
        assert_eq!(snapshot.signal, MarketSignal::Watch);
    }

    #[test]
    fn test_previous_window_used_with_fourteen_points() {
        let config = ScoringConfig::default();
        let mut prices = vec![100.0, 120.0, 100.0, 120.0, 100.0, 120.0, 100.0];
        prices.extend([200.0; 7]);
        let snapshot = analyze_market(&prices, &config).unwrap();
        assert_eq!(snapshot.volatility, 0.0);
        assert!(snapshot.prev_volatility > 0.0);
        assert!(snapshot.volatility_change() < 0.0);
    }

    #[test]
    fn test_trend_fit_and_forecast() {
        let model = TrendModel::fit(&[100.0, 102.0, 104.0, 106.0]).unwrap();
        assert!((model.slope - 2.0).abs() < 1e-9);
        assert_eq!(model.last_price, 106.0);
        assert!((model.forecast(3) - 112.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_forecast_recommendation() {
        let rising = TrendModel {
            last_price: 210.0,
            slope: 1.5,
        };
        let result = price_forecast(&rising, &[200.0, 205.0, 210.0]).unwrap();
        assert_eq!(result.forecast_price, 214.5);
        assert_eq!(result.recommendation, SellRecommendation::Sell);

        let falling = TrendModel {
            last_price: 190.0,
            slope: -5.0,
        };
        let result = price_forecast(&falling, &[200.0, 195.0, 190.0]).unwrap();
        assert_eq!(result.recommendation, SellRecommendation::Hold);
    }

    #[test]
    fn test_price_series_shape() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let history: Vec<(NaiveDate, f64)> = (0..12)
            .map(|i| (start + Duration::weeks(i), 200.0 + i as f64))
            .collect();
        let series = price_series(&history).unwrap();
        assert_eq!(series.len(), 15);
        assert_eq!(series[0].price, 202.0);
        assert_eq!(series[10].kind, PricePointKind::Forecast);
        assert_eq!(series[10].date, start + Duration::weeks(12));
        assert!((series[14].price - 216.0).abs() < 1e-9);
    }

    #[test]
    fn test_price_trend_dead_band() {
        assert_eq!(price_trend(102.0, 100.0), PriceTrend::Up);
        assert_eq!(price_trend(98.0, 100.0), PriceTrend::Down);
        assert_eq!(price_trend(100.5, 100.0), PriceTrend::Stable);
    }

    #[test]
    fn test_location_summary() {
        let summary = location_summary("north_bengal", &[180.0, 200.0, 190.0]).unwrap();
        assert_eq!(summary.location, "North Bengal");
        assert_eq!(summary.avg_price, 190.0);
        assert_eq!(summary.min_price, 180.0);
        assert_eq!(summary.max_price, 200.0);
        assert_eq!(summary.trend, PriceTrend::Down);
        assert!(location_summary("empty", &[]).is_none());
    }

    #[test]
    fn test_monthly_stats_keep_last_twelve() {
        let rows: Vec<(NaiveDate, Option<f64>)> = (1..=14)
            .flat_map(|m| {
                let year = if m > 12 { 2024 } else { 2023 };
                let month = if m > 12 { m - 12 } else { m };
                [
                    (NaiveDate::from_ymd_opt(year, month, 7).unwrap(), Some(200.0)),
                    (NaiveDate::from_ymd_opt(year, month, 14).unwrap(), Some(210.0)),
                    (NaiveDate::from_ymd_opt(year, month, 21).unwrap(), None),
                ]
            })
            .collect();
        let stats = monthly_demand_volatility(&rows);
        assert_eq!(stats.len(), 12);
        assert_eq!(stats[0].month, "Mar 2023");
        assert_eq!(stats[11].month, "Feb 2024");
        assert_eq!(stats[0].demand, 200);
        assert!(stats[0].volatility > 0.0);
    }
}
