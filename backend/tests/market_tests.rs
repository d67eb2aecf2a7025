//! Tests for market intelligence
//! Verifies demand, volatility, signal classification and the trend forecast

use chrono::NaiveDate;
use proptest::prelude::*;
use shared::{
    analyze_market, classify_signal, demand_index, location_summary, market_display_name,
    monthly_demand_volatility, pct_change, price_forecast, price_series, price_trend,
    validate_price_history, volatility, MarketSignal, MarketThresholds, PricePointKind,
    PriceTrend, ScoringConfig, ScoringError, SellRecommendation, TrendModel,
};

fn config() -> ScoringConfig {
    ScoringConfig::default()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// =============================================================================
// Demand and volatility
// =============================================================================

mod indicators {
    use super::*;

    #[test]
    fn demand_scales_absolute_change() {
        let t = MarketThresholds::default();
        assert!((demand_index(200.0, 210.0, &t).unwrap() - 25.0).abs() < 1e-9);
        assert!((demand_index(210.0, 199.5, &t).unwrap() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn demand_capped() {
        let t = MarketThresholds::default();
        assert_eq!(demand_index(100.0, 150.0, &t).unwrap(), 100.0);
    }

    #[test]
    fn zero_previous_price_rejected() {
        assert!(pct_change(0.0, 10.0).is_err());
    }

    #[test]
    fn flat_window_has_no_volatility() {
        assert_eq!(volatility(&[200.0, 200.0, 200.0]).unwrap(), 0.0);
    }

    #[test]
    fn volatility_needs_two_points() {
        assert!(matches!(
            volatility(&[200.0]),
            Err(ScoringError::InsufficientData { required: 2, available: 1 })
        ));
    }

    #[test]
    fn zero_mean_window_rejected() {
        assert!(matches!(
            volatility(&[0.0, 0.0]),
            Err(ScoringError::ZeroMeanWindow)
        ));
    }
}

// =============================================================================
// Signal classification
// =============================================================================

mod signals {
    use super::*;

    #[test]
    fn signal_table() {
        let t = MarketThresholds::default();
        assert_eq!(classify_signal(10.0, 1.0, &t), MarketSignal::Watch);
        assert_eq!(classify_signal(20.0, 1.0, &t), MarketSignal::Opportunity);
        assert_eq!(classify_signal(25.0, 3.0, &t), MarketSignal::Risk);
        assert_eq!(classify_signal(5.0, 8.0, &t), MarketSignal::Risk);
    }

    #[test]
    fn flat_market_is_watch() {
        let snapshot = analyze_market(&[200.0; 6], &config()).unwrap();
        assert_eq!(snapshot.demand_index, 0.0);
        assert_eq!(snapshot.signal, MarketSignal::Watch);
    }

    #[test]
    fn calm_rise_is_opportunity() {
        let snapshot = analyze_market(&[200.0, 200.0, 210.0], &config()).unwrap();
        assert_eq!(snapshot.current_price, 210.0);
        assert_eq!(snapshot.prev_price, 200.0);
        assert!(snapshot.volatility < 3.0);
        assert_eq!(snapshot.signal, MarketSignal::Opportunity);
    }

    #[test]
    fn swinging_market_is_risk() {
        let snapshot =
            analyze_market(&[200.0, 260.0, 200.0, 260.0, 200.0], &config()).unwrap();
        assert_eq!(snapshot.signal, MarketSignal::Risk);
    }

    #[test]
    fn short_history_rejected() {
        assert!(matches!(
            analyze_market(&[200.0, 210.0], &config()),
            Err(ScoringError::InsufficientData { required: 3, available: 2 })
        ));
        assert!(validate_price_history(&[200.0, 210.0], 3).is_err());
    }

    #[test]
    fn recent_window_is_last_seven() {
        let prices: Vec<f64> = (0..12).map(|i| 200.0 + i as f64).collect();
        let snapshot = analyze_market(&prices, &config()).unwrap();
        assert_eq!(snapshot.recent_window.len(), 7);
        assert_eq!(snapshot.recent_window[0], 205.0);
    }
}

// =============================================================================
// Forecast and charts
// =============================================================================

mod forecasting {
    use super::*;

    #[test]
    fn trend_fit_on_linear_series() {
        let model = TrendModel::fit(&[100.0, 110.0, 120.0]).unwrap();
        assert!((model.slope - 10.0).abs() < 1e-9);
        assert!((model.forecast(2) - 140.0).abs() < 1e-9);
    }

    #[test]
    fn rising_history_recommends_sell() {
        let history = [100.0, 110.0, 120.0];
        let model = TrendModel::fit(&history).unwrap();
        let forecast = price_forecast(&model, &history).unwrap();
        assert_eq!(forecast.forecast_price, 150.0);
        assert_eq!(forecast.recommendation, SellRecommendation::Sell);
    }

    #[test]
    fn falling_history_recommends_hold() {
        let history = [120.0, 110.0, 100.0];
        let model = TrendModel::fit(&history).unwrap();
        let forecast = price_forecast(&model, &history).unwrap();
        assert_eq!(forecast.forecast_price, 70.0);
        assert_eq!(forecast.recommendation, SellRecommendation::Hold);
    }

    #[test]
    fn empty_history_rejected() {
        let model = TrendModel {
            last_price: 100.0,
            slope: 1.0,
        };
        assert!(matches!(
            price_forecast(&model, &[]),
            Err(ScoringError::MissingField(_))
        ));
    }

    #[test]
    fn series_has_ten_actual_and_five_forecast() {
        let history: Vec<(NaiveDate, f64)> = (0..12)
            .map(|i| (date(2024, 1, 5) + chrono::Duration::weeks(i), 200.0 + i as f64))
            .collect();
        let series = price_series(&history).unwrap();
        assert_eq!(series.len(), 15);
        assert_eq!(
            series.iter().filter(|p| p.kind == PricePointKind::Actual).count(),
            10
        );
        let last_actual = &series[9];
        let first_forecast = &series[10];
        assert_eq!(first_forecast.kind, PricePointKind::Forecast);
        assert_eq!(first_forecast.date, last_actual.date + chrono::Duration::weeks(1));
        assert_eq!(first_forecast.price, 212.0);
    }
}

// =============================================================================
// Location and monthly summaries
// =============================================================================

mod summaries {
    use super::*;

    #[test]
    fn price_trend_dead_band() {
        assert_eq!(price_trend(102.0, 100.0), PriceTrend::Up);
        assert_eq!(price_trend(100.5, 100.0), PriceTrend::Stable);
        assert_eq!(price_trend(98.0, 100.0), PriceTrend::Down);
    }

    #[test]
    fn display_names() {
        assert_eq!(market_display_name("guwahati"), "Guwahati");
        assert_eq!(market_display_name("tea_serve"), "Tea Serve");
    }

    #[test]
    fn location_summary_stats() {
        let summary = location_summary("siliguri", &[200.0, 210.0, 220.0]).unwrap();
        assert_eq!(summary.location, "Siliguri");
        assert_eq!(summary.avg_price, 210.0);
        assert_eq!(summary.min_price, 200.0);
        assert_eq!(summary.max_price, 220.0);
        assert_eq!(summary.trend, PriceTrend::Up);
        assert!(location_summary("siliguri", &[]).is_none());
    }

    #[test]
    fn monthly_counts_priced_weeks() {
        let rows = vec![
            (date(2024, 1, 5), Some(200.0)),
            (date(2024, 1, 12), Some(210.0)),
            (date(2024, 2, 2), Some(205.0)),
            (date(2024, 2, 9), None),
        ];
        let stats = monthly_demand_volatility(&rows);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].month, "Jan 2024");
        assert_eq!(stats[0].demand, 200);
        assert!(stats[0].volatility > 0.0);
        assert_eq!(stats[1].demand, 100);
        assert_eq!(stats[1].volatility, 0.0);
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
        fn demand_within_cap(prev in 1.0..1000.0f64, current in 1.0..1000.0f64) {
            let d = demand_index(prev, current, &MarketThresholds::default()).unwrap();
            prop_assert!((0.0..=100.0).contains(&d));
        }

        #[test]
        fn volatility_non_negative(prices in prop::collection::vec(1.0..1000.0f64, 2..20)) {
            prop_assert!(volatility(&prices).unwrap() >= 0.0);
        }

        #[test]
        fn snapshot_uses_last_two_prices(prices in prop::collection::vec(50.0..500.0f64, 3..30)) {
            let snapshot = analyze_market(&prices, &config()).unwrap();
            prop_assert_eq!(snapshot.current_price, prices[prices.len() - 1]);
            prop_assert_eq!(snapshot.prev_price, prices[prices.len() - 2]);
        }
    }
}
