//! Market price and signal models

use serde::{Deserialize, Serialize};

/// Market-state classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MarketSignal {
    Watch,
    Opportunity,
    Risk,
    Neutral,
}

impl MarketSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSignal::Watch => "watch",
            MarketSignal::Opportunity => "opportunity",
            MarketSignal::Risk => "risk",
            MarketSignal::Neutral => "neutral",
        }
    }

    /// Parse a signal label; `SELL` from the forecast endpoint counts as opportunity
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "watch" => MarketSignal::Watch,
            "opportunity" | "sell" => MarketSignal::Opportunity,
            "risk" => MarketSignal::Risk,
            _ => MarketSignal::Neutral,
        }
    }
}

impl std::fmt::Display for MarketSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market state derived from a price history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub current_price: f64,
    pub prev_price: f64,
    /// Signed week-over-week change (%)
    pub price_change_pct: f64,
    /// Last (up to) seven prices, oldest first
    pub recent_window: Vec<f64>,
    pub demand_index: f64,
    pub prev_demand_index: f64,
    /// Coefficient of variation of the recent window (%)
    pub volatility: f64,
    pub prev_volatility: f64,
    pub signal: MarketSignal,
}

impl MarketSnapshot {
    pub fn demand_change(&self) -> f64 {
        self.demand_index - self.prev_demand_index
    }

    pub fn volatility_change(&self) -> f64 {
        self.volatility - self.prev_volatility
    }

    pub fn price_direction(&self) -> PriceTrend {
        if self.current_price < self.prev_price {
            PriceTrend::Down
        } else {
            PriceTrend::Up
        }
    }
}

/// Stored linear trend model for price forecasting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrendModel {
    pub last_price: f64,
    pub slope: f64,
}

/// Hold-or-sell recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SellRecommendation {
    Sell,
    Hold,
}

/// Forecast for a submitted price history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceForecast {
    pub forecast_price: f64,
    pub recommendation: SellRecommendation,
}

/// Direction of the latest price move
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Up,
    Down,
    Stable,
}

impl PriceTrend {
    /// Direction wording used in generated-text context
    pub fn wording(&self) -> &'static str {
        match self {
            PriceTrend::Up => "upward",
            PriceTrend::Down => "downward",
            PriceTrend::Stable => "stable",
        }
    }
}

/// One point of the price chart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    pub date: chrono::NaiveDate,
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: PricePointKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PricePointKind {
    Actual,
    Forecast,
}

/// Monthly sample count and volatility of the primary market
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyMarketStat {
    /// Month label, e.g. "Mar 2024"
    pub month: String,
    /// Number of priced weeks times 100
    pub demand: u32,
    pub volatility: f64,
}

/// Price summary for one market location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationPriceSummary {
    pub location: String,
    pub avg_price: f64,
    pub current_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub trend: PriceTrend,
}
