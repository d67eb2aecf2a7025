//! Market intelligence over the weekly auction price history

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use shared::{
    analyze_market, location_summary, market_display_name, monthly_demand_volatility,
    price_forecast, price_series, round_dp, signal_message, LocationPriceSummary, MarketSignal,
    MarketSnapshot, MonthlyMarketStat, PriceForecast, PricePoint, ScoringConfig, TrendModel,
};

use crate::config::MarketConfig;
use crate::error::{AppError, AppResult};
use crate::external::{BulletStyle, CannedText, EnrichmentRequest, Recommender};

/// Market columns of the auction sheet, in display order
pub const MARKET_COLUMNS: [&str; 9] = [
    "kolkata",
    "guwahati",
    "siliguri",
    "jalpaiguri",
    "mjunction",
    "cochin",
    "coonoor",
    "coimbatore",
    "tea_serve",
];

const DATE_COLUMN: &str = "week_ending_date";
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d"];

/// "Week Ending Date" -> "week_ending_date"
fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace([' ', '/'], "_")
}

/// First number in a cell such as "Rs. 212.50 (est)"
fn extract_price(cell: &str) -> Option<f64> {
    let start = cell.find(|c: char| c.is_ascii_digit())?;
    let rest = &cell[start..];
    let mut seen_dot = false;
    let end = rest
        .char_indices()
        .find(|(_, c)| {
            if *c == '.' && !seen_dot {
                seen_dot = true;
                false
            } else {
                !c.is_ascii_digit()
            }
        })
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}

fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cell = cell.trim();
    // spreadsheet exports may carry a time part
    let date_part = cell.split([' ', 'T']).next().unwrap_or(cell);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// One week of auction prices
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub week_ending: NaiveDate,
    pub prices: BTreeMap<String, Option<f64>>,
}

/// Weekly price table, oldest week first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceHistory {
    rows: Vec<PriceRow>,
}

impl PriceHistory {
    /// Parse a CSV export with a week-ending date column and one column per market
    pub fn from_reader<R: Read>(reader: R) -> AppResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()
            .map_err(|e| AppError::Configuration(format!("Invalid price history header: {}", e)))?
            .iter()
            .map(normalize_header)
            .collect();

        let date_idx = headers
            .iter()
            .position(|h| h == DATE_COLUMN)
            .ok_or_else(|| {
                AppError::Configuration(format!("Price history has no {} column", DATE_COLUMN))
            })?;

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record
                .map_err(|e| AppError::Configuration(format!("Invalid price history row: {}", e)))?;
            let Some(week_ending) = record.get(date_idx).and_then(parse_date) else {
                tracing::debug!("Skipping price row without a date: {:?}", record);
                continue;
            };

            let prices = MARKET_COLUMNS
                .iter()
                .map(|market| {
                    let price = headers
                        .iter()
                        .position(|h| h == market)
                        .and_then(|idx| record.get(idx))
                        .and_then(extract_price);
                    (market.to_string(), price)
                })
                .collect();

            rows.push(PriceRow {
                week_ending,
                prices,
            });
        }

        rows.sort_by_key(|r| r.week_ending);
        Ok(Self { rows })
    }

    pub fn load(path: &str) -> AppResult<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            AppError::Configuration(format!("Cannot open price history {}: {}", path, e))
        })?;
        Self::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every week with the market's price, missing or not
    pub fn column(&self, market: &str) -> Vec<(NaiveDate, Option<f64>)> {
        self.rows
            .iter()
            .map(|r| (r.week_ending, r.prices.get(market).copied().flatten()))
            .collect()
    }

    /// Weeks that carry a price for the market
    pub fn dated_prices(&self, market: &str) -> Vec<(NaiveDate, f64)> {
        self.column(market)
            .into_iter()
            .filter_map(|(date, price)| price.map(|p| (date, p)))
            .collect()
    }

    /// Priced weeks of the market, oldest first
    pub fn prices(&self, market: &str) -> Vec<f64> {
        self.dated_prices(market).into_iter().map(|(_, p)| p).collect()
    }

    pub fn latest(&self) -> Option<&PriceRow> {
        self.rows.last()
    }
}

/// Price history and trend model loaded once at startup
#[derive(Debug, Clone)]
pub struct MarketData {
    pub history: Option<PriceHistory>,
    pub primary_market: String,
    pub trend_model: Option<TrendModel>,
}

impl MarketData {
    pub fn new(history: Option<PriceHistory>, primary_market: &str) -> Self {
        let trend_model = history
            .as_ref()
            .and_then(|h| TrendModel::fit(&h.prices(primary_market)).ok());
        Self {
            history,
            primary_market: primary_market.to_string(),
            trend_model,
        }
    }

    /// Load the configured sources; missing data leaves the market endpoints degraded
    pub fn load(config: &MarketConfig) -> Self {
        let history = match PriceHistory::load(&config.price_history_path) {
            Ok(history) => {
                tracing::info!(
                    "Loaded {} weeks of price history from {}",
                    history.len(),
                    config.price_history_path
                );
                Some(history)
            }
            Err(e) => {
                tracing::warn!("Market data unavailable: {}", e);
                None
            }
        };

        let mut data = Self::new(history, &config.primary_market);

        if let Some(path) = &config.trend_model_path {
            match load_trend_model(path) {
                Ok(model) => data.trend_model = Some(model),
                Err(e) => tracing::warn!("Using fitted trend model: {}", e),
            }
        }

        data
    }

    pub fn primary_prices(&self) -> Vec<f64> {
        self.history
            .as_ref()
            .map(|h| h.prices(&self.primary_market))
            .unwrap_or_default()
    }
}

fn load_trend_model(path: &str) -> AppResult<TrendModel> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::Configuration(format!("Cannot read trend model {}: {}", path, e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| AppError::Configuration(format!("Invalid trend model {}: {}", path, e)))
}

/// Headline market numbers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarketKpis {
    pub current_price: f64,
    pub forecast_price: f64,
    pub price_change_pct: f64,
    pub market_demand: f64,
    pub market_demand_change_abs: f64,
    pub volatility: f64,
    pub volatility_change_abs: f64,
}

/// Market signal card
#[derive(Debug, Clone, Serialize)]
pub struct MarketInsight {
    pub signal: MarketSignal,
    pub title: String,
    pub message: String,
    pub ai_message: Option<String>,
    pub ai_recommendations: Vec<String>,
}

fn insight_context(market: &str, snapshot: &MarketSnapshot) -> String {
    format!(
        "- Market: {}\n- Signal: {}\n- Demand index: {}\n- Volatility: {:.2}%\n- Price direction: {}",
        market,
        snapshot.signal,
        snapshot.demand_index as i64,
        snapshot.volatility,
        snapshot.price_direction().wording()
    )
}

#[derive(Clone)]
pub struct MarketService {
    data: Arc<MarketData>,
    scoring: Arc<ScoringConfig>,
    recommender: Recommender,
}

impl MarketService {
    pub fn new(data: Arc<MarketData>, scoring: Arc<ScoringConfig>, recommender: Recommender) -> Self {
        Self {
            data,
            scoring,
            recommender,
        }
    }

    fn history(&self) -> AppResult<&PriceHistory> {
        self.data
            .history
            .as_ref()
            .filter(|h| !h.is_empty())
            .ok_or(AppError::MarketDataUnavailable)
    }

    /// Current market state of the primary market
    pub fn snapshot(&self) -> AppResult<MarketSnapshot> {
        self.history()?;
        Ok(analyze_market(&self.data.primary_prices(), &self.scoring)?)
    }

    /// Snapshot, or `None` when the market cannot be analysed
    pub fn try_snapshot(&self) -> Option<MarketSnapshot> {
        match self.snapshot() {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::debug!("No market snapshot: {}", e);
                None
            }
        }
    }

    pub fn primary_market(&self) -> &str {
        &self.data.primary_market
    }

    /// Weeks of usable primary-market prices
    pub fn history_points(&self) -> usize {
        self.data.primary_prices().len()
    }

    /// Next-week forecast from the trend model
    pub fn next_week_forecast(&self) -> Option<f64> {
        self.data.trend_model.map(|m| round_dp(m.forecast(1), 2))
    }

    pub fn kpis(&self) -> AppResult<MarketKpis> {
        let snapshot = self.snapshot()?;
        Ok(MarketKpis {
            current_price: round_dp(snapshot.current_price, 2),
            forecast_price: self
                .next_week_forecast()
                .unwrap_or_else(|| round_dp(snapshot.current_price, 2)),
            price_change_pct: round_dp(snapshot.price_change_pct, 1),
            market_demand: round_dp(snapshot.demand_index, 0),
            market_demand_change_abs: round_dp(snapshot.demand_change(), 1),
            volatility: round_dp(snapshot.volatility, 2),
            volatility_change_abs: round_dp(snapshot.volatility_change(), 2),
        })
    }

    pub fn price_series(&self) -> AppResult<Vec<PricePoint>> {
        let history = self.history()?;
        Ok(price_series(&history.dated_prices(&self.data.primary_market))?)
    }

    pub fn demand_volatility(&self) -> Vec<MonthlyMarketStat> {
        self.history()
            .map(|h| monthly_demand_volatility(&h.column(&self.data.primary_market)))
            .unwrap_or_default()
    }

    pub fn location_summary(&self) -> Vec<LocationPriceSummary> {
        let Ok(history) = self.history() else {
            return Vec::new();
        };
        MARKET_COLUMNS
            .iter()
            .filter_map(|market| location_summary(market, &history.prices(market)))
            .collect()
    }

    /// Last `weeks` priced weeks of the primary market, oldest first
    pub fn recent_prices(&self, weeks: usize) -> Vec<(NaiveDate, f64)> {
        let Ok(history) = self.history() else {
            return Vec::new();
        };
        let prices = history.dated_prices(&self.data.primary_market);
        prices[prices.len().saturating_sub(weeks)..].to_vec()
    }

    /// Prices of the latest week per market, display names
    pub fn latest_location_prices(&self) -> (Option<NaiveDate>, Vec<(String, f64)>) {
        let Some(row) = self.history().ok().and_then(PriceHistory::latest) else {
            return (None, Vec::new());
        };
        let prices = MARKET_COLUMNS
            .iter()
            .filter_map(|market| {
                let price = row.prices.get(*market).copied().flatten()?;
                Some((market_display_name(market), round_dp(price, 2)))
            })
            .collect();
        (Some(row.week_ending), prices)
    }

    /// Signal card with canned wording plus enriched commentary
    pub async fn insight(&self) -> MarketInsight {
        let snapshot = match self.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::debug!("Market insight without data: {}", e);
                return MarketInsight {
                    signal: MarketSignal::Neutral,
                    title: "Market Insight".to_string(),
                    message: "Insufficient data to generate insight.".to_string(),
                    ai_message: None,
                    ai_recommendations: Vec::new(),
                };
            }
        };

        let market = market_display_name(&self.data.primary_market);
        let context = insight_context(&market, &snapshot);

        let commentary_prompt = format!(
            "You are a tea market analyst specializing in {market} auctions.\n\n\
             Given the following market indicators, provide a concise strategic insight.\n\n\
             Rules:\n- Do NOT invent numbers\n- Do NOT give predictions\n\
             - Focus on interpretation and strategy\n- Professional, neutral tone\n\
             - 2-3 sentences max\n\nMarket Data:\n{context}"
        );
        let strategy_prompt = format!(
            "You are a tea market strategist advising producers in {market}.\n\n\
             Based on the market conditions below, generate 3 concise, actionable strategy recommendations.\n\n\
             Rules:\n- Align strictly with the market signal\n- No numbers unless provided\n\
             - No long-term predictions\n- Bullet points only\n- Professional tone\n\n\
             Market Context:\n{context}"
        );

        let ai_message = self
            .recommender
            .text(EnrichmentRequest::new("market insight", commentary_prompt))
            .await;
        let ai_recommendations = self
            .recommender
            .bullets(
                EnrichmentRequest::new("market strategy", strategy_prompt),
                BulletStyle::Marked,
                Some(4),
                CannedText::default(),
            )
            .await;

        MarketInsight {
            signal: snapshot.signal,
            title: format!("Actionable Market Insight – {}", market),
            message: signal_message(&snapshot),
            ai_message,
            ai_recommendations,
        }
    }

    /// Forecast for a submitted history using the stored trend model
    pub fn forecast(&self, history: &[f64]) -> AppResult<PriceForecast> {
        let model = match self.data.trend_model {
            Some(model) => model,
            None => TrendModel::fit(history)?,
        };
        Ok(price_forecast(&model, history)?)
    }
}
