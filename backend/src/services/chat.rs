//! Farm assistant chat
//!
//! Every question is answered against a summary of the farm's current data.
//! When the text service fails or stays silent the reply comes from a keyword
//! table instead.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    assess_environment, average_readings, cultivation_action, market_display_name, round_dp,
    EnvironmentalReading, FieldRisks, HealthAssessment, Language, MarketSnapshot, ScanSummary,
    ScoringConfig, SensorAverages,
};
use validator::Validate;

use crate::error::AppResult;
use crate::external::{extract_actions, EnrichmentRequest, Recommender};
use crate::services::cultivation::CultivationService;
use crate::services::leaf_quality::LeafQualityService;
use crate::services::market::MarketService;
use crate::services::readings::{
    daily_metrics, DailyMetric, ReadingService, AVERAGES_WINDOW, SERIES_WINDOW,
};

const HISTORY_TURNS: usize = 6;
const RECENT_SCANS: usize = 3;
const PRICE_WEEKS: usize = 4;
const DAILY_DAYS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ReplySource {
    #[serde(rename = "AI")]
    Ai,
    Fallback,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub source: ReplySource,
    pub suggested_actions: Vec<String>,
}

/// Current health of the latest reading
#[derive(Debug, Clone)]
pub struct FieldHealth {
    pub reading: EnvironmentalReading,
    pub assessment: HealthAssessment,
    pub risks: FieldRisks,
    pub alert_active: bool,
}

#[derive(Debug, Clone)]
pub struct MarketContext {
    pub name: String,
    pub snapshot: MarketSnapshot,
    pub week_ending: Option<NaiveDate>,
    pub recent_prices: Vec<(NaiveDate, f64)>,
    pub locations: Vec<(String, f64)>,
}

/// Everything the assistant knows about the farm
#[derive(Debug, Clone, Default)]
pub struct FarmContext {
    pub field: Option<FieldHealth>,
    pub averages: Option<SensorAverages>,
    /// (previous, current) soil moisture of the two latest readings
    pub soil_trend: Option<(f64, f64)>,
    pub market: Option<MarketContext>,
    /// Newest first
    pub scans: Vec<ScanSummary>,
    pub daily: Vec<DailyMetric>,
}

impl FarmContext {
    /// Plain-text summary handed to the text service
    pub fn summary(&self) -> String {
        let mut out = String::from("=== COMPLETE FARM DATA ===\n\n");

        if let Some(field) = &self.field {
            let r = &field.reading;
            let _ = write!(
                out,
                "CURRENT SENSOR READINGS:\n  - Soil Moisture: {}%\n  - Temperature: {}°C\n  \
                 - Humidity: {}%\n  - Rainfall (7 days): {}mm\n  - Soil pH: {}\n\n",
                r.soil_moisture, r.temperature, r.humidity, r.rainfall_7d, r.soil_ph
            );
        }

        if let Some(a) = &self.averages {
            let _ = write!(
                out,
                "FARM AVERAGES (Last {} readings):\n  - Avg Soil Moisture: {}%\n  \
                 - Avg Temperature: {}°C\n  - Avg Humidity: {}%\n  - Avg Rainfall: {}mm\n  \
                 - Sample Count: {}\n\n",
                AVERAGES_WINDOW,
                round_dp(a.soil_moisture, 2),
                round_dp(a.temperature, 2),
                round_dp(a.humidity, 2),
                round_dp(a.rainfall_7d, 2),
                a.sample_count
            );
        }

        if let Some((previous, current)) = self.soil_trend {
            let _ = write!(
                out,
                "SOIL MOISTURE TREND:\n  - Current: {}%\n  - Previous: {}%\n  - Change: {}% ({})\n\n",
                current,
                previous,
                round_dp(current - previous, 1),
                if current > previous { "increasing" } else { "decreasing" }
            );
        }

        if let Some(field) = &self.field {
            let assessment = &field.assessment;
            let _ = writeln!(
                out,
                "CULTIVATION HEALTH ANALYSIS:\n  - Health Score: {}/100\n  - Pest Risk: {}\n  \
                 - Drought Risk: {}\n  - Recommended Action: {}",
                assessment.health_score,
                field.risks.pest_risk,
                field.risks.drought_risk,
                cultivation_action(&field.risks)
            );
            for (factor, status) in &assessment.score_explanation {
                let _ = writeln!(out, "  - {} Status: {:?}", factor, status);
            }
            let _ = write!(
                out,
                "\nSMART ALERTS:\n  - Alert Active: {}\n  - Health Score: {}/100\n  - Risk Score: {}/100\n",
                if field.alert_active { "YES" } else { "NO" },
                assessment.health_score,
                assessment.risk_score
            );
            let stressed: Vec<_> = assessment
                .stress_breakdown
                .iter()
                .filter(|(_, v)| **v > 0.0)
                .collect();
            if !stressed.is_empty() {
                out.push_str("  - Stress Factors:\n");
                for (factor, value) in stressed {
                    let _ = writeln!(out, "    - {}: {}", factor, value);
                }
            }
            out.push('\n');
        }

        if let Some(m) = &self.market {
            let s = &m.snapshot;
            let _ = write!(
                out,
                "MARKET INTELLIGENCE ({}):\n  - Current Price: ₹{}/kg\n  - Previous Price: ₹{}/kg\n  \
                 - Price Change: {}% ({})\n  - Demand Index: {}/100\n  - Market Volatility: {}\n",
                m.name,
                round_dp(s.current_price, 2),
                round_dp(s.prev_price, 2),
                round_dp(s.price_change_pct, 2),
                if s.price_change_pct > 0.0 { "increasing" } else { "decreasing" },
                round_dp(s.demand_index, 1),
                round_dp(s.volatility, 2)
            );
            if let Some(week) = m.week_ending {
                let _ = writeln!(out, "  - Week Ending: {}", week.format("%Y-%m-%d"));
            }
            if !m.recent_prices.is_empty() {
                out.push_str("  - Recent Price History:\n");
                for (week, price) in &m.recent_prices {
                    let _ = writeln!(out, "    - {}: ₹{}/kg", week.format("%b %d"), price);
                }
            }
            if !m.locations.is_empty() {
                out.push_str("  - Prices at Other Markets:\n");
                for (name, price) in &m.locations {
                    let _ = writeln!(out, "    - {}: ₹{}/kg", name, price);
                }
            }
            out.push('\n');
        }

        if let Some(latest) = self.scans.first() {
            let _ = writeln!(out, "LEAF QUALITY SCANS:\n  - Latest Grade: {}", latest.grade);
            if let Some(disease) = &latest.disease_type {
                let _ = writeln!(out, "  - Disease Detected: {}", disease);
            }
            let _ = write!(
                out,
                "  - Confidence: {}\n  - Severity: {}\n  - Total Scans in History: {}\n\n",
                latest.confidence,
                latest.severity,
                self.scans.len()
            );
        }

        if !self.daily.is_empty() {
            out.push_str("DAILY METRICS (Last 7 days):\n");
            let skip = self.daily.len().saturating_sub(DAILY_DAYS);
            for day in &self.daily[skip..] {
                let _ = writeln!(
                    out,
                    "  - {}: Moisture={}%, Temp={}°C, Humidity={}%",
                    day.day, day.soil_moisture, day.temperature, day.humidity
                );
            }
            out.push('\n');
        }

        out
    }
}

fn language_instruction(language: Language) -> &'static str {
    match language {
        Language::Hindi => {
            "CRITICAL: The user is asking in HINDI. You MUST respond ENTIRELY in HINDI (Devanagari script).\n\
             Use natural, conversational Hindi that a farmer in Assam would understand."
        }
        Language::Assamese => {
            "CRITICAL: The user is asking in ASSAMESE. You MUST respond ENTIRELY in ASSAMESE (Bengali script).\n\
             Use natural, conversational Assamese that a tea farmer would understand."
        }
        Language::English => "The user is asking in ENGLISH. Respond in clear, simple English.",
    }
}

fn capitalize(role: &str) -> String {
    let mut chars = role.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn chat_prompt(request: &ChatRequest, context: &FarmContext) -> String {
    let skip = request.history.len().saturating_sub(HISTORY_TURNS);
    let history: String = request.history[skip..]
        .iter()
        .map(|m| format!("{}: {}\n", capitalize(&m.role), m.content))
        .collect();

    format!(
        "You are an expert tea agronomist and farming assistant for a tea cultivation platform in Assam, India.\n\n\
         {}\n\n\
         Your role:\n\
         - Provide accurate, practical advice on tea cultivation, leaf quality, pest management, irrigation, and market timing\n\
         - Use the provided REAL-TIME farm data to give context-aware recommendations\n\
         - ALWAYS reference actual numbers from the data when answering questions\n\
         - Be concise but informative (2-5 sentences typically)\n\n\
         Critical guidelines:\n\
         - DO NOT invent numbers or data not provided in the context\n\
         - If you don't have specific data, clearly state that and provide general best practices\n\
         - For urgent issues (high pest risk, severe disease, low health score), emphasize immediate action\n\n\
         {}\n\
         Previous conversation:\n{}\n\
         User question: {}\n\n\
         Provide a helpful, data-driven response. If appropriate, end with 1-3 specific suggested actions \
         (each on a new line starting with \"ACTION:\").",
        language_instruction(Language::detect(&request.message)),
        context.summary(),
        history,
        request.message
    )
}

const FALLBACK_REPLIES: &[(&[&str], &str)] = &[
    (
        &["leaf quality", "improve leaf"],
        "To improve leaf quality, ensure consistent soil moisture (55-65%), maintain optimal \
         temperature (22-25°C), and apply balanced fertilizers. Also monitor for pests regularly \
         and ensure adequate light exposure. The leaf scanner can grade your leaves in real time.",
    ),
    (
        &["irrigation", "water"],
        "For tea plants, irrigation depends on season and soil type. During growing season: 2-3 \
         times weekly. Use drip irrigation for efficiency. Monitor soil moisture with the field sensors.",
    ),
    (
        &["market", "price"],
        "Check the Market Intelligence tab for detailed price forecasts and optimal selling \
         windows. Market trends are updated weekly based on auction data from major markets.",
    ),
    (
        &["pest", "disease"],
        "Common tea plant pests: Green leaf hopper, Scale insect, and Tea mosquito. Prevention: \
         Regular scouting, integrated pest management, organic neem spray. Quarantine affected \
         plants. Early detection is key!",
    ),
    (
        &["fertilizer", "nutrient"],
        "Tea plants need NPK ratio around 4:2:2. Apply 500-750 kg/hectare annually. Use organic \
         matter to improve soil structure. Split applications: after each harvest. Foliar feeding \
         with micronutrients boosts quality. Soil test results recommended.",
    ),
    (
        &["harvest", "picking"],
        "Harvest tea leaves at the 2-3 leaf stage for best quality. Morning picking (after dew \
         dries) is preferred. Use two leaves + bud (2LB) for premium grades.",
    ),
    (
        &["soil moisture"],
        "Optimal soil moisture for tea plants is 55-65%. Too low causes stress and poor quality. \
         Too high leads to root diseases. Use the field sensors for real-time monitoring.",
    ),
    (
        &["temperature"],
        "Ideal temperature range for tea cultivation is 18-26°C. Temperatures above 30°C cause \
         heat stress. Below 15°C slows growth. Monitor daily and adjust shade management accordingly.",
    ),
    (
        &["humidity"],
        "Tea plants thrive in 65-75% humidity. Low humidity increases water stress and pest \
         susceptibility. High humidity can promote fungal diseases. Proper canopy management \
         helps regulate microclimate.",
    ),
    (
        &["kaise", "kya", "mujhe", "chai", "पानी", "मिट्टी"],
        "मैं आपकी मदद करने के लिए यहाँ हूँ। कृपया अपना सवाल अंग्रेजी में पूछें या विशिष्ट विषय चुनें: \
         पत्ती की गुणवत्ता, सिंचाई, बाजार मूल्य, या कीट नियंत्रण।",
    ),
];

const DEFAULT_REPLY: &str = "That's a great question! Based on your current farm data, I recommend \
     checking the relevant dashboard tab for detailed insights. You can also explore the \
     Cultivation Intelligence, Leaf Quality Scanner, or Market Intelligence sections. Is there \
     anything specific I can help clarify?";

/// Canned reply for the first keyword group found in the message
pub fn fallback_reply(message: &str) -> &'static str {
    let lower = message.to_lowercase();
    FALLBACK_REPLIES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, reply)| *reply)
        .unwrap_or(DEFAULT_REPLY)
}

/// Answers questions against a farm context
#[derive(Clone)]
pub struct ChatAssistant {
    recommender: Recommender,
}

impl ChatAssistant {
    pub fn new(recommender: Recommender) -> Self {
        Self { recommender }
    }

    pub async fn reply(&self, request: &ChatRequest, context: &FarmContext) -> ChatResponse {
        let generated = self
            .recommender
            .text(EnrichmentRequest::new("chat", chat_prompt(request, context)))
            .await;

        if let Some(text) = generated {
            let (response, suggested_actions) = extract_actions(&text);
            if !response.is_empty() {
                return ChatResponse {
                    response,
                    source: ReplySource::Ai,
                    suggested_actions,
                };
            }
        }

        ChatResponse {
            response: fallback_reply(&request.message).to_string(),
            source: ReplySource::Fallback,
            suggested_actions: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct ChatService {
    readings: ReadingService,
    scans: LeafQualityService,
    market: MarketService,
    cultivation: CultivationService,
    scoring: Arc<ScoringConfig>,
    assistant: ChatAssistant,
}

impl ChatService {
    pub fn new(
        readings: ReadingService,
        scans: LeafQualityService,
        market: MarketService,
        cultivation: CultivationService,
        scoring: Arc<ScoringConfig>,
        assistant: ChatAssistant,
    ) -> Self {
        Self {
            readings,
            scans,
            market,
            cultivation,
            scoring,
            assistant,
        }
    }

    /// Gather what is available; each source that fails is left out
    pub async fn context(&self, farm_id: &str) -> FarmContext {
        let mut context = FarmContext::default();

        let recent = self
            .readings
            .recent(farm_id, AVERAGES_WINDOW)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Chat context without readings: {}", e);
                Vec::new()
            });

        if let Some(latest) = recent.first() {
            match assess_environment(latest, &self.scoring) {
                Ok(assessment) => match self.cultivation.field_risks(latest).await {
                    Ok(risks) => {
                        context.field = Some(FieldHealth {
                            reading: latest.clone(),
                            alert_active: assessment.health_score
                                <= self.scoring.alert_health_threshold,
                            assessment,
                            risks,
                        })
                    }
                    Err(e) => tracing::warn!("Chat context without field risks: {}", e),
                },
                Err(e) => tracing::warn!("Chat context without health: {}", e),
            }
        }
        context.averages = average_readings(&recent).ok();

        let timed: Vec<_> = recent
            .iter()
            .take(SERIES_WINDOW as usize)
            .filter(|r| r.recorded_at.is_some())
            .collect();
        if let [current, previous, ..] = timed.as_slice() {
            context.soil_trend = Some((
                round_dp(previous.soil_moisture, 1),
                round_dp(current.soil_moisture, 1),
            ));
        }

        if let Some(snapshot) = self.market.try_snapshot() {
            let (week_ending, locations) = self.market.latest_location_prices();
            context.market = Some(MarketContext {
                name: market_display_name(self.market.primary_market()),
                snapshot,
                week_ending,
                recent_prices: self.market.recent_prices(PRICE_WEEKS),
                locations,
            });
        }

        let week_ago = Utc::now() - Duration::days(7);
        match self.scans.scans_since(farm_id, week_ago).await {
            Ok(scans) => context.scans = scans.into_iter().take(RECENT_SCANS).collect(),
            Err(e) => tracing::warn!("Chat context without leaf scans: {}", e),
        }
        match self.readings.since(farm_id, week_ago).await {
            Ok(week) => context.daily = daily_metrics(&week),
            Err(e) => tracing::warn!("Chat context without daily metrics: {}", e),
        }

        context
    }

    pub async fn chat(&self, farm_id: &str, request: &ChatRequest) -> AppResult<ChatResponse> {
        request.validate()?;
        let context = self.context(farm_id).await;
        let response = self.assistant.reply(request, &context).await;
        tracing::debug!("Chat reply from {:?}", response.source);
        Ok(response)
    }
}
