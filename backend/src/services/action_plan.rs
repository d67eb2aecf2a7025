//! Comprehensive action plan
//!
//! Blends the last week of sensor readings, leaf scans and the market snapshot
//! into a composite score, a tiered projection and recommendations over four
//! horizons. Each generated plan is kept as a history row per farm.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    average_readings, composite, crop_health_score, environmental_score,
    market_opportunity_score, projected_outcome, round_dp, strategic_recommendations,
    CropHealthScore, DemandLevel, EnvironmentalScore, Factor, FactorStatus, LeafGrade,
    MarketOpportunityScore, MarketOutlook, MarketSignal, MarketSnapshot, PlanContext,
    ProjectedOutcome, ScanSummary, ScoreStatus, ScoringConfig, SensorAverages, Severity,
    StrategicRecommendations,
};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::external::{EnrichmentRequest, Recommender};
use crate::services::leaf_quality::LeafQualityService;
use crate::services::market::MarketService;
use crate::services::readings::ReadingService;

/// Days of readings and scans a plan looks back over
pub const LOOKBACK_DAYS: i64 = 7;

const RECENT_SCANS: usize = 3;
const MODEL_ACCURACY: u8 = 89;
const HISTORICAL_SIMILARITY: u8 = 82;

/// Market numbers the plan was computed from
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarketCurrentData {
    pub current_price: f64,
    pub forecast_price: f64,
    pub price_change_pct: f64,
    pub demand_index: f64,
    pub volatility: f64,
    pub signal: MarketSignal,
    pub market: String,
}

/// Everything a plan is computed from
#[derive(Debug, Clone, Default)]
pub struct PlanInputs {
    pub averages: Option<SensorAverages>,
    /// Newest first
    pub scans: Vec<ScanSummary>,
    pub market: Option<MarketSnapshot>,
    pub forecast_price: Option<f64>,
    pub market_name: String,
}

impl PlanInputs {
    fn market_data(&self) -> Option<MarketCurrentData> {
        let snapshot = self.market.as_ref()?;
        Some(MarketCurrentData {
            current_price: round_dp(snapshot.current_price, 2),
            forecast_price: round_dp(
                self.forecast_price.unwrap_or(snapshot.current_price),
                2,
            ),
            price_change_pct: round_dp(snapshot.price_change_pct, 1),
            demand_index: round_dp(snapshot.demand_index, 0),
            volatility: round_dp(snapshot.volatility, 2),
            signal: snapshot.signal,
            market: self.market_name.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentalData {
    pub score: f64,
    pub status: ScoreStatus,
    pub factors: BTreeMap<Factor, FactorStatus>,
    pub latest_reading: Option<SensorAverages>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeafScanSummary {
    pub score: f64,
    pub status: ScoreStatus,
    pub scans_analyzed: usize,
    pub disease_count: usize,
    pub high_severity_count: usize,
    pub recent_scans: Vec<ScanSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketAnalysis {
    pub score: f64,
    pub status: MarketOutlook,
    pub signal: MarketSignal,
    pub demand_level: DemandLevel,
    pub current_data: Option<MarketCurrentData>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanConfidence {
    pub model_accuracy: u8,
    pub market_reliability: u8,
    pub historical_similarity: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataQuality {
    pub sensor_data_available: bool,
    pub leaf_scans_count: usize,
    pub market_data_available: bool,
    pub overall_confidence: &'static str,
}

/// Sources counted into a stored plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSources {
    pub sensor_readings: u8,
    pub leaf_scans: usize,
    pub market_data_available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionPlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub composite_score: f64,
    pub environmental_data: EnvironmentalData,
    pub leaf_scan_summary: LeafScanSummary,
    pub market_analysis: MarketAnalysis,
    pub recommended_actions: StrategicRecommendations,
    pub disease_prevention_approaches: Vec<String>,
    pub projected_outcomes: Option<ProjectedOutcome>,
    pub confidence: PlanConfidence,
    pub ai_insight: Option<String>,
    pub data_quality: DataQuality,
}

impl ActionPlan {
    pub fn data_sources(&self) -> DataSources {
        DataSources {
            sensor_readings: u8::from(self.data_quality.sensor_data_available),
            leaf_scans: self.data_quality.leaf_scans_count,
            market_data_available: self.data_quality.market_data_available,
        }
    }
}

/// Row of the plan history listing
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActionPlanSummary {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub composite_score: f64,
    pub environmental_score: f64,
    pub crop_health_score: f64,
    pub market_opportunity_score: f64,
    pub ai_insight: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionPlanHistory {
    pub count: usize,
    pub plans: Vec<ActionPlanSummary>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct HistoryQuery {
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_history_limit")]
    pub limit: i64,
}

fn default_history_limit() -> i64 {
    10
}

fn label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn prevention_prompt(scans: &[ScanSummary], averages: Option<&SensorAverages>) -> String {
    let diseased: Vec<&ScanSummary> = scans
        .iter()
        .filter(|s| s.grade == LeafGrade::Diseased)
        .collect();
    let types: BTreeSet<&str> = diseased
        .iter()
        .filter_map(|s| s.disease_type.as_deref())
        .collect();
    let types = if types.is_empty() {
        "general leaf stress".to_string()
    } else {
        types.into_iter().collect::<Vec<_>>().join(", ")
    };
    let high = diseased
        .iter()
        .filter(|s| s.severity == Severity::High)
        .count();
    let field = |value: Option<f64>| {
        value
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "unknown".to_string())
    };

    format!(
        "You are an expert tea plant pathologist specializing in disease prevention and treatment.\n\n\
         Based on the analysis below, generate EXACTLY 3 distinct approaches for disease prevention and cure.\n\
         Each approach should be a complete strategy with different methodologies.\n\n\
         Rules:\n- Generate EXACTLY 3 numbered approaches\n\
         - Each approach must be DIFFERENT (e.g., Approach 1: Chemical, Approach 2: Organic, Approach 3: Integrated)\n\
         - Each approach should be 2-3 sentences\n\
         - Focus on ACTIONABLE preventive measures and cures\n\
         - Be specific about treatments and timing\n\
         - No bullet points within approaches, use numbered list only\n\n\
         Analysis Data:\n\
         - Total Leaf Scans (Last 7 Days): {}\n- Diseased Scans Detected: {}\n- Disease Types: {}\n\
         - High Severity Cases: {}\n- Soil Moisture: {}%\n- Temperature: {}°C\n- Humidity: {}%\n\n\
         Generate 3 approaches now:",
        scans.len(),
        diseased.len(),
        types,
        high,
        field(averages.map(|a| a.soil_moisture)),
        field(averages.map(|a| a.temperature)),
        field(averages.map(|a| a.humidity)),
    )
}

fn summary_prompt(
    env: &EnvironmentalScore,
    crop: &CropHealthScore,
    market: &MarketOpportunityScore,
) -> String {
    format!(
        "You are an expert tea farm management advisor specializing in Assam tea cultivation.\n\n\
         Based on the comprehensive farm analysis below, provide a strategic executive summary (3-4 sentences) \
         that highlights the most critical insights and recommended focus areas.\n\n\
         Rules:\n- Be specific and actionable\n- Prioritize the most impactful factors\n\
         - Use professional agricultural language\n\
         - Focus on strategic decisions, not tactical details\n\
         - No bullet points, write in paragraph form\n\n\
         Farm Analysis:\n\
         - Environmental Health: {}/100 ({})\n- Crop Health: {}/100 ({})\n\
         - Market Opportunity: {}/100 ({})\n- Leaf Scans Analyzed: {}\n- Disease Detected: {}",
        env.score,
        label(&env.status),
        crop.score,
        label(&crop.status),
        market.score,
        market.signal,
        crop.scans_analyzed,
        if crop.disease_count > 0 { "Yes" } else { "No" }
    )
}

/// Scores, recommendations and enrichment for one set of inputs
#[derive(Clone)]
pub struct ActionPlanner {
    scoring: Arc<ScoringConfig>,
    recommender: Recommender,
}

impl ActionPlanner {
    pub fn new(scoring: Arc<ScoringConfig>, recommender: Recommender) -> Self {
        Self {
            scoring,
            recommender,
        }
    }

    pub async fn plan(&self, inputs: &PlanInputs, now: DateTime<Utc>) -> AppResult<ActionPlan> {
        let config = &*self.scoring;
        let reading = inputs.averages.as_ref().map(SensorAverages::as_reading);

        let env = environmental_score(reading.as_ref(), config)?;
        let crop = crop_health_score(&inputs.scans, config);
        let market = market_opportunity_score(inputs.market.as_ref(), config);
        let score = composite(env.score, crop.score, market.score, &config.composite);
        let signal = inputs.market.as_ref().map(|m| m.signal);

        let ctx = PlanContext {
            reading: reading.as_ref(),
            scans: &inputs.scans,
            market: inputs.market.as_ref(),
            forecast_price: inputs.forecast_price,
        };
        let recommendations = strategic_recommendations(&env, &crop, &market, &ctx);

        let disease_prevention_approaches = if inputs.scans.is_empty() {
            Vec::new()
        } else {
            self.recommender
                .numbered(
                    EnrichmentRequest::new(
                        "disease-prevention",
                        prevention_prompt(&inputs.scans, inputs.averages.as_ref()),
                    ),
                    3,
                )
                .await
        };
        let ai_insight = self
            .recommender
            .text(EnrichmentRequest::new(
                "executive-summary",
                summary_prompt(&env, &crop, &market),
            ))
            .await;

        let sensor_available = inputs.averages.is_some();
        let market_available = inputs.market.is_some();
        let overall_confidence =
            if sensor_available && !inputs.scans.is_empty() && market_available {
                "high"
            } else {
                "medium"
            };

        tracing::debug!(
            "Action plan: env={} crop={} market={} composite={}",
            env.score,
            crop.score,
            market.score,
            score.composite
        );

        Ok(ActionPlan {
            plan_id: None,
            timestamp: now,
            composite_score: score.composite,
            projected_outcomes: projected_outcome(&score, signal, config),
            environmental_data: EnvironmentalData {
                score: env.score,
                status: env.status,
                factors: env.factors,
                latest_reading: inputs.averages.clone(),
            },
            leaf_scan_summary: LeafScanSummary {
                score: crop.score,
                status: crop.status,
                scans_analyzed: crop.scans_analyzed,
                disease_count: crop.disease_count,
                high_severity_count: crop.high_severity_count,
                recent_scans: inputs.scans.iter().take(RECENT_SCANS).cloned().collect(),
            },
            market_analysis: MarketAnalysis {
                score: market.score,
                status: market.status,
                signal: market.signal,
                demand_level: market.demand_level,
                current_data: inputs.market_data(),
            },
            recommended_actions: recommendations,
            disease_prevention_approaches,
            confidence: PlanConfidence {
                model_accuracy: MODEL_ACCURACY,
                market_reliability: if market_available { 95 } else { 50 },
                historical_similarity: HISTORICAL_SIMILARITY,
            },
            ai_insight,
            data_quality: DataQuality {
                sensor_data_available: sensor_available,
                leaf_scans_count: inputs.scans.len(),
                market_data_available: market_available,
                overall_confidence,
            },
        })
    }
}

#[derive(Clone)]
pub struct ActionPlanService {
    db: PgPool,
    readings: ReadingService,
    scans: LeafQualityService,
    market: MarketService,
    planner: ActionPlanner,
}

impl ActionPlanService {
    pub fn new(
        db: PgPool,
        readings: ReadingService,
        scans: LeafQualityService,
        market: MarketService,
        planner: ActionPlanner,
    ) -> Self {
        Self {
            db,
            readings,
            scans,
            market,
            planner,
        }
    }

    /// Last week of data for the farm; read failures count as no data
    async fn gather(&self, farm_id: &str, now: DateTime<Utc>) -> PlanInputs {
        let since = now - Duration::days(LOOKBACK_DAYS);

        let averages = match self.readings.since(farm_id, since).await {
            Ok(readings) if !readings.is_empty() => average_readings(&readings)
                .map_err(|e| tracing::warn!("Cannot average readings for {}: {}", farm_id, e))
                .ok(),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Sensor readings unavailable for {}: {}", farm_id, e);
                None
            }
        };

        let scans = self
            .scans
            .scans_since(farm_id, since)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Leaf scans unavailable for {}: {}", farm_id, e);
                Vec::new()
            });

        PlanInputs {
            averages,
            scans,
            market: self.market.try_snapshot(),
            forecast_price: self.market.next_week_forecast(),
            market_name: self.market.primary_market().to_string(),
        }
    }

    /// Build a plan for the farm and keep it in the history
    pub async fn generate(&self, farm_id: &str) -> AppResult<ActionPlan> {
        let now = Utc::now();
        let inputs = self.gather(farm_id, now).await;
        let mut plan = self.planner.plan(&inputs, now).await?;

        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO action_plans (id, farm_id, composite_score, environmental_score,
                                      crop_health_score, market_opportunity_score,
                                      recommendations, ai_insight, data_sources, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(farm_id)
        .bind(plan.composite_score)
        .bind(plan.environmental_data.score)
        .bind(plan.leaf_scan_summary.score)
        .bind(plan.market_analysis.score)
        .bind(Json(&plan.recommended_actions))
        .bind(&plan.ai_insight)
        .bind(Json(plan.data_sources()))
        .bind(now)
        .execute(&self.db)
        .await?;

        tracing::info!(
            "Action plan {} stored for {} (composite {})",
            id,
            farm_id,
            plan.composite_score
        );

        plan.plan_id = Some(id);
        Ok(plan)
    }

    /// Most recent plans, newest first
    pub async fn history(&self, farm_id: &str, query: &HistoryQuery) -> AppResult<ActionPlanHistory> {
        query.validate()?;

        let plans = sqlx::query_as::<_, ActionPlanSummary>(
            r#"
            SELECT id, created_at AS timestamp, composite_score, environmental_score,
                   crop_health_score, market_opportunity_score, ai_insight
            FROM action_plans
            WHERE farm_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(farm_id)
        .bind(query.limit)
        .fetch_all(&self.db)
        .await?;

        Ok(ActionPlanHistory {
            count: plans.len(),
            plans,
        })
    }
}
