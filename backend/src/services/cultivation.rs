//! Cultivation engine: health score, field risks and field advice

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::{
    assess_environment, average_readings, cultivation_action, evaluate_alert,
    fallback_field_risks, EnvironmentalReading, Factor, FactorStatus, FieldRisks, ReadingInput,
    RiskLevel, ScoringConfig, SmartAlert,
};

use crate::error::AppResult;
use crate::external::{
    BulletStyle, CannedText, EnrichmentRequest, Recommender, RiskFeatures, RiskModel,
};
use crate::models::FactorAverages;

const CULTIVATION_FALLBACK: CannedText = CannedText {
    unavailable: Some("AI recommendation service unavailable."),
    empty: Some("AI recommendations unavailable at the moment."),
    unparsed: Some("Field conditions are stable. Continue routine monitoring."),
};

/// Result of running the cultivation engine on one reading
#[derive(Debug, Clone, Serialize)]
pub struct CultivationReport {
    pub health_score: u8,
    pub risk_score: u8,
    pub pest_risk: RiskLevel,
    pub drought_risk: RiskLevel,
    pub action: String,
    pub score_explanation: BTreeMap<Factor, FactorStatus>,
    pub stress_breakdown: BTreeMap<Factor, f64>,
    pub ai_recommendations: Vec<String>,
}

/// Batch of raw readings to average
#[derive(Debug, Deserialize)]
pub struct AggregateInput {
    #[serde(default)]
    pub readings: Vec<ReadingInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub averages: FactorAverages,
    pub count: usize,
}

#[derive(Clone)]
pub struct CultivationService {
    scoring: Arc<ScoringConfig>,
    risk_model: Option<Arc<dyn RiskModel>>,
    recommender: Recommender,
}

fn field_context(
    reading: &EnvironmentalReading,
    health_score: u8,
    risks: &FieldRisks,
    explanation: &BTreeMap<Factor, FactorStatus>,
) -> String {
    let explanation: Vec<String> = explanation
        .iter()
        .map(|(factor, status)| format!("{}: {:?}", factor, status))
        .collect();
    format!(
        "- Health score: {}\n- Pest risk: {}\n- Drought risk: {}\n- Soil moisture: {}%\n\
         - Temperature: {}°C\n- Humidity: {}%\n- Rainfall (7 days): {} mm\n- Soil pH: {}\n\
         - Factor status: {}",
        health_score,
        risks.pest_risk,
        risks.drought_risk,
        reading.soil_moisture,
        reading.temperature,
        reading.humidity,
        reading.rainfall_7d,
        reading.soil_ph,
        explanation.join(", ")
    )
}

fn cultivation_prompt(context: &str) -> String {
    format!(
        "You are an AI agronomist specialized in Assam tea cultivation.\n\n\
         Given the following field analysis data, generate 3-5 concise, actionable recommendations.\n\n\
         Rules:\n- Practical, field-level advice\n- Explain WHY each recommendation is needed\n\
         - Use bullet points\n- No emojis\n\nField Data:\n{}",
        context
    )
}

impl CultivationService {
    pub fn new(
        scoring: Arc<ScoringConfig>,
        risk_model: Option<Arc<dyn RiskModel>>,
        recommender: Recommender,
    ) -> Self {
        Self {
            scoring,
            risk_model,
            recommender,
        }
    }

    /// Pest and drought risk from the model, or from stress when it is unavailable
    pub async fn field_risks(&self, reading: &EnvironmentalReading) -> AppResult<FieldRisks> {
        if let Some(model) = &self.risk_model {
            match model.predict(&RiskFeatures::from(reading)).await {
                Ok(risks) => return Ok(risks),
                Err(e) => tracing::warn!("Risk model unavailable, using stress fallback: {}", e),
            }
        }
        Ok(fallback_field_risks(reading, &self.scoring)?)
    }

    /// Run the full engine on one reading
    pub async fn evaluate(&self, reading: &EnvironmentalReading) -> AppResult<CultivationReport> {
        let assessment = assess_environment(reading, &self.scoring)?;
        let risks = self.field_risks(reading).await?;

        let context = field_context(
            reading,
            assessment.health_score,
            &risks,
            &assessment.score_explanation,
        );
        let ai_recommendations = self
            .recommender
            .bullets(
                EnrichmentRequest::new("cultivation", cultivation_prompt(&context)),
                BulletStyle::MarkedOrNumbered,
                None,
                CULTIVATION_FALLBACK,
            )
            .await;

        tracing::debug!(
            "Cultivation: health={} pest={} drought={}",
            assessment.health_score,
            risks.pest_risk,
            risks.drought_risk
        );

        Ok(CultivationReport {
            health_score: assessment.health_score,
            risk_score: assessment.risk_score,
            pest_risk: risks.pest_risk,
            drought_risk: risks.drought_risk,
            action: cultivation_action(&risks).to_string(),
            score_explanation: assessment.score_explanation,
            stress_breakdown: assessment.stress_breakdown,
            ai_recommendations,
        })
    }

    /// Smart alert for the latest reading; no reading is a quiet result
    pub fn smart_alert(&self, latest: Option<&EnvironmentalReading>) -> AppResult<SmartAlert> {
        let Some(reading) = latest else {
            return Ok(SmartAlert::no_data());
        };
        let assessment = assess_environment(reading, &self.scoring)?;
        Ok(evaluate_alert(&assessment, &self.scoring))
    }
}

/// Average a submitted batch; any missing field rejects the whole batch
pub fn aggregate(input: AggregateInput) -> AppResult<AggregateReport> {
    let readings = input
        .readings
        .into_iter()
        .map(EnvironmentalReading::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let averages = average_readings(&readings)?;

    Ok(AggregateReport {
        averages: FactorAverages::from(&averages),
        count: averages.sample_count,
    })
}
