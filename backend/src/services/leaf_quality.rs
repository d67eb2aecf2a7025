//! Leaf quality scanning
//!
//! An uploaded photo goes through the localizer (advisory), a centre crop and
//! resize, the classifier and the HSV surface rules. The fused decision is
//! stored as an audit record and returned with enriched advice.

use std::io::Cursor;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageOutputFormat, RgbImage};
use serde::Serialize;
use shared::{
    analyze_surface, center_crop_bounds, fuse, ClassifierOutput, ConfidenceLevel,
    DecisionSource, DiseaseDetection, LeafDecision, LeafGrade, ScanSummary, ScoringConfig,
    Severity, SurfaceAnalysis, ANALYSIS_SIZE,
};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::{
    BulletStyle, CannedText, DiseaseLocalizer, EnrichmentRequest, LeafClassifier, Recommender,
};

const DECISION_REASON: &str = "CNN prediction used when disease detected; \
                               HSV rule-based grading used when CNN predicts healthy";

const LEAF_FALLBACK: CannedText = CannedText {
    unavailable: Some("Leaf AI service unavailable."),
    empty: Some("No recommendations available for this scan."),
    unparsed: Some("Continue routine monitoring of leaf health."),
};

/// Cropped and resized leaf ready for the classifier and surface rules
pub struct PreparedLeaf {
    pub png: Vec<u8>,
    pub pixels: RgbImage,
    pub original_size: (u32, u32),
}

/// Decode, crop the middle 80% and resize to the analysis size
pub fn prepare_leaf(bytes: &[u8]) -> AppResult<PreparedLeaf> {
    let original = image::load_from_memory(bytes)
        .map_err(|e| AppError::InvalidImage(format!("Unable to decode image: {}", e)))?;
    let (width, height) = original.dimensions();
    if width == 0 || height == 0 {
        return Err(AppError::InvalidImage("Image has no pixels".to_string()));
    }

    let (x, y, w, h) = center_crop_bounds(width, height);
    let prepared = original
        .crop_imm(x, y, w, h)
        .resize_exact(ANALYSIS_SIZE, ANALYSIS_SIZE, FilterType::Triangle);
    let pixels = prepared.to_rgb8();

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(pixels.clone())
        .write_to(&mut png, ImageOutputFormat::Png)
        .map_err(|e| AppError::Internal(format!("Failed to encode leaf image: {}", e)))?;

    Ok(PreparedLeaf {
        png: png.into_inner(),
        pixels,
        original_size: (width, height),
    })
}

/// Leaf scan response
#[derive(Debug, Clone, Serialize)]
pub struct LeafQualityReport {
    pub scan_id: Option<Uuid>,
    pub grade: LeafGrade,
    pub disease_type: Option<String>,
    pub cnn_prediction: Option<String>,
    /// Classifier confidence as a fraction
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub severity: Severity,
    pub surface_analysis: SurfaceAnalysis,
    pub decision_source: DecisionSource,
    pub reason: &'static str,
    pub ai_recommendations: Vec<String>,
    pub yolo_detections: Option<Vec<DiseaseDetection>>,
}

/// Everything the scan pipeline produces before persistence
#[derive(Debug, Clone)]
pub struct LeafAnalysis {
    pub decision: LeafDecision,
    pub surface: SurfaceAnalysis,
    pub detections: Option<Vec<DiseaseDetection>>,
    pub recommendations: Vec<String>,
}

impl LeafAnalysis {
    pub fn into_report(self, scan_id: Option<Uuid>) -> LeafQualityReport {
        let confidence = self.decision.confidence_fraction();
        LeafQualityReport {
            scan_id,
            grade: self.decision.final_grade,
            disease_type: self.decision.disease_type,
            cnn_prediction: self.decision.cnn_prediction,
            confidence,
            confidence_level: self.decision.confidence_level,
            severity: self.decision.severity,
            surface_analysis: self.surface,
            decision_source: self.decision.decision_source,
            reason: DECISION_REASON,
            ai_recommendations: self.recommendations,
            yolo_detections: self.detections,
        }
    }
}

fn leaf_prompt(condition: &str, confidence_pct: u8) -> String {
    format!(
        "You are an expert tea leaf pathologist.\n\n\
         Based on the AI leaf scan result below, generate 3-4 actionable quality\n\
         improvement recommendations.\n\n\
         Rules:\n- Focus ONLY on leaf health and disease\n- Use professional agricultural language\n\
         - Mention WHY the action is needed\n- Keep recommendations concise\n- Bullet points only\n\
         - No emojis\n\n\
         Leaf Analysis Result:\n- Detected Condition: {}\n- Model Confidence: {}%",
        condition, confidence_pct
    )
}

/// Scan pipeline without storage
#[derive(Clone)]
pub struct LeafAnalyzer {
    scoring: Arc<ScoringConfig>,
    classifier: Option<Arc<dyn LeafClassifier>>,
    localizer: Option<Arc<dyn DiseaseLocalizer>>,
    recommender: Recommender,
}

impl LeafAnalyzer {
    pub fn new(
        scoring: Arc<ScoringConfig>,
        classifier: Option<Arc<dyn LeafClassifier>>,
        localizer: Option<Arc<dyn DiseaseLocalizer>>,
        recommender: Recommender,
    ) -> Self {
        Self {
            scoring,
            classifier,
            localizer,
            recommender,
        }
    }

    async fn detect(&self, bytes: &[u8]) -> Option<Vec<DiseaseDetection>> {
        let localizer = self.localizer.as_ref()?;
        match localizer.detect(bytes).await {
            Ok(detections) if !detections.is_empty() => Some(detections),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Disease localizer unavailable: {}", e);
                None
            }
        }
    }

    async fn classify(&self, png: &[u8]) -> Option<ClassifierOutput> {
        let classifier = self.classifier.as_ref()?;
        match classifier.classify(png).await {
            Ok(output) => Some(output),
            Err(e) => {
                tracing::warn!("Leaf classifier unavailable, using surface rules only: {}", e);
                None
            }
        }
    }

    pub async fn analyze(&self, bytes: &[u8]) -> AppResult<LeafAnalysis> {
        let detections = self.detect(bytes).await;
        let leaf = prepare_leaf(bytes)?;
        let classifier = self.classify(&leaf.png).await;
        let surface = analyze_surface(
            leaf.pixels.pixels().map(|p| p.0),
            &self.scoring.surface_colors,
        );
        let decision = fuse(classifier.as_ref(), &surface, &self.scoring);

        tracing::debug!(
            "Leaf scan {}x{}: classifier={:?} surface={:?} rule={} final={} source={}",
            leaf.original_size.0,
            leaf.original_size.1,
            classifier,
            surface,
            decision.rule_grade,
            decision.final_grade,
            decision.decision_source.as_str()
        );

        let condition = decision
            .disease_type
            .clone()
            .unwrap_or_else(|| decision.final_grade.to_string());
        let recommendations = self
            .recommender
            .bullets(
                EnrichmentRequest::new("leaf", leaf_prompt(&condition, decision.confidence_pct)),
                BulletStyle::Marked,
                None,
                LEAF_FALLBACK,
            )
            .await;

        Ok(LeafAnalysis {
            decision,
            surface,
            detections,
            recommendations,
        })
    }
}

/// Stored scan fields the crop-health scorer needs
#[derive(Debug, Clone, sqlx::FromRow)]
struct ScanRow {
    grade: String,
    disease_type: Option<String>,
    confidence: f64,
    severity: String,
    scanned_at: DateTime<Utc>,
}

impl From<ScanRow> for ScanSummary {
    fn from(row: ScanRow) -> Self {
        ScanSummary {
            grade: LeafGrade::parse(&row.grade),
            disease_type: row.disease_type,
            confidence: row.confidence,
            severity: Severity::parse(&row.severity),
            scanned_at: Some(row.scanned_at),
        }
    }
}

/// Leaf scans with audit storage
#[derive(Clone)]
pub struct LeafQualityService {
    db: PgPool,
    analyzer: LeafAnalyzer,
}

impl LeafQualityService {
    pub fn new(db: PgPool, analyzer: LeafAnalyzer) -> Self {
        Self { db, analyzer }
    }

    /// Scan an uploaded image and record the result for the farm
    pub async fn scan(
        &self,
        farm_id: &str,
        filename: Option<String>,
        bytes: &[u8],
    ) -> AppResult<LeafQualityReport> {
        let analysis = self.analyzer.analyze(bytes).await?;
        let id = Uuid::new_v4();
        let d = &analysis.decision;

        sqlx::query(
            r#"
            INSERT INTO leaf_scans (id, farm_id, grade, disease_type, cnn_prediction, confidence,
                                    confidence_level, severity, surface_analysis, decision_source,
                                    filename, scanned_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
            "#,
        )
        .bind(id)
        .bind(farm_id)
        .bind(d.final_grade.as_str())
        .bind(&d.disease_type)
        .bind(&d.cnn_prediction)
        .bind(d.confidence_fraction())
        .bind(d.confidence_level.as_str())
        .bind(d.severity.as_str())
        .bind(Json(analysis.surface))
        .bind(d.decision_source.as_str())
        .bind(&filename)
        .execute(&self.db)
        .await?;

        tracing::info!("Leaf scan {} stored for {}: {}", id, farm_id, d.final_grade);

        Ok(analysis.into_report(Some(id)))
    }

    /// Scans recorded at or after `since`, newest first
    pub async fn scans_since(
        &self,
        farm_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<ScanSummary>> {
        let rows = sqlx::query_as::<_, ScanRow>(
            r#"
            SELECT grade, disease_type, confidence, severity, scanned_at
            FROM leaf_scans
            WHERE farm_id = $1 AND scanned_at >= $2
            ORDER BY scanned_at DESC
            "#,
        )
        .bind(farm_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ScanSummary::from).collect())
    }
}
