//! Sensor reading storage and dashboard aggregations

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::Serialize;
use shared::{round_dp, EnvironmentalReading, Factor};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;

/// Readings averaged for the farm averages card
pub const AVERAGES_WINDOW: i64 = 50;
/// Readings shown on the series charts
pub const SERIES_WINDOW: i64 = 24;

/// Reading storage keyed by farm
#[derive(Clone)]
pub struct ReadingService {
    db: PgPool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ReadingRow {
    soil_moisture: f64,
    temperature: f64,
    humidity: f64,
    rainfall_7d: f64,
    soil_ph: f64,
    rainfall_last_24h: Option<f64>,
    recorded_at: DateTime<Utc>,
}

impl From<ReadingRow> for EnvironmentalReading {
    fn from(row: ReadingRow) -> Self {
        EnvironmentalReading {
            soil_moisture: row.soil_moisture,
            temperature: row.temperature,
            humidity: row.humidity,
            rainfall_7d: row.rainfall_7d,
            soil_ph: row.soil_ph,
            rainfall_last_24h: row.rainfall_last_24h,
            recorded_at: Some(row.recorded_at),
        }
    }
}

/// Stored reading with its id
#[derive(Debug, Clone, Serialize)]
pub struct StoredReading {
    pub id: Uuid,
    pub farm_id: String,
    #[serde(flatten)]
    pub reading: EnvironmentalReading,
}

const READING_COLUMNS: &str = "soil_moisture, temperature, humidity, rainfall_7d, soil_ph, \
                               rainfall_last_24h, recorded_at";

impl ReadingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Store a validated reading
    pub async fn insert(
        &self,
        farm_id: &str,
        reading: EnvironmentalReading,
    ) -> AppResult<StoredReading> {
        let id = Uuid::new_v4();
        let recorded_at = reading.recorded_at.unwrap_or_else(Utc::now);

        sqlx::query(
            r#"
            INSERT INTO sensor_readings (id, farm_id, soil_moisture, temperature, humidity,
                                         rainfall_7d, soil_ph, rainfall_last_24h, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(farm_id)
        .bind(reading.soil_moisture)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.rainfall_7d)
        .bind(reading.soil_ph)
        .bind(reading.rainfall_last_24h)
        .bind(recorded_at)
        .execute(&self.db)
        .await?;

        tracing::debug!("Stored reading {} for {}", id, farm_id);

        Ok(StoredReading {
            id,
            farm_id: farm_id.to_string(),
            reading: EnvironmentalReading {
                recorded_at: Some(recorded_at),
                ..reading
            },
        })
    }

    /// Most recent reading, if any
    pub async fn latest(&self, farm_id: &str) -> AppResult<Option<EnvironmentalReading>> {
        Ok(self.recent(farm_id, 1).await?.into_iter().next())
    }

    /// Latest `limit` readings, newest first
    pub async fn recent(&self, farm_id: &str, limit: i64) -> AppResult<Vec<EnvironmentalReading>> {
        let rows = sqlx::query_as::<_, ReadingRow>(&format!(
            "SELECT {} FROM sensor_readings WHERE farm_id = $1 \
             ORDER BY recorded_at DESC LIMIT $2",
            READING_COLUMNS
        ))
        .bind(farm_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(EnvironmentalReading::from).collect())
    }

    /// Readings recorded at or after `since`, oldest first
    pub async fn since(
        &self,
        farm_id: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<EnvironmentalReading>> {
        let rows = sqlx::query_as::<_, ReadingRow>(&format!(
            "SELECT {} FROM sensor_readings WHERE farm_id = $1 AND recorded_at >= $2 \
             ORDER BY recorded_at ASC",
            READING_COLUMNS
        ))
        .bind(farm_id)
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(EnvironmentalReading::from).collect())
    }
}

/// One point of a sensor chart
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeriesPoint {
    pub time: String,
    pub value: f64,
}

/// Chart points for one factor, oldest first; untimed readings are skipped
pub fn sensor_series(readings: &[EnvironmentalReading], factor: Factor) -> Vec<SeriesPoint> {
    let mut timed: Vec<(DateTime<Utc>, f64)> = readings
        .iter()
        .filter_map(|r| r.recorded_at.map(|ts| (ts, r.value(factor))))
        .collect();
    timed.sort_by_key(|(ts, _)| *ts);

    timed
        .into_iter()
        .map(|(ts, value)| SeriesPoint {
            time: ts.format("%d %b %H:%M").to_string(),
            value: round_dp(value, 1),
        })
        .collect()
}

/// Weekday averages for the daily metrics chart
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyMetric {
    pub day: String,
    pub soil_moisture: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
}

#[derive(Default)]
struct DayBucket {
    soil_moisture: Vec<f64>,
    temperature: Vec<f64>,
    humidity: Vec<f64>,
    rainfall: f64,
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Bucket readings by weekday, Monday first, skipping empty days.
///
/// Daily rainfall is estimated as the weekly total divided by seven, summed
/// over the day's readings.
pub fn daily_metrics(readings: &[EnvironmentalReading]) -> Vec<DailyMetric> {
    let mut buckets: BTreeMap<u32, (Weekday, DayBucket)> = BTreeMap::new();

    for reading in readings {
        let Some(ts) = reading.recorded_at else {
            continue;
        };
        let weekday = ts.weekday();
        let (_, bucket) = buckets
            .entry(weekday.num_days_from_monday())
            .or_insert_with(|| (weekday, DayBucket::default()));
        bucket.soil_moisture.push(reading.soil_moisture);
        bucket.temperature.push(reading.temperature);
        bucket.humidity.push(reading.humidity);
        bucket.rainfall += reading.rainfall_7d / 7.0;
    }

    buckets
        .into_values()
        .map(|(weekday, b)| DailyMetric {
            day: weekday.to_string(),
            soil_moisture: round_dp(mean(&b.soil_moisture), 1),
            temperature: round_dp(mean(&b.temperature), 1),
            humidity: round_dp(mean(&b.humidity), 1),
            rainfall: round_dp(b.rainfall, 1),
        })
        .collect()
}
