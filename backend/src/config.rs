//! Configuration management for the Tea Farm Advisor
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with TFA_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::ScoringConfig;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// Bearer token verification and demo account
    pub auth: AuthConfig,

    /// Pretrained leaf classifier service
    pub classifier: ServiceEndpoint,

    /// Disease localizer (object detection) service
    pub localizer: LocalizerConfig,

    /// Pest and drought risk model service
    pub risk_model: ServiceEndpoint,

    /// Text-generation service used for recommendations and chat
    pub generative: GenerativeConfig,

    pub market: MarketConfig,

    /// Scoring constants; every field falls back to the built-in table
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret used to verify bearer tokens
    pub secret: String,

    /// Accounts with this email always see the demo farm
    pub demo_email: String,

    pub demo_farm_id: String,
}

/// Endpoint of an optional HTTP model service
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServiceEndpoint {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalizerConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,

    /// Minimum detection confidence
    pub confidence_threshold: f64,

    /// Non-maximum suppression IoU threshold
    pub iou_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerativeConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MarketConfig {
    /// Weekly auction prices, one column per market
    pub price_history_path: String,

    /// Market column used for KPIs, signals and selling strategies
    pub primary_market: String,

    /// Stored `{last_price, slope}` trend model; fitted from history when absent
    pub trend_model_path: Option<String>,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("TFA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("auth.demo_email", "demo@chaitea.com")?
            .set_default("auth.demo_farm_id", "demo_farm")?
            .set_default("classifier.timeout_secs", 30)?
            .set_default("localizer.timeout_secs", 30)?
            .set_default("localizer.confidence_threshold", 0.25)?
            .set_default("localizer.iou_threshold", 0.45)?
            .set_default("risk_model.timeout_secs", 10)?
            .set_default(
                "generative.endpoint",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("generative.model", "gemini-flash-latest")?
            .set_default("generative.timeout_secs", 20)?
            .set_default("market.price_history_path", "data/tea_prices.csv")?
            .set_default("market.primary_market", "guwahati")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (TFA_ prefix)
            .add_source(
                Environment::with_prefix("TFA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: 30,
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
        }
    }
}
