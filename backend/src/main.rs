//! Tea Farm Advisor - Backend Server
//!
//! Decision support for Assam tea growers: field health from sensor readings,
//! leaf quality from photos, market timing from auction prices and an action
//! plan that blends all three.

use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod external;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;

pub use config::Config;

use external::{
    ClassifierClient, DiseaseLocalizer, GeminiClient, LeafClassifier, LocalizerClient,
    Recommender, RiskModel, RiskModelClient,
};
use services::{
    ActionPlanService, ActionPlanner, ChatAssistant, ChatService, CultivationService,
    LeafAnalyzer, LeafQualityService, MarketData, MarketService, ReadingService,
    StrategyService,
};
use shared::ScoringConfig;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub scoring: Arc<ScoringConfig>,
    pub market: Arc<MarketData>,
    pub classifier: Option<Arc<dyn LeafClassifier>>,
    pub localizer: Option<Arc<dyn DiseaseLocalizer>>,
    pub risk_model: Option<Arc<dyn RiskModel>>,
    pub recommender: Recommender,
}

impl AppState {
    pub fn readings(&self) -> ReadingService {
        ReadingService::new(self.db.clone())
    }

    pub fn cultivation(&self) -> CultivationService {
        CultivationService::new(
            self.scoring.clone(),
            self.risk_model.clone(),
            self.recommender.clone(),
        )
    }

    pub fn leaf_quality(&self) -> LeafQualityService {
        let analyzer = LeafAnalyzer::new(
            self.scoring.clone(),
            self.classifier.clone(),
            self.localizer.clone(),
            self.recommender.clone(),
        );
        LeafQualityService::new(self.db.clone(), analyzer)
    }

    pub fn market_service(&self) -> MarketService {
        MarketService::new(
            self.market.clone(),
            self.scoring.clone(),
            self.recommender.clone(),
        )
    }

    pub fn strategy(&self) -> StrategyService {
        StrategyService::new(self.market_service(), self.scoring.clone())
    }

    pub fn action_plans(&self) -> ActionPlanService {
        ActionPlanService::new(
            self.db.clone(),
            self.readings(),
            self.leaf_quality(),
            self.market_service(),
            ActionPlanner::new(self.scoring.clone(), self.recommender.clone()),
        )
    }

    pub fn chat(&self) -> ChatService {
        ChatService::new(
            self.readings(),
            self.leaf_quality(),
            self.market_service(),
            self.cultivation(),
            self.scoring.clone(),
            ChatAssistant::new(self.recommender.clone()),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tfa_server=debug,tower_http=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    tracing::info!("Starting Tea Farm Advisor Server");
    tracing::info!("Environment: {}", config.environment);

    if config.auth.secret.trim().is_empty() {
        anyhow::bail!("auth.secret must be set");
    }
    config.scoring.validate()?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database.url)
        .await?;

    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&db_pool).await?;
    tracing::info!("Migrations completed");

    let classifier = ClassifierClient::from_config(&config.classifier)?
        .map(|c| Arc::new(c) as Arc<dyn LeafClassifier>);
    let localizer = LocalizerClient::from_config(&config.localizer)?
        .map(|c| Arc::new(c) as Arc<dyn DiseaseLocalizer>);
    let risk_model = RiskModelClient::from_config(&config.risk_model)?
        .map(|c| Arc::new(c) as Arc<dyn RiskModel>);
    let recommender = match GeminiClient::from_config(&config.generative)? {
        Some(client) => Recommender::new(Arc::new(client)),
        None => {
            tracing::warn!("No text-generation key configured, using canned recommendations");
            Recommender::disabled()
        }
    };
    for (name, present) in [
        ("Leaf classifier", classifier.is_some()),
        ("Disease localizer", localizer.is_some()),
        ("Risk model", risk_model.is_some()),
    ] {
        if !present {
            tracing::warn!("{} not configured, rule-based fallback only", name);
        }
    }

    // Create application state
    let state = AppState {
        db: db_pool,
        scoring: Arc::new(config.scoring.clone()),
        market: Arc::new(MarketData::load(&config.market)),
        config: Arc::new(config.clone()),
        classifier,
        localizer,
        risk_model,
        recommender,
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Tea Farm Advisor API v1.0"
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
