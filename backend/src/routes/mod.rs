//! Route definitions for the Tea Farm Advisor

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Largest leaf photo accepted, in bytes
const MAX_LEAF_UPLOAD: usize = 10 * 1024 * 1024;

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Market intelligence and selling decisions (public)
        .route("/price-forecast", post(handlers::price_forecast))
        .route("/simulate-action", post(handlers::simulate_action))
        .route(
            "/calculate-yield-strategy",
            post(handlers::calculate_yield_strategy),
        )
        .nest("/market", market_routes())
        // Cultivation engine (manual input public, stored data protected)
        .nest("/cultivation", cultivation_routes())
        // Protected routes - farm sensor data
        .nest("/farm", farm_routes())
        // Protected routes - leaf scans
        .nest("/leaf-quality", leaf_quality_routes())
        // Protected routes - action plans
        .nest("/action-plan", action_plan_routes())
        // Protected routes - assistant
        .nest("/chat", chat_routes())
}

/// Market dashboard routes (public)
fn market_routes() -> Router<AppState> {
    Router::new()
        .route("/kpis", get(handlers::market_kpis))
        .route("/price-series", get(handlers::price_series))
        .route("/demand-volatility", get(handlers::demand_volatility))
        .route(
            "/location-price-summary",
            get(handlers::location_price_summary),
        )
        .route("/insight", get(handlers::market_insight))
}

/// Cultivation routes; only those added before the auth layer are protected
fn cultivation_routes() -> Router<AppState> {
    Router::new()
        .route("/latest", get(handlers::latest_cultivation))
        .route("/smart-alert", get(handlers::smart_alert))
        .route_layer(middleware::from_fn(auth_middleware))
        .route("/", post(handlers::evaluate_reading))
        .route("/aggregate", post(handlers::aggregate_readings))
}

/// Farm sensor routes (protected)
fn farm_routes() -> Router<AppState> {
    Router::new()
        .route("/readings", post(handlers::store_reading))
        .route("/averages", get(handlers::farm_averages))
        .route("/soil-moisture-series", get(handlers::soil_moisture_series))
        .route("/temperature-series", get(handlers::temperature_series))
        .route("/daily-metrics", get(handlers::farm_daily_metrics))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Leaf quality routes (protected)
fn leaf_quality_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::scan_leaf))
        .layer(DefaultBodyLimit::max(MAX_LEAF_UPLOAD))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Action plan routes (protected)
fn action_plan_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(handlers::generate_action_plan))
        .route("/history", get(handlers::action_plan_history))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Assistant routes (protected)
fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::chat))
        .route_layer(middleware::from_fn(auth_middleware))
}
