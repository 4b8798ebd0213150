use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method},
    response::Json,
    routing::get,
    serve, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use bomforge_database::{initialize_store, CatalogStore};
use bomforge_utils::{init_logging, AppConfig};

mod handlers;
mod metrics;
mod middleware;
mod routes;

use metrics::ApiMetrics;
use middleware::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration ({}), using defaults", e);
        AppConfig::default()
    });

    init_logging(&config.logging)?;
    info!("Starting BOM Forge API Gateway");

    let store = initialize_store(&config.database.to_store_config()).await?;
    info!(backend = ?config.database.backend, "Catalog store ready");

    let state = AppState::new(store, config.clone())?;
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("API Gateway listening on {}", addr);

    serve(listener, app).await?;

    Ok(())
}

pub fn create_app(state: AppState) -> Router {
    let max_request_size = state.config.server.max_request_size;

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", routes::create_api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST])
                        .allow_headers([header::CONTENT_TYPE]),
                )
                .layer(DefaultBodyLimit::max(max_request_size))
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(axum::middleware::from_fn(error_handling_middleware)),
        )
        .with_state(state)
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub config: Arc<AppConfig>,
    pub metrics: Arc<ApiMetrics>,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, config: AppConfig) -> Result<Self> {
        let metrics = ApiMetrics::new(&config.monitoring.prometheus_namespace)?;
        Ok(Self {
            store,
            config: Arc::new(config),
            metrics: Arc::new(metrics),
        })
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "bomforge-api-gateway",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    if !state.config.monitoring.metrics_enabled {
        return String::new();
    }
    state
        .metrics
        .render()
        .unwrap_or_else(|_| "Error encoding metrics".to_string())
}
