use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn detailed_health_check(State(state): State<AppState>) -> Json<Value> {
    let store_status = match state.store.health_check().await {
        Ok(()) => json!({"status": "healthy", "message": "Connected"}),
        Err(e) => json!({"status": "unhealthy", "message": e.to_string()}),
    };
    let healthy = store_status["status"] == "healthy";

    Json(json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "service": "bomforge-api-gateway",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "catalog_store": store_status,
        }
    }))
}
