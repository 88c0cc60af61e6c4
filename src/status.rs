use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::{phone::Ruleset, registry::RegistryHelper};

#[derive(Clone)]
struct StatusState {
    registry: RegistryHelper,
    ruleset: Ruleset,
}

pub fn router(registry: RegistryHelper, ruleset: Ruleset) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .with_state(StatusState { registry, ruleset })
}

pub async fn serve(
    listen: String,
    registry: RegistryHelper,
    ruleset: Ruleset,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&listen).await?;
    log::info!("Status server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(registry, ruleset)).await?;
    Ok(())
}

async fn handle_root(State(state): State<StatusState>) -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "ruleset": state.ruleset.name(),
        "status": "running",
    }))
}

async fn handle_health(State(state): State<StatusState>) -> (StatusCode, Json<Value>) {
    let now = kstool::time::get_current_second();
    match state.registry.query_status().await {
        Some(status) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "uptime": status.uptime,
                "heartbeat_count": status.heartbeat_count,
                "last_heartbeat": status.last_heartbeat,
                "timestamp": now,
            })),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "timestamp": now })),
        ),
    }
}

async fn handle_status(State(state): State<StatusState>) -> (StatusCode, Json<Value>) {
    let (Some(status), Some(global)) = (
        state.registry.query_status().await,
        state.registry.query_global().await,
    ) else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy" })),
        );
    };
    (
        StatusCode::OK,
        Json(json!({
            "status": "running",
            "ruleset": state.ruleset.name(),
            "system": status,
            "statistics": {
                "total_queries": global.total_queries,
                "total_numbers": global.total_numbers,
                "total_duplicates": global.total_duplicates,
                "phone_records": global.phone_records,
                "users": global.users,
                "today": global.today,
            },
        })),
    )
}
