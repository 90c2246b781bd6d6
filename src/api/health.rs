use crate::api::AppState;
use crate::error::AppError;
use axum::extract::State;
use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready while no network is loading. Each refresh flags every network
/// loading again, so this reports unavailable until the refresh settles.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let snapshot = state.orchestrator.snapshot();
    let pending: Vec<String> = snapshot
        .networks
        .iter()
        .filter(|n| n.loading)
        .map(|n| n.network.to_string())
        .collect();

    if !pending.is_empty() {
        return Err(AppError::Unavailable(format!(
            "still loading: {}",
            pending.join(", ")
        )));
    }
    Ok(Json(serde_json::json!({"status": "ready"})))
}
