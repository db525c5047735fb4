use axum::extract::State;
use axum::Json;

use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "git_sha": env!("GIT_SHA"),
    }))
}

/// Process-wide counters for the in-memory editing state.
pub async fn stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "data": {
            "watched_pictures": state.registry.group_count(),
            "held_tokens": state.arbiter.held_count(),
            "pipeline_shards": state.publisher.shard_count(),
        }
    }))
}
