use axum::{Extension, response::Json};
use serde_json::{Value, json};

use super::AppState;

/// Liveness plus the derived session state.
pub async fn health(Extension(state): Extension<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "session": state.session.state(),
    }))
}
