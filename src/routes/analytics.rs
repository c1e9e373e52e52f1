use crate::commands;
use crate::state::AppState;
use axum::{routing::post, Router};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/analytics/run", post(commands::analytics::run_analytics_axum))
}
