use crate::commands;
use crate::state::AppState;
use axum::{routing::post, Router};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/settlements/upload",
            post(commands::reconcile::upload_settlements_axum),
        )
        .route(
            "/api/settlements/reconcile",
            post(commands::reconcile::reconcile_settlements_axum),
        )
        .route(
            "/api/settlements/forecasts",
            post(commands::reconcile::create_forecasts_axum),
        )
}
