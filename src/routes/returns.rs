use crate::commands;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/returns/create", post(commands::returns::create_return_axum))
        .route(
            "/api/returns/process-received",
            post(commands::returns::process_return_received_axum),
        )
        .route("/api/returns/list", get(commands::returns::get_returns_axum))
}
