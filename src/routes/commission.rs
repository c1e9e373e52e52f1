use crate::commands;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/commission/create",
            post(commands::commission::create_commission_receipt_axum),
        )
        .route(
            "/api/commission/list",
            get(commands::commission::get_commission_receipts_axum),
        )
}
