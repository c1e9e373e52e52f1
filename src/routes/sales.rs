use crate::commands;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/sales/create", post(commands::sales::order::create_order_axum))
        .route(
            "/api/sales/update-status",
            post(commands::sales::order::update_order_status_axum),
        )
        .route("/api/sales/cancel", post(commands::sales::order::cancel_order_axum))
        .route("/api/sales/search", get(commands::sales::query::search_orders_axum))
        .route("/api/sales/items", get(commands::sales::query::get_order_items_axum))
}
