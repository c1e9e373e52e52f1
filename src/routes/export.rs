use crate::commands;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/export/sales", get(commands::export::export_sales_csv_axum))
        .route("/api/export/expenses", get(commands::export::export_expenses_csv_axum))
}
