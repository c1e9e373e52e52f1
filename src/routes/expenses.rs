use crate::commands;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/expenses/save", post(commands::expenses::save_expense_axum))
        .route("/api/expenses/list", get(commands::expenses::get_expenses_axum))
        .route(
            "/api/expenses/summary",
            get(commands::expenses::get_expense_summary_axum),
        )
        .route("/api/expenses/delete", post(commands::expenses::delete_expense_axum))
}
