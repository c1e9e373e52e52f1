use crate::commands;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/bank/statement/preview",
            post(commands::bank::preview_bank_statement_axum),
        )
        .route(
            "/api/bank/statement/import",
            post(commands::bank::import_bank_statement_axum),
        )
        .route("/api/bank/transactions", get(commands::bank::get_bank_transactions_axum))
        .route("/api/bank/accounts", get(commands::bank::get_bank_accounts_axum))
        .route(
            "/api/bank/accounts/create",
            post(commands::bank::create_bank_account_axum),
        )
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}
