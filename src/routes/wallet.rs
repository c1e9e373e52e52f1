use crate::commands;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/wallets/create", post(commands::wallet::create_wallet_axum))
        .route("/api/wallets/list", get(commands::wallet::get_wallets_axum))
        .route("/api/wallets/balances", get(commands::wallet::get_wallet_balances_axum))
        .route("/api/wallets/ledger", get(commands::wallet::get_wallet_ledger_axum))
        .route(
            "/api/wallets/ledger/create",
            post(commands::wallet::create_wallet_entry_axum),
        )
}
