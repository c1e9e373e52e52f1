use crate::state::AppState;
use axum::Router;

pub mod ads;
pub mod analytics;
pub mod auth;
pub mod bank;
pub mod commission;
pub mod dashboard;
pub mod expenses;
pub mod export;
pub mod notification;
pub mod reconcile;
pub mod returns;
pub mod sales;
pub mod wallet;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(sales::router())
        .merge(expenses::router())
        .merge(wallet::router())
        .merge(commission::router())
        .merge(returns::router())
        .merge(reconcile::router())
        .merge(bank::router())
        .merge(ads::router())
        .merge(analytics::router())
        .merge(export::router())
        .merge(notification::router())
}
