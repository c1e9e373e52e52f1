use crate::commands;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/ads/upload", post(commands::ads::upload_ads_report_axum))
        .route("/api/ads/performance", get(commands::ads::get_ads_performance_axum))
        .route("/api/ads/summary", get(commands::ads::get_ads_summary_axum))
        .route(
            "/api/ads/affiliate/upload",
            post(commands::ads::upload_affiliate_report_axum),
        )
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}
