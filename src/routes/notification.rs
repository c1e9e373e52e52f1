use crate::commands;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/notifications/list",
            get(commands::notification::get_notifications_axum),
        )
        .route(
            "/api/notifications/read",
            post(commands::notification::mark_notification_read_axum),
        )
        .route(
            "/api/notifications/read-all",
            post(commands::notification::mark_all_read_axum),
        )
}
