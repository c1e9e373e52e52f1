use crate::db::Notification;
use crate::error::DeskResult;
use crate::middleware::auth::Claims;
use axum::extract::State as AxumState;
use axum::{Extension, Json};

pub async fn get_notifications_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
) -> DeskResult<Json<Vec<Notification>>> {
    let rows = sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE merchant_id = $1 ORDER BY created_at DESC LIMIT 50",
    )
    .bind(&claims.merchant_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

#[derive(serde::Deserialize)]
pub struct MarkReadRequest {
    pub notification_id: i32,
}

pub async fn mark_notification_read_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<MarkReadRequest>,
) -> DeskResult<Json<()>> {
    sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE notification_id = $1 AND merchant_id = $2",
    )
    .bind(payload.notification_id)
    .bind(&claims.merchant_id)
    .execute(&state.pool)
    .await?;
    Ok(Json(()))
}

pub async fn mark_all_read_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
) -> DeskResult<Json<()>> {
    sqlx::query("UPDATE notifications SET is_read = TRUE WHERE merchant_id = $1")
        .bind(&claims.merchant_id)
        .execute(&state.pool)
        .await?;
    Ok(Json(()))
}
