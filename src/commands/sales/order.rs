use crate::db::DbPool;
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::extract::State as AxumState;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::Utc;

use super::utils::round2;

#[derive(serde::Deserialize)]
pub struct OrderItemInput {
    pub sku: String,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
}

#[derive(serde::Deserialize)]
pub struct CreateOrderRequest {
    pub marketplace: String,
    pub marketplace_order_no: Option<String>,
    pub customer_name: Option<String>,
    pub order_time: Option<String>,
    pub memo: Option<String>,
    pub items: Vec<OrderItemInput>,
}

pub async fn create_order_internal(
    pool: &DbPool,
    merchant_id: &str,
    req: CreateOrderRequest,
) -> DeskResult<String> {
    if req.items.is_empty() {
        return Err(DeskError::Validation(
            "คำสั่งซื้อต้องมีสินค้าอย่างน้อย 1 รายการ".to_string(),
        ));
    }

    let order_id = format!("SO-{}", &uuid::Uuid::new_v4().to_string()[..8].to_uppercase());

    let order_time = match req.order_time.as_deref() {
        Some(s) if !s.is_empty() => chrono::DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| DeskError::Validation(th(Msg::InvalidDate).to_string()))?,
        _ => Utc::now(),
    };

    let total_amount = round2(
        req.items
            .iter()
            .map(|i| i.unit_price * i.quantity as f64)
            .sum(),
    );

    sqlx::query(
        "INSERT INTO sales_orders (order_id, merchant_id, marketplace, marketplace_order_no, status, customer_name, order_time, total_amount, memo)
         VALUES ($1, $2, $3, $4, 'confirmed', $5, $6, $7, $8)",
    )
    .bind(&order_id)
    .bind(merchant_id)
    .bind(&req.marketplace)
    .bind(&req.marketplace_order_no)
    .bind(&req.customer_name)
    .bind(order_time)
    .bind(total_amount)
    .bind(&req.memo)
    .execute(pool)
    .await
    .map_err(DeskError::from_db_write)?;

    for item in &req.items {
        sqlx::query(
            "INSERT INTO sales_order_items (order_id, sku, product_name, quantity, unit_price, amount)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&order_id)
        .bind(&item.sku)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(round2(item.unit_price * item.quantity as f64))
        .execute(pool)
        .await?;
    }

    Ok(order_id)
}

pub async fn create_order_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateOrderRequest>,
) -> impl axum::response::IntoResponse {
    match create_order_internal(&state.pool, &claims.merchant_id, payload).await {
        Ok(id) => Json(serde_json::json!({ "success": true, "orderId": id })).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn update_order_status_internal(
    pool: &DbPool,
    merchant_id: &str,
    order_id: &str,
    status: &str,
) -> DeskResult<()> {
    let result = sqlx::query(
        "UPDATE sales_orders SET status = $1, updated_at = now() WHERE order_id = $2 AND merchant_id = $3",
    )
    .bind(status)
    .bind(order_id)
    .bind(merchant_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DeskError::Validation(th(Msg::OrderNotFound).to_string()));
    }
    Ok(())
}

#[derive(serde::Deserialize)]
pub struct UpdateStatusRequest {
    pub order_id: String,
    pub status: String,
}

pub async fn update_order_status_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateStatusRequest>,
) -> DeskResult<Json<()>> {
    update_order_status_internal(
        &state.pool,
        &claims.merchant_id,
        &payload.order_id,
        &payload.status,
    )
    .await?;
    Ok(Json(()))
}

#[derive(serde::Deserialize)]
pub struct CancelOrderRequest {
    pub order_id: String,
}

pub async fn cancel_order_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CancelOrderRequest>,
) -> DeskResult<Json<()>> {
    update_order_status_internal(&state.pool, &claims.merchant_id, &payload.order_id, "cancelled")
        .await?;
    Ok(Json(()))
}
