use crate::db::{DbPool, InventoryReturn};
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, th_return_qty_exceeded, Msg};
use crate::middleware::auth::Claims;
use axum::extract::{Query, State as AxumState};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use std::collections::HashMap;

#[derive(serde::Deserialize)]
pub struct CreateReturnRequest {
    pub order_id: String,
    pub sku: String,
    pub quantity: i32,
    pub reason: Option<String>,
}

pub async fn create_return_internal(
    pool: &DbPool,
    merchant_id: &str,
    req: CreateReturnRequest,
) -> DeskResult<i32> {
    if req.quantity <= 0 {
        return Err(DeskError::Validation(
            "จำนวนคืนต้องมากกว่า 0".to_string(),
        ));
    }

    let sold: Option<(i64,)> = sqlx::query_as(
        "SELECT COALESCE(SUM(i.quantity), 0) FROM sales_order_items i
         JOIN sales_orders o ON i.order_id = o.order_id
         WHERE o.merchant_id = $1 AND i.order_id = $2 AND i.sku = $3
         HAVING COUNT(*) > 0",
    )
    .bind(merchant_id)
    .bind(&req.order_id)
    .bind(&req.sku)
    .fetch_optional(pool)
    .await?;

    let quantity_sold = match sold {
        Some((qty,)) => qty as i32,
        None => return Err(DeskError::Validation(th(Msg::OrderNotFound).to_string())),
    };

    // Aggregate already-returned quantity per SKU for this order.
    let prior: Vec<(String, i32)> = sqlx::query_as(
        "SELECT sku, quantity FROM inventory_returns
         WHERE merchant_id = $1 AND order_id = $2 AND status != 'rejected'",
    )
    .bind(merchant_id)
    .bind(&req.order_id)
    .fetch_all(pool)
    .await?;

    let mut returned_by_sku: HashMap<String, i32> = HashMap::new();
    for (sku, qty) in prior {
        *returned_by_sku.entry(sku).or_insert(0) += qty;
    }
    let already_returned = returned_by_sku.get(&req.sku).copied().unwrap_or(0);

    let remaining = quantity_sold - already_returned;
    if req.quantity > remaining {
        return Err(DeskError::Validation(th_return_qty_exceeded(
            remaining.max(0),
        )));
    }

    let row: (i32,) = sqlx::query_as(
        "INSERT INTO inventory_returns (merchant_id, order_id, sku, quantity, reason, status)
         VALUES ($1, $2, $3, $4, $5, 'received') RETURNING return_id",
    )
    .bind(merchant_id)
    .bind(&req.order_id)
    .bind(&req.sku)
    .bind(req.quantity)
    .bind(&req.reason)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

#[derive(serde::Serialize)]
pub struct ProcessReturnOutcome {
    pub processed: bool,
    pub already_processed: bool,
    pub unit_cost: f64,
    pub warning: Option<String>,
}

/// Receives a return back into stock and reverses the original COGS
/// recognition. Idempotency is an existence probe on the receipt layer,
/// not a transaction; two concurrent calls can both pass the probe.
pub async fn process_return_received_internal(
    pool: &DbPool,
    merchant_id: &str,
    return_id: i32,
) -> DeskResult<ProcessReturnOutcome> {
    let ret: Option<InventoryReturn> = sqlx::query_as(
        "SELECT * FROM inventory_returns WHERE return_id = $1 AND merchant_id = $2",
    )
    .bind(return_id)
    .bind(merchant_id)
    .fetch_optional(pool)
    .await?;

    let ret = match ret {
        Some(r) => r,
        None => return Err(DeskError::Validation(th(Msg::ReturnNotFound).to_string())),
    };

    let source_id = return_id.to_string();

    let existing: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM inventory_receipt_layers
         WHERE source_type = 'return' AND source_id = $1 AND is_voided = FALSE",
    )
    .bind(&source_id)
    .fetch_one(pool)
    .await?;
    if existing.0 > 0 {
        return Ok(ProcessReturnOutcome {
            processed: false,
            already_processed: true,
            unit_cost: 0.0,
            warning: None,
        });
    }

    // Weighted-average unit cost over the order's original (non-reversal)
    // allocations for this SKU.
    let allocations: Vec<(i32, f64)> = sqlx::query_as(
        "SELECT quantity, amount FROM cogs_allocations
         WHERE merchant_id = $1 AND order_id = $2 AND sku = $3 AND is_reversal = FALSE",
    )
    .bind(merchant_id)
    .bind(&ret.order_id)
    .bind(&ret.sku)
    .fetch_all(pool)
    .await?;

    let unit_cost = weighted_average_unit_cost(&allocations);

    let layer_result = sqlx::query(
        "INSERT INTO inventory_receipt_layers (merchant_id, sku, quantity, unit_cost, source_type, source_id)
         VALUES ($1, $2, $3, $4, 'return', $5)",
    )
    .bind(merchant_id)
    .bind(&ret.sku)
    .bind(ret.quantity)
    .bind(unit_cost)
    .bind(&source_id)
    .execute(pool)
    .await;

    if let Err(e) = layer_result {
        tracing::warn!("return {} receipt layer insert failed: {:?}", return_id, e);
        return Ok(ProcessReturnOutcome {
            processed: false,
            already_processed: false,
            unit_cost,
            warning: Some(th(Msg::ReceiptLayerFailed).to_string()),
        });
    }

    let _ = sqlx::query(
        "UPDATE inventory_returns SET status = 'restocked', updated_at = now() WHERE return_id = $1",
    )
    .bind(return_id)
    .execute(pool)
    .await;

    // Best-effort reversal. Failure leaves the layer in place and reports a
    // warning alongside the success.
    let reversal_amount = -(ret.quantity as f64 * unit_cost);
    let reversal_result = sqlx::query(
        "INSERT INTO cogs_allocations (merchant_id, order_id, sku, quantity, amount, is_reversal, reference_id)
         VALUES ($1, $2, $3, $4, $5, TRUE, $6)",
    )
    .bind(merchant_id)
    .bind(&ret.order_id)
    .bind(&ret.sku)
    .bind(ret.quantity)
    .bind(reversal_amount)
    .bind(&source_id)
    .execute(pool)
    .await;

    let warning = match reversal_result {
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("return {} COGS reversal insert failed: {:?}", return_id, e);
            Some(th(Msg::ReversalWarning).to_string())
        }
    };

    Ok(ProcessReturnOutcome {
        processed: true,
        already_processed: false,
        unit_cost,
        warning,
    })
}

/// Σ(amount) / Σ(qty) over the original allocations; an order with no cost
/// history reverses at zero.
pub fn weighted_average_unit_cost(allocations: &[(i32, f64)]) -> f64 {
    let total_qty: i32 = allocations.iter().map(|(q, _)| q).sum();
    if total_qty <= 0 {
        return 0.0;
    }
    let total_amount: f64 = allocations.iter().map(|(_, a)| a).sum();
    total_amount / total_qty as f64
}

// --- Axum handlers ---

pub async fn create_return_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateReturnRequest>,
) -> DeskResult<Json<i32>> {
    let id = create_return_internal(&state.pool, &claims.merchant_id, payload).await?;
    Ok(Json(id))
}

#[derive(serde::Deserialize)]
pub struct ProcessReturnRequest {
    pub return_id: i32,
}

pub async fn process_return_received_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ProcessReturnRequest>,
) -> impl axum::response::IntoResponse {
    match process_return_received_internal(&state.pool, &claims.merchant_id, payload.return_id)
        .await
    {
        Ok(outcome) => {
            let mut body = serde_json::json!({
                "success": true,
                "processed": outcome.processed,
                "alreadyProcessed": outcome.already_processed,
                "unitCost": outcome.unit_cost,
            });
            if outcome.already_processed {
                body["message"] =
                    serde_json::Value::String(th(Msg::ReturnAlreadyReceived).to_string());
            }
            if let Some(w) = outcome.warning {
                body["warning"] = serde_json::Value::String(w);
            }
            Json(body).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(serde::Deserialize)]
pub struct ReturnListQuery {
    pub order_id: Option<String>,
}

pub async fn get_returns_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ReturnListQuery>,
) -> DeskResult<Json<Vec<InventoryReturn>>> {
    let rows = if let Some(order_id) = query.order_id {
        sqlx::query_as::<_, InventoryReturn>(
            "SELECT * FROM inventory_returns
             WHERE merchant_id = $1 AND order_id = $2 ORDER BY created_at DESC",
        )
        .bind(&claims.merchant_id)
        .bind(order_id)
        .fetch_all(&state.pool)
        .await?
    } else {
        sqlx::query_as::<_, InventoryReturn>(
            "SELECT * FROM inventory_returns
             WHERE merchant_id = $1 ORDER BY created_at DESC LIMIT 100",
        )
        .bind(&claims.merchant_id)
        .fetch_all(&state.pool)
        .await?
    };
    Ok(Json(rows))
}
