use crate::db::{DbPool, SettlementImportRow, UnsettledTransaction};
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::extract::State as AxumState;
use axum::{Extension, Json};
use std::collections::HashMap;

const FETCH_BATCH: usize = 500;
const UPDATE_BATCH: usize = 500;

pub fn match_key(marketplace: &str, txn_ref: &str) -> String {
    format!("{}::{}", marketplace, txn_ref)
}

#[derive(serde::Deserialize)]
pub struct SettlementRowInput {
    pub marketplace: String,
    pub txn_ref: String,
    pub order_id: Option<String>,
    pub amount: f64,
    pub settled_at: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct UploadSettlementsRequest {
    pub rows: Vec<SettlementRowInput>,
}

pub async fn upload_settlements_internal(
    pool: &DbPool,
    merchant_id: &str,
    rows: Vec<SettlementRowInput>,
) -> DeskResult<(String, usize)> {
    if rows.is_empty() {
        return Err(DeskError::Validation(th(Msg::EmptyWorkbook).to_string()));
    }

    let batch_id = format!("IMP-{}", &uuid::Uuid::new_v4().to_string()[..12]);
    sqlx::query(
        "INSERT INTO import_batches (batch_id, merchant_id, batch_type, row_count)
         VALUES ($1, $2, 'settlement', $3)",
    )
    .bind(&batch_id)
    .bind(merchant_id)
    .bind(rows.len() as i32)
    .execute(pool)
    .await?;

    for row in &rows {
        let settled_at = match row.settled_at.as_deref() {
            Some(s) if !s.is_empty() => Some(
                chrono::DateTime::parse_from_rfc3339(s)
                    .map_err(|_| DeskError::Validation(th(Msg::InvalidDate).to_string()))?
                    .with_timezone(&chrono::Utc),
            ),
            _ => None,
        };
        sqlx::query(
            "INSERT INTO settlement_imports (merchant_id, marketplace, txn_ref, order_id, amount, settled_at, import_batch_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(merchant_id)
        .bind(&row.marketplace)
        .bind(&row.txn_ref)
        .bind(&row.order_id)
        .bind(row.amount)
        .bind(settled_at)
        .bind(&batch_id)
        .execute(pool)
        .await?;
    }

    Ok((batch_id, rows.len()))
}

#[derive(Debug, serde::Serialize, Default)]
pub struct ReconcileSummary {
    pub settlement_count: usize,
    pub matched: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

/// Joins the batch's settlement rows against the unsettled forecasts in
/// memory and marks matches settled, 500 rows per round-trip. Applied
/// batches stay applied when a later batch fails; errors are accumulated
/// and returned instead of rolled back.
pub async fn reconcile_settlements_internal(
    pool: &DbPool,
    merchant_id: &str,
    import_batch_id: &str,
) -> DeskResult<ReconcileSummary> {
    let batch: Option<(String,)> = sqlx::query_as(
        "SELECT batch_id FROM import_batches
         WHERE batch_id = $1 AND merchant_id = $2 AND batch_type = 'settlement'",
    )
    .bind(import_batch_id)
    .bind(merchant_id)
    .fetch_optional(pool)
    .await?;
    if batch.is_none() {
        return Err(DeskError::Validation(
            th(Msg::ImportBatchNotFound).to_string(),
        ));
    }

    let settlements: Vec<SettlementImportRow> = sqlx::query_as(
        "SELECT * FROM settlement_imports WHERE import_batch_id = $1 AND merchant_id = $2",
    )
    .bind(import_batch_id)
    .bind(merchant_id)
    .fetch_all(pool)
    .await?;

    let mut summary = ReconcileSummary {
        settlement_count: settlements.len(),
        ..Default::default()
    };
    if settlements.is_empty() {
        return Ok(summary);
    }

    let by_key: HashMap<String, &SettlementImportRow> = settlements
        .iter()
        .map(|s| (match_key(&s.marketplace, &s.txn_ref), s))
        .collect();

    let txn_refs: Vec<String> = settlements.iter().map(|s| s.txn_ref.clone()).collect();

    // (forecast_id, settled_amount, settled_at) pending update
    let mut pending: Vec<(i32, f64, Option<chrono::DateTime<chrono::Utc>>)> = Vec::new();

    for chunk in txn_refs.chunks(FETCH_BATCH) {
        let forecasts: Vec<UnsettledTransaction> = match sqlx::query_as(
            "SELECT * FROM unsettled_transactions
             WHERE merchant_id = $1 AND txn_ref = ANY($2)",
        )
        .bind(merchant_id)
        .bind(chunk)
        .fetch_all(pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("settlement forecast fetch failed: {:?}", e);
                summary.errors.push(format!("fetch: {}", e));
                continue;
            }
        };

        for forecast in forecasts {
            let key = match_key(&forecast.marketplace, &forecast.txn_ref);
            if let Some(settlement) = by_key.get(&key) {
                summary.matched += 1;
                if forecast.status != "settled" {
                    pending.push((forecast.forecast_id, settlement.amount, settlement.settled_at));
                }
            }
        }
    }

    for chunk in pending.chunks(UPDATE_BATCH) {
        let ids: Vec<i32> = chunk.iter().map(|(id, _, _)| *id).collect();
        let amounts: Vec<f64> = chunk.iter().map(|(_, amt, _)| *amt).collect();
        let times: Vec<Option<chrono::DateTime<chrono::Utc>>> =
            chunk.iter().map(|(_, _, t)| *t).collect();

        let result = sqlx::query(
            "UPDATE unsettled_transactions u
             SET status = 'settled',
                 settled_amount = v.amount,
                 settled_at = COALESCE(v.settled_at, now()),
                 updated_at = now()
             FROM (SELECT unnest($1::int4[]) AS id, unnest($2::float8[]) AS amount, unnest($3::timestamptz[]) AS settled_at) v
             WHERE u.forecast_id = v.id",
        )
        .bind(&ids)
        .bind(&amounts)
        .bind(&times)
        .execute(pool)
        .await;

        match result {
            Ok(r) => summary.updated += r.rows_affected() as usize,
            Err(e) => {
                tracing::error!("settlement update batch failed: {:?}", e);
                summary.errors.push(format!("update: {}", e));
            }
        }
    }

    Ok(summary)
}

// --- Axum handlers ---

pub async fn upload_settlements_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UploadSettlementsRequest>,
) -> DeskResult<Json<serde_json::Value>> {
    let (batch_id, count) =
        upload_settlements_internal(&state.pool, &claims.merchant_id, payload.rows).await?;
    Ok(Json(serde_json::json!({
        "batchId": batch_id,
        "rowCount": count,
    })))
}

#[derive(serde::Deserialize)]
pub struct ReconcileRequest {
    pub import_batch_id: String,
}

pub async fn reconcile_settlements_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ReconcileRequest>,
) -> DeskResult<Json<ReconcileSummary>> {
    let summary =
        reconcile_settlements_internal(&state.pool, &claims.merchant_id, &payload.import_batch_id)
            .await?;
    Ok(Json(summary))
}

#[derive(serde::Deserialize)]
pub struct ForecastInput {
    pub marketplace: String,
    pub txn_ref: String,
    pub order_id: Option<String>,
    pub expected_amount: f64,
}

#[derive(serde::Deserialize)]
pub struct CreateForecastsRequest {
    pub rows: Vec<ForecastInput>,
}

pub async fn create_forecasts_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateForecastsRequest>,
) -> DeskResult<Json<usize>> {
    let mut inserted = 0;
    for row in &payload.rows {
        sqlx::query(
            "INSERT INTO unsettled_transactions (merchant_id, marketplace, txn_ref, order_id, expected_amount)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&claims.merchant_id)
        .bind(&row.marketplace)
        .bind(&row.txn_ref)
        .bind(&row.order_id)
        .bind(row.expected_amount)
        .execute(&state.pool)
        .await?;
        inserted += 1;
    }
    Ok(Json(inserted))
}
