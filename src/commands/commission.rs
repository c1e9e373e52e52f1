use crate::db::{CommissionReceipt, DbPool};
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::extract::{Query, State as AxumState};
use axum::response::IntoResponse;
use axum::{Extension, Json};

use super::sales::utils::parse_date_safe;

pub const BALANCE_TOLERANCE: f64 = 0.01;

/// The receipt must balance: gross = personal_used + transferred, within
/// one satang of float slack.
pub fn commission_balanced(gross: f64, personal_used: f64, transferred: f64) -> bool {
    (gross - (personal_used + transferred)).abs() <= BALANCE_TOLERANCE
}

#[derive(serde::Deserialize)]
pub struct CommissionReceiptInput {
    pub receipt_no: String,
    pub receipt_date: String,
    pub gross_amount: f64,
    pub personal_used: f64,
    pub transferred_amount: f64,
    pub wallet_id: Option<i32>,
    pub memo: Option<String>,
}

#[derive(serde::Serialize)]
pub struct CommissionReceiptOutcome {
    pub receipt_id: i32,
    pub warning: Option<String>,
}

pub async fn create_commission_receipt_internal(
    pool: &DbPool,
    merchant_id: &str,
    input: CommissionReceiptInput,
) -> DeskResult<CommissionReceiptOutcome> {
    if !commission_balanced(
        input.gross_amount,
        input.personal_used,
        input.transferred_amount,
    ) {
        return Err(DeskError::Validation(
            th(Msg::CommissionImbalance).to_string(),
        ));
    }

    let receipt_date = parse_date_safe(&input.receipt_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;

    let row: (i32,) = sqlx::query_as(
        "INSERT INTO commission_receipts (merchant_id, receipt_no, receipt_date, gross_amount, personal_used, transferred_amount, wallet_id, memo)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING receipt_id",
    )
    .bind(merchant_id)
    .bind(&input.receipt_no)
    .bind(receipt_date)
    .bind(input.gross_amount)
    .bind(input.personal_used)
    .bind(input.transferred_amount)
    .bind(input.wallet_id)
    .bind(&input.memo)
    .fetch_one(pool)
    .await
    .map_err(DeskError::from_db_write)?;

    let receipt_id = row.0;

    // Secondary write: ledger the transferred amount into the target wallet.
    // Guarded by a probe on the reference key, not a transaction. Failure
    // here is a partial success, the receipt stays.
    let mut warning = None;
    if input.transferred_amount > 0.0 {
        if let Some(wallet_id) = input.wallet_id {
            match ledger_transfer(
                pool,
                merchant_id,
                wallet_id,
                receipt_id,
                receipt_date,
                input.transferred_amount,
            )
            .await
            {
                Ok(()) => {}
                Err(e) => {
                    tracing::warn!(
                        "commission receipt {} ledger entry failed: {:?}",
                        receipt_id,
                        e
                    );
                    warning = Some(th(Msg::CommissionLedgerWarning).to_string());
                }
            }
        }
    }

    Ok(CommissionReceiptOutcome {
        receipt_id,
        warning,
    })
}

async fn ledger_transfer(
    pool: &DbPool,
    merchant_id: &str,
    wallet_id: i32,
    receipt_id: i32,
    receipt_date: chrono::NaiveDate,
    amount: f64,
) -> DeskResult<()> {
    let ref_id = receipt_id.to_string();

    let existing: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM wallet_ledger
         WHERE reference_type = 'commission_receipt' AND reference_id = $1",
    )
    .bind(&ref_id)
    .fetch_one(pool)
    .await?;
    if existing.0 > 0 {
        return Ok(());
    }

    super::wallet::create_wallet_entry_internal(
        pool,
        merchant_id,
        wallet_id,
        receipt_date,
        "topup",
        amount,
        Some("โอนจากคอมมิชชั่น".to_string()),
        Some("commission_receipt".to_string()),
        Some(ref_id),
    )
    .await?;
    Ok(())
}

pub async fn create_commission_receipt_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CommissionReceiptInput>,
) -> impl axum::response::IntoResponse {
    match create_commission_receipt_internal(&state.pool, &claims.merchant_id, payload).await {
        Ok(outcome) => {
            let mut body = serde_json::json!({
                "success": true,
                "receiptId": outcome.receipt_id,
            });
            if let Some(w) = outcome.warning {
                body["warning"] = serde_json::Value::String(w);
            }
            Json(body).into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[derive(serde::Deserialize)]
pub struct ReceiptListQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn get_commission_receipts_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ReceiptListQuery>,
) -> DeskResult<Json<Vec<CommissionReceipt>>> {
    let rows = if let (Some(s), Some(e)) = (query.start_date.as_deref(), query.end_date.as_deref())
    {
        let sd = parse_date_safe(s)
            .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;
        let ed = parse_date_safe(e)
            .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;
        sqlx::query_as::<_, CommissionReceipt>(
            "SELECT * FROM commission_receipts
             WHERE merchant_id = $1 AND receipt_date BETWEEN $2 AND $3
             ORDER BY receipt_date DESC, receipt_id DESC",
        )
        .bind(&claims.merchant_id)
        .bind(sd)
        .bind(ed)
        .fetch_all(&state.pool)
        .await?
    } else {
        sqlx::query_as::<_, CommissionReceipt>(
            "SELECT * FROM commission_receipts
             WHERE merchant_id = $1 ORDER BY receipt_date DESC, receipt_id DESC LIMIT 100",
        )
        .bind(&claims.merchant_id)
        .fetch_all(&state.pool)
        .await?
    };
    Ok(Json(rows))
}
