use crate::db::{DbPool, Wallet, WalletBalance};
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::extract::{Query, State as AxumState};
use axum::{Extension, Json};
use chrono::NaiveDate;
use sqlx::FromRow;

/// Ledger rows are stored sign-normalized so a wallet balance is a plain SUM.
pub fn normalize_entry_amount(entry_type: &str, amount: f64) -> f64 {
    match entry_type {
        "topup" => amount.abs(),
        "spend" | "withdraw" => -amount.abs(),
        _ => amount, // 'adjust' keeps the caller's sign
    }
}

#[derive(Debug, serde::Serialize, FromRow)]
pub struct WalletLedgerLine {
    pub entry_id: i32,
    pub wallet_id: i32,
    pub entry_date: String,
    pub entry_type: String,
    pub amount: f64,
    pub description: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub running_balance: f64,
}

pub async fn get_wallets_internal(pool: &DbPool, merchant_id: &str) -> DeskResult<Vec<Wallet>> {
    Ok(sqlx::query_as::<_, Wallet>(
        "SELECT * FROM wallets WHERE merchant_id = $1 AND is_active = TRUE ORDER BY wallet_name",
    )
    .bind(merchant_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_wallet_balances_internal(
    pool: &DbPool,
    merchant_id: &str,
) -> DeskResult<Vec<WalletBalance>> {
    Ok(sqlx::query_as::<_, WalletBalance>(
        "SELECT w.wallet_id, w.wallet_name, w.wallet_type, SUM(l.amount) as balance
         FROM wallets w
         LEFT JOIN wallet_ledger l ON l.wallet_id = w.wallet_id
         WHERE w.merchant_id = $1 AND w.is_active = TRUE
         GROUP BY w.wallet_id, w.wallet_name, w.wallet_type
         ORDER BY w.wallet_name",
    )
    .bind(merchant_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_wallet_ledger_internal(
    pool: &DbPool,
    merchant_id: &str,
    wallet_id: i32,
) -> DeskResult<Vec<WalletLedgerLine>> {
    Ok(sqlx::query_as::<_, WalletLedgerLine>(
        r#"
        SELECT
            entry_id,
            wallet_id,
            to_char(entry_date, 'YYYY-MM-DD') as entry_date,
            entry_type,
            amount,
            description,
            reference_type,
            reference_id,
            SUM(amount) OVER (PARTITION BY wallet_id ORDER BY entry_date ASC, entry_id ASC) as running_balance
        FROM wallet_ledger
        WHERE merchant_id = $1 AND wallet_id = $2
        ORDER BY entry_date DESC, entry_id DESC
        "#,
    )
    .bind(merchant_id)
    .bind(wallet_id)
    .fetch_all(pool)
    .await?)
}

pub async fn create_wallet_entry_internal(
    pool: &DbPool,
    merchant_id: &str,
    wallet_id: i32,
    entry_date: NaiveDate,
    entry_type: &str,
    amount: f64,
    description: Option<String>,
    reference_type: Option<String>,
    reference_id: Option<String>,
) -> DeskResult<i32> {
    let exists: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM wallets WHERE wallet_id = $1 AND merchant_id = $2")
            .bind(wallet_id)
            .bind(merchant_id)
            .fetch_one(pool)
            .await?;
    if exists.0 == 0 {
        return Err(DeskError::Validation(th(Msg::WalletNotFound).to_string()));
    }

    let final_amount = normalize_entry_amount(entry_type, amount);

    let row: (i32,) = sqlx::query_as(
        "INSERT INTO wallet_ledger (wallet_id, merchant_id, entry_date, entry_type, amount, description, reference_type, reference_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING entry_id",
    )
    .bind(wallet_id)
    .bind(merchant_id)
    .bind(entry_date)
    .bind(entry_type)
    .bind(final_amount)
    .bind(description)
    .bind(reference_type)
    .bind(reference_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

// --- Axum handlers ---

#[derive(serde::Deserialize)]
pub struct CreateWalletRequest {
    pub wallet_name: String,
    pub wallet_type: Option<String>,
}

pub async fn create_wallet_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateWalletRequest>,
) -> DeskResult<Json<i32>> {
    let row: (i32,) = sqlx::query_as(
        "INSERT INTO wallets (merchant_id, wallet_name, wallet_type) VALUES ($1, $2, $3) RETURNING wallet_id",
    )
    .bind(&claims.merchant_id)
    .bind(&payload.wallet_name)
    .bind(payload.wallet_type.as_deref().unwrap_or("general"))
    .fetch_one(&state.pool)
    .await
    .map_err(DeskError::from_db_write)?;
    Ok(Json(row.0))
}

pub async fn get_wallets_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
) -> DeskResult<Json<Vec<Wallet>>> {
    Ok(Json(
        get_wallets_internal(&state.pool, &claims.merchant_id).await?,
    ))
}

pub async fn get_wallet_balances_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
) -> DeskResult<Json<Vec<WalletBalance>>> {
    Ok(Json(
        get_wallet_balances_internal(&state.pool, &claims.merchant_id).await?,
    ))
}

#[derive(serde::Deserialize)]
pub struct LedgerQuery {
    pub wallet_id: i32,
}

pub async fn get_wallet_ledger_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<LedgerQuery>,
) -> DeskResult<Json<Vec<WalletLedgerLine>>> {
    Ok(Json(
        get_wallet_ledger_internal(&state.pool, &claims.merchant_id, query.wallet_id).await?,
    ))
}

#[derive(serde::Deserialize)]
pub struct CreateEntryRequest {
    pub wallet_id: i32,
    pub entry_date: String,
    pub entry_type: String,
    pub amount: f64,
    pub description: Option<String>,
}

pub async fn create_wallet_entry_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateEntryRequest>,
) -> DeskResult<Json<i32>> {
    let date = super::sales::utils::parse_date_safe(&payload.entry_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;
    let id = create_wallet_entry_internal(
        &state.pool,
        &claims.merchant_id,
        payload.wallet_id,
        date,
        &payload.entry_type,
        payload.amount,
        payload.description,
        None,
        None,
    )
    .await?;
    Ok(Json(id))
}
