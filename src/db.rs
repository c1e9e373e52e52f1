#![allow(dead_code)]
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::{FromRow, Pool, Postgres};
use std::str::FromStr;

use crate::error::{DeskError, DeskResult};

pub type DbPool = Pool<Postgres>;

pub async fn init_pool_with_options(opts: PgConnectOptions) -> DeskResult<DbPool> {
    // connect_lazy_with returns the pool immediately. It does not validate connection.
    Ok(PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .idle_timeout(std::time::Duration::from_secs(120))
        .max_lifetime(std::time::Duration::from_secs(300))
        .connect_lazy_with(opts))
}

pub async fn init_pool(database_url: &str) -> DeskResult<DbPool> {
    let opts = PgConnectOptions::from_str(database_url)
        .map_err(|e| DeskError::Internal(format!("Invalid DB URL: {}", e)))?
        .ssl_mode(PgSslMode::Prefer);

    init_pool_with_options(opts).await
}

pub async fn init_database(pool: &DbPool) -> DeskResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database ready");
    Ok(())
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct SalesOrder {
    pub order_id: String,
    pub merchant_id: String,
    pub marketplace: String,
    pub marketplace_order_no: Option<String>,
    pub status: String,
    pub customer_name: Option<String>,
    pub order_time: DateTime<Utc>,
    pub total_amount: f64,
    pub memo: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct SalesOrderItem {
    pub item_id: i32,
    pub order_id: String,
    pub sku: String,
    pub product_name: Option<String>,
    pub quantity: i32,
    pub unit_price: f64,
    pub amount: f64,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub expense_id: Option<i32>,
    pub merchant_id: String,
    pub expense_date: NaiveDate,
    pub category: String,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub memo: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Wallet {
    pub wallet_id: i32,
    pub merchant_id: String,
    pub wallet_name: String,
    pub wallet_type: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct WalletLedgerEntry {
    pub entry_id: i32,
    pub wallet_id: i32,
    pub merchant_id: String,
    pub entry_date: NaiveDate,
    pub entry_type: String,
    pub amount: f64,
    pub description: Option<String>,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct WalletBalance {
    pub wallet_id: i32,
    pub wallet_name: String,
    pub wallet_type: String,
    pub balance: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct CommissionReceipt {
    pub receipt_id: i32,
    pub merchant_id: String,
    pub receipt_no: String,
    pub receipt_date: NaiveDate,
    pub gross_amount: f64,
    pub personal_used: f64,
    pub transferred_amount: f64,
    pub wallet_id: Option<i32>,
    pub memo: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct InventoryReturn {
    pub return_id: i32,
    pub merchant_id: String,
    pub order_id: String,
    pub sku: String,
    pub quantity: i32,
    pub reason: Option<String>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ReceiptLayer {
    pub layer_id: i32,
    pub merchant_id: String,
    pub sku: String,
    pub quantity: i32,
    pub unit_cost: f64,
    pub source_type: String,
    pub source_id: Option<String>,
    pub is_voided: bool,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct CogsAllocation {
    pub allocation_id: i32,
    pub merchant_id: String,
    pub order_id: String,
    pub sku: String,
    pub quantity: i32,
    pub amount: f64,
    pub is_reversal: bool,
    pub reference_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct BankAccount {
    pub account_id: i32,
    pub merchant_id: String,
    pub bank_name: String,
    pub account_no: String,
    pub account_name: Option<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct BankTransaction {
    pub txn_id: i32,
    pub merchant_id: String,
    pub account_id: i32,
    pub txn_time: DateTime<Utc>,
    pub description: Option<String>,
    pub withdrawal: f64,
    pub deposit: f64,
    pub channel: Option<String>,
    pub balance: Option<f64>,
    pub import_batch_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct ImportBatch {
    pub batch_id: String,
    pub merchant_id: String,
    pub batch_type: String,
    pub file_name: Option<String>,
    pub row_count: i32,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AdPerformanceRow {
    pub row_id: i32,
    pub merchant_id: String,
    pub platform: String,
    pub report_date: NaiveDate,
    pub campaign_name: String,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub revenue: f64,
    pub import_batch_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AffiliateAttribution {
    pub attribution_id: i32,
    pub merchant_id: String,
    pub order_ref: String,
    pub affiliate_name: String,
    pub commission_amount: f64,
    pub attributed_date: Option<NaiveDate>,
    pub import_batch_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct SettlementImportRow {
    pub settlement_id: i32,
    pub merchant_id: String,
    pub marketplace: String,
    pub txn_ref: String,
    pub order_id: Option<String>,
    pub amount: f64,
    pub settled_at: Option<DateTime<Utc>>,
    pub import_batch_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct UnsettledTransaction {
    pub forecast_id: i32,
    pub merchant_id: String,
    pub marketplace: String,
    pub txn_ref: String,
    pub order_id: Option<String>,
    pub expected_amount: f64,
    pub status: String,
    pub settled_amount: Option<f64>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    #[sqlx(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub notification_id: i32,
    pub merchant_id: String,
    pub category: String,
    pub title: String,
    pub body: Option<String>,
    pub is_read: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct DashboardStats {
    pub total_sales: f64,
    pub order_count: i64,
    pub total_expenses: f64,
    pub net_amount: f64,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct AdsSummary {
    pub platform: String,
    pub total_spend: Option<f64>,
    pub total_impressions: Option<i64>,
    pub total_clicks: Option<i64>,
    pub total_revenue: Option<f64>,
}
