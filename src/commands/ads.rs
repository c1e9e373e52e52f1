use crate::db::{AdPerformanceRow, AdsSummary, DbPool};
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::extract::{Multipart, Query, State as AxumState};
use axum::{Extension, Json};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;
use std::io::Cursor;

use super::bank::parse_statement_date;
use super::sales::utils::{round2, sum_amounts};

const PAGE_SIZE: i64 = 1000;

/// One validated row of an ads performance report. Reports arrive as loose
/// spreadsheets; everything is checked at this boundary instead of indexing
/// cells by name downstream.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AdsReportRow {
    pub report_date: NaiveDate,
    pub campaign_name: String,
    pub impressions: i64,
    pub clicks: i64,
    pub spend: f64,
    pub revenue: f64,
}

struct AdsColumns {
    date: usize,
    campaign: usize,
    impressions: Option<usize>,
    clicks: Option<usize>,
    spend: usize,
    revenue: Option<usize>,
}

fn find_column(header: &[String], tokens: &[&str]) -> Option<usize> {
    header.iter().position(|cell| {
        let lowered = cell.to_lowercase();
        tokens.iter().any(|t| lowered.contains(t))
    })
}

fn resolve_ads_columns(header: &[String]) -> Option<AdsColumns> {
    Some(AdsColumns {
        date: find_column(header, &["date", "วันที่"])?,
        campaign: find_column(header, &["campaign", "แคมเปญ", "ชื่อโฆษณา"])?,
        impressions: find_column(header, &["impression", "การแสดงผล", "view"]),
        clicks: find_column(header, &["click", "คลิก"]),
        spend: find_column(header, &["spend", "expense", "cost", "ค่าใช้จ่าย"])?,
        revenue: find_column(header, &["revenue", "gmv", "sales", "ยอดขาย"]),
    })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                format!("{}", *f as i64)
            } else {
                format!("{}", f)
            }
        }
        Data::Int(i) => format!("{}", i),
        other => format!("{}", other),
    }
}

fn cell_number(row: &[String], idx: Option<usize>) -> f64 {
    idx.and_then(|i| row.get(i))
        .map(|s| s.replace(',', "").trim().parse::<f64>().unwrap_or(0.0))
        .unwrap_or(0.0)
}

pub fn parse_ads_report(bytes: &[u8]) -> DeskResult<Vec<AdsReportRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DeskError::Validation(th(Msg::EmptyWorkbook).to_string()))?
        .map_err(calamine::Error::from)?;

    let grid: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let header = grid
        .first()
        .ok_or_else(|| DeskError::Validation(th(Msg::EmptyWorkbook).to_string()))?;
    let columns = resolve_ads_columns(header)
        .ok_or_else(|| DeskError::Validation(th(Msg::FileReadError).to_string()))?;

    let mut rows = Vec::new();
    for raw in grid.iter().skip(1) {
        let report_date = match raw.get(columns.date).and_then(|c| parse_statement_date(c)) {
            Some(d) => d,
            None => continue,
        };
        let campaign_name = match raw.get(columns.campaign) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => continue,
        };
        let spend = cell_number(raw, Some(columns.spend));
        if spend < 0.0 {
            continue;
        }
        rows.push(AdsReportRow {
            report_date,
            campaign_name,
            impressions: cell_number(raw, columns.impressions) as i64,
            clicks: cell_number(raw, columns.clicks) as i64,
            spend,
            revenue: cell_number(raw, columns.revenue),
        });
    }

    Ok(rows)
}

async fn read_upload(
    multipart: &mut Multipart,
) -> DeskResult<(Vec<u8>, Option<String>, Option<String>)> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut platform: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DeskError::Internal(format!("multipart: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                file_name = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| DeskError::Internal(format!("multipart: {}", e)))?;
                bytes = Some(data.to_vec());
            }
            Some("platform") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| DeskError::Internal(format!("multipart: {}", e)))?;
                platform = Some(text.trim().to_lowercase());
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| DeskError::Validation(th(Msg::MissingFile).to_string()))?;
    Ok((bytes, file_name, platform))
}

/// Fetches every row in the range with a sequential page loop, the way the
/// marketplace report APIs are paged.
pub async fn get_ads_performance_internal(
    pool: &DbPool,
    merchant_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    platform: Option<&str>,
) -> DeskResult<Vec<AdPerformanceRow>> {
    let mut all = Vec::new();
    let mut offset: i64 = 0;

    loop {
        let page: Vec<AdPerformanceRow> = if let Some(p) = platform {
            sqlx::query_as(
                "SELECT * FROM ad_performance
                 WHERE merchant_id = $1 AND report_date BETWEEN $2 AND $3 AND platform = $4
                 ORDER BY report_date, row_id LIMIT $5 OFFSET $6",
            )
            .bind(merchant_id)
            .bind(start)
            .bind(end)
            .bind(p)
            .bind(PAGE_SIZE)
            .bind(offset)
            .fetch_all(pool)
            .await?
        } else {
            sqlx::query_as(
                "SELECT * FROM ad_performance
                 WHERE merchant_id = $1 AND report_date BETWEEN $2 AND $3
                 ORDER BY report_date, row_id LIMIT $4 OFFSET $5",
            )
            .bind(merchant_id)
            .bind(start)
            .bind(end)
            .bind(PAGE_SIZE)
            .bind(offset)
            .fetch_all(pool)
            .await?
        };

        let fetched = page.len() as i64;
        all.extend(page);
        if fetched < PAGE_SIZE {
            break;
        }
        offset += PAGE_SIZE;
    }

    Ok(all)
}

// --- Axum handlers ---

pub async fn upload_ads_report_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> DeskResult<Json<serde_json::Value>> {
    let (bytes, file_name, platform) = read_upload(&mut multipart).await?;
    let platform =
        platform.ok_or_else(|| DeskError::Validation("กรุณาระบุแพลตฟอร์ม".to_string()))?;

    let rows = parse_ads_report(&bytes)?;
    if rows.is_empty() {
        return Err(DeskError::Validation(th(Msg::EmptyWorkbook).to_string()));
    }

    let batch_id = format!("IMP-{}", &uuid::Uuid::new_v4().to_string()[..12]);
    sqlx::query(
        "INSERT INTO import_batches (batch_id, merchant_id, batch_type, file_name, row_count)
         VALUES ($1, $2, 'ads_performance', $3, $4)",
    )
    .bind(&batch_id)
    .bind(&claims.merchant_id)
    .bind(&file_name)
    .bind(rows.len() as i32)
    .execute(&state.pool)
    .await?;

    for row in &rows {
        sqlx::query(
            "INSERT INTO ad_performance (merchant_id, platform, report_date, campaign_name, impressions, clicks, spend, revenue, import_batch_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&claims.merchant_id)
        .bind(&platform)
        .bind(row.report_date)
        .bind(&row.campaign_name)
        .bind(row.impressions)
        .bind(row.clicks)
        .bind(row.spend)
        .bind(row.revenue)
        .bind(&batch_id)
        .execute(&state.pool)
        .await?;
    }

    Ok(Json(serde_json::json!({
        "batchId": batch_id,
        "inserted": rows.len(),
    })))
}

#[derive(serde::Deserialize)]
pub struct AdsRangeQuery {
    pub start_date: String,
    pub end_date: String,
    pub platform: Option<String>,
}

pub async fn get_ads_performance_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<AdsRangeQuery>,
) -> DeskResult<Json<Vec<AdPerformanceRow>>> {
    let start = super::sales::utils::parse_date_safe(&query.start_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;
    let end = super::sales::utils::parse_date_safe(&query.end_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;
    let rows = get_ads_performance_internal(
        &state.pool,
        &claims.merchant_id,
        start,
        end,
        query.platform.as_deref(),
    )
    .await?;
    Ok(Json(rows))
}

pub async fn get_ads_summary_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<AdsRangeQuery>,
) -> DeskResult<Json<serde_json::Value>> {
    let start = super::sales::utils::parse_date_safe(&query.start_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;
    let end = super::sales::utils::parse_date_safe(&query.end_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;

    // Per-platform aggregation stays in the database.
    let per_platform: Vec<AdsSummary> = sqlx::query_as(
        "SELECT platform, SUM(spend) as total_spend,
                CAST(SUM(impressions) AS BIGINT) as total_impressions,
                CAST(SUM(clicks) AS BIGINT) as total_clicks,
                SUM(revenue) as total_revenue
         FROM ad_performance
         WHERE merchant_id = $1 AND report_date BETWEEN $2 AND $3
         GROUP BY platform ORDER BY platform",
    )
    .bind(&claims.merchant_id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.pool)
    .await?;

    let spends: Vec<f64> = per_platform
        .iter()
        .map(|p| p.total_spend.unwrap_or(0.0))
        .collect();
    let total_spend = sum_amounts(&spends);
    let total_revenue =
        round2(per_platform.iter().map(|p| p.total_revenue.unwrap_or(0.0)).sum());

    Ok(Json(serde_json::json!({
        "platforms": per_platform,
        "totalSpend": total_spend,
        "totalRevenue": total_revenue,
    })))
}

// Affiliate attribution reports share the workbook pipeline.

#[derive(Debug, Clone, serde::Serialize)]
pub struct AffiliateReportRow {
    pub order_ref: String,
    pub affiliate_name: String,
    pub commission_amount: f64,
    pub attributed_date: Option<NaiveDate>,
}

pub fn parse_affiliate_report(bytes: &[u8]) -> DeskResult<Vec<AffiliateReportRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DeskError::Validation(th(Msg::EmptyWorkbook).to_string()))?
        .map_err(calamine::Error::from)?;

    let grid: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    let header = grid
        .first()
        .ok_or_else(|| DeskError::Validation(th(Msg::EmptyWorkbook).to_string()))?;
    let order_col = find_column(header, &["order", "คำสั่งซื้อ", "หมายเลข"])
        .ok_or_else(|| DeskError::Validation(th(Msg::FileReadError).to_string()))?;
    let name_col = find_column(header, &["affiliate", "creator", "ครีเอเตอร์", "พาร์ทเนอร์"])
        .ok_or_else(|| DeskError::Validation(th(Msg::FileReadError).to_string()))?;
    let amount_col = find_column(header, &["commission", "คอมมิชชั่น", "ค่าคอม"])
        .ok_or_else(|| DeskError::Validation(th(Msg::FileReadError).to_string()))?;
    let date_col = find_column(header, &["date", "วันที่"]);

    let mut rows = Vec::new();
    for raw in grid.iter().skip(1) {
        let order_ref = match raw.get(order_col) {
            Some(v) if !v.is_empty() => v.clone(),
            _ => continue,
        };
        let affiliate_name = match raw.get(name_col) {
            Some(v) if !v.is_empty() => v.clone(),
            _ => continue,
        };
        rows.push(AffiliateReportRow {
            order_ref,
            affiliate_name,
            commission_amount: cell_number(raw, Some(amount_col)),
            attributed_date: date_col
                .and_then(|i| raw.get(i))
                .and_then(|c| parse_statement_date(c)),
        });
    }
    Ok(rows)
}

pub async fn upload_affiliate_report_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> DeskResult<Json<serde_json::Value>> {
    let (bytes, file_name, _) = read_upload(&mut multipart).await?;
    let rows = parse_affiliate_report(&bytes)?;
    if rows.is_empty() {
        return Err(DeskError::Validation(th(Msg::EmptyWorkbook).to_string()));
    }

    let batch_id = format!("IMP-{}", &uuid::Uuid::new_v4().to_string()[..12]);
    sqlx::query(
        "INSERT INTO import_batches (batch_id, merchant_id, batch_type, file_name, row_count)
         VALUES ($1, $2, 'affiliate', $3, $4)",
    )
    .bind(&batch_id)
    .bind(&claims.merchant_id)
    .bind(&file_name)
    .bind(rows.len() as i32)
    .execute(&state.pool)
    .await?;

    for row in &rows {
        sqlx::query(
            "INSERT INTO affiliate_attributions (merchant_id, order_ref, affiliate_name, commission_amount, attributed_date, import_batch_id)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&claims.merchant_id)
        .bind(&row.order_ref)
        .bind(&row.affiliate_name)
        .bind(row.commission_amount)
        .bind(row.attributed_date)
        .bind(&batch_id)
        .execute(&state.pool)
        .await?;
    }

    Ok(Json(serde_json::json!({
        "batchId": batch_id,
        "inserted": rows.len(),
    })))
}
