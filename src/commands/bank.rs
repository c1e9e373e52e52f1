use crate::db::{BankAccount, BankTransaction, DbPool};
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::extract::{Multipart, Query, State as AxumState};
use axum::{Extension, Json};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use std::io::Cursor;

const HEADER_SCAN_ROWS: usize = 30;
const HEADER_MIN_GROUPS: usize = 2;
const HEADER_EARLY_EXIT_GROUPS: usize = 4;
const IMPORT_BATCH: usize = 500;

/// Semantic column groups, English and Thai. A row "matches" a group when
/// any cell contains any of its tokens as a substring (case-insensitive).
const TOKEN_GROUPS: [(&str, &[&str]); 6] = [
    ("date", &["date", "วันที่", "วัน/เดือน/ปี"]),
    (
        "description",
        &["description", "detail", "particulars", "รายละเอียด", "รายการ"],
    ),
    ("withdrawal", &["withdrawal", "debit", "ถอน", "เงินออก"]),
    ("deposit", &["deposit", "credit", "ฝาก", "เงินเข้า"]),
    ("channel", &["channel", "branch", "ช่องทาง", "สาขา"]),
    ("balance", &["balance", "outstanding", "คงเหลือ", "ยอดคงเหลือ"]),
];

#[derive(Debug, Clone, serde::Serialize)]
pub struct HeaderDetection {
    pub row_index: usize,
    pub matched_groups: usize,
    pub confidence: f64,
    pub fallback: bool,
}

fn row_group_matches(cells: &[String]) -> usize {
    let lowered: Vec<String> = cells.iter().map(|c| c.to_lowercase()).collect();
    TOKEN_GROUPS
        .iter()
        .filter(|(_, tokens)| {
            lowered
                .iter()
                .any(|cell| tokens.iter().any(|t| cell.contains(t)))
        })
        .count()
}

/// Scores the first 30 rows and picks the one matching the most distinct
/// token groups (ties keep the first seen, ≥4 groups exits early). Fewer
/// than 2 groups anywhere falls back to treating row 0 as the header.
pub fn detect_header_row(rows: &[Vec<String>]) -> HeaderDetection {
    let mut best_index = 0usize;
    let mut best_matches = 0usize;

    for (i, row) in rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let matches = row_group_matches(row);
        if matches > best_matches {
            best_matches = matches;
            best_index = i;
        }
        if matches >= HEADER_EARLY_EXIT_GROUPS {
            break;
        }
    }

    if best_matches < HEADER_MIN_GROUPS {
        return HeaderDetection {
            row_index: 0,
            matched_groups: best_matches,
            confidence: 0.3,
            fallback: true,
        };
    }

    HeaderDetection {
        row_index: best_index,
        matched_groups: best_matches,
        confidence: (best_matches as f64 / 5.0).min(1.0),
        fallback: false,
    }
}

/// Column indices resolved from the detected header row.
#[derive(Debug, Default)]
struct ColumnMap {
    date: Option<usize>,
    description: Option<usize>,
    withdrawal: Option<usize>,
    deposit: Option<usize>,
    channel: Option<usize>,
    balance: Option<usize>,
}

fn map_columns(header: &[String]) -> ColumnMap {
    let mut map = ColumnMap::default();
    for (i, cell) in header.iter().enumerate() {
        let lowered = cell.to_lowercase();
        for (group, tokens) in TOKEN_GROUPS.iter() {
            if tokens.iter().any(|t| lowered.contains(t)) {
                let slot = match *group {
                    "date" => &mut map.date,
                    "description" => &mut map.description,
                    "withdrawal" => &mut map.withdrawal,
                    "deposit" => &mut map.deposit,
                    "channel" => &mut map.channel,
                    _ => &mut map.balance,
                };
                if slot.is_none() {
                    *slot = Some(i);
                }
            }
        }
    }
    map
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ParsedBankRow {
    pub txn_date: NaiveDate,
    pub description: Option<String>,
    pub withdrawal: f64,
    pub deposit: f64,
    pub channel: Option<String>,
    pub balance: Option<f64>,
}

#[derive(Debug, serde::Serialize)]
pub struct ParsedStatement {
    pub detection: HeaderDetection,
    pub rows: Vec<ParsedBankRow>,
    pub skipped_rows: usize,
}

fn cell_to_string(cell: &Data) -> String {
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
        Data::Bool(b) => format!("{}", b),
        other => format!("{}", other),
    }
}

fn cell_to_amount(cell: Option<&String>) -> f64 {
    cell.map(|s| s.replace(',', "").trim().parse::<f64>().unwrap_or(0.0))
        .unwrap_or(0.0)
}

/// Excel serial day 0 is 1899-12-30.
fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial as i64))
}

/// Statement dates arrive as "DD/MM/YYYY", ISO, or Buddhist-era variants.
pub fn parse_statement_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(serial) = raw.parse::<f64>() {
        if serial > 20000.0 && serial < 80000.0 {
            return excel_serial_to_date(serial);
        }
    }
    let parsed = NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d-%m-%Y"))
        .ok()?;
    // Buddhist-era year (e.g. 2567) to Gregorian
    if parsed.year() > 2400 {
        return parsed.with_year(parsed.year() - 543);
    }
    Some(parsed)
}

pub fn parse_bank_statement_auto(bytes: &[u8]) -> DeskResult<ParsedStatement> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DeskError::Validation(th(Msg::EmptyWorkbook).to_string()))?
        .map_err(calamine::Error::from)?;

    let grid: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    if grid.is_empty() {
        return Err(DeskError::Validation(th(Msg::EmptyWorkbook).to_string()));
    }

    let detection = detect_header_row(&grid);
    let columns = map_columns(&grid[detection.row_index]);

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for raw in grid.iter().skip(detection.row_index + 1) {
        let date_cell = columns.date.and_then(|i| raw.get(i));
        let txn_date = match date_cell.and_then(|c| parse_statement_date(c)) {
            Some(d) => d,
            None => {
                skipped += 1;
                continue;
            }
        };

        let withdrawal = cell_to_amount(columns.withdrawal.and_then(|i| raw.get(i)));
        let deposit = cell_to_amount(columns.deposit.and_then(|i| raw.get(i)));
        if withdrawal == 0.0 && deposit == 0.0 {
            skipped += 1;
            continue;
        }

        let balance_cell = columns.balance.and_then(|i| raw.get(i));
        let balance = match balance_cell {
            Some(s) if !s.trim().is_empty() => Some(cell_to_amount(Some(s))),
            _ => None,
        };

        rows.push(ParsedBankRow {
            txn_date,
            description: columns
                .description
                .and_then(|i| raw.get(i))
                .filter(|s| !s.is_empty())
                .cloned(),
            withdrawal,
            deposit,
            channel: columns
                .channel
                .and_then(|i| raw.get(i))
                .filter(|s| !s.is_empty())
                .cloned(),
            balance,
        });
    }

    Ok(ParsedStatement {
        detection,
        rows,
        skipped_rows: skipped,
    })
}

fn bangkok_midnight(date: NaiveDate) -> DeskResult<DateTime<Utc>> {
    DateTime::<FixedOffset>::parse_from_rfc3339(&format!("{}T00:00:00+07:00", date.format("%Y-%m-%d")))
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| DeskError::Validation(th(Msg::InvalidDate).to_string()))
}

async fn read_upload(multipart: &mut Multipart) -> DeskResult<(Vec<u8>, Option<String>, Option<i32>)> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut account_id: Option<i32> = None;

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
            Some("account_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| DeskError::Internal(format!("multipart: {}", e)))?;
                account_id = text.trim().parse::<i32>().ok();
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| DeskError::Validation(th(Msg::MissingFile).to_string()))?;
    Ok((bytes, file_name, account_id))
}

// --- Axum handlers ---

pub async fn preview_bank_statement_axum(
    AxumState(_state): AxumState<crate::state::AppState>,
    Extension(_claims): Extension<Claims>,
    mut multipart: Multipart,
) -> DeskResult<Json<ParsedStatement>> {
    let (bytes, _, _) = read_upload(&mut multipart).await?;
    let parsed = parse_bank_statement_auto(&bytes)?;
    Ok(Json(parsed))
}

pub async fn import_bank_statement_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> DeskResult<Json<serde_json::Value>> {
    let (bytes, file_name, account_id) = read_upload(&mut multipart).await?;
    let account_id =
        account_id.ok_or_else(|| DeskError::Validation("กรุณาระบุบัญชีธนาคาร".to_string()))?;

    let account: Option<BankAccount> = sqlx::query_as(
        "SELECT * FROM bank_accounts WHERE account_id = $1 AND merchant_id = $2",
    )
    .bind(account_id)
    .bind(&claims.merchant_id)
    .fetch_optional(&state.pool)
    .await?;
    if account.is_none() {
        return Err(DeskError::Validation("ไม่พบบัญชีธนาคาร".to_string()));
    }

    let parsed = parse_bank_statement_auto(&bytes)?;
    if parsed.rows.is_empty() {
        return Err(DeskError::Validation(th(Msg::EmptyWorkbook).to_string()));
    }

    let batch_id = format!("IMP-{}", &uuid::Uuid::new_v4().to_string()[..12]);
    sqlx::query(
        "INSERT INTO import_batches (batch_id, merchant_id, batch_type, file_name, row_count)
         VALUES ($1, $2, 'bank_statement', $3, $4)",
    )
    .bind(&batch_id)
    .bind(&claims.merchant_id)
    .bind(&file_name)
    .bind(parsed.rows.len() as i32)
    .execute(&state.pool)
    .await?;

    let mut inserted = 0usize;
    for chunk in parsed.rows.chunks(IMPORT_BATCH) {
        let mut times = Vec::with_capacity(chunk.len());
        let mut descriptions = Vec::with_capacity(chunk.len());
        let mut withdrawals = Vec::with_capacity(chunk.len());
        let mut deposits = Vec::with_capacity(chunk.len());
        let mut channels = Vec::with_capacity(chunk.len());
        let mut balances = Vec::with_capacity(chunk.len());
        for row in chunk {
            times.push(bangkok_midnight(row.txn_date)?);
            descriptions.push(row.description.clone());
            withdrawals.push(row.withdrawal);
            deposits.push(row.deposit);
            channels.push(row.channel.clone());
            balances.push(row.balance);
        }

        let result = sqlx::query(
            "INSERT INTO bank_transactions (merchant_id, account_id, txn_time, description, withdrawal, deposit, channel, balance, import_batch_id)
             SELECT $1, $2, t, d, w, dp, c, b, $3
             FROM unnest($4::timestamptz[], $5::text[], $6::float8[], $7::float8[], $8::text[], $9::float8[]) AS v(t, d, w, dp, c, b)",
        )
        .bind(&claims.merchant_id)
        .bind(account_id)
        .bind(&batch_id)
        .bind(&times)
        .bind(&descriptions)
        .bind(&withdrawals)
        .bind(&deposits)
        .bind(&channels)
        .bind(&balances)
        .execute(&state.pool)
        .await?;
        inserted += result.rows_affected() as usize;
    }

    let _ = sqlx::query(
        "INSERT INTO notifications (merchant_id, category, title, body)
         VALUES ($1, 'import', $2, $3)",
    )
    .bind(&claims.merchant_id)
    .bind("นำเข้ารายการธนาคารเสร็จสิ้น")
    .bind(format!("นำเข้า {} รายการ (ข้าม {} แถว)", inserted, parsed.skipped_rows))
    .execute(&state.pool)
    .await;

    Ok(Json(serde_json::json!({
        "batchId": batch_id,
        "inserted": inserted,
        "skipped": parsed.skipped_rows,
        "confidence": parsed.detection.confidence,
    })))
}

#[derive(serde::Deserialize)]
pub struct BankTxnQuery {
    pub account_id: i32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn get_bank_transactions_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<BankTxnQuery>,
) -> DeskResult<Json<Vec<BankTransaction>>> {
    let rows = if let (Some(s), Some(e)) = (query.start_date.as_deref(), query.end_date.as_deref())
    {
        let (from, to) = super::sales::utils::bangkok_day_bounds(s, e)
            .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;
        sqlx::query_as::<_, BankTransaction>(
            "SELECT * FROM bank_transactions
             WHERE merchant_id = $1 AND account_id = $2 AND txn_time >= $3 AND txn_time <= $4
             ORDER BY txn_time DESC",
        )
        .bind(&claims.merchant_id)
        .bind(query.account_id)
        .bind(from)
        .bind(to)
        .fetch_all(&state.pool)
        .await?
    } else {
        sqlx::query_as::<_, BankTransaction>(
            "SELECT * FROM bank_transactions
             WHERE merchant_id = $1 AND account_id = $2
             ORDER BY txn_time DESC LIMIT 200",
        )
        .bind(&claims.merchant_id)
        .bind(query.account_id)
        .fetch_all(&state.pool)
        .await?
    };
    Ok(Json(rows))
}

#[derive(serde::Deserialize)]
pub struct BankAccountInput {
    pub bank_name: String,
    pub account_no: String,
    pub account_name: Option<String>,
}

pub async fn create_bank_account_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BankAccountInput>,
) -> DeskResult<Json<i32>> {
    let row: (i32,) = sqlx::query_as(
        "INSERT INTO bank_accounts (merchant_id, bank_name, account_no, account_name)
         VALUES ($1, $2, $3, $4) RETURNING account_id",
    )
    .bind(&claims.merchant_id)
    .bind(&payload.bank_name)
    .bind(&payload.account_no)
    .bind(&payload.account_name)
    .fetch_one(&state.pool)
    .await?;
    Ok(Json(row.0))
}

pub async fn get_bank_accounts_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
) -> DeskResult<Json<Vec<BankAccount>>> {
    let rows = sqlx::query_as::<_, BankAccount>(
        "SELECT * FROM bank_accounts WHERE merchant_id = $1 AND is_active = TRUE ORDER BY bank_name",
    )
    .bind(&claims.merchant_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}
