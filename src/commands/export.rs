use crate::db::{Expense, SalesOrder};
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::extract::{Query, State as AxumState};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Extension;

use super::sales::query::{search_orders_internal, OrderSearchQuery};
use super::sales::utils::parse_date_safe;

/// Cells containing a comma, quote or newline are wrapped in quotes with
/// internal quotes doubled, so re-parsing yields the original string.
pub fn escape_csv_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') || cell.contains('\r') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

pub fn build_csv(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    out.push_str(
        &headers
            .iter()
            .map(|h| escape_csv_cell(h))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');
    for row in rows {
        out.push_str(
            &row.iter()
                .map(|c| escape_csv_cell(c))
                .collect::<Vec<_>>()
                .join(","),
        );
        out.push('\n');
    }
    out
}

fn csv_response(file_name: &str, body: String) -> axum::response::Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

#[derive(serde::Deserialize)]
pub struct ExportRangeQuery {
    pub start_date: String,
    pub end_date: String,
}

pub async fn export_sales_csv_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ExportRangeQuery>,
) -> DeskResult<axum::response::Response> {
    let orders: Vec<SalesOrder> = search_orders_internal(
        &state.pool,
        &claims.merchant_id,
        OrderSearchQuery {
            start_date: Some(query.start_date.clone()),
            end_date: Some(query.end_date.clone()),
            marketplace: None,
            keyword: None,
        },
    )
    .await?;

    let rows: Vec<Vec<String>> = orders
        .iter()
        .map(|o| {
            vec![
                o.order_id.clone(),
                o.marketplace.clone(),
                o.marketplace_order_no.clone().unwrap_or_default(),
                o.status.clone(),
                o.customer_name.clone().unwrap_or_default(),
                o.order_time.to_rfc3339(),
                format!("{:.2}", o.total_amount),
            ]
        })
        .collect();

    let body = build_csv(
        &[
            "order_id",
            "marketplace",
            "marketplace_order_no",
            "status",
            "customer_name",
            "order_time",
            "total_amount",
        ],
        &rows,
    );

    Ok(csv_response(
        &format!("sales_{}_{}.csv", query.start_date, query.end_date),
        body,
    ))
}

pub async fn export_expenses_csv_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ExportRangeQuery>,
) -> DeskResult<axum::response::Response> {
    let start = parse_date_safe(&query.start_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;
    let end = parse_date_safe(&query.end_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;

    let expenses: Vec<Expense> = sqlx::query_as(
        "SELECT * FROM expenses
         WHERE merchant_id = $1 AND expense_date BETWEEN $2 AND $3
         ORDER BY expense_date, expense_id",
    )
    .bind(&claims.merchant_id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.pool)
    .await?;

    let rows: Vec<Vec<String>> = expenses
        .iter()
        .map(|e| {
            vec![
                e.expense_date.format("%Y-%m-%d").to_string(),
                e.category.clone(),
                format!("{:.2}", e.amount),
                e.payment_method.clone().unwrap_or_default(),
                e.memo.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let body = build_csv(
        &["expense_date", "category", "amount", "payment_method", "memo"],
        &rows,
    );

    Ok(csv_response(
        &format!("expenses_{}_{}.csv", query.start_date, query.end_date),
        body,
    ))
}
