use crate::db::{DbPool, Expense};
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::extract::{Query, State as AxumState};
use axum::{Extension, Json};

use super::sales::utils::{parse_date_safe, sum_amounts};

#[derive(serde::Deserialize)]
pub struct ExpenseInput {
    pub expense_id: Option<i32>,
    pub expense_date: String,
    pub category: String,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub memo: Option<String>,
}

pub async fn save_expense_internal(
    pool: &DbPool,
    merchant_id: &str,
    expense: ExpenseInput,
) -> DeskResult<i32> {
    let date = parse_date_safe(&expense.expense_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;

    if expense.amount < 0.0 {
        return Err(DeskError::Validation(
            "จำนวนเงินต้องไม่ติดลบ".to_string(),
        ));
    }

    if let Some(id) = expense.expense_id {
        let result = sqlx::query(
            "UPDATE expenses SET expense_date=$1, category=$2, amount=$3, payment_method=$4, memo=$5, updated_at=now()
             WHERE expense_id=$6 AND merchant_id=$7",
        )
        .bind(date)
        .bind(&expense.category)
        .bind(expense.amount)
        .bind(&expense.payment_method)
        .bind(&expense.memo)
        .bind(id)
        .bind(merchant_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DeskError::Validation("ไม่พบรายการค่าใช้จ่าย".to_string()));
        }
        Ok(id)
    } else {
        let row: (i32,) = sqlx::query_as(
            "INSERT INTO expenses (merchant_id, expense_date, category, amount, payment_method, memo)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING expense_id",
        )
        .bind(merchant_id)
        .bind(date)
        .bind(&expense.category)
        .bind(expense.amount)
        .bind(&expense.payment_method)
        .bind(&expense.memo)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}

#[derive(serde::Deserialize)]
pub struct ExpenseRangeQuery {
    pub start_date: String,
    pub end_date: String,
    pub category: Option<String>,
}

pub async fn get_expenses_internal(
    pool: &DbPool,
    merchant_id: &str,
    query: &ExpenseRangeQuery,
) -> DeskResult<Vec<Expense>> {
    let start = parse_date_safe(&query.start_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;
    let end = parse_date_safe(&query.end_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;

    let rows = if let Some(cat) = &query.category {
        sqlx::query_as::<_, Expense>(
            "SELECT * FROM expenses
             WHERE merchant_id = $1 AND expense_date BETWEEN $2 AND $3 AND category = $4
             ORDER BY expense_date DESC, expense_id DESC",
        )
        .bind(merchant_id)
        .bind(start)
        .bind(end)
        .bind(cat)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as::<_, Expense>(
            "SELECT * FROM expenses
             WHERE merchant_id = $1 AND expense_date BETWEEN $2 AND $3
             ORDER BY expense_date DESC, expense_id DESC",
        )
        .bind(merchant_id)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?
    };

    Ok(rows)
}

pub async fn save_expense_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ExpenseInput>,
) -> DeskResult<Json<i32>> {
    let id = save_expense_internal(&state.pool, &claims.merchant_id, payload).await?;
    Ok(Json(id))
}

pub async fn get_expenses_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ExpenseRangeQuery>,
) -> DeskResult<Json<Vec<Expense>>> {
    let rows = get_expenses_internal(&state.pool, &claims.merchant_id, &query).await?;
    Ok(Json(rows))
}

pub async fn get_expense_summary_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ExpenseRangeQuery>,
) -> DeskResult<Json<serde_json::Value>> {
    let rows = get_expenses_internal(&state.pool, &claims.merchant_id, &query).await?;
    let amounts: Vec<f64> = rows.iter().map(|r| r.amount).collect();
    let total = sum_amounts(&amounts);
    Ok(Json(serde_json::json!({
        "total": total,
        "count": rows.len(),
    })))
}

#[derive(serde::Deserialize)]
pub struct DeleteExpenseRequest {
    pub expense_id: i32,
}

pub async fn delete_expense_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<DeleteExpenseRequest>,
) -> DeskResult<Json<()>> {
    sqlx::query("DELETE FROM expenses WHERE expense_id = $1 AND merchant_id = $2")
        .bind(payload.expense_id)
        .bind(&claims.merchant_id)
        .execute(&state.pool)
        .await?;
    Ok(Json(()))
}
