use crate::db::{DashboardStats, DbPool, SalesOrder};
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::extract::{Query, State as AxumState};
use axum::{Extension, Json};

use super::sales::utils::{bangkok_day_bounds, round2, sum_amounts};

#[derive(serde::Deserialize)]
pub struct StatsQuery {
    pub start_date: String,
    pub end_date: String,
}

pub async fn get_dashboard_stats_internal(
    pool: &DbPool,
    merchant_id: &str,
    start_date: &str,
    end_date: &str,
) -> DeskResult<DashboardStats> {
    let (from, to) = bangkok_day_bounds(start_date, end_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;

    // The two queries are independent; run them concurrently and join.
    let sales_fut = sqlx::query_scalar::<_, f64>(
        "SELECT total_amount FROM sales_orders
         WHERE merchant_id = $1 AND status != 'cancelled'
           AND order_time >= $2 AND order_time <= $3",
    )
    .bind(merchant_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool);

    let expense_fut = sqlx::query_scalar::<_, f64>(
        "SELECT amount FROM expenses
         WHERE merchant_id = $1 AND expense_date >= $2::date AND expense_date <= $3::date",
    )
    .bind(merchant_id)
    .bind(start_date)
    .bind(end_date)
    .fetch_all(pool);

    let (sales_rows, expense_rows) = tokio::join!(sales_fut, expense_fut);
    let sales_rows = sales_rows?;
    let expense_rows = expense_rows?;

    let total_sales = sum_amounts(&sales_rows);
    let total_expenses = sum_amounts(&expense_rows);

    Ok(DashboardStats {
        total_sales,
        order_count: sales_rows.len() as i64,
        total_expenses,
        net_amount: round2(total_sales - total_expenses),
    })
}

pub async fn get_dashboard_stats_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<StatsQuery>,
) -> DeskResult<Json<DashboardStats>> {
    let stats = get_dashboard_stats_internal(
        &state.pool,
        &claims.merchant_id,
        &query.start_date,
        &query.end_date,
    )
    .await?;
    Ok(Json(stats))
}

pub async fn get_recent_orders_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
) -> DeskResult<Json<Vec<SalesOrder>>> {
    let orders = sqlx::query_as::<_, SalesOrder>(
        "SELECT * FROM sales_orders WHERE merchant_id = $1 ORDER BY order_time DESC LIMIT 10",
    )
    .bind(&claims.merchant_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(orders))
}
