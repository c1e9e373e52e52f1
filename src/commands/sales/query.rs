use crate::db::{DbPool, SalesOrder, SalesOrderItem};
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::extract::{Query, State as AxumState};
use axum::{Extension, Json};

use super::utils::bangkok_day_bounds;

#[derive(serde::Deserialize)]
pub struct OrderSearchQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub marketplace: Option<String>,
    pub keyword: Option<String>,
}

pub async fn search_orders_internal(
    pool: &DbPool,
    merchant_id: &str,
    query: OrderSearchQuery,
) -> DeskResult<Vec<SalesOrder>> {
    let mut sql = String::from("SELECT * FROM sales_orders WHERE merchant_id = $1");
    let mut idx = 1;

    let bounds = match (query.start_date.as_deref(), query.end_date.as_deref()) {
        (Some(s), Some(e)) => Some(
            bangkok_day_bounds(s, e)
                .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?,
        ),
        _ => None,
    };

    if bounds.is_some() {
        sql.push_str(&format!(
            " AND order_time >= ${} AND order_time <= ${}",
            idx + 1,
            idx + 2
        ));
        idx += 2;
    }
    if query.marketplace.is_some() {
        sql.push_str(&format!(" AND marketplace = ${}", idx + 1));
        idx += 1;
    }
    if query.keyword.is_some() {
        sql.push_str(&format!(
            " AND (order_id ILIKE ${} OR marketplace_order_no ILIKE ${} OR customer_name ILIKE ${})",
            idx + 1,
            idx + 1,
            idx + 1
        ));
    }
    sql.push_str(" ORDER BY order_time DESC LIMIT 500");

    let mut q = sqlx::query_as::<_, SalesOrder>(&sql).bind(merchant_id);
    if let Some((from, to)) = bounds {
        q = q.bind(from).bind(to);
    }
    if let Some(mp) = query.marketplace {
        q = q.bind(mp);
    }
    if let Some(kw) = query.keyword {
        q = q.bind(format!("%{}%", kw));
    }

    Ok(q.fetch_all(pool).await?)
}

pub async fn search_orders_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<OrderSearchQuery>,
) -> DeskResult<Json<Vec<SalesOrder>>> {
    let orders = search_orders_internal(&state.pool, &claims.merchant_id, query).await?;
    Ok(Json(orders))
}

#[derive(serde::Deserialize)]
pub struct OrderItemsQuery {
    pub order_id: String,
}

pub async fn get_order_items_internal(
    pool: &DbPool,
    merchant_id: &str,
    order_id: &str,
) -> DeskResult<Vec<SalesOrderItem>> {
    Ok(sqlx::query_as::<_, SalesOrderItem>(
        "SELECT i.* FROM sales_order_items i
         JOIN sales_orders o ON i.order_id = o.order_id
         WHERE i.order_id = $1 AND o.merchant_id = $2
         ORDER BY i.item_id",
    )
    .bind(order_id)
    .bind(merchant_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_order_items_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<OrderItemsQuery>,
) -> DeskResult<Json<Vec<SalesOrderItem>>> {
    let items = get_order_items_internal(&state.pool, &claims.merchant_id, &query.order_id).await?;
    Ok(Json(items))
}
