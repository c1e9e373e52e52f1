use crate::db::DbPool;
use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::extract::State as AxumState;
use axum::{Extension, Json};
use std::collections::HashMap;

use super::sales::utils::{bangkok_day_bounds, round2};

/// The fixed set of metric slots the builder can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSource {
    SalesTotal,
    OrdersCount,
    ExpensesTotal,
    AdSpend,
    ReturnsCount,
    WalletSpend,
}

impl MetricSource {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sales_total" => Some(Self::SalesTotal),
            "orders_count" => Some(Self::OrdersCount),
            "expenses_total" => Some(Self::ExpensesTotal),
            "ad_spend" => Some(Self::AdSpend),
            "returns_count" => Some(Self::ReturnsCount),
            "wallet_spend" => Some(Self::WalletSpend),
            _ => None,
        }
    }
}

#[derive(serde::Deserialize)]
pub struct MetricRequest {
    pub slot: String,
    pub source: String,
    pub marketplace: Option<String>,
    pub platform: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct AnalyticsRunRequest {
    pub start_date: String,
    pub end_date: String,
    pub metrics: Vec<MetricRequest>,
    pub formula: Option<String>,
}

async fn resolve_metric(
    pool: &DbPool,
    merchant_id: &str,
    req: &MetricRequest,
    start_date: &str,
    end_date: &str,
) -> DeskResult<f64> {
    let source = MetricSource::parse(&req.source).ok_or_else(|| {
        DeskError::Validation(format!("ไม่รู้จักตัวชี้วัด: {}", req.source))
    })?;

    let (from, to) = bangkok_day_bounds(start_date, end_date)
        .ok_or_else(|| DeskError::Validation(th(Msg::InvalidDate).to_string()))?;

    let value: Option<f64> = match source {
        MetricSource::SalesTotal => {
            let mut sql = String::from(
                "SELECT SUM(total_amount) FROM sales_orders
                 WHERE merchant_id = $1 AND status != 'cancelled'
                   AND order_time >= $2 AND order_time <= $3",
            );
            if req.marketplace.is_some() {
                sql.push_str(" AND marketplace = $4");
            }
            let mut q = sqlx::query_scalar::<_, Option<f64>>(&sql)
                .bind(merchant_id)
                .bind(from)
                .bind(to);
            if let Some(mp) = &req.marketplace {
                q = q.bind(mp);
            }
            q.fetch_one(pool).await?
        }
        MetricSource::OrdersCount => {
            let mut sql = String::from(
                "SELECT COUNT(*)::float8 FROM sales_orders
                 WHERE merchant_id = $1 AND status != 'cancelled'
                   AND order_time >= $2 AND order_time <= $3",
            );
            if req.marketplace.is_some() {
                sql.push_str(" AND marketplace = $4");
            }
            let mut q = sqlx::query_scalar::<_, Option<f64>>(&sql)
                .bind(merchant_id)
                .bind(from)
                .bind(to);
            if let Some(mp) = &req.marketplace {
                q = q.bind(mp);
            }
            q.fetch_one(pool).await?
        }
        MetricSource::ExpensesTotal => {
            sqlx::query_scalar::<_, Option<f64>>(
                "SELECT SUM(amount) FROM expenses
                 WHERE merchant_id = $1 AND expense_date >= $2::date AND expense_date <= $3::date",
            )
            .bind(merchant_id)
            .bind(start_date)
            .bind(end_date)
            .fetch_one(pool)
            .await?
        }
        MetricSource::AdSpend => {
            let mut sql = String::from(
                "SELECT SUM(spend) FROM ad_performance
                 WHERE merchant_id = $1 AND report_date >= $2::date AND report_date <= $3::date",
            );
            if req.platform.is_some() {
                sql.push_str(" AND platform = $4");
            }
            let mut q = sqlx::query_scalar::<_, Option<f64>>(&sql)
                .bind(merchant_id)
                .bind(start_date)
                .bind(end_date);
            if let Some(p) = &req.platform {
                q = q.bind(p);
            }
            q.fetch_one(pool).await?
        }
        MetricSource::ReturnsCount => {
            sqlx::query_scalar::<_, Option<f64>>(
                "SELECT COUNT(*)::float8 FROM inventory_returns
                 WHERE merchant_id = $1 AND created_at >= $2 AND created_at <= $3",
            )
            .bind(merchant_id)
            .bind(from)
            .bind(to)
            .fetch_one(pool)
            .await?
        }
        MetricSource::WalletSpend => {
            sqlx::query_scalar::<_, Option<f64>>(
                "SELECT SUM(ABS(amount)) FROM wallet_ledger
                 WHERE merchant_id = $1 AND amount < 0
                   AND entry_date >= $2::date AND entry_date <= $3::date",
            )
            .bind(merchant_id)
            .bind(start_date)
            .bind(end_date)
            .fetch_one(pool)
            .await?
        }
    };

    Ok(round2(value.unwrap_or(0.0)))
}

// --- Formula evaluation: a safe arithmetic subset over the metric slots ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let num = text.parse::<f64>().map_err(|_| format!("bad number: {}", text))?;
                tokens.push(Token::Num(num));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character: {}", other)),
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    values: &'a HashMap<String, f64>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<Option<f64>, String> {
        let mut acc = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    acc = combine(acc, rhs, |a, b| Some(a + b));
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    acc = combine(acc, rhs, |a, b| Some(a - b));
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<Option<f64>, String> {
        let mut acc = self.factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    acc = combine(acc, rhs, |a, b| Some(a * b));
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.factor()?;
                    // Division by zero produces a null cell, not an error.
                    acc = combine(acc, rhs, |a, b| if b == 0.0 { None } else { Some(a / b) });
                }
                _ => break,
            }
        }
        Ok(acc)
    }

    fn factor(&mut self) -> Result<Option<f64>, String> {
        match self.next().cloned() {
            Some(Token::Num(n)) => Ok(Some(n)),
            Some(Token::Ident(name)) => self
                .values
                .get(&name)
                .map(|v| Some(*v))
                .ok_or_else(|| format!("unknown metric: {}", name)),
            Some(Token::Minus) => {
                let inner = self.factor()?;
                Ok(inner.map(|v| -v))
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            other => Err(format!("unexpected token: {:?}", other)),
        }
    }
}

fn combine(
    lhs: Option<f64>,
    rhs: Option<f64>,
    op: impl Fn(f64, f64) -> Option<f64>,
) -> Option<f64> {
    match (lhs, rhs) {
        (Some(a), Some(b)) => op(a, b),
        _ => None,
    }
}

/// Evaluates the formula over resolved slot values. Returns Ok(None) when a
/// division by zero poisons the result; Err on any malformed input.
pub fn evaluate_formula(
    formula: &str,
    values: &HashMap<String, f64>,
) -> Result<Option<f64>, String> {
    let tokens = tokenize(formula)?;
    if tokens.is_empty() {
        return Err("empty formula".to_string());
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        values,
    };
    let result = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err("trailing tokens".to_string());
    }
    Ok(result)
}

// --- Axum handler ---

pub async fn run_analytics_axum(
    AxumState(state): AxumState<crate::state::AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AnalyticsRunRequest>,
) -> DeskResult<Json<serde_json::Value>> {
    if payload.metrics.is_empty() {
        return Err(DeskError::Validation(
            "กรุณาเลือกตัวชี้วัดอย่างน้อย 1 รายการ".to_string(),
        ));
    }

    let mut values: HashMap<String, f64> = HashMap::new();
    for metric in &payload.metrics {
        let value = resolve_metric(
            &state.pool,
            &claims.merchant_id,
            metric,
            &payload.start_date,
            &payload.end_date,
        )
        .await?;
        values.insert(metric.slot.clone(), value);
    }

    let computed = match payload.formula.as_deref() {
        Some(f) if !f.trim().is_empty() => {
            let result = evaluate_formula(f, &values).map_err(|e| {
                tracing::debug!("formula rejected: {}", e);
                DeskError::Validation(th(Msg::InvalidFormula).to_string())
            })?;
            result.map(round2)
        }
        _ => None,
    };

    Ok(Json(serde_json::json!({
        "metrics": values,
        "computed": computed,
    })))
}
