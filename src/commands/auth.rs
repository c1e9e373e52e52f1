use crate::error::{DeskError, DeskResult};
use crate::locale::{th, Msg};
use crate::middleware::auth::Claims;
use axum::{Extension, Json};

/// Echoes the validated claims so the frontend can confirm its session.
/// Token issuance lives in the hosted auth service, not here.
pub async fn check_auth_axum(
    claims: Option<Extension<Claims>>,
) -> DeskResult<Json<serde_json::Value>> {
    let Extension(claims) =
        claims.ok_or_else(|| DeskError::Auth(th(Msg::Unauthorized).to_string()))?;
    Ok(Json(serde_json::json!({
        "sub": claims.sub,
        "merchantId": claims.merchant_id,
        "role": claims.role,
    })))
}
