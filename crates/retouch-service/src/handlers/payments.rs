//! Payment-order handlers.
//!
//! Orders are created against a fixed server-side package table; the
//! client only names a package, never an amount. The response carries a
//! signed gateway redirect URL.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use retouch_core::{OrderStatus, PaymentOrder, PaymentType};
use retouch_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::credits::Pagination;
use crate::sign::gateway_sign;
use crate::state::AppState;

/// Purchasable credit packages: (credits, price in cents).
const PACKAGES: [(i64, i64); 3] = [(10, 1000), (50, 4500), (100, 8000)];

/// Create-order request.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Package size in credits; must match a listed package.
    pub credits: i64,

    /// Payment channel.
    pub payment_type: PaymentType,
}

/// Order response.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    /// Merchant order number.
    pub out_trade_no: String,
    /// Credits granted on success.
    pub credits: i64,
    /// Amount in cents.
    pub amount_cents: i64,
    /// Payment channel.
    pub payment_type: PaymentType,
    /// Current status.
    pub status: OrderStatus,
    /// Gateway transaction number, present once finalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_no: Option<String>,
    /// Signed gateway redirect URL, present while the order is payable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_url: Option<String>,
    /// Created timestamp.
    pub created_at: String,
}

impl OrderResponse {
    fn from_order(order: &PaymentOrder, pay_url: Option<String>) -> Self {
        Self {
            out_trade_no: order.out_trade_no.clone(),
            credits: order.credits,
            amount_cents: order.amount_cents,
            payment_type: order.payment_type,
            status: order.status,
            trade_no: order.trade_no.clone(),
            pay_url,
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

/// One purchasable package.
#[derive(Debug, Serialize)]
pub struct PackageResponse {
    /// Package size in credits.
    pub credits: i64,
    /// Price in cents.
    pub amount_cents: i64,
}

/// List the purchasable credit packages.
pub async fn list_packages() -> Json<Vec<PackageResponse>> {
    Json(
        PACKAGES
            .iter()
            .map(|&(credits, amount_cents)| PackageResponse {
                credits,
                amount_cents,
            })
            .collect(),
    )
}

/// Create a pending order and a signed gateway redirect URL.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let Some(&(credits, amount_cents)) = PACKAGES.iter().find(|(c, _)| *c == body.credits) else {
        return Err(ApiError::BadRequest(format!(
            "unknown credit package: {}",
            body.credits
        )));
    };

    let order = PaymentOrder::new(
        generate_out_trade_no(),
        auth.user_id,
        amount_cents,
        credits,
        body.payment_type,
    );
    state.store.create_order(&order)?;

    tracing::info!(
        out_trade_no = %order.out_trade_no,
        user_id = %auth.user_id,
        credits,
        "Payment order created"
    );

    let pay_url = build_pay_url(&state, &order)?;
    Ok((
        StatusCode::CREATED,
        Json(OrderResponse::from_order(&order, Some(pay_url))),
    ))
}

/// Re-issue the gateway redirect URL for a still-pending order.
pub async fn retry_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(out_trade_no): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .store
        .get_order(&out_trade_no)?
        .ok_or_else(|| ApiError::NotFound(format!("order not found: {out_trade_no}")))?;
    if order.user_id != auth.user_id {
        return Err(ApiError::Forbidden);
    }
    if order.status != OrderStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "order is no longer payable: {out_trade_no}"
        )));
    }

    let pay_url = build_pay_url(&state, &order)?;
    Ok(Json(OrderResponse::from_order(&order, Some(pay_url))))
}

/// List the authenticated user's orders, newest first.
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let (limit, offset) = pagination.clamp();
    let orders = state.store.list_orders(&auth.user_id, limit, offset)?;
    Ok(Json(
        orders
            .iter()
            .map(|o| OrderResponse::from_order(o, None))
            .collect(),
    ))
}

/// Generate a merchant order number: a UTC timestamp prefix for human
/// readability plus a random suffix for uniqueness.
fn generate_out_trade_no() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}{}", Utc::now().format("%Y%m%d%H%M%S"), &suffix[..8])
}

/// Build the signed gateway redirect URL for an order.
fn build_pay_url(state: &AppState, order: &PaymentOrder) -> Result<String, ApiError> {
    let config = &state.config;

    let mut params = BTreeMap::new();
    params.insert("pid".to_string(), config.epay_pid.clone());
    params.insert("type".to_string(), order.payment_type.as_str().to_string());
    params.insert("out_trade_no".to_string(), order.out_trade_no.clone());
    params.insert("notify_url".to_string(), config.epay_notify_url.clone());
    params.insert("return_url".to_string(), config.epay_return_url.clone());
    params.insert("name".to_string(), format!("{} credits", order.credits));
    params.insert("money".to_string(), order.money());

    let sign = gateway_sign(&params, &config.epay_key);
    params.insert("sign".to_string(), sign);
    params.insert("sign_type".to_string(), "MD5".to_string());

    let query = serde_urlencoded::to_string(&params)
        .map_err(|err| ApiError::Internal(format!("failed to encode gateway query: {err}")))?;
    Ok(format!("{}?{query}", config.epay_gateway_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use retouch_core::UserId;

    #[test]
    fn out_trade_no_has_timestamp_prefix() {
        let no = generate_out_trade_no();
        assert_eq!(no.len(), 22);
        assert!(no[..14].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn packages_are_distinct() {
        let mut sizes: Vec<i64> = PACKAGES.iter().map(|(c, _)| *c).collect();
        sizes.dedup();
        assert_eq!(sizes.len(), PACKAGES.len());
    }

    #[test]
    fn pay_url_query_verifies() {
        use crate::sign::verify_gateway_sign;

        let order = PaymentOrder::new(
            "20260825120000abcd1234".into(),
            UserId::generate(),
            4500,
            50,
            PaymentType::Alipay,
        );

        let mut params = BTreeMap::new();
        params.insert("pid".to_string(), "1000".to_string());
        params.insert("type".to_string(), order.payment_type.as_str().to_string());
        params.insert("out_trade_no".to_string(), order.out_trade_no.clone());
        params.insert("money".to_string(), order.money());

        let sign = gateway_sign(&params, "SECRET");
        assert!(verify_gateway_sign(&params, "SECRET", &sign));
    }
}
