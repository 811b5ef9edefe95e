//! Payment-gateway webhook reconciliation.
//!
//! The gateway notifies us of a payment outcome via GET query parameters
//! or a POST body (form-encoded or JSON). Processing is idempotent: the
//! order status flip and the credit grant happen in one atomic store
//! write, and an already-finalized order acknowledges without writing.
//!
//! The gateway retries until it receives the literal body `success`, so
//! every validation failure must come back non-`success`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;

use retouch_core::order::parse_money;
use retouch_store::{FinalizeOutcome, Store};

use crate::error::ApiError;
use crate::sign::verify_gateway_sign;
use crate::state::AppState;

/// Notification fields that must be present.
const REQUIRED_FIELDS: [&str; 5] = ["pid", "trade_no", "money", "trade_status", "sign"];

/// Gateway trade status meaning the payment went through.
const TRADE_SUCCESS: &str = "TRADE_SUCCESS";

/// Handle a GET notification.
pub async fn epay_notify_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<&'static str, ApiError> {
    process_notification(&state, params)
}

/// Handle a POST notification, form-encoded or JSON.
pub async fn epay_notify_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<&'static str, ApiError> {
    let params = parse_notification_body(&headers, &body)?;
    process_notification(&state, params)
}

/// Parse a POST notification body into a flat parameter map.
fn parse_notification_body(
    headers: &HeaderMap,
    body: &str,
) -> Result<BTreeMap<String, String>, ApiError> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|err| ApiError::BadRequest(format!("invalid JSON body: {err}")))?;
        let serde_json::Value::Object(map) = value else {
            return Err(ApiError::BadRequest("JSON body must be an object".into()));
        };

        Ok(map
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect())
    } else {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(body)
            .map_err(|err| ApiError::BadRequest(format!("invalid form body: {err}")))?;
        Ok(pairs.into_iter().collect())
    }
}

/// Validate and apply one gateway notification.
fn process_notification(
    state: &AppState,
    params: BTreeMap<String, String>,
) -> Result<&'static str, ApiError> {
    for field in REQUIRED_FIELDS {
        if params.get(field).map_or(true, String::is_empty) {
            return Err(ApiError::BadRequest(format!(
                "missing notification field: {field}"
            )));
        }
    }

    // Some gateways omit sign_type; when present it must be MD5.
    if let Some(sign_type) = params.get("sign_type") {
        if !sign_type.eq_ignore_ascii_case("MD5") {
            return Err(ApiError::BadRequest(format!(
                "unsupported sign_type: {sign_type}"
            )));
        }
    }

    let out_trade_no = recover_out_trade_no(&params).ok_or_else(|| {
        ApiError::BadRequest("missing notification field: out_trade_no".into())
    })?;

    if params.get("pid") != Some(&state.config.epay_pid) {
        return Err(ApiError::BadRequest("merchant ID mismatch".into()));
    }

    let sign = &params["sign"];
    if !verify_gateway_sign(&params, &state.config.epay_key, sign) {
        tracing::warn!(%out_trade_no, "Rejected notification with invalid signature");
        return Err(ApiError::BadRequest("invalid signature".into()));
    }

    let order = state
        .store
        .get_order(&out_trade_no)?
        .ok_or_else(|| ApiError::NotFound(format!("order not found: {out_trade_no}")))?;

    let money = parse_money(&params["money"])
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    if !order.amount_matches(money) {
        tracing::warn!(
            %out_trade_no,
            expected = %order.money(),
            received = money,
            "Rejected notification with amount mismatch"
        );
        return Err(ApiError::BadRequest("amount mismatch".into()));
    }

    let paid = params["trade_status"] == TRADE_SUCCESS;
    let outcome = state
        .store
        .finalize_order(&out_trade_no, paid, &params["trade_no"])?;

    match outcome {
        FinalizeOutcome::Finalized {
            status,
            new_balance,
        } => {
            tracing::info!(
                %out_trade_no,
                ?status,
                ?new_balance,
                "Payment order reconciled"
            );
        }
        FinalizeOutcome::AlreadyFinal { status } => {
            tracing::debug!(
                %out_trade_no,
                ?status,
                "Duplicate notification for finalized order"
            );
        }
    }

    Ok("success")
}

/// Find `out_trade_no` either as a top-level field or inside the `param`
/// passthrough, which some gateways send as a urlencoded or JSON blob.
fn recover_out_trade_no(params: &BTreeMap<String, String>) -> Option<String> {
    if let Some(no) = params.get("out_trade_no").filter(|s| !s.is_empty()) {
        return Some(no.clone());
    }

    let blob = params.get("param")?;

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(blob) {
        if let Some(serde_json::Value::String(no)) = map.get("out_trade_no") {
            return Some(no.clone());
        }
    }

    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(blob).ok()?;
    pairs
        .into_iter()
        .find(|(k, v)| k == "out_trade_no" && !v.is_empty())
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_body_flattens_scalars() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());

        let params = parse_notification_body(
            &headers,
            r#"{"pid":"1000","money":45.0,"trade_status":"TRADE_SUCCESS"}"#,
        )
        .unwrap();

        assert_eq!(params["pid"], "1000");
        assert_eq!(params["money"], "45.0");
        assert_eq!(params["trade_status"], "TRADE_SUCCESS");
    }

    #[test]
    fn form_body_parses_pairs() {
        let headers = HeaderMap::new();
        let params = parse_notification_body(&headers, "pid=1000&money=45.00").unwrap();
        assert_eq!(params["pid"], "1000");
        assert_eq!(params["money"], "45.00");
    }

    #[test]
    fn out_trade_no_recovered_from_param_blob() {
        let mut params = BTreeMap::new();
        params.insert(
            "param".to_string(),
            "out_trade_no=20260825120000abcd1234".to_string(),
        );
        assert_eq!(
            recover_out_trade_no(&params).as_deref(),
            Some("20260825120000abcd1234")
        );

        params.insert(
            "param".to_string(),
            r#"{"out_trade_no":"20260825120000abcd1234"}"#.to_string(),
        );
        assert_eq!(
            recover_out_trade_no(&params).as_deref(),
            Some("20260825120000abcd1234")
        );
    }

    #[test]
    fn top_level_out_trade_no_wins() {
        let mut params = BTreeMap::new();
        params.insert("out_trade_no".to_string(), "direct".to_string());
        params.insert("param".to_string(), "out_trade_no=indirect".to_string());
        assert_eq!(recover_out_trade_no(&params).as_deref(), Some("direct"));
    }
}
