//! Payment-gateway request signing.
//!
//! The gateway signs requests and notifications with the same procedure:
//! drop `sign`, `sign_type`, and empty values, sort the remaining
//! parameters by key in byte order, join them as `k1=v1&k2=v2`, append
//! the merchant secret directly, and take the lower-hex MD5 digest.
//!
//! Generation (building the redirect URL) and verification (inbound
//! webhooks) share this one implementation so the two sides cannot drift.

use std::collections::BTreeMap;

use md5::{Digest, Md5};

/// Parameters excluded from the signing base string.
const EXCLUDED_KEYS: [&str; 2] = ["sign", "sign_type"];

/// Compute the gateway signature for a parameter map.
///
/// The `BTreeMap` gives byte-ordered keys for free; `sign`, `sign_type`,
/// and empty values are skipped.
#[must_use]
pub fn gateway_sign(params: &BTreeMap<String, String>, secret: &str) -> String {
    let base: Vec<String> = params
        .iter()
        .filter(|(k, v)| !EXCLUDED_KEYS.contains(&k.as_str()) && !v.is_empty())
        .map(|(k, v)| format!("{k}={v}"))
        .collect();

    let mut hasher = Md5::new();
    hasher.update(base.join("&").as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a received gateway signature.
///
/// Comparison is constant-time to prevent timing side channels; the
/// received signature is case-normalized first since some gateways send
/// upper-hex.
#[must_use]
pub fn verify_gateway_sign(params: &BTreeMap<String, String>, secret: &str, sign: &str) -> bool {
    constant_time_eq(&gateway_sign(params, secret), &sign.to_ascii_lowercase())
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
