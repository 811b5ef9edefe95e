//! Payment order types.
//!
//! A `PaymentOrder` maps money (integer cents) to credits. Orders are
//! created `pending`; the gateway's webhook later flips them to `success`
//! or `failed`. `success` is terminal and re-application is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Amount tolerance when matching a webhook `money` value against the
/// recorded order amount, in yuan.
pub const AMOUNT_TOLERANCE: f64 = 0.01;

/// A payment-gateway transaction record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Merchant-side order number, unique.
    pub out_trade_no: String,

    /// The purchasing user.
    pub user_id: UserId,

    /// Order amount in cents.
    pub amount_cents: i64,

    /// Credits granted when the order succeeds.
    pub credits: i64,

    /// Payment channel selected at checkout.
    pub payment_type: PaymentType,

    /// Current order status.
    pub status: OrderStatus,

    /// Gateway-side transaction number, set on finalization.
    pub trade_no: Option<String>,

    /// When the order was created.
    pub created_at: DateTime<Utc>,

    /// When the order was paid, set on successful finalization.
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentOrder {
    /// Create a new pending order.
    #[must_use]
    pub fn new(
        out_trade_no: String,
        user_id: UserId,
        amount_cents: i64,
        credits: i64,
        payment_type: PaymentType,
    ) -> Self {
        Self {
            out_trade_no,
            user_id,
            amount_cents,
            credits,
            payment_type,
            status: OrderStatus::Pending,
            trade_no: None,
            created_at: Utc::now(),
            paid_at: None,
        }
    }

    /// Format the order amount as a gateway money string, e.g. `"45.00"`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn money(&self) -> String {
        format!("{:.2}", self.amount_cents as f64 / 100.0)
    }

    /// Check whether a received money value matches the recorded amount
    /// within the gateway tolerance of 0.01.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn amount_matches(&self, money: f64) -> bool {
        (money - self.amount_cents as f64 / 100.0).abs() <= AMOUNT_TOLERANCE + f64::EPSILON
    }
}

/// Status of a payment order.
///
/// Transitions are monotonic: `Pending → Success` or `Pending → Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting the gateway notification.
    Pending,

    /// Paid and credited. Terminal.
    Success,

    /// The gateway reported a non-success outcome. Terminal.
    Failed,
}

/// Payment channel offered by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Alipay.
    Alipay,

    /// WeChat Pay.
    Wxpay,
}

impl PaymentType {
    /// The gateway wire name for this channel.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Alipay => "alipay",
            Self::Wxpay => "wxpay",
        }
    }
}

/// Error parsing a gateway money string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid money value: {0}")]
pub struct MoneyError(pub String);

/// Parse a gateway money string (`"45.00"`) into a float amount.
///
/// # Errors
///
/// Returns `MoneyError` if the value is not a non-negative decimal number.
pub fn parse_money(value: &str) -> Result<f64, MoneyError> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| MoneyError(value.to_string()))?;
    if parsed.is_finite() && parsed >= 0.0 {
        Ok(parsed)
    } else {
        Err(MoneyError(value.to_string()))
    }
}
