//! Credit ledger entry types.
//!
//! Every balance mutation appends a journal entry so the history of a
//! user's credits is fully reconstructable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EntryId, UserId};

/// Credits charged for one edit job.
pub const EDIT_COST_CREDITS: i64 = 1;

/// A user's credit balance.
///
/// One row per user, created lazily on the first credit grant. Mutated
/// only by ledger operations; the balance may never go negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditBalance {
    /// The user ID.
    pub user_id: UserId,

    /// Current balance in whole credits.
    pub credits: i64,

    /// When the balance was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl CreditBalance {
    /// Create a zero balance for a user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            credits: 0,
            updated_at: Utc::now(),
        }
    }
}

/// A credit ledger entry representing one balance change.
///
/// Amounts are signed: positive entries add credits, negative entries
/// deduct them. `balance_after` records the balance once the entry was
/// applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditEntry {
    /// Unique entry ID (ULID for time-ordering).
    pub id: EntryId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Signed amount in credits.
    pub amount: i64,

    /// What caused the entry.
    pub kind: EntryKind,

    /// Balance after this entry was applied.
    pub balance_after: i64,

    /// Human-readable description.
    pub description: String,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl CreditEntry {
    /// Create a charge entry for an edit job (always negative).
    #[must_use]
    pub fn edit_charge(user_id: UserId, amount: i64, description: String) -> Self {
        Self {
            id: EntryId::generate(),
            user_id,
            amount: -amount.abs(),
            kind: EntryKind::EditCharge,
            balance_after: 0,
            description,
            created_at: Utc::now(),
        }
    }

    /// Create a refund entry compensating a failed edit.
    #[must_use]
    pub fn refund(user_id: UserId, amount: i64, reason: String) -> Self {
        Self {
            id: EntryId::generate(),
            user_id,
            amount: amount.abs(),
            kind: EntryKind::Refund,
            balance_after: 0,
            description: reason,
            created_at: Utc::now(),
        }
    }

    /// Create a purchase entry for a reconciled payment order.
    #[must_use]
    pub fn purchase(user_id: UserId, amount: i64, out_trade_no: &str) -> Self {
        Self {
            id: EntryId::generate(),
            user_id,
            amount: amount.abs(),
            kind: EntryKind::Purchase,
            balance_after: 0,
            description: format!("Purchased {amount} credits (order {out_trade_no})"),
            created_at: Utc::now(),
        }
    }
}

/// What caused a credit ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// One credit deducted for a submitted edit job.
    EditCharge,

    /// Compensating credit after a charged job failed to deliver.
    Refund,

    /// Credits bought through the payment gateway.
    Purchase,
}

impl EntryKind {
    /// Check if this entry kind adds credits.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        matches!(self, Self::Refund | Self::Purchase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_charge_is_negative() {
        let user_id = UserId::generate();
        let entry = CreditEntry::edit_charge(user_id, 1, "Edit job".into());

        assert_eq!(entry.amount, -1);
        assert_eq!(entry.kind, EntryKind::EditCharge);
        assert!(!entry.kind.is_credit());
    }

    #[test]
    fn refund_is_positive() {
        let user_id = UserId::generate();
        let entry = CreditEntry::refund(user_id, 1, "Provider failure".into());

        assert_eq!(entry.amount, 1);
        assert!(entry.kind.is_credit());
    }

    #[test]
    fn purchase_describes_order() {
        let user_id = UserId::generate();
        let entry = CreditEntry::purchase(user_id, 50, "20260825120000abcd1234");

        assert_eq!(entry.amount, 50);
        assert_eq!(entry.kind, EntryKind::Purchase);
        assert!(entry.description.contains("20260825120000abcd1234"));
    }
}
