//! `RocksDB` storage layer for retouch.
//!
//! This crate provides persistent storage for credit balances, ledger
//! entries, projects, image versions, and payment orders using `RocksDB`
//! with column families for efficient indexing.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `balances`: Credit balances, keyed by `user_id`
//! - `entries`: Ledger entries, keyed by `entry_id` (ULID)
//! - `entries_by_user`: Index for listing entries by user
//! - `projects`: Project records, keyed by `project_id`
//! - `projects_by_user`: Index for listing projects by user
//! - `versions`: Image versions, keyed by `project_id || version_id`
//! - `orders`: Payment orders, keyed by `out_trade_no`
//! - `orders_by_user`: Index for listing orders by user
//!
//! # Concurrency
//!
//! Compound read-modify-write operations (deduct, credit, order
//! finalization, version append) run under an internal write mutex, so
//! balance mutations are serialized per store and a concurrent duplicate
//! webhook cannot slip between the status check and the status write.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use retouch_core::{
    CreditEntry, ImageVersion, OrderStatus, PaymentOrder, Project, ProjectId, UserId,
};

/// Outcome of a payment-order finalization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The order was pending and has been finalized.
    Finalized {
        /// The status the order was flipped to.
        status: OrderStatus,
        /// New balance after the credit grant, present only when the
        /// order transitioned into `Success`.
        new_balance: Option<i64>,
    },

    /// The order was already terminal; nothing was written.
    AlreadyFinal {
        /// The terminal status the order already carried.
        status: OrderStatus,
    },
}

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Credit Ledger Operations
    // =========================================================================

    /// Get a user's balance. Returns 0 for an unknown user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn balance(&self, user_id: &UserId) -> Result<i64>;

    /// Atomically deduct credits and record a ledger entry.
    ///
    /// Returns the new balance. The entry's `balance_after` is filled in
    /// by the store before writing.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InsufficientCredits` (writing nothing) if the
    /// balance would go negative.
    fn deduct_credits(&self, user_id: &UserId, amount: i64, entry: CreditEntry) -> Result<i64>;

    /// Atomically add credits and record a ledger entry.
    ///
    /// Creates the balance row when absent. Not idempotent: at-most-once
    /// invocation is the caller's responsibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn add_credits(&self, user_id: &UserId, amount: i64, entry: CreditEntry) -> Result<i64>;

    /// List ledger entries for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditEntry>>;

    // =========================================================================
    // Project / Version Operations
    // =========================================================================

    /// Create a project together with its root image version atomically.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidChain` if the root version does not
    /// belong to the project or is not a root.
    fn create_project(&self, project: &Project, root: &ImageVersion) -> Result<()>;

    /// Get a project by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_project(&self, project_id: &ProjectId) -> Result<Option<Project>>;

    /// List a user's projects, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_projects(&self, user_id: &UserId) -> Result<Vec<Project>>;

    /// Append an edited version to a project's chain.
    ///
    /// The version's parent must be the current chain head.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the project doesn't exist.
    /// - `StoreError::InvalidChain` if the parent is not the chain head.
    fn append_version(&self, version: &ImageVersion) -> Result<()>;

    /// Get the current chain head of a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn latest_version(&self, project_id: &ProjectId) -> Result<Option<ImageVersion>>;

    /// List a project's versions in chain order (root first).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_versions(&self, project_id: &ProjectId) -> Result<Vec<ImageVersion>>;

    // =========================================================================
    // Payment Order Operations
    // =========================================================================

    /// Persist a new pending order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateOrder` if `out_trade_no` is taken.
    fn create_order(&self, order: &PaymentOrder) -> Result<()>;

    /// Get an order by merchant order number.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_order(&self, out_trade_no: &str) -> Result<Option<PaymentOrder>>;

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_orders(&self, user_id: &UserId, limit: usize, offset: usize)
        -> Result<Vec<PaymentOrder>>;

    /// Finalize a pending order and, on success, grant its credits.
    ///
    /// The status flip, `trade_no`, `paid_at`, the credit grant, and the
    /// purchase ledger entry are applied as one atomic write. Orders
    /// already terminal are left untouched (`FinalizeOutcome::AlreadyFinal`),
    /// which makes duplicate webhook delivery a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the order doesn't exist.
    fn finalize_order(
        &self,
        out_trade_no: &str,
        paid: bool,
        trade_no: &str,
    ) -> Result<FinalizeOutcome>;
}
