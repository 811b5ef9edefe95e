//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Credit balances, keyed by `user_id`.
    pub const BALANCES: &str = "balances";

    /// Ledger entries, keyed by `entry_id` (ULID).
    pub const ENTRIES: &str = "entries";

    /// Index: entries by user, keyed by `user_id || entry_id`.
    /// Value is empty (index only).
    pub const ENTRIES_BY_USER: &str = "entries_by_user";

    /// Project records, keyed by `project_id`.
    pub const PROJECTS: &str = "projects";

    /// Index: projects by user, keyed by `user_id || project_id`.
    /// Value is empty (index only).
    pub const PROJECTS_BY_USER: &str = "projects_by_user";

    /// Image versions, keyed by `project_id || version_id`.
    /// ULID version IDs keep each project's chain in append order.
    pub const VERSIONS: &str = "versions";

    /// Payment orders, keyed by `out_trade_no` (UTF-8).
    pub const ORDERS: &str = "orders";

    /// Index: orders by user, keyed by `user_id || out_trade_no`.
    /// Value is empty (index only).
    pub const ORDERS_BY_USER: &str = "orders_by_user";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::BALANCES,
        cf::ENTRIES,
        cf::ENTRIES_BY_USER,
        cf::PROJECTS,
        cf::PROJECTS_BY_USER,
        cf::VERSIONS,
        cf::ORDERS,
        cf::ORDERS_BY_USER,
    ]
}
