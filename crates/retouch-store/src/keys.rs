//! Key encoding utilities for `RocksDB`.
//!
//! This module provides functions for encoding and decoding keys used in
//! column families.

use retouch_core::{EntryId, ProjectId, UserId, VersionId};

/// Create a balance key from a user ID.
#[must_use]
pub fn balance_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Create a ledger-entry key from an entry ID.
#[must_use]
pub fn entry_key(entry_id: &EntryId) -> Vec<u8> {
    entry_id.to_bytes().to_vec()
}

/// Create a user-entry index key.
///
/// Format: `user_id (16 bytes) || entry_id (16 bytes)`
///
/// Since ULIDs are time-ordered, entries for a user sort by time.
#[must_use]
pub fn user_entry_key(user_id: &UserId, entry_id: &EntryId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&entry_id.to_bytes());
    key
}

/// Create a prefix for iterating all entries for a user.
#[must_use]
pub fn user_entries_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the entry ID from a user-entry index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_entry_id_from_user_key(key: &[u8]) -> EntryId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    EntryId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Create a project key from a project ID.
#[must_use]
pub fn project_key(project_id: &ProjectId) -> Vec<u8> {
    project_id.as_bytes().to_vec()
}

/// Create a user-project index key.
///
/// Format: `user_id (16 bytes) || project_id (16 bytes)`
#[must_use]
pub fn user_project_key(user_id: &UserId, project_id: &ProjectId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(project_id.as_bytes());
    key
}

/// Create a prefix for iterating all projects for a user.
#[must_use]
pub fn user_projects_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the project ID from a user-project index key.
///
/// # Panics
///
/// Panics if the key is not at least 32 bytes.
#[must_use]
pub fn extract_project_id_from_user_key(key: &[u8]) -> ProjectId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    ProjectId::from_uuid(uuid::Uuid::from_bytes(bytes))
}

/// Create a version key.
///
/// Format: `project_id (16 bytes) || version_id (16 bytes)`
///
/// ULID version IDs keep each project's versions in append order, so the
/// chain head is the last key under the project prefix.
#[must_use]
pub fn version_key(project_id: &ProjectId, version_id: &VersionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(project_id.as_bytes());
    key.extend_from_slice(&version_id.to_bytes());
    key
}

/// Create a prefix for iterating all versions of a project.
#[must_use]
pub fn project_versions_prefix(project_id: &ProjectId) -> Vec<u8> {
    project_id.as_bytes().to_vec()
}

/// Create an order key from a merchant order number.
#[must_use]
pub fn order_key(out_trade_no: &str) -> Vec<u8> {
    out_trade_no.as_bytes().to_vec()
}

/// Create a user-order index key.
///
/// Format: `user_id (16 bytes) || out_trade_no (UTF-8)`
///
/// Order numbers start with a UTC timestamp, so byte order is
/// approximately chronological.
#[must_use]
pub fn user_order_key(user_id: &UserId, out_trade_no: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + out_trade_no.len());
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(out_trade_no.as_bytes());
    key
}

/// Create a prefix for iterating all orders for a user.
#[must_use]
pub fn user_orders_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Extract the order number from a user-order index key.
///
/// # Panics
///
/// Panics if the suffix is not valid UTF-8.
#[must_use]
pub fn extract_order_no_from_user_key(key: &[u8]) -> String {
    String::from_utf8(key[16..].to_vec()).expect("valid UTF-8 order number")
}
