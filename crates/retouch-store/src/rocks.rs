//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store`
//! trait. Compound read-modify-write operations take an internal write
//! mutex so conditional transitions (balance deductions, order
//! finalization, chain appends) are serialized; the batched write then
//! makes each transition durable atomically.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use retouch_core::{
    CreditBalance, CreditEntry, ImageVersion, OrderStatus, PaymentOrder, Project, ProjectId,
    UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{FinalizeOutcome, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    // Serializes compound read-modify-write operations. RocksDB batches
    // are atomic on disk but do not provide compare-and-swap; this lock
    // closes the read-check/write gap.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_balance_record(&self, user_id: &UserId) -> Result<Option<CreditBalance>> {
        let cf = self.cf(cf::BALANCES)?;
        self.db
            .get_cf(&cf, keys::balance_key(user_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Stage a balance write plus its ledger entry into `batch`.
    fn stage_balance_write(
        &self,
        batch: &mut WriteBatch,
        balance: &CreditBalance,
        entry: &CreditEntry,
    ) -> Result<()> {
        let cf_balances = self.cf(cf::BALANCES)?;
        let cf_entries = self.cf(cf::ENTRIES)?;
        let cf_by_user = self.cf(cf::ENTRIES_BY_USER)?;

        batch.put_cf(
            &cf_balances,
            keys::balance_key(&balance.user_id),
            Self::serialize(balance)?,
        );
        batch.put_cf(&cf_entries, keys::entry_key(&entry.id), Self::serialize(entry)?);
        batch.put_cf(
            &cf_by_user,
            keys::user_entry_key(&entry.user_id, &entry.id),
            [],
        );
        Ok(())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Credit Ledger Operations
    // =========================================================================

    fn balance(&self, user_id: &UserId) -> Result<i64> {
        Ok(self
            .get_balance_record(user_id)?
            .map_or(0, |b| b.credits))
    }

    fn deduct_credits(&self, user_id: &UserId, amount: i64, mut entry: CreditEntry) -> Result<i64> {
        let _guard = self.write_lock.lock().expect("store write lock poisoned");

        let mut balance = self
            .get_balance_record(user_id)?
            .unwrap_or_else(|| CreditBalance::new(*user_id));

        if balance.credits < amount {
            return Err(StoreError::InsufficientCredits {
                balance: balance.credits,
                required: amount,
            });
        }

        balance.credits -= amount;
        balance.updated_at = chrono::Utc::now();
        entry.balance_after = balance.credits;

        let mut batch = WriteBatch::default();
        self.stage_balance_write(&mut batch, &balance, &entry)?;
        self.write(batch)?;

        Ok(balance.credits)
    }

    fn add_credits(&self, user_id: &UserId, amount: i64, mut entry: CreditEntry) -> Result<i64> {
        let _guard = self.write_lock.lock().expect("store write lock poisoned");

        let mut balance = self
            .get_balance_record(user_id)?
            .unwrap_or_else(|| CreditBalance::new(*user_id));

        balance.credits += amount;
        balance.updated_at = chrono::Utc::now();
        entry.balance_after = balance.credits;

        let mut batch = WriteBatch::default();
        self.stage_balance_write(&mut batch, &balance, &entry)?;
        self.write(batch)?;

        Ok(balance.credits)
    }

    fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditEntry>> {
        let cf_by_user = self.cf(cf::ENTRIES_BY_USER)?;
        let cf_entries = self.cf(cf::ENTRIES)?;
        let prefix = keys::user_entries_prefix(user_id);

        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&prefix, Direction::Forward),
        );

        // ULIDs are time-ordered, so collecting forward and reversing
        // yields newest-first.
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }
        all_keys.reverse();

        let mut entries = Vec::new();
        for key in all_keys.into_iter().skip(offset) {
            if entries.len() >= limit {
                break;
            }
            let entry_id = keys::extract_entry_id_from_user_key(&key);
            if let Some(data) = self
                .db
                .get_cf(&cf_entries, keys::entry_key(&entry_id))
                .map_err(|e| StoreError::Database(e.to_string()))?
            {
                entries.push(Self::deserialize(&data)?);
            }
        }

        Ok(entries)
    }

    // =========================================================================
    // Project / Version Operations
    // =========================================================================

    fn create_project(&self, project: &Project, root: &ImageVersion) -> Result<()> {
        if root.project_id != project.id || !root.is_original || root.parent_id.is_some() {
            return Err(StoreError::InvalidChain(
                "root version must belong to the project, be original, and have no parent".into(),
            ));
        }

        let _guard = self.write_lock.lock().expect("store write lock poisoned");

        let cf_projects = self.cf(cf::PROJECTS)?;
        let cf_by_user = self.cf(cf::PROJECTS_BY_USER)?;
        let cf_versions = self.cf(cf::VERSIONS)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_projects,
            keys::project_key(&project.id),
            Self::serialize(project)?,
        );
        batch.put_cf(
            &cf_by_user,
            keys::user_project_key(&project.user_id, &project.id),
            [],
        );
        batch.put_cf(
            &cf_versions,
            keys::version_key(&root.project_id, &root.id),
            Self::serialize(root)?,
        );

        self.write(batch)
    }

    fn get_project(&self, project_id: &ProjectId) -> Result<Option<Project>> {
        let cf = self.cf(cf::PROJECTS)?;
        self.db
            .get_cf(&cf, keys::project_key(project_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_projects(&self, user_id: &UserId) -> Result<Vec<Project>> {
        let cf_by_user = self.cf(cf::PROJECTS_BY_USER)?;
        let cf_projects = self.cf(cf::PROJECTS)?;
        let prefix = keys::user_projects_prefix(user_id);

        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&prefix, Direction::Forward),
        );

        let mut projects = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            let project_id = keys::extract_project_id_from_user_key(&key);
            if let Some(data) = self
                .db
                .get_cf(&cf_projects, keys::project_key(&project_id))
                .map_err(|e| StoreError::Database(e.to_string()))?
            {
                projects.push(Self::deserialize::<Project>(&data)?);
            }
        }

        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    fn append_version(&self, version: &ImageVersion) -> Result<()> {
        if version.is_original || version.parent_id.is_none() {
            return Err(StoreError::InvalidChain(
                "appended versions must have a parent and not be original".into(),
            ));
        }

        let _guard = self.write_lock.lock().expect("store write lock poisoned");

        if self.get_project(&version.project_id)?.is_none() {
            return Err(StoreError::NotFound {
                entity: "project",
                id: version.project_id.to_string(),
            });
        }

        let head = self
            .latest_version_inner(&version.project_id)?
            .ok_or_else(|| StoreError::InvalidChain("project has no root version".into()))?;

        if version.parent_id != Some(head.id) {
            return Err(StoreError::InvalidChain(format!(
                "parent {:?} is not the chain head {}",
                version.parent_id, head.id
            )));
        }

        let cf_versions = self.cf(cf::VERSIONS)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_versions,
            keys::version_key(&version.project_id, &version.id),
            Self::serialize(version)?,
        );
        self.write(batch)
    }

    fn latest_version(&self, project_id: &ProjectId) -> Result<Option<ImageVersion>> {
        self.latest_version_inner(project_id)
    }

    fn list_versions(&self, project_id: &ProjectId) -> Result<Vec<ImageVersion>> {
        let cf = self.cf(cf::VERSIONS)?;
        let prefix = keys::project_versions_prefix(project_id);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut versions = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            versions.push(Self::deserialize(&value)?);
        }

        Ok(versions)
    }

    // =========================================================================
    // Payment Order Operations
    // =========================================================================

    fn create_order(&self, order: &PaymentOrder) -> Result<()> {
        let _guard = self.write_lock.lock().expect("store write lock poisoned");

        if self.get_order(&order.out_trade_no)?.is_some() {
            return Err(StoreError::DuplicateOrder {
                out_trade_no: order.out_trade_no.clone(),
            });
        }

        let cf_orders = self.cf(cf::ORDERS)?;
        let cf_by_user = self.cf(cf::ORDERS_BY_USER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_orders,
            keys::order_key(&order.out_trade_no),
            Self::serialize(order)?,
        );
        batch.put_cf(
            &cf_by_user,
            keys::user_order_key(&order.user_id, &order.out_trade_no),
            [],
        );
        self.write(batch)
    }

    fn get_order(&self, out_trade_no: &str) -> Result<Option<PaymentOrder>> {
        let cf = self.cf(cf::ORDERS)?;
        self.db
            .get_cf(&cf, keys::order_key(out_trade_no))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_orders(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PaymentOrder>> {
        let cf_by_user = self.cf(cf::ORDERS_BY_USER)?;
        let prefix = keys::user_orders_prefix(user_id);

        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&prefix, Direction::Forward),
        );

        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            all_keys.push(key.to_vec());
        }
        all_keys.reverse();

        let mut orders = Vec::new();
        for key in all_keys.into_iter().skip(offset) {
            if orders.len() >= limit {
                break;
            }
            let out_trade_no = keys::extract_order_no_from_user_key(&key);
            if let Some(order) = self.get_order(&out_trade_no)? {
                orders.push(order);
            }
        }

        Ok(orders)
    }

    fn finalize_order(
        &self,
        out_trade_no: &str,
        paid: bool,
        trade_no: &str,
    ) -> Result<FinalizeOutcome> {
        let _guard = self.write_lock.lock().expect("store write lock poisoned");

        let mut order = self
            .get_order(out_trade_no)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "order",
                id: out_trade_no.to_string(),
            })?;

        // Idempotency: terminal orders are never re-applied. The check
        // runs under the same lock as the flip below, so a concurrent
        // duplicate cannot observe Pending twice.
        if order.status != OrderStatus::Pending {
            return Ok(FinalizeOutcome::AlreadyFinal {
                status: order.status,
            });
        }

        let now = chrono::Utc::now();
        order.trade_no = Some(trade_no.to_string());

        let cf_orders = self.cf(cf::ORDERS)?;
        let mut batch = WriteBatch::default();

        let new_balance = if paid {
            order.status = OrderStatus::Success;
            order.paid_at = Some(now);

            let mut balance = self
                .get_balance_record(&order.user_id)?
                .unwrap_or_else(|| CreditBalance::new(order.user_id));
            balance.credits += order.credits;
            balance.updated_at = now;

            let mut entry = CreditEntry::purchase(order.user_id, order.credits, out_trade_no);
            entry.balance_after = balance.credits;

            self.stage_balance_write(&mut batch, &balance, &entry)?;
            Some(balance.credits)
        } else {
            order.status = OrderStatus::Failed;
            None
        };

        batch.put_cf(
            &cf_orders,
            keys::order_key(out_trade_no),
            Self::serialize(&order)?,
        );
        self.write(batch)?;

        tracing::info!(
            out_trade_no = %out_trade_no,
            trade_no = %trade_no,
            status = ?order.status,
            credited = ?new_balance.map(|_| order.credits),
            "Payment order finalized"
        );

        Ok(FinalizeOutcome::Finalized {
            status: order.status,
            new_balance,
        })
    }
}

impl RocksStore {
    fn latest_version_inner(&self, project_id: &ProjectId) -> Result<Option<ImageVersion>> {
        let cf = self.cf(cf::VERSIONS)?;
        let prefix = keys::project_versions_prefix(project_id);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut head = None;
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }
            head = Some(Self::deserialize(&value)?);
        }

        Ok(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retouch_core::PaymentType;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn fund(store: &RocksStore, user_id: UserId, credits: i64) -> i64 {
        let entry = CreditEntry::purchase(user_id, credits, "test-funding");
        store.add_credits(&user_id, credits, entry).unwrap()
    }

    #[test]
    fn unknown_user_has_zero_balance() {
        let (store, _dir) = create_test_store();
        assert_eq!(store.balance(&UserId::generate()).unwrap(), 0);
    }

    #[test]
    fn deduct_and_credit_reconcile() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        assert_eq!(fund(&store, user_id, 3), 3);

        let charge = CreditEntry::edit_charge(user_id, 1, "Edit".into());
        assert_eq!(store.deduct_credits(&user_id, 1, charge).unwrap(), 2);

        let refund = CreditEntry::refund(user_id, 1, "Provider failure".into());
        assert_eq!(store.add_credits(&user_id, 1, refund).unwrap(), 3);

        assert_eq!(store.balance(&user_id).unwrap(), 3);
    }

    #[test]
    fn deduct_never_goes_negative() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        fund(&store, user_id, 1);

        let charge = CreditEntry::edit_charge(user_id, 2, "Edit".into());
        let result = store.deduct_credits(&user_id, 2, charge);
        assert!(matches!(
            result,
            Err(StoreError::InsufficientCredits {
                balance: 1,
                required: 2
            })
        ));

        // Rejection writes nothing.
        assert_eq!(store.balance(&user_id).unwrap(), 1);
        assert_eq!(store.list_entries(&user_id, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn entries_list_newest_first() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        fund(&store, user_id, 5);

        let charge = CreditEntry::edit_charge(user_id, 1, "Edit".into());
        store.deduct_credits(&user_id, 1, charge).unwrap();

        let entries = store.list_entries(&user_id, 10, 0).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, -1); // Newest first
        assert_eq!(entries[0].balance_after, 4);
        assert_eq!(entries[1].amount, 5);
    }

    #[test]
    fn concurrent_deducts_cannot_overdraw() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);
        let user_id = UserId::generate();
        fund(&store, user_id, 5);

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let entry = CreditEntry::edit_charge(user_id, 1, "Edit".into());
                    store.deduct_credits(&user_id, 1, entry).is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();

        assert_eq!(successes, 5);
        assert_eq!(store.balance(&user_id).unwrap(), 0);
    }

    #[test]
    fn project_with_root_version() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let project = Project::new(user_id);
        let root = ImageVersion::original(project.id, "https://img.example/a.png".into());

        store.create_project(&project, &root).unwrap();

        let fetched = store.get_project(&project.id).unwrap().unwrap();
        assert_eq!(fetched.user_id, user_id);

        let head = store.latest_version(&project.id).unwrap().unwrap();
        assert!(head.is_original);
        assert_eq!(head.id, root.id);
    }

    #[test]
    fn create_project_rejects_non_root_version() {
        let (store, _dir) = create_test_store();
        let project = Project::new(UserId::generate());
        let root = ImageVersion::original(project.id, "a".into());
        let child = ImageVersion::edited(&root, "b".into(), "p".into(), None);

        assert!(matches!(
            store.create_project(&project, &child),
            Err(StoreError::InvalidChain(_))
        ));
    }

    #[test]
    fn append_version_extends_chain_head() {
        let (store, _dir) = create_test_store();
        let project = Project::new(UserId::generate());
        let root = ImageVersion::original(project.id, "a".into());
        store.create_project(&project, &root).unwrap();

        let v2 = ImageVersion::edited(&root, "b".into(), "sketch it".into(), None);
        store.append_version(&v2).unwrap();

        let v3 = ImageVersion::edited(&v2, "c".into(), "now watercolor".into(), None);
        store.append_version(&v3).unwrap();

        let versions = store.list_versions(&project.id).unwrap();
        assert_eq!(versions.len(), 3);
        assert!(versions[0].is_original);
        assert_eq!(versions[1].parent_id, Some(root.id));
        assert_eq!(versions[2].parent_id, Some(v2.id));

        let head = store.latest_version(&project.id).unwrap().unwrap();
        assert_eq!(head.id, v3.id);
    }

    #[test]
    fn rapid_appends_keep_head_in_append_order() {
        let (store, _dir) = create_test_store();
        let project = Project::new(UserId::generate());
        let root = ImageVersion::original(project.id, "a".into());
        store.create_project(&project, &root).unwrap();

        // Back-to-back appends land in the same millisecond; the head
        // must still advance one parent link at a time.
        for i in 0..20 {
            let head = store.latest_version(&project.id).unwrap().unwrap();
            let next = ImageVersion::edited(&head, format!("img-{i}"), "p".into(), None);
            store.append_version(&next).unwrap();
        }

        let versions = store.list_versions(&project.id).unwrap();
        assert_eq!(versions.len(), 21);
        for pair in versions.windows(2) {
            assert_eq!(pair[1].parent_id, Some(pair[0].id));
        }

        let head = store.latest_version(&project.id).unwrap().unwrap();
        assert_eq!(head.id, versions[20].id);
    }

    #[test]
    fn append_version_rejects_stale_parent() {
        let (store, _dir) = create_test_store();
        let project = Project::new(UserId::generate());
        let root = ImageVersion::original(project.id, "a".into());
        store.create_project(&project, &root).unwrap();

        let v2 = ImageVersion::edited(&root, "b".into(), "p".into(), None);
        store.append_version(&v2).unwrap();

        // A second child of the root is no longer chained onto the head.
        let stale = ImageVersion::edited(&root, "c".into(), "p".into(), None);
        assert!(matches!(
            store.append_version(&stale),
            Err(StoreError::InvalidChain(_))
        ));
    }

    #[test]
    fn order_lifecycle_success_credits_once() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let order = PaymentOrder::new(
            "20260825090000aaaa0001".into(),
            user_id,
            4500,
            50,
            PaymentType::Alipay,
        );
        store.create_order(&order).unwrap();

        let outcome = store
            .finalize_order("20260825090000aaaa0001", true, "gw-tx-1")
            .unwrap();
        assert_eq!(
            outcome,
            FinalizeOutcome::Finalized {
                status: OrderStatus::Success,
                new_balance: Some(50),
            }
        );

        let stored = store.get_order("20260825090000aaaa0001").unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Success);
        assert_eq!(stored.trade_no.as_deref(), Some("gw-tx-1"));
        assert!(stored.paid_at.is_some());
        assert_eq!(store.balance(&user_id).unwrap(), 50);

        // Duplicate application is a no-op.
        let dup = store
            .finalize_order("20260825090000aaaa0001", true, "gw-tx-1")
            .unwrap();
        assert_eq!(
            dup,
            FinalizeOutcome::AlreadyFinal {
                status: OrderStatus::Success
            }
        );
        assert_eq!(store.balance(&user_id).unwrap(), 50);
    }

    #[test]
    fn failed_order_grants_nothing() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let order = PaymentOrder::new(
            "20260825090000aaaa0002".into(),
            user_id,
            1000,
            10,
            PaymentType::Wxpay,
        );
        store.create_order(&order).unwrap();

        let outcome = store
            .finalize_order("20260825090000aaaa0002", false, "gw-tx-2")
            .unwrap();
        assert_eq!(
            outcome,
            FinalizeOutcome::Finalized {
                status: OrderStatus::Failed,
                new_balance: None,
            }
        );
        assert_eq!(store.balance(&user_id).unwrap(), 0);

        // Failed is terminal: a late success notification does not credit.
        let late = store
            .finalize_order("20260825090000aaaa0002", true, "gw-tx-2")
            .unwrap();
        assert_eq!(
            late,
            FinalizeOutcome::AlreadyFinal {
                status: OrderStatus::Failed
            }
        );
        assert_eq!(store.balance(&user_id).unwrap(), 0);
    }

    #[test]
    fn duplicate_order_number_rejected() {
        let (store, _dir) = create_test_store();
        let order = PaymentOrder::new(
            "20260825090000aaaa0003".into(),
            UserId::generate(),
            1000,
            10,
            PaymentType::Alipay,
        );
        store.create_order(&order).unwrap();
        assert!(matches!(
            store.create_order(&order),
            Err(StoreError::DuplicateOrder { .. })
        ));
    }

    #[test]
    fn concurrent_finalize_credits_exactly_once() {
        let (store, _dir) = create_test_store();
        let store = Arc::new(store);
        let user_id = UserId::generate();
        let order = PaymentOrder::new(
            "20260825090000aaaa0004".into(),
            user_id,
            4500,
            50,
            PaymentType::Alipay,
        );
        store.create_order(&order).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .finalize_order("20260825090000aaaa0004", true, "gw-tx-4")
                        .unwrap()
                })
            })
            .collect();

        let finalized = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| matches!(o, FinalizeOutcome::Finalized { .. }))
            .count();

        assert_eq!(finalized, 1);
        assert_eq!(store.balance(&user_id).unwrap(), 50);
    }

    #[test]
    fn list_orders_newest_first() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        for i in 1..=3 {
            let order = PaymentOrder::new(
                format!("2026082509000{i}aaaa000{i}"),
                user_id,
                1000,
                10,
                PaymentType::Alipay,
            );
            store.create_order(&order).unwrap();
        }

        let orders = store.list_orders(&user_id, 10, 0).unwrap();
        assert_eq!(orders.len(), 3);
        assert!(orders[0].out_trade_no > orders[1].out_trade_no);

        let page = store.list_orders(&user_id, 1, 1).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].out_trade_no, orders[1].out_trade_no);
    }
}
