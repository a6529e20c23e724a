// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Schema provisioning for per-user namespaces.
//!
//! Provisioning opens the four sub-collection tables (redb creates a table
//! on first open) and registers the namespace, all inside the caller's write
//! transaction. Either everything commits or nothing does, and re-running it
//! against an existing namespace changes nothing.

use redb::{ReadableTable, WriteTransaction};

use super::database::{record_table, NAMESPACES};
use super::{Namespace, StorageError, StorageResult, VaultDatabase};

/// Create the namespace of `user_id` inside an open write transaction.
pub(crate) fn provision_in(txn: &WriteTransaction, user_id: &str) -> StorageResult<Namespace> {
    let ns = Namespace::for_user(user_id);

    for (_, table) in ns.tables() {
        let _ = txn.open_table(record_table(&table))?;
    }

    let mut registry = txn.open_table(NAMESPACES)?;
    let owner = registry
        .get(ns.as_str())?
        .map(|guard| guard.value().to_string());
    match owner {
        Some(owner) if owner != user_id => {
            return Err(StorageError::AlreadyExists(format!("namespace {ns}")));
        }
        Some(_) => {}
        None => {
            registry.insert(ns.as_str(), user_id)?;
        }
    }

    Ok(ns)
}

/// Remove the namespace and all of its sub-collections inside an open write
/// transaction. Missing tables are not an error.
pub(crate) fn teardown_in(txn: &WriteTransaction, ns: &Namespace) -> StorageResult<()> {
    for (_, table) in ns.tables() {
        txn.delete_table(record_table(&table))?;
    }
    let mut registry = txn.open_table(NAMESPACES)?;
    registry.remove(ns.as_str())?;
    Ok(())
}

impl VaultDatabase {
    /// Provision the namespace of `user_id` in its own transaction.
    ///
    /// Idempotent: succeeds without modification when already provisioned.
    pub fn provision(&self, user_id: &str) -> StorageResult<Namespace> {
        let write_txn = self.begin_write()?;
        let ns = provision_in(&write_txn, user_id)?;
        write_txn.commit()?;

        tracing::debug!(namespace = %ns, "Namespace provisioned");
        Ok(ns)
    }

    /// Whether the namespace of `user_id` is registered.
    pub fn is_provisioned(&self, user_id: &str) -> StorageResult<bool> {
        let ns = Namespace::for_user(user_id);
        let read_txn = self.begin_read()?;
        let registry = read_txn.open_table(NAMESPACES)?;
        Ok(registry.get(ns.as_str())?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::TableError;
    use tempfile::TempDir;

    fn open_db() -> (TempDir, VaultDatabase) {
        let dir = TempDir::new().unwrap();
        let db = VaultDatabase::open(&dir.path().join("keeper.redb")).unwrap();
        (dir, db)
    }

    fn table_exists(db: &VaultDatabase, name: &str) -> bool {
        let read_txn = db.begin_read().unwrap();
        match read_txn.open_table(record_table(name)) {
            Ok(_) => true,
            Err(TableError::TableDoesNotExist(_)) => false,
            Err(e) => panic!("unexpected table error: {e}"),
        }
    }

    #[test]
    fn provision_creates_all_sub_collections() {
        let (_dir, db) = open_db();
        let ns = db.provision("user-1").unwrap();

        for (_, table) in ns.tables() {
            assert!(table_exists(&db, &table), "{table} missing");
        }
        assert!(db.is_provisioned("user-1").unwrap());
        assert!(!db.is_provisioned("user-2").unwrap());
    }

    #[test]
    fn provision_is_idempotent() {
        let (_dir, db) = open_db();
        let first = db.provision("user-1").unwrap();

        // Seed a row, then re-provision: the row must survive
        {
            let write_txn = db.begin_write().unwrap();
            {
                let table_name = first.table(crate::models::RecordKind::Text).unwrap();
                let mut table = write_txn.open_table(record_table(&table_name)).unwrap();
                table.insert("note", b"{}".as_slice()).unwrap();
            }
            write_txn.commit().unwrap();
        }

        let second = db.provision("user-1").unwrap();
        assert_eq!(first, second);

        let read_txn = db.begin_read().unwrap();
        let table_name = second.table(crate::models::RecordKind::Text).unwrap();
        let table = read_txn.open_table(record_table(&table_name)).unwrap();
        assert!(table.get("note").unwrap().is_some());
    }

    #[test]
    fn uncommitted_provisioning_leaves_nothing() {
        let (_dir, db) = open_db();
        {
            let write_txn = db.begin_write().unwrap();
            provision_in(&write_txn, "user-1").unwrap();
            write_txn.abort().unwrap();
        }

        let ns = Namespace::for_user("user-1");
        for (_, table) in ns.tables() {
            assert!(!table_exists(&db, &table));
        }
        assert!(!db.is_provisioned("user-1").unwrap());
    }

    #[test]
    fn teardown_drops_every_table() {
        let (_dir, db) = open_db();
        let ns = db.provision("user-1").unwrap();

        let write_txn = db.begin_write().unwrap();
        teardown_in(&write_txn, &ns).unwrap();
        write_txn.commit().unwrap();

        for (_, table) in ns.tables() {
            assert!(!table_exists(&db, &table));
        }
        assert!(!db.is_provisioned("user-1").unwrap());
    }
}
