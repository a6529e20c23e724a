// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded vault database backed by redb (pure Rust, ACID).
//!
//! The shared tables are created when the database is opened. Per-user
//! tables are created by the provisioner.

use std::path::Path;

use redb::{Database, ReadTransaction, ReadableDatabase, TableDefinition, WriteTransaction};

use super::StorageResult;

// =============================================================================
// Shared Table Definitions
// =============================================================================

/// Accounts keyed by login: login → serialized StoredUser.
pub(crate) const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Root records keyed by user id: user_id → serialized UserRoot.
pub(crate) const USER_ROOTS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_roots");

/// Namespace registry: namespace → owning user_id.
pub(crate) const NAMESPACES: TableDefinition<&str, &str> = TableDefinition::new("namespaces");

/// Definition for a dynamically named per-user table.
pub(crate) fn record_table(name: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(name)
}

// =============================================================================
// VaultDatabase
// =============================================================================

/// Handle to the vault database. Cheap to share behind an `Arc`.
pub struct VaultDatabase {
    db: Database,
}

impl VaultDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create shared tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_ROOTS)?;
            let _ = write_txn.open_table(NAMESPACES)?;
        }
        write_txn.commit()?;

        tracing::debug!(path = %path.display(), "Vault database opened");
        Ok(Self { db })
    }

    pub(crate) fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    pub(crate) fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Readiness probe: a read transaction can be opened on a shared table.
    pub fn ping(&self) -> StorageResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(NAMESPACES)?;
        Ok(())
    }
}
