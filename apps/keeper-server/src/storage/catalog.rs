// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Catalog of a user's records: kind and name only, never payloads.

use redb::{ReadableTable, TableError};

use super::database::record_table;
use super::{Namespace, StorageResult, VaultDatabase};
use crate::models::Summary;

pub struct Catalog<'a> {
    db: &'a VaultDatabase,
}

impl<'a> Catalog<'a> {
    pub fn new(db: &'a VaultDatabase) -> Self {
        Self { db }
    }

    /// Summaries from all four sub-collections, in kind then name order.
    ///
    /// Rows are never deserialized, so no sealed field is touched. An empty
    /// or unprovisioned namespace yields an empty list.
    pub fn list(&self, user_id: &str) -> StorageResult<Vec<Summary>> {
        let ns = Namespace::for_user(user_id);
        let read_txn = self.db.begin_read()?;

        let mut summaries = Vec::new();
        for (kind, table_name) in ns.tables() {
            let table = match read_txn.open_table(record_table(&table_name)) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            for entry in table.iter()? {
                let (key, _) = entry?;
                summaries.push(Summary {
                    kind,
                    name: key.value().to_string(),
                });
            }
        }

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::FieldCipher;
    use crate::models::{PasswordPayload, RecordKind, TextPayload};
    use crate::storage::records::StoredFile;
    use crate::storage::{SecretStore, UserStore};
    use tempfile::TempDir;

    #[test]
    fn fresh_user_has_empty_catalog() {
        let dir = TempDir::new().unwrap();
        let db = VaultDatabase::open(&dir.path().join("keeper.redb")).unwrap();
        let user = UserStore::new(&db).create("alice", "hash").unwrap();

        assert!(Catalog::new(&db).list(&user.id).unwrap().is_empty());
        assert!(Catalog::new(&db).list("never-registered").unwrap().is_empty());
    }

    #[test]
    fn lists_every_kind_without_payloads() {
        let dir = TempDir::new().unwrap();
        let db = VaultDatabase::open(&dir.path().join("keeper.redb")).unwrap();
        let cipher = FieldCipher::from_secret(b"catalog-secret").unwrap();
        let alice = UserStore::new(&db).create("alice", "hash").unwrap().id;
        let bob = UserStore::new(&db).create("bob", "hash").unwrap().id;
        let store = SecretStore::new(&db, &cipher);

        store
            .put(
                &alice,
                &PasswordPayload {
                    name: "wifi".into(),
                    password: "hunter2".into(),
                },
            )
            .unwrap();
        store
            .put(
                &alice,
                &TextPayload {
                    name: "diary".into(),
                    text: "dear diary".into(),
                },
            )
            .unwrap();
        store
            .put(
                &alice,
                &StoredFile {
                    name: "scan.pdf".into(),
                    path: "/tmp/x".into(),
                },
            )
            .unwrap();
        store
            .put(
                &bob,
                &PasswordPayload {
                    name: "bob-only".into(),
                    password: "x".into(),
                },
            )
            .unwrap();

        let listed = Catalog::new(&db).list(&alice).unwrap();
        assert_eq!(
            listed,
            vec![
                Summary {
                    kind: RecordKind::Password,
                    name: "wifi".into()
                },
                Summary {
                    kind: RecordKind::Text,
                    name: "diary".into()
                },
                Summary {
                    kind: RecordKind::Binary,
                    name: "scan.pdf".into()
                },
            ]
        );

        let rendered = serde_json::to_string(&listed).unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("/tmp/x"));
    }
}
