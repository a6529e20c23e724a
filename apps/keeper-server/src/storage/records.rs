// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted field store.
//!
//! Each record kind implements [`SecretRecord`], which says which table it
//! lives in and how its sensitive fields are sealed into a row. The store
//! itself is generic: one `put` and one `get` serve all four kinds.
//!
//! | Kind     | Row fields                 | Sealed |
//! |----------|----------------------------|--------|
//! | password | secret                     | secret |
//! | text     | body                       | body   |
//! | card     | number, month, year, cvv   | cvv    |
//! | binary   | path                       | path   |
//!
//! The record name is the table key and is not repeated in the row.

use std::path::PathBuf;

use redb::{ReadableTable, TableError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::database::{record_table, NAMESPACES};
use super::{Namespace, StorageError, StorageResult, VaultDatabase};
use crate::crypto::{CryptoError, FieldCipher, Sealed};
use crate::models::{CardPayload, PasswordPayload, RecordKind, TextPayload};

// =============================================================================
// SecretRecord
// =============================================================================

/// A record shape with a fixed kind and a sealed row representation.
pub trait SecretRecord: Sized {
    const KIND: RecordKind;

    /// Row as persisted, sensitive fields sealed.
    type Row: Serialize + DeserializeOwned;

    fn name(&self) -> &str;

    fn seal(&self, cipher: &FieldCipher, aad: &[u8]) -> Result<Self::Row, CryptoError>;

    fn open(
        name: &str,
        row: Self::Row,
        cipher: &FieldCipher,
        aad: &[u8],
    ) -> Result<Self, CryptoError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordRow {
    secret: Sealed,
}

impl SecretRecord for PasswordPayload {
    const KIND: RecordKind = RecordKind::Password;
    type Row = PasswordRow;

    fn name(&self) -> &str {
        &self.name
    }

    fn seal(&self, cipher: &FieldCipher, aad: &[u8]) -> Result<PasswordRow, CryptoError> {
        Ok(PasswordRow {
            secret: cipher.seal(self.password.as_bytes(), aad)?,
        })
    }

    fn open(
        name: &str,
        row: PasswordRow,
        cipher: &FieldCipher,
        aad: &[u8],
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            name: name.to_string(),
            password: cipher.open_string(&row.secret, aad)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextRow {
    body: Sealed,
}

impl SecretRecord for TextPayload {
    const KIND: RecordKind = RecordKind::Text;
    type Row = TextRow;

    fn name(&self) -> &str {
        &self.name
    }

    fn seal(&self, cipher: &FieldCipher, aad: &[u8]) -> Result<TextRow, CryptoError> {
        Ok(TextRow {
            body: cipher.seal(self.text.as_bytes(), aad)?,
        })
    }

    fn open(name: &str, row: TextRow, cipher: &FieldCipher, aad: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            name: name.to_string(),
            text: cipher.open_string(&row.body, aad)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CardRow {
    number: String,
    month: String,
    year: String,
    cvv: Sealed,
}

impl SecretRecord for CardPayload {
    const KIND: RecordKind = RecordKind::Card;
    type Row = CardRow;

    fn name(&self) -> &str {
        &self.name
    }

    fn seal(&self, cipher: &FieldCipher, aad: &[u8]) -> Result<CardRow, CryptoError> {
        Ok(CardRow {
            number: self.number.clone(),
            month: self.month.clone(),
            year: self.year.clone(),
            cvv: cipher.seal(self.cvv.as_bytes(), aad)?,
        })
    }

    fn open(name: &str, row: CardRow, cipher: &FieldCipher, aad: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            name: name.to_string(),
            cvv: cipher.open_string(&row.cvv, aad)?,
            number: row.number,
            month: row.month,
            year: row.year,
        })
    }
}

/// Server-side reference to an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BinaryRow {
    path: Sealed,
}

impl SecretRecord for StoredFile {
    const KIND: RecordKind = RecordKind::Binary;
    type Row = BinaryRow;

    fn name(&self) -> &str {
        &self.name
    }

    fn seal(&self, cipher: &FieldCipher, aad: &[u8]) -> Result<BinaryRow, CryptoError> {
        let path = self.path.to_string_lossy();
        Ok(BinaryRow {
            path: cipher.seal(path.as_bytes(), aad)?,
        })
    }

    fn open(name: &str, row: BinaryRow, cipher: &FieldCipher, aad: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self {
            name: name.to_string(),
            path: PathBuf::from(cipher.open_string(&row.path, aad)?),
        })
    }
}

// =============================================================================
// SecretStore
// =============================================================================

/// Put/Get of sealed records inside a user's namespace.
pub struct SecretStore<'a> {
    db: &'a VaultDatabase,
    cipher: &'a FieldCipher,
}

impl<'a> SecretStore<'a> {
    pub fn new(db: &'a VaultDatabase, cipher: &'a FieldCipher) -> Self {
        Self { db, cipher }
    }

    /// Seal and insert `record`. A second put of the same name fails with
    /// `AlreadyExists` and leaves the stored row untouched.
    pub fn put<R: SecretRecord>(&self, user_id: &str, record: &R) -> StorageResult<()> {
        let ns = Namespace::for_user(user_id);
        let table_name = kind_table(&ns, R::KIND)?;
        let name = record.name();

        let row = record
            .seal(self.cipher, &ns.aad(R::KIND, name))
            .map_err(StorageError::Crypto)?;
        let row_json = serde_json::to_vec(&row)?;

        let write_txn = self.db.begin_write()?;
        {
            // Opening a table in a write transaction creates it, so check the
            // namespace is provisioned first.
            let registry = write_txn.open_table(NAMESPACES)?;
            if registry.get(ns.as_str())?.is_none() {
                return Err(StorageError::NotFound(format!("namespace {ns}")));
            }

            let mut table = write_txn.open_table(record_table(&table_name))?;
            if table.get(name)?.is_some() {
                return Err(StorageError::AlreadyExists(format!("{} {name:?}", R::KIND)));
            }
            table.insert(name, row_json.as_slice())?;
        }
        write_txn.commit()?;

        tracing::debug!(namespace = %ns, kind = %R::KIND, "Record stored");
        Ok(())
    }

    /// Whether a record `name` of kind `R` exists. Does not open it.
    pub fn contains<R: SecretRecord>(&self, user_id: &str, name: &str) -> StorageResult<bool> {
        let ns = Namespace::for_user(user_id);
        let table_name = kind_table(&ns, R::KIND)?;

        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(record_table(&table_name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let found = table.get(name)?.is_some();
        Ok(found)
    }

    /// Read and open the record `name`.
    pub fn get<R: SecretRecord>(&self, user_id: &str, name: &str) -> StorageResult<R> {
        let ns = Namespace::for_user(user_id);
        let table_name = kind_table(&ns, R::KIND)?;

        let row_json = {
            let read_txn = self.db.begin_read()?;
            let table = match read_txn.open_table(record_table(&table_name)) {
                Ok(table) => table,
                Err(TableError::TableDoesNotExist(_)) => {
                    return Err(StorageError::NotFound(format!("namespace {ns}")));
                }
                Err(e) => return Err(e.into()),
            };
            let bytes = match table.get(name)? {
                Some(value) => value.value().to_vec(),
                None => return Err(StorageError::NotFound(format!("{} {name:?}", R::KIND))),
            };
            bytes
        };

        let row: R::Row = serde_json::from_slice(&row_json)?;
        R::open(name, row, self.cipher, &ns.aad(R::KIND, name)).map_err(|e| {
            tracing::error!(
                namespace = %ns,
                kind = %R::KIND,
                error = %e,
                "Sealed field failed to open"
            );
            StorageError::Tampered {
                kind: R::KIND,
                name: name.to_string(),
            }
        })
    }
}

fn kind_table(ns: &Namespace, kind: RecordKind) -> StorageResult<String> {
    ns.table(kind)
        .ok_or_else(|| StorageError::NotFound(format!("{kind} collection")))
}
