// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault Storage
//!
//! Persistent state lives in one embedded `redb` database plus an upload
//! directory on the local filesystem.
//!
//! ## Table Layout
//!
//! ```text
//! users                login -> StoredUser (JSON)
//! user_roots           user_id -> UserRoot (JSON), the cascade root
//! namespaces           namespace -> user_id
//! <ns>.password        name -> PasswordRow (JSON, secret sealed)
//! <ns>.text            name -> TextRow (JSON, body sealed)
//! <ns>.card            name -> CardRow (JSON, cvv sealed)
//! <ns>.binary          name -> BinaryRow (JSON, path sealed)
//! ```
//!
//! ## Filesystem Layout
//!
//! ```text
//! <DATA_DIR>/
//!   keeper.redb
//!   uploads/<ns>/<uuid>     # uploaded file bytes
//! ```
//!
//! Record names are table keys, so `(namespace, kind, name)` uniqueness is
//! enforced by the store itself. Writers check and insert inside a single
//! write transaction; redb serializes write transactions, which makes the
//! check atomic under concurrency.

pub mod catalog;
pub mod database;
pub mod namespace;
pub mod paths;
pub mod provision;
pub mod records;
pub mod users;

pub use catalog::Catalog;
pub use database::VaultDatabase;
pub use namespace::Namespace;
pub use paths::StoragePaths;
pub use records::{SecretRecord, SecretStore};
pub use users::{StoredUser, UserStore};

use crate::crypto::CryptoError;
use crate::models::RecordKind;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("encryption error: {0}")]
    Crypto(#[source] CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A sealed field failed authentication on open.
    #[error("{kind} record {name:?} failed integrity check")]
    Tampered { kind: RecordKind, name: String },
}

pub type StorageResult<T> = Result<T, StorageError>;
