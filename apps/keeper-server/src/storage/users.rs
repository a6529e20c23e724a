// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account storage.
//!
//! `users` is keyed by login, which makes the login unique. `user_roots` is
//! keyed by the immutable user id and is the root every namespace hangs off:
//! removing a root removes the account and its whole namespace.

use std::fmt;

use chrono::{DateTime, Utc};
use redb::ReadableTable;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::database::{USERS, USER_ROOTS};
use super::provision::{provision_in, teardown_in};
use super::{Namespace, StorageError, StorageResult, VaultDatabase};

/// Account record stored under its login.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredUser {
    /// Stable user identifier (UUID v4); the tenancy key
    pub id: String,
    pub login: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for StoredUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredUser")
            .field("id", &self.id)
            .field("login", &self.login)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Root record keyed by user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRoot {
    login: String,
    namespace: String,
}

/// Typed access to accounts.
pub struct UserStore<'a> {
    db: &'a VaultDatabase,
}

impl<'a> UserStore<'a> {
    pub fn new(db: &'a VaultDatabase) -> Self {
        Self { db }
    }

    /// Create an account and provision its namespace in one transaction.
    ///
    /// Fails with `AlreadyExists` when the login is taken; in that case
    /// nothing is written.
    pub fn create(&self, login: &str, password_hash: &str) -> StorageResult<StoredUser> {
        let user = StoredUser {
            id: Uuid::new_v4().to_string(),
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        let user_json = serde_json::to_vec(&user)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut users = write_txn.open_table(USERS)?;
            if users.get(login)?.is_some() {
                return Err(StorageError::AlreadyExists(format!("login {login}")));
            }
            users.insert(login, user_json.as_slice())?;

            let ns = provision_in(&write_txn, &user.id)?;
            let root = serde_json::to_vec(&UserRoot {
                login: user.login.clone(),
                namespace: ns.as_str().to_string(),
            })?;
            let mut roots = write_txn.open_table(USER_ROOTS)?;
            roots.insert(user.id.as_str(), root.as_slice())?;
        }
        write_txn.commit()?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Look up an account by login.
    pub fn find_by_login(&self, login: &str) -> StorageResult<Option<StoredUser>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        match users.get(login)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Delete the root record and cascade to the login entry, the namespace
    /// registration and all four sub-collections.
    pub fn remove(&self, user_id: &str) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut roots = write_txn.open_table(USER_ROOTS)?;
            let root: UserRoot = match roots.remove(user_id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StorageError::NotFound(format!("user {user_id}"))),
            };

            let mut users = write_txn.open_table(USERS)?;
            users.remove(root.login.as_str())?;

            teardown_in(&write_txn, &Namespace::for_user(user_id))?;
        }
        write_txn.commit()?;

        tracing::info!(user_id = %user_id, "User removed with namespace");
        Ok(())
    }
}
