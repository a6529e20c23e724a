// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared application state.
//!
//! Nothing request-specific lives here: the database handle, the field
//! cipher, session keys and a few settings. Decrypted values are never
//! cached.

use std::sync::Arc;

use crate::auth::SessionManager;
use crate::config::ServerConfig;
use crate::crypto::FieldCipher;
use crate::dispatch::Dispatcher;
use crate::error::{VaultError, VaultResult};
use crate::storage::{SecretStore, StoragePaths, UserStore, VaultDatabase};

/// Database plus the cipher for its sealed fields.
pub struct Vault {
    db: VaultDatabase,
    cipher: FieldCipher,
}

impl Vault {
    pub fn new(db: VaultDatabase, cipher: FieldCipher) -> Self {
        Self { db, cipher }
    }

    pub fn db(&self) -> &VaultDatabase {
        &self.db
    }

    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.db)
    }

    pub fn store(&self) -> SecretStore<'_> {
        SecretStore::new(&self.db, &self.cipher)
    }

    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(&self.db, &self.cipher)
    }
}

#[derive(Clone)]
pub struct AppState {
    vault: Arc<Vault>,
    sessions: Arc<SessionManager>,
    paths: StoragePaths,
    chunk_size: usize,
}

impl AppState {
    pub fn new(vault: Vault, sessions: SessionManager, paths: StoragePaths, chunk_size: usize) -> Self {
        Self {
            vault: Arc::new(vault),
            sessions: Arc::new(sessions),
            paths,
            chunk_size,
        }
    }

    /// Open the database, derive keys and prepare the upload root.
    pub fn open(config: &ServerConfig) -> VaultResult<Self> {
        let paths = StoragePaths::new(&config.data_dir);
        std::fs::create_dir_all(paths.uploads_dir())
            .map_err(|e| VaultError::Internal(format!("create upload root: {e}")))?;

        let db = VaultDatabase::open(&paths.database())?;
        let cipher = FieldCipher::from_secret(config.secret_key.as_bytes())
            .map_err(|e| VaultError::Internal(format!("field key: {e}")))?;

        let secure = config.tls.is_some();
        let sessions = match &config.session_secret {
            Some(secret) => SessionManager::new(secret.as_bytes(), config.session_ttl_secs, secure),
            None => {
                tracing::warn!("SESSION_SECRET not set, sessions will not survive a restart");
                SessionManager::ephemeral(config.session_ttl_secs, secure)
            }
        }
        .map_err(|e| VaultError::Internal(e.to_string()))?;

        Ok(Self::new(
            Vault::new(db, cipher),
            sessions,
            paths,
            config.chunk_size,
        ))
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Run blocking vault work off the async runtime.
    ///
    /// Each call holds database transactions only for its own duration and
    /// never across client I/O.
    pub async fn with_vault<T, F>(&self, work: F) -> VaultResult<T>
    where
        F: FnOnce(&Vault) -> VaultResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let vault = Arc::clone(&self.vault);
        tokio::task::spawn_blocking(move || work(&vault))
            .await
            .map_err(|e| VaultError::Internal(format!("vault task failed: {e}")))?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// State over a fresh data dir with one registered user.
    pub(crate) async fn test_state() -> (TempDir, AppState, String) {
        let (dir, state) = empty_state(4096);
        let user_id = state
            .with_vault(|vault| Ok(vault.users().create("alice", "hash")?.id))
            .await
            .unwrap();
        (dir, state, user_id)
    }

    /// State over a fresh data dir, no users, given relay chunk size.
    pub(crate) fn empty_state(chunk_size: usize) -> (TempDir, AppState) {
        let dir = TempDir::new().unwrap();
        let paths = StoragePaths::new(dir.path());
        std::fs::create_dir_all(paths.uploads_dir()).unwrap();

        let db = VaultDatabase::open(&paths.database()).unwrap();
        let cipher = FieldCipher::from_secret(b"state-test-secret").unwrap();
        let sessions = SessionManager::new(b"state-test-session".to_vec(), 3600, false).unwrap();
        let state = AppState::new(Vault::new(db, cipher), sessions, paths, chunk_size);
        (dir, state)
    }

    #[tokio::test]
    async fn open_prepares_data_dir() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig::from_lookup(|name| match name {
            "SECRET_KEY" => Some("master".into()),
            "DATA_DIR" => Some(dir.path().join("data").display().to_string()),
            _ => None,
        })
        .unwrap();

        let state = AppState::open(&config).unwrap();
        assert!(state.paths().database().exists());
        assert!(state.paths().uploads_dir().is_dir());
        assert_eq!(state.chunk_size(), 32 * 1024);

        let ok = state.with_vault(|vault| Ok(vault.db().ping()?)).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn with_vault_propagates_errors() {
        let (_dir, state) = empty_state(1024);
        let result: VaultResult<()> = state
            .with_vault(|_| Err(VaultError::validation("nope")))
            .await;
        assert!(matches!(result, Err(VaultError::Validation(_))));
    }
}
