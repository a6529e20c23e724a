// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upload side of the pipeline.
//!
//! The caller's byte stream is the producer; a spawned task drains the relay
//! into the destination file. Once the bytes are down, the file reference is
//! stored through the encrypted field store like any other record.

use std::fmt::Display;
use std::path::Path;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::fs::{File, OpenOptions};
use uuid::Uuid;

use super::{drain_into, relay, TransferError, RELAY_DEPTH};
use crate::dispatch::validate_name;
use crate::error::{VaultError, VaultResult};
use crate::models::RecordKind;
use crate::state::AppState;
use crate::storage::records::StoredFile;
use crate::storage::Namespace;

/// Relay `source` into `file` in chunks of at most `chunk_size`.
///
/// Returns bytes written. On a source or write failure the relay is aborted
/// and the file keeps whatever was written so far.
pub async fn receive_to_file<S, E>(
    source: S,
    file: File,
    chunk_size: usize,
) -> Result<u64, TransferError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let (sender, receiver) = relay(RELAY_DEPTH, chunk_size);
    let consumer = tokio::spawn(drain_into(receiver, file));

    futures_util::pin_mut!(source);
    let produced: Result<(), TransferError> = async {
        while let Some(item) = source.next().await {
            match item {
                Ok(chunk) => sender.send(chunk).await?,
                Err(e) => return Err(TransferError::Source(e.to_string())),
            }
        }
        Ok(())
    }
    .await;

    match produced {
        Ok(()) => {
            // A finish error means the consumer already failed; its result says why
            let _ = sender.finish().await;
        }
        Err(TransferError::Source(reason)) => {
            sender
                .fail(TransferError::Source(reason.clone()))
                .await;
            let _ = consumer.await;
            return Err(TransferError::Source(reason));
        }
        Err(other) => {
            // The consumer hung up; its own error says why
            drop(sender);
            return match consumer.await {
                Ok(Err(e)) => Err(e),
                Err(e) => Err(TransferError::Io(std::io::Error::other(e))),
                Ok(Ok(_)) => Err(other),
            };
        }
    }

    consumer
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e)))?
}

/// Stream an uploaded file to disk and record it under `file_name`.
///
/// The destination gets a fresh random name inside the user's upload
/// directory, so an upload never replaces a stored file. If the record
/// cannot be stored the file is removed again; a transfer that fails midway
/// leaves its partial file behind and stores no record.
pub async fn store_upload<S, E>(
    state: &AppState,
    user_id: &str,
    file_name: &str,
    source: S,
) -> VaultResult<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    validate_name(file_name)?;

    // Fail fast before any bytes move; the final put still enforces it
    let exists = {
        let user_id = user_id.to_string();
        let name = file_name.to_string();
        state
            .with_vault(move |vault| Ok(vault.store().contains::<StoredFile>(&user_id, &name)?))
            .await?
    };
    if exists {
        return Err(VaultError::AlreadyExists(format!(
            "{} {file_name:?}",
            RecordKind::Binary
        )));
    }

    let ns = Namespace::for_user(user_id);
    let dir = state.paths().user_uploads_dir(&ns);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(TransferError::Io)?;

    let path = state.paths().upload_file(&ns, &Uuid::new_v4().simple().to_string());
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .await
        .map_err(TransferError::Io)?;

    let written = match receive_to_file(source, file, state.chunk_size()).await {
        Ok(written) => written,
        Err(e) => {
            tracing::warn!(
                user_id = %user_id,
                error = %e,
                "Upload aborted, partial file left in place"
            );
            return Err(e.into());
        }
    };

    let record = StoredFile {
        name: file_name.to_string(),
        path: path.clone(),
    };
    let owner = user_id.to_string();
    let stored = state
        .with_vault(move |vault| Ok(vault.store().put(&owner, &record)?))
        .await;

    if let Err(e) = stored {
        remove_orphan(&path).await;
        return Err(e);
    }

    tracing::info!(user_id = %user_id, bytes = written, "File stored");
    Ok(written)
}

async fn remove_orphan(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove orphaned upload");
    }
}
