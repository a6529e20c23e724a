// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Download side of the pipeline.
//!
//! A spawned task pumps the stored file into a relay; the response body is a
//! one-part `multipart/form-data` stream wrapped around the relay output.

use std::path::Path;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use futures_util::{future, stream, Stream, StreamExt};
use tokio::fs::File;
use uuid::Uuid;

use super::{pump_reader, relay, RelayReceiver, TransferError, RELAY_DEPTH};
use crate::error::{VaultError, VaultResult};
use crate::storage::records::StoredFile;

/// Form field name of the file part, both directions.
pub const PART_NAME: &str = "file";

/// Filename as a quoted-string parameter: `"` is backslash-escaped and
/// line breaks are dropped.
pub fn quote_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\r' | '\n' => {}
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Open `path` and start pumping it into a relay on a background task.
pub async fn open_file_stream(path: &Path, chunk_size: usize) -> Result<RelayReceiver, TransferError> {
    let file = File::open(path).await?;
    let (sender, receiver) = relay(RELAY_DEPTH, chunk_size);

    tokio::spawn(async move {
        match pump_reader(file, sender).await {
            Ok(bytes) => tracing::debug!(bytes, "Download streamed"),
            Err(TransferError::Disconnected) => {
                tracing::info!("Client disconnected during download")
            }
            Err(e) => tracing::warn!(error = %e, "Download aborted"),
        }
    });

    Ok(receiver)
}

/// Wrap relay output in a single multipart part.
pub fn multipart_body(
    boundary: &str,
    filename: &str,
    receiver: RelayReceiver,
) -> impl Stream<Item = Result<Bytes, TransferError>> + Send + 'static {
    let head = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{PART_NAME}\"; filename={}\r\n\
         Content-Type: application/octet-stream\r\n\r\n",
        quote_filename(filename)
    );
    let tail = format!("\r\n--{boundary}--\r\n");

    stream::once(future::ready(Ok(Bytes::from(head))))
        .chain(receiver.into_stream())
        .chain(stream::once(future::ready(Ok(Bytes::from(tail)))))
}

/// Build the streaming response for a stored file.
pub async fn file_response(file: StoredFile, chunk_size: usize) -> VaultResult<Response> {
    let receiver = open_file_stream(&file.path, chunk_size).await.map_err(|e| {
        tracing::error!(error = %e, "Stored file could not be opened");
        VaultError::from(e)
    })?;

    let boundary = Uuid::new_v4().simple().to_string();
    let content_type = HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}"))
        .map_err(|e| VaultError::Internal(e.to_string()))?;
    let body = Body::from_stream(multipart_body(&boundary, &file.name, receiver));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(body)
        .map_err(|e| VaultError::Internal(e.to_string()))
}
