// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Vault API Client
//!
//! HTTP client for the keeper API. The session cookie issued by
//! `register`/`login` is kept in the client's cookie store and sent with
//! every later call.
//!
//! Files stream in both directions: `put_file` sends the local file as a
//! chunked multipart body, and `download` writes the multipart response to
//! disk through the same bounded relay the server uses. A download never
//! overwrites a local file; see [`KeeperClient::download`].

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::Request,
};
use reqwest::{header::CONTENT_TYPE, multipart, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tokio::fs::{File, OpenOptions};
use tokio_util::io::ReaderStream;
use tower::{Layer, ServiceExt};
use url::Url;

use crate::models::{Credentials, Envelope, RecordKind, Summary};
use crate::transfer::{download::PART_NAME, upload::receive_to_file, TransferError, DEFAULT_CHUNK_SIZE};

/// Highest `(n)` suffix tried before a download gives up on a name.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Name used when the server's filename has no usable final component.
const FALLBACK_FILE_NAME: &str = "download";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("server answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ClientError {
    /// HTTP status of a server-side rejection, if this is one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Accept self-signed or otherwise unverifiable server certificates.
    pub accept_invalid_certs: bool,
    /// Relay chunk size for uploads and downloads.
    pub chunk_size: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            accept_invalid_certs: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

pub struct KeeperClient {
    http: reqwest::Client,
    base: Url,
    chunk_size: usize,
}

impl KeeperClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::with_options(base_url, ClientOptions::default())
    }

    pub fn with_options(base_url: &str, options: ClientOptions) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;
        Ok(Self {
            http,
            base: Url::parse(base_url)?,
            chunk_size: options.chunk_size.max(1),
        })
    }

    pub async fn register(&self, login: &str, password: &str) -> Result<(), ClientError> {
        self.authenticate("register", login, password).await
    }

    pub async fn login(&self, login: &str, password: &str) -> Result<(), ClientError> {
        self.authenticate("login", login, password).await
    }

    pub async fn list(&self) -> Result<Vec<Summary>, ClientError> {
        let response = self.http.post(self.endpoint("list")?).send().await?;
        Ok(checked(response).await?.json().await?)
    }

    /// Store a password, text or card record.
    pub async fn put<T: Serialize>(&self, kind: RecordKind, record: &T) -> Result<(), ClientError> {
        let envelope = Envelope::wrap(kind, record)?;
        let response = self.post_envelope("put", &envelope).await?;
        let ack: Envelope = response.json().await?;
        if ack.kind != kind {
            return Err(ClientError::UnexpectedResponse(format!(
                "stored {kind} but server acknowledged {}",
                ack.kind
            )));
        }
        Ok(())
    }

    /// Fetch and decode the `kind` record called `name`.
    pub async fn get<T: DeserializeOwned>(&self, kind: RecordKind, name: &str) -> Result<T, ClientError> {
        let response = self.post_envelope("get", &query(kind, name)?).await?;
        let envelope: Envelope = response.json().await?;
        if envelope.kind != kind {
            return Err(ClientError::UnexpectedResponse(format!(
                "asked for {kind}, got {}",
                envelope.kind
            )));
        }
        Ok(envelope.decode()?)
    }

    /// Upload a local file, streaming it in relay-sized chunks.
    ///
    /// The record name is the file's final path component.
    pub async fn put_file(&self, path: &Path) -> Result<(), ClientError> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ClientError::Io(std::io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("{} has no usable file name", path.display()),
                ))
            })?
            .to_string();

        let file = File::open(path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::with_capacity(file, self.chunk_size));
        let part = multipart::Part::stream(body)
            .file_name(name)
            .mime_str("application/octet-stream")?;
        let form = multipart::Form::new().part(PART_NAME, part);

        let response = self
            .http
            .post(self.endpoint("put/binary")?)
            .multipart(form)
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    /// Download the file record `name` into `dir`.
    ///
    /// The file is written to `dir/<name>`, or to `dir/<stem> (n).<ext>`
    /// with the lowest free `n` when that exists. Returns the path written.
    pub async fn download(&self, name: &str, dir: &Path) -> Result<PathBuf, ClientError> {
        let response = self
            .post_envelope("get", &query(RecordKind::Binary, name)?)
            .await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("multipart/form-data") {
            return Err(ClientError::UnexpectedResponse(format!(
                "expected a multipart body, got {content_type:?}"
            )));
        }

        let request = Request::builder()
            .header(CONTENT_TYPE, content_type)
            .body(Body::from_stream(response.bytes_stream()))
            .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?;
        let mut multipart = read_multipart(request).await?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ClientError::UnexpectedResponse(e.body_text()))?
        {
            if field.name() != Some(PART_NAME) {
                continue;
            }
            let remote_name = field.file_name().unwrap_or(name).to_string();
            let (path, file) = create_unique(dir, local_file_name(&remote_name)).await?;
            let written = receive_to_file(field, file, self.chunk_size).await?;
            tracing::debug!(path = %path.display(), bytes = written, "Download complete");
            return Ok(path);
        }

        Err(ClientError::UnexpectedResponse(
            "response has no file part".into(),
        ))
    }

    async fn authenticate(&self, route: &str, login: &str, password: &str) -> Result<(), ClientError> {
        let credentials = Credentials {
            login: login.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.endpoint(route)?)
            .json(&credentials)
            .send()
            .await?;
        checked(response).await?;
        Ok(())
    }

    async fn post_envelope(&self, route: &str, envelope: &Envelope) -> Result<Response, ClientError> {
        let response = self
            .http
            .post(self.endpoint(route)?)
            .json(envelope)
            .send()
            .await?;
        checked(response).await
    }

    fn endpoint(&self, route: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(route)?)
    }
}

/// Record names grouped by kind, in display order, skipping empty kinds.
pub fn group_by_kind(summaries: &[Summary]) -> Vec<(RecordKind, Vec<String>)> {
    RecordKind::STORED
        .into_iter()
        .filter_map(|kind| {
            let mut names: Vec<String> = summaries
                .iter()
                .filter(|summary| summary.kind == kind)
                .map(|summary| summary.name.clone())
                .collect();
            if names.is_empty() {
                return None;
            }
            names.sort();
            Some((kind, names))
        })
        .collect()
}

fn query(kind: RecordKind, name: &str) -> Result<Envelope, ClientError> {
    Ok(Envelope::wrap(kind, &json!({ "name": name }))?)
}

/// Pass successful responses through; turn error bodies into `Status`.
async fn checked(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_owned))
        .unwrap_or(body);
    Err(ClientError::Status { status, message })
}

/// Parse a streaming multipart body without axum's default size limit.
async fn read_multipart(request: Request<Body>) -> Result<Multipart, ClientError> {
    let parser = tower::service_fn(|request: Request<Body>| Multipart::from_request(request, &()));
    axum::extract::DefaultBodyLimit::disable()
        .layer(parser)
        .oneshot(request)
        .await
        .map_err(|e| ClientError::UnexpectedResponse(e.body_text()))
}

/// Final path component of a server-supplied name.
fn local_file_name(remote: &str) -> &str {
    match remote.rsplit(['/', '\\']).next() {
        Some(name) if !name.is_empty() && name != "." && name != ".." => name,
        _ => FALLBACK_FILE_NAME,
    }
}

/// Create `dir/name`, or the first free `stem (n).ext` variant.
async fn create_unique(dir: &Path, name: &str) -> Result<(PathBuf, File), ClientError> {
    let as_path = Path::new(name);
    let stem = as_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    let extension = as_path.extension().and_then(|e| e.to_str());

    for attempt in 0..=MAX_NAME_ATTEMPTS {
        let candidate = match (attempt, extension) {
            (0, _) => name.to_string(),
            (n, Some(ext)) => format!("{stem} ({n}).{ext}"),
            (n, None) => format!("{stem} ({n})"),
        };
        let path = dir.join(candidate);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(ClientError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free name for {name:?} in {}", dir.display()),
    )))
}
