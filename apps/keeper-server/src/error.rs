// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy and its HTTP mapping.
//!
//! | VaultError           | Status | Body                      |
//! |----------------------|--------|---------------------------|
//! | `Validation`         | 400    | reason                    |
//! | `InvalidCredentials` | 401    | fixed message             |
//! | `AlreadyExists`      | 409    | what exists               |
//! | `NotFound`           | 404    | `"not found"`             |
//! | `Tampered`           | 404    | `"not found"` (identical) |
//! | everything else      | 500    | `"internal server error"` |
//!
//! Tampering is logged at `error` level but looks like absence to callers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::StorageError;
use crate::transfer::TransferError;

pub const NOT_FOUND_MESSAGE: &str = "not found";
pub const INTERNAL_MESSAGE: &str = "internal server error";

// =============================================================================
// VaultError
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("integrity check failed: {0}")]
    Tampered(String),

    #[error("invalid login or password")]
    InvalidCredentials,

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("storage failure: {0}")]
    Storage(#[source] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl VaultError {
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

impl From<StorageError> for VaultError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => VaultError::NotFound(what),
            StorageError::AlreadyExists(what) => VaultError::AlreadyExists(what),
            StorageError::Tampered { kind, name } => {
                VaultError::Tampered(format!("{kind} {name:?}"))
            }
            other => VaultError::Storage(other),
        }
    }
}

pub type VaultResult<T> = Result<T, VaultError>;

// =============================================================================
// ApiError
// =============================================================================

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }
}

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Validation(reason) => ApiError::bad_request(reason),
            VaultError::InvalidCredentials => ApiError::unauthorized(err.to_string()),
            VaultError::AlreadyExists(what) => ApiError::conflict(format!("{what} already exists")),
            VaultError::NotFound(_) => ApiError::not_found(),
            VaultError::Tampered(ref what) => {
                tracing::error!(record = %what, "Integrity failure reported as not found");
                ApiError::not_found()
            }
            VaultError::Transfer(_) | VaultError::Storage(_) | VaultError::Internal(_) => {
                tracing::error!(error = %err, "Request failed");
                ApiError::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
