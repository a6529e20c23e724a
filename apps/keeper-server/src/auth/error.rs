// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why a request could not be tied to a session.
#[derive(Debug)]
pub enum AuthError {
    /// No session cookie present
    MissingSession,
    /// Cookie value is not a session token
    MalformedSession,
    /// Token MAC does not verify
    InvalidSignature,
    /// Token is past its expiry
    SessionExpired,
    /// Hashing or key setup failed
    InternalError(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingSession => "missing_session",
            AuthError::MalformedSession => "malformed_session",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::SessionExpired => "session_expired",
            AuthError::InternalError(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingSession => write!(f, "Session cookie is required"),
            AuthError::MalformedSession => write!(f, "Session cookie is malformed"),
            AuthError::InvalidSignature => write!(f, "Session signature is invalid"),
            AuthError::SessionExpired => write!(f, "Session has expired"),
            AuthError::InternalError(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AuthError::InternalError(msg) = &self {
            tracing::error!(error = %msg, "Authentication failure");
        }
        let message = match &self {
            AuthError::InternalError(_) => "Internal authentication error".to_string(),
            other => other.to_string(),
        };
        let body = Json(AuthErrorBody {
            error: message,
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
