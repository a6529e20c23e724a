// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require a session:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user.user_id is the resolved tenant
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;

use super::session::SESSION_COOKIE;
use super::AuthError;
use crate::state::AppState;

/// Identity resolved from a valid session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Extractor requiring a valid `keeper_session` cookie.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let cookie = jar.get(SESSION_COOKIE).ok_or(AuthError::MissingSession)?;

        let user_id = state
            .sessions()
            .verify(cookie.value_trimmed())
            .inspect_err(|e| {
                tracing::debug!(error_code = e.error_code(), "Session rejected");
            })?;

        let user = AuthenticatedUser { user_id };
        parts.extensions.insert(user.clone());
        Ok(Auth(user))
    }
}
