// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::SET_COOKIE, HeaderName, StatusCode},
    Json,
};

use super::json_body;
use crate::{
    auth::{hash_password, verify_password},
    error::{ApiError, VaultError, VaultResult},
    models::Credentials,
    state::AppState,
};

/// Longest accepted login, in characters.
const MAX_LOGIN_LEN: usize = 255;

/// `Set-Cookie` header carrying a fresh session.
type SessionHeader = [(HeaderName, String); 1];

fn validate_credentials(credentials: &Credentials) -> VaultResult<()> {
    let login = &credentials.login;
    if login.trim().is_empty() {
        return Err(VaultError::validation("login must not be empty"));
    }
    if login.chars().count() > MAX_LOGIN_LEN || login.chars().any(char::is_control) {
        return Err(VaultError::validation("login is not acceptable"));
    }
    if credentials.password.is_empty() {
        return Err(VaultError::validation("password must not be empty"));
    }
    Ok(())
}

/// Session cookie for `user_id`, as a response header pair.
fn session_cookie(state: &AppState, user_id: &str) -> Result<SessionHeader, ApiError> {
    let token = state.sessions().issue(user_id).map_err(|e| {
        tracing::error!(error = %e, "Session issue failed");
        ApiError::internal()
    })?;
    Ok([(SET_COOKIE, state.sessions().cookie(&token).to_string())])
}

#[utoipa::path(
    post,
    path = "/register",
    request_body = Credentials,
    tag = "Account",
    responses(
        (status = 200, description = "Account created, session cookie set"),
        (status = 400, description = "Malformed request"),
        (status = 409, description = "Login already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, SessionHeader), ApiError> {
    let credentials = json_body(payload)?;
    validate_credentials(&credentials)?;

    let user = state
        .with_vault(move |vault| {
            let hash = hash_password(&credentials.password)
                .map_err(|e| VaultError::Internal(e.to_string()))?;
            Ok(vault.users().create(&credentials.login, &hash)?)
        })
        .await?;

    Ok((StatusCode::OK, session_cookie(&state, &user.id)?))
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = Credentials,
    tag = "Account",
    responses(
        (status = 200, description = "Logged in, session cookie set"),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Invalid login or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<(StatusCode, SessionHeader), ApiError> {
    let credentials = json_body(payload)?;
    validate_credentials(&credentials)?;

    let user_id = state
        .with_vault(move |vault| {
            match vault.users().find_by_login(&credentials.login)? {
                Some(user) if verify_password(&credentials.password, &user.password_hash) => {
                    Ok(user.id)
                }
                Some(_) => Err(VaultError::InvalidCredentials),
                None => {
                    // Same cost as a real verification
                    let _ = hash_password(&credentials.password);
                    Err(VaultError::InvalidCredentials)
                }
            }
        })
        .await
        .inspect_err(|e| {
            if matches!(e, VaultError::InvalidCredentials) {
                tracing::info!("Login rejected");
            }
        })?;

    tracing::info!(user_id = %user_id, "User logged in");
    Ok((StatusCode::OK, session_cookie(&state, &user_id)?))
}
