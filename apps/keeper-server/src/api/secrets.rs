// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};

use super::json_body;
use crate::{
    auth::Auth,
    dispatch::Retrieved,
    error::ApiError,
    models::{Envelope, Summary},
    state::AppState,
    transfer::download::file_response,
};

#[utoipa::path(
    post,
    path = "/list",
    tag = "Secrets",
    security(("session" = [])),
    responses(
        (status = 200, description = "Names and kinds of every stored record", body = [Summary]),
        (status = 401, description = "Missing or invalid session")
    )
)]
pub async fn list(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Summary>>, ApiError> {
    let user_id = user.user_id;
    let summaries = state
        .with_vault(move |vault| vault.dispatcher().list(&user_id))
        .await?;
    Ok(Json(summaries))
}

#[utoipa::path(
    post,
    path = "/put",
    request_body = Envelope,
    tag = "Secrets",
    security(("session" = [])),
    responses(
        (status = 200, description = "Stored; echoes the kind with an empty payload", body = Envelope),
        (status = 400, description = "Malformed envelope or invalid record"),
        (status = 401, description = "Missing or invalid session"),
        (status = 409, description = "A record with this name already exists")
    )
)]
pub async fn put(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<Envelope>, JsonRejection>,
) -> Result<Json<Envelope>, ApiError> {
    let envelope = json_body(payload)?;
    let user_id = user.user_id;

    let ack = state
        .with_vault(move |vault| {
            let ack = vault.dispatcher().put(&user_id, &envelope)?;
            tracing::info!(user_id = %user_id, kind = %envelope.kind, "Record stored");
            Ok(ack)
        })
        .await?;
    Ok(Json(ack))
}

/// Fetch one record by name.
///
/// Binary records answer with a `multipart/form-data` stream instead of
/// JSON.
#[utoipa::path(
    post,
    path = "/get",
    request_body = Envelope,
    tag = "Secrets",
    security(("session" = [])),
    responses(
        (status = 200, description = "Record envelope, or the stored file for binary records",
            content(
                (Envelope = "application/json"),
                (String = "multipart/form-data")
            )
        ),
        (status = 400, description = "Malformed envelope"),
        (status = 401, description = "Missing or invalid session"),
        (status = 404, description = "No such record")
    )
)]
pub async fn get(
    Auth(user): Auth,
    State(state): State<AppState>,
    payload: Result<Json<Envelope>, JsonRejection>,
) -> Result<Response, ApiError> {
    let envelope = json_body(payload)?;
    let user_id = user.user_id;

    let retrieved = state
        .with_vault(move |vault| vault.dispatcher().get(&user_id, &envelope))
        .await?;

    match retrieved {
        Retrieved::Envelope(envelope) => Ok(Json(envelope).into_response()),
        Retrieved::File(file) => Ok(file_response(file, state.chunk_size()).await?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUser;
    use crate::models::{CardPayload, RecordKind};
    use crate::state::tests::test_state;
    use axum::http::StatusCode;

    fn auth(user_id: &str) -> Auth {
        Auth(AuthenticatedUser {
            user_id: user_id.to_string(),
        })
    }

    fn card(name: &str) -> CardPayload {
        CardPayload {
            name: name.into(),
            number: "4242 4242 4242 4242".into(),
            cvv: "123".into(),
            month: "12".into(),
            year: "2099".into(),
        }
    }

    #[tokio::test]
    async fn card_round_trips_through_handlers() {
        let (_dir, state, user_id) = test_state().await;
        let envelope = Envelope::wrap(RecordKind::Card, &card("visa")).unwrap();

        let Json(ack) = put(auth(&user_id), State(state.clone()), Ok(Json(envelope)))
            .await
            .unwrap();
        assert_eq!(ack.kind, RecordKind::Card);
        assert!(ack.payload.is_empty());

        let query = Envelope::wrap(RecordKind::Card, &serde_json::json!({"name": "visa"})).unwrap();
        let response = get(auth(&user_id), State(state.clone()), Ok(Json(query)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let returned: Envelope = serde_json::from_slice(&body).unwrap();
        let stored: CardPayload = returned.decode().unwrap();
        assert_eq!(stored.number, "4242424242424242");
        assert_eq!(stored.cvv, "123");

        let Json(listed) = list(auth(&user_id), State(state)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind, RecordKind::Card);
    }

    #[tokio::test]
    async fn binary_kind_is_refused_on_json_put() {
        let (_dir, state, user_id) = test_state().await;
        let envelope =
            Envelope::wrap(RecordKind::Binary, &serde_json::json!({"name": "x.bin"})).unwrap();
        let err = put(auth(&user_id), State(state), Ok(Json(envelope)))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let (_dir, state, user_id) = test_state().await;
        let query =
            Envelope::wrap(RecordKind::Binary, &serde_json::json!({"name": "absent.bin"})).unwrap();
        let err = get(auth(&user_id), State(state), Ok(Json(query)))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
