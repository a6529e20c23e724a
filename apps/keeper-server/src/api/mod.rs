// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, DefaultBodyLimit},
    http::Request,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::SESSION_COOKIE,
    error::ApiError,
    models::{
        BinaryPayload, CardPayload, Credentials, Envelope, PasswordPayload, RecordKind, Summary,
        TextPayload,
    },
    state::AppState,
};

pub mod account;
pub mod binary;
pub mod health;
pub mod secrets;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Unwrap a JSON body, answering malformed or mistyped bodies with 400.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "Request body rejected");
            Err(ApiError::bad_request(rejection.body_text()))
        }
    }
}

pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/register", post(account::register))
        .route("/login", post(account::login))
        .route("/list", post(secrets::list))
        .route("/put", post(secrets::put))
        .route(
            "/put/binary",
            post(binary::put_binary).layer(DefaultBodyLimit::disable()),
        )
        .route("/get", post(secrets::get))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(trace)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Documents the session cookie as the API's security scheme.
struct SessionCookie;

impl Modify for SessionCookie {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        account::register,
        account::login,
        secrets::list,
        secrets::put,
        secrets::get,
        binary::put_binary,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            Credentials,
            Envelope,
            RecordKind,
            Summary,
            PasswordPayload,
            TextPayload,
            CardPayload,
            BinaryPayload,
            binary::UploadForm,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SessionCookie),
    tags(
        (name = "Account", description = "Registration and login"),
        (name = "Secrets", description = "Password, text and card records"),
        (name = "Files", description = "Streaming binary upload and download"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
