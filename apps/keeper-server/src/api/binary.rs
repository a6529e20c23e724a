// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
};
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    error::ApiError,
    state::AppState,
    transfer::{download::PART_NAME, upload::store_upload},
};

/// Multipart form accepted by `/put/binary`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// File contents; the part's filename becomes the record name.
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Stream an uploaded file to disk and record it.
///
/// Only the part named `file` is read; other parts are skipped.
#[utoipa::path(
    post,
    path = "/put/binary",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    tag = "Files",
    security(("session" = [])),
    responses(
        (status = 200, description = "File stored"),
        (status = 400, description = "Not a multipart body, or no named file part"),
        (status = 401, description = "Missing or invalid session"),
        (status = 409, description = "A file with this name already exists")
    )
)]
pub async fn put_binary(
    Auth(user): Auth,
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StatusCode, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::bad_request(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(PART_NAME) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| ApiError::bad_request("file part has no filename"))?;

        let written = store_upload(&state, &user.user_id, &file_name, field).await?;
        tracing::info!(
            user_id = %user.user_id,
            bytes = written,
            "File uploaded"
        );
        return Ok(StatusCode::OK);
    }

    Err(ApiError::bad_request(format!(
        "multipart body has no {PART_NAME:?} part"
    )))
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::api::tests::{body_bytes, post_json, register, send};
    use crate::models::{Envelope, RecordKind, Summary};
    use crate::state::tests::empty_state;
    use axum::body::Body;
    use axum::extract::{FromRequest, Multipart};
    use axum::http::{
        header::{CONTENT_TYPE, COOKIE},
        Request, StatusCode,
    };
    use serde_json::json;

    const BOUNDARY: &str = "test-boundary-7f3a";

    fn upload(cookie: &str, part: &str, filename: Option<&str>, data: &[u8]) -> Request<Body> {
        let disposition = match filename {
            Some(filename) => format!("form-data; name=\"{part}\"; filename=\"{filename}\""),
            None => format!("form-data; name=\"{part}\""),
        };
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/put/binary")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(COOKIE, cookie)
            .body(Body::from(body))
            .unwrap()
    }

    fn binary_query(name: &str) -> serde_json::Value {
        let envelope = Envelope::wrap(RecordKind::Binary, &json!({"name": name})).unwrap();
        serde_json::to_value(envelope).unwrap()
    }

    #[tokio::test]
    async fn upload_then_download_returns_same_bytes() {
        let (_dir, state) = empty_state(1024);
        let app = router(state);
        let cookie = register(&app, "alice").await;
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();

        let response = send(&app, upload(&cookie, "file", Some("photo.jpg"), &data)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, post_json("/get", Some(&cookie), binary_query("photo.jpg"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("multipart/form-data; boundary="));

        let body = body_bytes(response).await;
        let request = Request::post("/")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let mut multipart = Multipart::from_request(request, &()).await.unwrap();
        let field = multipart.next_field().await.unwrap().unwrap();
        assert_eq!(field.name(), Some("file"));
        assert_eq!(field.file_name(), Some("photo.jpg"));
        assert_eq!(field.bytes().await.unwrap().as_ref(), data.as_slice());

        let response = send(&app, post_json("/list", Some(&cookie), json!(null))).await;
        let listed: Vec<Summary> = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(
            listed,
            vec![Summary {
                kind: RecordKind::Binary,
                name: "photo.jpg".into()
            }]
        );
    }

    #[tokio::test]
    async fn quoted_filename_comes_back_unchanged() {
        let (_dir, state) = empty_state(1024);
        let app = router(state);
        let cookie = register(&app, "alice").await;

        let response = send(&app, upload(&cookie, "file", Some(r#"a\"b.txt"#), b"quoted")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&app, post_json("/get", Some(&cookie), binary_query("a\"b.txt"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[CONTENT_TYPE].clone();
        let request = Request::post("/")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body_bytes(response).await))
            .unwrap();
        let mut multipart = Multipart::from_request(request, &()).await.unwrap();
        let field = multipart.next_field().await.unwrap().unwrap();
        assert_eq!(field.file_name(), Some("a\"b.txt"));
        assert_eq!(field.bytes().await.unwrap().as_ref(), b"quoted");
    }

    #[tokio::test]
    async fn duplicate_upload_conflicts() {
        let (_dir, state) = empty_state(1024);
        let app = router(state);
        let cookie = register(&app, "alice").await;

        let first = send(&app, upload(&cookie, "file", Some("a.txt"), b"one")).await;
        assert_eq!(first.status(), StatusCode::OK);
        let second = send(&app, upload(&cookie, "file", Some("a.txt"), b"two")).await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn upload_needs_a_named_file_part() {
        let (_dir, state) = empty_state(1024);
        let app = router(state);
        let cookie = register(&app, "alice").await;

        let wrong_part = send(&app, upload(&cookie, "attachment", Some("a.txt"), b"x")).await;
        assert_eq!(wrong_part.status(), StatusCode::BAD_REQUEST);

        let no_filename = send(&app, upload(&cookie, "file", None, b"x")).await;
        assert_eq!(no_filename.status(), StatusCode::BAD_REQUEST);

        let not_multipart = send(&app, post_json("/put/binary", Some(&cookie), json!({}))).await;
        assert_eq!(not_multipart.status(), StatusCode::BAD_REQUEST);
    }
}
