use std::convert::Infallible;

use crate::api::ErrorResponse;
use crate::auth::AuthUser;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use larder_core::{BatchImporter, ImportBatch, ImportEvent};
use serde::Deserialize;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImportBatchRequest {
    /// Video URLs to import (1 to 20)
    pub urls: Option<Vec<String>>,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn to_sse(event: ImportEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .json_data(&event)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode import event");
            Event::default()
                .event("error")
                .data(r#"{"type":"error","error":"failed to encode event"}"#)
        })
}

/// Import recipes from a batch of video URLs
///
/// Streams `start`, `progress`, `complete` and `error` events as server-sent
/// events. Individual URL failures are reported in the stream, not as an HTTP
/// error.
#[utoipa::path(
    post,
    path = "/api/import-batch",
    tag = "import",
    request_body = ImportBatchRequest,
    responses(
        (status = 200, description = "Event stream of import progress", content_type = "text/event-stream", body = String),
        (status = 400, description = "Missing, empty or oversized URL list", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Import could not be started", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn import_batch(
    AuthUser(user): AuthUser,
    State(importer): State<BatchImporter>,
    payload: Result<Json<ImportBatchRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let Some(urls) = request.urls else {
        return error_response(StatusCode::BAD_REQUEST, "urls is required");
    };

    let batch = match ImportBatch::new(urls) {
        Ok(batch) => batch,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let events = match importer.start(user.id, batch) {
        Ok(events) => events,
        Err(e) => {
            tracing::error!(user_id = %user.id, error = %e, "Failed to start batch import");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to start import",
            );
        }
    };

    let stream = UnboundedReceiverStream::new(events).map(|event| Ok::<_, Infallible>(to_sse(event)));

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use larder_core::extract::{ExtractorSet, FakeExtractor};
    use larder_core::generate::FakeGenerator;
    use larder_core::platform::VideoPlatform;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::testing::{default_extractors, test_app, TestBackend};

    fn post(token: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/import-batch")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Parse an SSE body into (event name, data) pairs, skipping keep-alive comments.
    fn parse_sse(body: &str) -> Vec<(String, Value)> {
        body.split("\n\n")
            .filter_map(|frame| {
                let mut name = None;
                let mut data = None;
                for line in frame.lines() {
                    if let Some(v) = line.strip_prefix("event: ") {
                        name = Some(v.to_string());
                    } else if let Some(v) = line.strip_prefix("data: ") {
                        data = Some(serde_json::from_str(v).unwrap());
                    }
                }
                Some((name?, data?))
            })
            .collect()
    }

    #[tokio::test]
    async fn rejects_missing_or_invalid_token() {
        let backend = Arc::new(TestBackend::default());
        let app = test_app(backend, default_extractors(), FakeGenerator::new());

        let response = app
            .clone()
            .oneshot(post(None, r#"{"urls": ["https://youtu.be/AAA"]}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Missing Authorization header"})
        );

        let response = app
            .oneshot(post(Some("nope"), r#"{"urls": ["https://youtu.be/AAA"]}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            json!({"error": "Invalid or expired token"})
        );
    }

    #[tokio::test]
    async fn rejects_bad_url_lists() {
        let backend = Arc::new(TestBackend::default());
        let (_, token) = backend.login("cook");
        let app = test_app(backend.clone(), default_extractors(), FakeGenerator::new());

        let too_many: Vec<String> = (0..21).map(|i| format!("https://youtu.be/v{}", i)).collect();
        let cases = [
            ("{}".to_string(), "urls is required"),
            (r#"{"urls": []}"#.to_string(), "urls must contain at least one URL"),
            (
                json!({ "urls": too_many }).to_string(),
                "a batch may contain at most 20 URLs, got 21",
            ),
        ];

        for (body, expected) in cases {
            let response = app.clone().oneshot(post(Some(&token), &body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(json_body(response).await, json!({ "error": expected }));
        }

        let response = app
            .oneshot(post(Some(&token), "not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());

        assert!(backend.store.recipes().is_empty());
    }

    #[tokio::test]
    async fn streams_progress_until_complete() {
        let backend = Arc::new(TestBackend::default());
        let (user, token) = backend.login("cook");
        let extractors = ExtractorSet::new()
            .with(Arc::new(FakeExtractor::new(VideoPlatform::YouTube)))
            .with(Arc::new(FakeExtractor::new(VideoPlatform::TikTok).with_failure(
                "https://www.tiktok.com/@u/video/BBB",
                Some("Video unavailable"),
            )));
        let app = test_app(backend.clone(), extractors, FakeGenerator::new());

        let response = app
            .oneshot(post(
                Some(&token),
                r#"{"urls": ["https://youtu.be/AAA", "https://www.tiktok.com/@u/video/BBB"]}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert!(headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream"));
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONNECTION], "keep-alive");

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let events = parse_sse(std::str::from_utf8(&bytes).unwrap());

        let names: Vec<&str> = events.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names.iter().filter(|n| **n == "start").count(), 2);
        assert_eq!(names.iter().filter(|n| **n == "progress").count(), 2);
        assert_eq!(names.last(), Some(&"complete"));

        let (_, complete) = events.last().unwrap();
        assert_eq!(complete["type"], "complete");
        assert_eq!(complete["totalProcessed"], 2);
        assert_eq!(complete["successful"][0]["index"], 0);
        assert_eq!(complete["successful"][0]["recipeName"], "Recipe from AAA");
        assert_eq!(complete["failed"][0]["index"], 1);
        assert_eq!(complete["failed"][0]["error"], "Video unavailable");

        assert_eq!(backend.store.recipes_for(user.id).len(), 1);
    }
}
