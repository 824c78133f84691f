use std::path::Path;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::models::{AddBookRequest, AddBookResponse, DetailParams, SearchParams};
use crate::relay::{Relay, RelayError};

const SEARCH_FAILED: &str = "검색 중 오류가 발생했습니다";
const DETAIL_FAILED: &str = "도서 정보를 가져오는 중 오류가 발생했습니다";
const NOT_FOUND: &str = "도서를 찾을 수 없습니다";
const ADD_FAILED: &str = "노션 추가 중 오류가 발생했습니다";

pub fn router(relay: Relay, static_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search_endpoint))
        .route("/detail", get(detail_endpoint))
        .route("/addBook", post(add_book_endpoint))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn search_endpoint(
    State(relay): State<Relay>,
    Query(params): Query<SearchParams>,
) -> Response {
    match relay.search(params.query.as_deref()).await {
        Ok(books) => (StatusCode::OK, Json(books)).into_response(),
        Err(e) => {
            let (status, detail) = classify(&e, SEARCH_FAILED, false);
            (status, Json(json!({"error": detail}))).into_response()
        }
    }
}

async fn detail_endpoint(
    State(relay): State<Relay>,
    Query(params): Query<DetailParams>,
) -> Response {
    match relay.detail(params.isbn.as_deref()).await {
        Ok(book) => (StatusCode::OK, Json(book)).into_response(),
        Err(e) => {
            let (status, detail) = classify(&e, DETAIL_FAILED, false);
            (status, Json(json!({"error": detail}))).into_response()
        }
    }
}

async fn add_book_endpoint(
    State(relay): State<Relay>,
    Json(book): Json<AddBookRequest>,
) -> Response {
    match relay.add(&book).await {
        Ok(page_id) => {
            let response = AddBookResponse { ok: true, page_id };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            let (status, detail) = classify(&e, ADD_FAILED, true);
            (status, Json(json!({"ok": false, "error": detail}))).into_response()
        }
    }
}

/// Log the operator-facing detail and pick the status and client-facing text.
/// Besides bad-input messages, an upstream call's message reaches the client
/// only when `surface_upstream` is set.
fn classify(err: &RelayError, failure: &str, surface_upstream: bool) -> (StatusCode, String) {
    match err {
        RelayError::BadRequest(msg) => {
            tracing::debug!(error = %err, "rejected request");
            (StatusCode::BAD_REQUEST, msg.clone())
        }
        RelayError::NotFound(_) => {
            tracing::info!(error = %err, "lookup found nothing");
            (StatusCode::NOT_FOUND, NOT_FOUND.to_string())
        }
        RelayError::UpstreamMalformed(_) | RelayError::UpstreamReported { .. } => {
            tracing::error!(error = %err, "unusable catalog response");
            (StatusCode::INTERNAL_SERVER_ERROR, failure.to_string())
        }
        RelayError::UpstreamCallFailed(msg) => {
            tracing::error!(error = %err, "upstream call failed");
            let detail = if surface_upstream {
                format!("{failure}: {msg}")
            } else {
                failure.to_string()
            };
            (StatusCode::INTERNAL_SERVER_ERROR, detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::stubs::{test_config, StubCatalog, StubNotes};

    const SEARCH_BODY: &str = r#"{"version":"20131101","totalResults":2,"item":[
        {"title":"소년이 온다","author":"한강 (지은이)","publisher":"창비",
         "cover":"https://image.aladin.co.kr/product/4086/97/coversum/8936434128_2.jpg",
         "description":"&lt;b&gt;1980년 5월&lt;/b&gt;","isbn13":"9788936434120"},
        {"title":"흰","author":"한강"}
    ]};"#;

    struct Harness {
        app: Router,
        catalog: Arc<StubCatalog>,
        notes: Arc<StubNotes>,
    }

    fn harness(catalog: StubCatalog, notes: StubNotes) -> Harness {
        let catalog = Arc::new(catalog);
        let notes = Arc::new(notes);
        let relay = Relay::new(&test_config(), catalog.clone(), notes.clone());
        Harness {
            app: router(relay, Path::new("does-not-exist")),
            catalog,
            notes,
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn add_request(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/addBook")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let h = harness(StubCatalog::responding("{}"), StubNotes::default());
        let (status, body) = send(&h.app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn empty_query_is_rejected_without_upstream_call() {
        let h = harness(StubCatalog::responding(SEARCH_BODY), StubNotes::default());
        for uri in ["/search?query=", "/search", "/search?query=%20%20"] {
            let (status, body) = send(&h.app, get_request(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "uri: {uri}");
            assert!(body["error"].is_string());
        }
        assert_eq!(h.catalog.calls(), 0);
    }

    #[tokio::test]
    async fn search_returns_normalized_books() {
        let h = harness(StubCatalog::responding(SEARCH_BODY), StubNotes::default());
        let (status, body) = send(&h.app, get_request("/search?query=han%20kang")).await;
        assert_eq!(status, StatusCode::OK);

        let books = body.as_array().unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0]["title"], "소년이 온다");
        assert_eq!(books[0]["description"], "<b>1980년 5월</b>");
        assert_eq!(
            books[0]["cover"],
            "https://image.aladin.co.kr/product/4086/97/cover500/8936434128_2.jpg"
        );
        assert_eq!(books[0]["isbn"], "9788936434120");
        assert_eq!(books[1]["description"], crate::catalog::NO_DESCRIPTION);
        assert!(books[1].get("cover").is_none());
        assert_eq!(h.catalog.calls(), 1);
    }

    #[tokio::test]
    async fn callback_wrapped_search_body_is_accepted() {
        let body = format!("cb({})", SEARCH_BODY.trim_end_matches(';'));
        let h = harness(StubCatalog::responding(&body), StubNotes::default());
        let (status, body) = send(&h.app, get_request("/search?query=x")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn search_failures_are_500_with_generic_message() {
        for catalog in [
            StubCatalog::responding("<html>Service Unavailable</html>"),
            StubCatalog::responding(r#"{"errorCode":10,"errorMessage":"잘못된 TTBKey"}"#),
            StubCatalog::failing(503),
        ] {
            let h = harness(catalog, StubNotes::default());
            let (status, body) = send(&h.app, get_request("/search?query=x")).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["error"], SEARCH_FAILED);
            assert_eq!(h.catalog.calls(), 1);
        }
    }

    #[test]
    fn upstream_message_is_surfaced_only_on_request() {
        let err = RelayError::UpstreamCallFailed("catalog returned HTTP 503".to_string());

        let (status, detail) = classify(&err, SEARCH_FAILED, false);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail, SEARCH_FAILED);

        let (status, detail) = classify(&err, ADD_FAILED, true);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail, format!("{ADD_FAILED}: catalog returned HTTP 503"));

        let malformed = RelayError::UpstreamMalformed("eof".to_string());
        assert_eq!(classify(&malformed, ADD_FAILED, true).1, ADD_FAILED);
    }

    #[tokio::test]
    async fn detail_returns_extended_book() {
        let h = harness(
            StubCatalog::responding(
                r#"{"item":[{"title":"흰","author":"한강","priceStandard":13000,"priceSales":11700,"customerReviewRank":8}]}"#,
            ),
            StubNotes::default(),
        );
        let (status, body) = send(&h.app, get_request("/detail?isbn=9788954651356")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "흰");
        assert_eq!(body["priceSales"], 11700);
        assert_eq!(body["rating"], 8.0);
    }

    #[tokio::test]
    async fn detail_status_codes() {
        let h = harness(StubCatalog::responding(r#"{"item":[]}"#), StubNotes::default());
        let (status, body) = send(&h.app, get_request("/detail?isbn=9788954651356")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], NOT_FOUND);

        let (status, _) = send(&h.app, get_request("/detail")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let h = harness(StubCatalog::failing(502), StubNotes::default());
        let (status, body) = send(&h.app, get_request("/detail?isbn=1")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], DETAIL_FAILED);
    }

    #[tokio::test]
    async fn add_without_description_creates_no_block() {
        let h = harness(StubCatalog::responding("{}"), StubNotes::default());
        let (status, body) =
            send(&h.app, add_request(&json!({"title": "흰", "author": "한강"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true, "pageId": "page-1"}));

        let pages = h.notes.pages();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].get("children").is_none());
        assert_eq!(h.catalog.calls(), 0);
    }

    #[tokio::test]
    async fn add_truncates_long_description() {
        let h = harness(StubCatalog::responding("{}"), StubNotes::default());
        let description = "x".repeat(2500);
        let (status, _) = send(
            &h.app,
            add_request(&json!({"title": "t", "author": "a", "description": description})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let page = &h.notes.pages()[0];
        let quoted = page["children"][0]["quote"]["rich_text"][0]["text"]["content"]
            .as_str()
            .unwrap();
        assert_eq!(quoted.chars().count(), 2000);
    }

    #[tokio::test]
    async fn identical_adds_create_distinct_pages() {
        let h = harness(StubCatalog::responding("{}"), StubNotes::default());
        let book = json!({"title": "흰", "author": "한강", "isbn": "9788954651356"});

        let (first_status, first) = send(&h.app, add_request(&book)).await;
        let (second_status, second) = send(&h.app, add_request(&book)).await;

        assert_eq!(first_status, StatusCode::OK);
        assert_eq!(second_status, StatusCode::OK);
        assert_ne!(first["pageId"], second["pageId"]);
        assert_eq!(h.notes.pages().len(), 2);
    }

    #[tokio::test]
    async fn add_failure_surfaces_upstream_message() {
        let h = harness(
            StubCatalog::responding("{}"),
            StubNotes::rejecting("validation_error: author is not a property that exists."),
        );
        let (status, body) = send(&h.app, add_request(&json!({"title": "t"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["ok"], false);
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with(ADD_FAILED));
        assert!(error.contains("author is not a property"));
    }

    #[tokio::test]
    async fn malformed_add_body_never_reaches_note_service() {
        let h = harness(StubCatalog::responding("{}"), StubNotes::default());
        let request = Request::builder()
            .method("POST")
            .uri("/addBook")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = h.app.clone().oneshot(request).await.unwrap();
        assert!(response.status().is_client_error());
        assert!(h.notes.pages().is_empty());
    }

    #[tokio::test]
    async fn unknown_paths_fall_through_to_static_files() {
        let h = harness(StubCatalog::responding("{}"), StubNotes::default());
        let response = h.app.clone().oneshot(get_request("/index.html")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
