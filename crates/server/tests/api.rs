use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use catalog::CatalogConfig;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use server::{build_router, ServerConfig, ServerState};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----shelf-test-boundary";

fn test_app(dir: &TempDir) -> (Router, Arc<ServerState>) {
    let config = ServerConfig {
        library: CatalogConfig::rooted_at(dir.path()),
        ..ServerConfig::default()
    };
    let state = Arc::new(ServerState::new(config).unwrap());
    (build_router(state.clone()), state)
}

enum FormPart<'a> {
    File(&'a str, &'a str, &'a [u8]),
    Field(&'a str, &'a str),
}

fn multipart(parts: &[FormPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            FormPart::File(name, filename, content) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
            FormPart::Field(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn upload_one(app: &Router, filename: &str, content: &[u8]) -> String {
    let body = multipart(&[FormPart::File("book_0", filename, content)]);
    let (status, json) = send_json(app, multipart_request("/api/upload", body)).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    json["books"][0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let (status, json) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let (status, json) = send_json(&app, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_upload_with_metadata_and_cover() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(&dir);

    let body = multipart(&[
        FormPart::File("book_0", "dune.epub", b"dune-bytes"),
        FormPart::Field("metadata_0", r#"{"title":"Dune","creator":"Frank Herbert"}"#),
        FormPart::File("cover_0", "cover_0.jpg", b"jpeg-bytes"),
    ]);
    let (status, json) = send_json(&app, multipart_request("/api/upload", body)).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["success"], true);
    assert_eq!(json["books"].as_array().unwrap().len(), 1);
    assert_eq!(json["books"][0]["title"], "Dune");
    assert_eq!(json["books"][0]["filename"], "dune.epub");

    let id = json["books"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(id, catalog::generate_id(b"dune-bytes", "dune.epub"));
    assert!(state.catalog.contains(&id));

    let (status, listing) = send_json(&app, get("/api/books")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["books"][0]["author"], "Frank Herbert");
    assert_eq!(listing["books"][0]["coverUrl"], format!("/api/cover/{id}"));

    let (status, cover) = send(&app, get(&format!("/api/cover/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cover, b"jpeg-bytes");
}

#[tokio::test]
async fn test_upload_without_epub_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let body = multipart(&[FormPart::File("file", "notes.txt", b"hello")]);
    let (status, json) = send_json(&app, multipart_request("/api/upload", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "NO_FILES_UPLOADED");
}

#[tokio::test]
async fn test_upload_without_boundary_is_rejected() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, "multipart/form-data")
        .body(Body::from("irrelevant"))
        .unwrap();
    let (status, json) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "MALFORMED_REQUEST");
}

#[tokio::test]
async fn test_book_download_and_head() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);
    let id = upload_one(&app, "Dune.epub", b"PK-epub-bytes").await;

    let response = app
        .clone()
        .oneshot(get(&format!("/api/book/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/epub+zip"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Dune.epub\""
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"PK-epub-bytes");

    let head = Request::builder()
        .method(Method::HEAD)
        .uri(format!("/api/book/{id}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(head).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "13");
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/epub+zip"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Dune.epub\""
    );
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_head_for_vanished_blob_is_404() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(&dir);
    let id = upload_one(&app, "vanish.epub", b"bytes").await;
    std::fs::remove_file(state.catalog.book_file_path(&id).unwrap()).unwrap();

    let head = Request::builder()
        .method(Method::HEAD)
        .uri(format!("/api/book/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, head).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_book_and_cover_are_404() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let (status, _) = send(&app, get("/api/book/book_00000000_00000000")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = upload_one(&app, "plain.epub", b"no cover here").await;
    let (status, _) = send(&app, get(&format!("/api/cover/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blob_deleted_behind_the_catalog_is_404() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(&dir);
    let id = upload_one(&app, "gone.epub", b"soon gone").await;

    let path = state.catalog.book_file_path(&id).unwrap();
    std::fs::remove_file(path).unwrap();

    let (status, json) = send_json(&app, get(&format!("/api/book/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_progress_round_trip() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);
    let id = upload_one(&app, "a.epub", b"a").await;

    let (status, json) = send_json(&app, get(&format!("/api/progress/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["progress"].is_null());

    let payload = json!({
        "bookId": id,
        "progress": {"cfi": "epubcfi(/6/4!/4/2)", "percentage": 0.42, "chapterTitle": "One"}
    });
    let (status, saved) = send_json(&app, json_request(Method::POST, "/api/progress", payload)).await;
    assert_eq!(status, StatusCode::OK, "{saved}");
    assert_eq!(saved["success"], true);
    assert_eq!(saved["bookId"], id.as_str());
    assert!(saved["timestamp"].as_i64().unwrap() > 0);

    let (_, loaded) = send_json(&app, get(&format!("/api/progress/{id}"))).await;
    assert_eq!(loaded["progress"]["cfi"], "epubcfi(/6/4!/4/2)");
    assert_eq!(loaded["progress"]["percentage"], 0.42);
    assert_eq!(loaded["progress"]["chapterTitle"], "One");
    assert_eq!(loaded["progress"]["timestamp"], saved["timestamp"]);

    let delete = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/progress/{id}"))
        .body(Body::empty())
        .unwrap();
    let (status, removed) = send_json(&app, delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["removed"], true);

    let (_, loaded) = send_json(&app, get(&format!("/api/progress/{id}"))).await;
    assert!(loaded["progress"].is_null());
}

#[tokio::test]
async fn test_progress_missing_fields_are_400() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    for payload in [
        json!({"progress": {"cfi": "x", "percentage": 0.1}}),
        json!({"bookId": "b"}),
        json!({"bookId": "b", "progress": {"percentage": 0.1}}),
        json!({"bookId": "b", "progress": {"cfi": "x"}}),
    ] {
        let (status, json) =
            send_json(&app, json_request(Method::POST, "/api/progress", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/progress")
        .body(Body::from("not json"))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cover_upload() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);
    let id = upload_one(&app, "b.epub", b"b").await;

    let body = multipart(&[
        FormPart::Field("bookId", &id),
        FormPart::File("cover", "cover.jpg", b"new-cover"),
    ]);
    let (status, json) = send_json(&app, multipart_request("/api/upload-cover", body)).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["coverUrl"], format!("/api/cover/{id}"));

    let (status, cover) = send(&app, get(&format!("/api/cover/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cover, b"new-cover");
}

#[tokio::test]
async fn test_cover_upload_errors() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let body = multipart(&[FormPart::File("cover", "cover.jpg", b"img")]);
    let (status, _) = send(&app, multipart_request("/api/upload-cover", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = multipart(&[
        FormPart::Field("bookId", "book_deadbeef_deadbeef"),
        FormPart::File("cover", "cover.jpg", b"img"),
    ]);
    let (status, json) = send_json(&app, multipart_request("/api/upload-cover", body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_delete_book_and_stats() {
    let dir = TempDir::new().unwrap();
    let (app, state) = test_app(&dir);
    let id = upload_one(&app, "c.epub", b"c").await;
    upload_one(&app, "d.epub", b"d").await;

    let (_, stats) = send_json(&app, get("/api/stats")).await;
    assert_eq!(stats["stats"]["books_count"], 2);

    let path = state.catalog.book_file_path(&id).unwrap();
    let delete = || {
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/book/{id}"))
            .body(Body::empty())
            .unwrap()
    };
    let (status, _) = send(&app, delete()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!path.exists());

    let (status, _) = send(&app, delete()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, stats) = send_json(&app, get("/api/stats")).await;
    assert_eq!(stats["stats"]["books_count"], 1);
}

#[tokio::test]
async fn test_catalog_survives_restart() {
    let dir = TempDir::new().unwrap();
    let id = {
        let (app, _) = test_app(&dir);
        upload_one(&app, "keep.epub", b"kept bytes").await
    };

    let (app, _) = test_app(&dir);
    let (_, listing) = send_json(&app, get("/api/books")).await;
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["books"][0]["id"], id.as_str());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let dir = TempDir::new().unwrap();
    let (app, _) = test_app(&dir);

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn test_progress_and_deletion_are_saved_to_disk() {
    let dir = TempDir::new().unwrap();
    let (kept, dropped) = {
        let (app, _) = test_app(&dir);
        let kept = upload_one(&app, "kept.epub", b"kept").await;
        let dropped = upload_one(&app, "dropped.epub", b"dropped").await;

        let payload = json!({
            "bookId": kept,
            "progress": {"cfi": "epubcfi(/6/10)", "percentage": 0.75}
        });
        let (status, _) = send(&app, json_request(Method::POST, "/api/progress", payload)).await;
        assert_eq!(status, StatusCode::OK);

        let delete = Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/book/{dropped}"))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, delete).await;
        assert_eq!(status, StatusCode::OK);
        (kept, dropped)
    };

    let (app, _) = test_app(&dir);
    let (_, loaded) = send_json(&app, get(&format!("/api/progress/{kept}"))).await;
    assert_eq!(loaded["progress"]["cfi"], "epubcfi(/6/10)");
    let (_, listing) = send_json(&app, get("/api/books")).await;
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["books"][0]["id"], kept.as_str());
    let (status, _) = send(&app, get(&format!("/api/book/{dropped}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
