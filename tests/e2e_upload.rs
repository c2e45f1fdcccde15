//! E2E tests for the upload endpoints

mod common;

use common::{FakeMode, TestServer};
use media_gateway::storage::ResourceKind;
use serde_json::{Value, json};

#[tokio::test]
async fn test_video_upload_returns_provider_url_and_stores_it() {
    let server = TestServer::with_media(FakeMode::Fixed(
        "https://cdn.example/v/1.mp4".to_string(),
    ))
    .await;

    let response = server
        .upload("/upload-video", "video", b"0123456789".to_vec())
        .await;

    assert_eq!(response.status(), 200);
    assert!(
        response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"))
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "url": "https://cdn.example/v/1.mp4" }));

    assert_eq!(server.media.uploads(), vec![(10, ResourceKind::Video)]);
    let records = server.db.find_by_url("https://cdn.example/v/1.mp4").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(server.record_count().await, 1);
}

#[tokio::test]
async fn test_each_route_forwards_its_resource_kind() {
    let server = TestServer::new().await;

    for (path, field) in [
        ("/upload", "image"),
        ("/upload-video", "video"),
        ("/upload-file", "file"),
    ] {
        let response = server.upload(path, field, b"payload".to_vec()).await;
        assert_eq!(response.status(), 200, "{path}");
    }

    let kinds: Vec<ResourceKind> = server
        .media
        .uploads()
        .into_iter()
        .map(|(_, kind)| kind)
        .collect();
    assert_eq!(
        kinds,
        vec![ResourceKind::Image, ResourceKind::Video, ResourceKind::Raw]
    );
    assert_eq!(server.record_count().await, 3);
}

#[tokio::test]
async fn test_missing_file_is_rejected_on_every_route() {
    let server = TestServer::new().await;

    for path in ["/upload", "/upload-video", "/upload-file"] {
        let response = server.upload(path, "wrong-field", b"data".to_vec()).await;

        assert_eq!(response.status(), 400, "{path}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "error": "No file uploaded" }));
    }

    assert!(server.media.uploads().is_empty());
    assert_eq!(server.record_count().await, 0);
}

#[tokio::test]
async fn test_empty_post_is_rejected() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/upload"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "No file uploaded" }));
}

#[tokio::test]
async fn test_provider_failure_creates_no_record() {
    let server = TestServer::with_media(FakeMode::Failing).await;

    let response = server.upload("/upload", "image", b"png".to_vec()).await;

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Cloudinary upload failed" }));
    assert_eq!(server.record_count().await, 0);
}

#[tokio::test]
async fn test_record_failure_leaves_asset_hosted() {
    let server = TestServer::with_failing_records(false).await;

    let response = server.upload("/upload-file", "file", b"report".to_vec()).await;

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Server error" }));

    // The provider accepted the file, nothing recorded it and nothing removed it.
    assert_eq!(server.media.uploads().len(), 1);
    assert!(server.media.destroyed().is_empty());
    assert_eq!(server.record_count().await, 0);
}

#[tokio::test]
async fn test_record_failure_with_cleanup_destroys_asset() {
    let server = TestServer::with_failing_records(true).await;

    let response = server.upload("/upload", "image", b"png".to_vec()).await;

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Server error" }));
    assert_eq!(server.media.destroyed(), vec!["asset-1".to_string()]);
}

#[tokio::test]
async fn test_same_upload_twice_creates_two_records() {
    let server = TestServer::new().await;

    let first: Value = server
        .upload("/upload", "image", b"same bytes".to_vec())
        .await
        .json()
        .await
        .unwrap();
    let second: Value = server
        .upload("/upload", "image", b"same bytes".to_vec())
        .await
        .json()
        .await
        .unwrap();

    assert_ne!(first["url"], second["url"]);
    assert_eq!(server.record_count().await, 2);
}

#[tokio::test]
async fn test_same_url_returned_twice_is_not_deduplicated() {
    let url = "https://cdn.example/i/fixed.png";
    let server = TestServer::with_media(FakeMode::Fixed(url.to_string())).await;

    for _ in 0..2 {
        let response = server.upload("/upload", "image", b"png".to_vec()).await;
        assert_eq!(response.status(), 200);
    }

    assert_eq!(server.db.find_by_url(url).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_uploads_are_independent() {
    let server = TestServer::new().await;

    let responses = upload_concurrently(&server).await;
    assert!(responses.iter().all(|status| *status == 200));
    assert_eq!(server.record_count().await, 4);
}

async fn upload_concurrently(server: &TestServer) -> Vec<u16> {
    let (a, b, c, d) = tokio::join!(
        server.upload("/upload", "image", vec![1; 64]),
        server.upload("/upload-video", "video", vec![2; 64]),
        server.upload("/upload-file", "file", vec![3; 64]),
        server.upload("/upload", "image", vec![4; 64]),
    );
    [a, b, c, d]
        .iter()
        .map(|response| response.status().as_u16())
        .collect()
}
