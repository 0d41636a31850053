//! E2E Upload Flow Tests
//!
//! Happy path: a file posted through the form can be fetched back.

use super::common::{generate_test_data, E2ETestEnv};
use fileserver::config::UploadRoute;
use reqwest::StatusCode;

#[tokio::test]
async fn test_upload_then_download() {
    let env = E2ETestEnv::new().await;

    let response = env
        .upload("/receive", Some("docs"), "a.txt", b"0123456789".to_vec())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("/docs/a.txt"), "unexpected body: {}", body);

    let (status, data) = env.get("/docs/a.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data, b"0123456789");
    assert_eq!(
        std::fs::read(env.root().join("docs/a.txt")).unwrap(),
        b"0123456789"
    );
}

#[tokio::test]
async fn test_upload_without_target_lands_in_root() {
    let env = E2ETestEnv::new().await;

    let response = env.upload("/receive", None, "root.bin", vec![1, 2, 3]).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(std::fs::read(env.root().join("root.bin")).unwrap(), [1u8, 2, 3]);
}

#[tokio::test]
async fn test_upload_creates_nested_directories() {
    let env = E2ETestEnv::new().await;
    let data = generate_test_data(256 * 1024);

    let response = env
        .upload("/receive", Some("/a/b/c/"), "big.bin", data.clone())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, fetched) = env.get("/a/b/c/big.bin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, data);
}

#[tokio::test]
async fn test_upload_overwrites_existing_file() {
    let env = E2ETestEnv::new().await;

    env.upload("/receive", Some("docs"), "a.txt", b"first version".to_vec())
        .await;
    let response = env
        .upload("/receive", Some("docs"), "a.txt", b"second".to_vec())
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (_, data) = env.get("/docs/a.txt").await;
    assert_eq!(data, b"second");
}

#[tokio::test]
async fn test_file_part_before_target_is_stored_in_target() {
    let env = E2ETestEnv::new().await;

    let form = reqwest::multipart::Form::new()
        .part(
            "filebrowser",
            reqwest::multipart::Part::bytes(b"late target".to_vec()).file_name("b.txt"),
        )
        .text("target_loc", "later");
    let response = env
        .client
        .post(format!("{}/receive", env.base_url()))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        std::fs::read(env.root().join("later/b.txt")).unwrap(),
        b"late target"
    );
}

#[tokio::test]
async fn test_single_endpoint_variant() {
    let env = E2ETestEnv::with_route(UploadRoute::Upload).await;

    let (status, form) = env.get("/upload").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&form).contains("action=\"/upload\""));

    let response = env
        .upload("/upload", Some("docs"), "a.txt", b"single".to_vec())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        std::fs::read(env.root().join("docs/a.txt")).unwrap(),
        b"single"
    );
}

#[tokio::test]
async fn test_upload_form_posts_to_receive() {
    let env = E2ETestEnv::new().await;

    let response = env
        .client
        .get(format!("{}/upload", env.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = response.text().await.unwrap();
    assert!(html.contains("action=\"/receive\""));
    assert!(html.contains("name=\"filebrowser\""));
    assert!(html.contains("name=\"target_loc\""));
}
