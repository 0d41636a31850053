//! E2E Error Scenario Tests
//!
//! ## Test Coverage
//!
//! - Unsupported HTTP methods
//! - Malformed upload forms
//! - Unsafe destinations
//! - Filesystem failures mid-pipeline

use super::common::E2ETestEnv;
use fileserver::config::UploadRoute;
use reqwest::StatusCode;

#[tokio::test]
async fn test_put_to_receive_is_501() {
    let env = E2ETestEnv::new().await;

    let response = env
        .client
        .put(format!("{}/receive", env.base_url()))
        .body("data")
        .send()
        .await
        .expect("Request failed");

    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert!(response.text().await.unwrap().contains("PUT"));
}

#[tokio::test]
async fn test_get_on_receive_is_501() {
    let env = E2ETestEnv::new().await;

    let (status, body) = env.get("/receive").await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert!(String::from_utf8_lossy(&body).contains("GET"));
}

#[tokio::test]
async fn test_delete_on_static_path_is_501() {
    let env = E2ETestEnv::new().await;
    std::fs::write(env.root().join("a.txt"), b"keep").unwrap();

    let response = env
        .client
        .delete(format!("{}/a.txt", env.base_url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert!(env.root().join("a.txt").exists());
}

#[tokio::test]
async fn test_post_to_upload_in_two_endpoint_mode_is_501() {
    let env = E2ETestEnv::new().await;

    let response = env.upload("/upload", None, "a.txt", b"x".to_vec()).await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert!(!env.root().join("a.txt").exists());
}

#[tokio::test]
async fn test_receive_not_routed_in_single_endpoint_mode() {
    let env = E2ETestEnv::with_route(UploadRoute::Upload).await;

    let response = env.upload("/receive", None, "a.txt", b"x".to_vec()).await;
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    assert!(!env.root().join("a.txt").exists());
}

#[tokio::test]
async fn test_non_multipart_post_is_400() {
    let env = E2ETestEnv::new().await;

    let response = env
        .client
        .post(format!("{}/receive", env.base_url()))
        .header("content-type", "text/plain")
        .body("not a form")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Error receiving data"));
}

#[tokio::test]
async fn test_missing_file_field_is_400() {
    let env = E2ETestEnv::new().await;

    let form = reqwest::multipart::Form::new().text("target_loc", "docs");
    let response = env
        .client
        .post(format!("{}/receive", env.base_url()))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!env.root().join("docs").exists());
}

#[tokio::test]
async fn test_traversal_target_is_rejected() {
    let env = E2ETestEnv::new().await;

    for target in ["../escape", "docs/../../escape", ".."] {
        let response = env
            .upload("/receive", Some(target), "evil.txt", b"x".to_vec())
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", target);
    }

    let parent = env.root().parent().unwrap();
    assert!(!parent.join("escape").exists());
    assert!(!parent.join("evil.txt").exists());
}

#[tokio::test]
async fn test_directory_blocked_by_file_is_500() {
    let env = E2ETestEnv::new().await;
    std::fs::write(env.root().join("blocker"), b"a regular file").unwrap();

    let response = env
        .upload("/receive", Some("blocker/sub"), "a.txt", b"x".to_vec())
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.text().await.unwrap();
    assert!(body.contains("Error creating parent directory"), "{}", body);
    assert!(!body.contains(env.root().to_str().unwrap()));
    assert_eq!(
        std::fs::read(env.root().join("blocker")).unwrap(),
        b"a regular file"
    );
}

#[tokio::test]
async fn test_file_name_naming_a_directory_is_500() {
    let env = E2ETestEnv::new().await;
    std::fs::create_dir_all(env.root().join("docs/taken")).unwrap();

    let response = env
        .upload("/receive", Some("docs"), "taken", b"x".to_vec())
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Error creating file"));
    assert!(env.root().join("docs/taken").is_dir());
}
