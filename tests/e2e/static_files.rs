//! E2E Static File Tests

use super::common::E2ETestEnv;
use reqwest::StatusCode;

#[tokio::test]
async fn test_directory_listing_shows_entries() {
    let env = E2ETestEnv::new().await;
    std::fs::create_dir(env.root().join("docs")).unwrap();
    std::fs::write(env.root().join("readme.txt"), b"hi").unwrap();

    let (status, body) = env.get("/").await;
    assert_eq!(status, StatusCode::OK);

    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<pre>"));
    assert!(html.contains("href=\"docs/\""));
    assert!(html.contains("href=\"readme.txt\""));
}

#[tokio::test]
async fn test_index_html_served_for_directory() {
    let env = E2ETestEnv::new().await;
    std::fs::create_dir(env.root().join("site")).unwrap();
    std::fs::write(env.root().join("site/index.html"), b"<p>site</p>").unwrap();

    let (status, body) = env.get("/site/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"<p>site</p>");
}

#[tokio::test]
async fn test_directory_redirects_to_trailing_slash() {
    let env = E2ETestEnv::new().await;
    std::fs::create_dir(env.root().join("docs")).unwrap();

    let response = env
        .client
        .get(format!("{}/docs", env.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers()["location"], "/docs/");
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let env = E2ETestEnv::new().await;

    let (status, _) = env.get("/missing.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_head_has_length_but_no_body() {
    let env = E2ETestEnv::new().await;
    std::fs::write(env.root().join("a.txt"), b"0123456789").unwrap();

    let response = env
        .client
        .head(format!("{}/a.txt", env.base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-length"], "10");
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_encoded_traversal_stays_in_root() {
    let env = E2ETestEnv::new().await;
    std::fs::write(env.root().join("passwd"), b"inside").unwrap();

    let (status, body) = env.get("/%2e%2e/%2e%2e/passwd").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"inside");
}
