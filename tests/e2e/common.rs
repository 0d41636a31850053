//! Common E2E Test Infrastructure
//!
//! Provides shared utilities for E2E tests:
//! - Test server management
//! - Upload form helpers

use fileserver::config::{Config, UploadRoute};
use fileserver::server::Server;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// E2E Test Environment
///
/// Owns a running server and the temporary storage root it serves.
pub struct E2ETestEnv {
    pub server_addr: SocketAddr,
    pub client: reqwest::Client,
    storage: TempDir,
    _server_handle: tokio::task::JoinHandle<()>,
}

impl E2ETestEnv {
    /// Create a new E2E test environment with a running server
    pub async fn new() -> Self {
        Self::with_route(UploadRoute::Receive).await
    }

    /// Create an environment whose form posts to the given route
    pub async fn with_route(route: UploadRoute) -> Self {
        let storage = tempfile::tempdir().expect("Failed to create storage dir");

        let mut config = Config::default();
        config.server.address = "127.0.0.1:0".to_string();
        config.server.upload_route = route;
        config.storage.root = storage.path().to_path_buf();

        let server = Server::bind(config).await.expect("Failed to bind server");
        let server_addr = server.local_addr();

        let server_handle = tokio::spawn(async move {
            let _ = server.run_until(std::future::pending()).await;
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build client");

        Self {
            server_addr,
            client,
            storage,
            _server_handle: server_handle,
        }
    }

    /// Get the base URL for the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.server_addr)
    }

    /// Storage root served by the test server
    pub fn root(&self) -> &Path {
        self.storage.path()
    }

    /// Post the upload form with `target_loc` before the file part
    pub async fn upload(
        &self,
        route: &str,
        target: Option<&str>,
        file_name: &str,
        data: Vec<u8>,
    ) -> reqwest::Response {
        let mut form = reqwest::multipart::Form::new();
        if let Some(target) = target {
            form = form.text("target_loc", target.to_string());
        }
        form = form.part(
            "filebrowser",
            reqwest::multipart::Part::bytes(data).file_name(file_name.to_string()),
        );

        self.client
            .post(format!("{}{}", self.base_url(), route))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    /// GET a path and return status and body
    pub async fn get(&self, path: &str) -> (reqwest::StatusCode, Vec<u8>) {
        let response = self
            .client
            .get(format!("{}{}", self.base_url(), path))
            .send()
            .await
            .expect("GET request failed");
        let status = response.status();
        let body = response.bytes().await.expect("Failed to read body").to_vec();
        (status, body)
    }
}

/// Generate test data of specified size
pub fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}
