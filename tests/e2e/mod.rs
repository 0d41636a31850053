//! End-to-End Tests for Fileserver
//!
//! Each test gets its own server and storage directory, so tests run in
//! parallel without sharing files.

pub mod common;
pub mod error_scenarios;
pub mod request_log;
pub mod static_files;
pub mod upload_flow;
