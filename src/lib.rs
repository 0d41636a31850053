//! Fileserver Library
//!
//! Small HTTP file server: static files out of a storage directory, multipart
//! uploads into it, and a rotating log file that is rotated on `SIGHUP`.
//!
//! # Features
//!
//! - **Static Serving**: Files, `index.html`, and plain directory listings
//! - **Uploads**: `multipart/form-data` streamed straight to disk
//! - **Path Safety**: Uploads never land outside the storage root
//! - **Rotating Log**: Size-based rotation plus rotation on demand
//!
//! # Example
//!
//! ```no_run
//! use fileserver::{config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let server = Server::bind(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use logging::RotatingFile;
pub use server::Server;
pub use upload::UploadPipeline;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
