//! HTTP server module
//!
//! Accepts connections and routes requests to the static file server, the
//! upload form and the upload receiver.
//!
//! # Architecture
//!
//! Built on `hyper` and `tokio`:
//! - one task per connection (HTTP/1.1)
//! - no shared mutable state between requests besides the log sink and the
//!   filesystem
//! - optional semaphore bounding concurrent uploads
//!
//! # Example
//!
//! ```no_run
//! use fileserver::config::Config;
//! use fileserver::server::Server;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::default();
//! config.server.address = "127.0.0.1:0".to_string();
//! let server = Server::bind(config).await?;
//! println!("Listening on {}", server.local_addr());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

mod handlers;
pub mod response;
pub mod static_files;

use crate::config::Config;
use crate::upload::UploadPipeline;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),
}

/// State shared by every connection
pub struct AppState {
    pub config: Config,
    pub pipeline: UploadPipeline,
    upload_slots: Option<Arc<Semaphore>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let pipeline = UploadPipeline::new(config.storage.root.clone());
        let upload_slots = config
            .server
            .max_concurrent_uploads
            .map(|n| Arc::new(Semaphore::new(n)));
        Self {
            config,
            pipeline,
            upload_slots,
        }
    }
}

/// HTTP Server
pub struct Server {
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Bind to the configured address
    ///
    /// With port 0 the OS picks a free port; see [`Server::local_addr`].
    pub async fn bind(config: Config) -> Result<Self, ServerError> {
        let addr: SocketAddr = config
            .server
            .address
            .parse()
            .map_err(|e| ServerError::BindError(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        info!(
            "Server bound to {}, serving {}",
            local_addr,
            config.storage.root.display()
        );

        Ok(Self {
            state: Arc::new(AppState::new(config)),
            listener,
            local_addr,
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<(), ServerError> {
        let (tx, rx) = tokio::sync::oneshot::channel::<std::io::Result<()>>();
        tokio::spawn(async move {
            let _ = tx.send(tokio::signal::ctrl_c().await);
        });

        self.run_until(async move {
            match rx.await {
                Ok(Err(e)) => error!("Failed to listen for Ctrl-C: {}", e),
                _ => info!("Received Ctrl-C"),
            }
        })
        .await
    }

    /// Serve until `shutdown` completes
    ///
    /// Stops accepting new connections; connections already accepted are
    /// left to finish on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        info!("Starting server on {}", self.local_addr);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move {
                        Ok::<_, Infallible>(handlers::handle_request(req, peer, state).await)
                    }
                });

                if let Err(e) = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    debug!("Error serving connection from {}: {}", peer, e);
                }
            });
        }

        info!("Shutting down server");
        Ok(())
    }
}
