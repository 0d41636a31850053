//! Logging: rotating log file, rotation triggers, subscriber setup
//!
//! The log file is the audit trail of the server, so opening it is the first
//! thing `main` does and a failure there stops the process.
//!
//! # Example
//!
//! ```no_run
//! use fileserver::logging::{self, LogFormat, RotatingFile, RotationPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sink = RotatingFile::open("./logs/fileserver.log", RotationPolicy::default())?;
//! logging::init_subscriber(sink.clone(), "info", LogFormat::Text, false)?;
//!
//! #[cfg(unix)]
//! logging::spawn_rotation_task(sink, logging::HangupSignal::install()?);
//! # Ok(())
//! # }
//! ```

pub mod rotating;
pub mod subscriber;
pub mod trigger;

use thiserror::Error;

pub use rotating::{LogSinkError, Rotation, RotatingFile, RotationPolicy};
pub use subscriber::{init_subscriber, LogFormat};
#[cfg(unix)]
pub use trigger::HangupSignal;
pub use trigger::{spawn_rotation_task, ChannelTrigger, RotationHandle, RotationTrigger};

/// Logging setup errors
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error(transparent)]
    Sink(#[from] LogSinkError),

    #[error("Subscriber error: {0}")]
    Subscriber(String),
}
