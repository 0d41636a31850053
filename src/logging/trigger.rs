//! Rotation triggers
//!
//! A trigger is any async event source that asks the log sink to rotate.
//! Production uses SIGHUP; tests and embedders use a channel.

use super::rotating::{Rotation, RotatingFile};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Source of rotation requests
#[async_trait]
pub trait RotationTrigger: Send {
    /// Wait for the next request. Returns `false` once the source is closed.
    async fn triggered(&mut self) -> bool;
}

/// Rotates on SIGHUP
#[cfg(unix)]
pub struct HangupSignal {
    signal: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl HangupSignal {
    /// Install the SIGHUP handler. Must be called inside a tokio runtime.
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            signal: signal(SignalKind::hangup())?,
        })
    }
}

#[cfg(unix)]
#[async_trait]
impl RotationTrigger for HangupSignal {
    async fn triggered(&mut self) -> bool {
        self.signal.recv().await.is_some()
    }
}

/// Rotates whenever a message arrives on the paired [`RotationHandle`]
pub struct ChannelTrigger {
    rx: mpsc::Receiver<()>,
}

/// Sending side of a [`ChannelTrigger`]
#[derive(Clone)]
pub struct RotationHandle {
    tx: mpsc::Sender<()>,
}

impl ChannelTrigger {
    /// Create a trigger and the handle that fires it
    pub fn pair() -> (RotationHandle, Self) {
        let (tx, rx) = mpsc::channel(8);
        (RotationHandle { tx }, Self { rx })
    }
}

impl RotationHandle {
    /// Request a rotation. Returns `false` if the rotation task has stopped.
    pub async fn request(&self) -> bool {
        self.tx.send(()).await.is_ok()
    }
}

#[async_trait]
impl RotationTrigger for ChannelTrigger {
    async fn triggered(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

/// Run `sink.rotate()` every time `trigger` fires, until it closes
pub fn spawn_rotation_task<T>(sink: RotatingFile, mut trigger: T) -> JoinHandle<()>
where
    T: RotationTrigger + 'static,
{
    tokio::spawn(async move {
        while trigger.triggered().await {
            match sink.rotate() {
                Ok(Rotation::Archived(archive)) => {
                    info!(archive = %archive.display(), "Rotated log file");
                }
                Ok(Rotation::Skipped) => {
                    info!("Log rotation requested but the log file is empty");
                }
                Err(e) => {
                    warn!(error = %e, "Log rotation failed, keeping current file");
                }
            }
        }
    })
}
