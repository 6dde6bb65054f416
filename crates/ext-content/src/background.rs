//! Off-thread content synchronisation.
//!
//! The UI thread hands a provider to [`spawn_update`] and later collects the
//! outcome from the returned ticket, applying it on its own thread. Updates
//! run on the blocking pool of a tokio runtime.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::oneshot::{self, error::TryRecvError};

use crate::provider::ContentProvider;
use crate::{Error, Result};

/// Pending outcome of a background `update`.
#[derive(Debug)]
pub struct SyncTicket {
    target: PathBuf,
    receiver: oneshot::Receiver<Result<bool>>,
}

impl SyncTicket {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Poll for the outcome without blocking.
    ///
    /// Returns `None` while the update is still running.
    pub fn try_complete(&mut self) -> Option<Result<bool>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(Error::WorkerLost)),
        }
    }

    /// Block the calling thread until the update reports.
    ///
    /// Must not be called from inside an async context; use
    /// [`completed`](Self::completed) there.
    pub fn wait(self) -> Result<bool> {
        self.receiver.blocking_recv().unwrap_or(Err(Error::WorkerLost))
    }

    /// Await the outcome.
    pub async fn completed(self) -> Result<bool> {
        self.receiver.await.unwrap_or(Err(Error::WorkerLost))
    }
}

/// Run `provider.update(target)` on the blocking pool of `runtime`.
pub fn spawn_update(
    runtime: &Handle,
    provider: Arc<dyn ContentProvider>,
    target: PathBuf,
) -> SyncTicket {
    let (sender, receiver) = oneshot::channel();
    let worker_target = target.clone();
    runtime.spawn_blocking(move || {
        let update = AssertUnwindSafe(|| provider.update(&worker_target));
        let Ok(outcome) = panic::catch_unwind(update) else {
            // Dropping the sender reports `WorkerLost` to the ticket.
            tracing::error!(target_dir = %worker_target.display(), "content sync worker panicked");
            return;
        };
        if let Err(e) = &outcome {
            tracing::warn!(target_dir = %worker_target.display(), error = %e, "content sync failed");
        }
        // The ticket may have been dropped; nobody is waiting then.
        let _ = sender.send(outcome);
    });

    SyncTicket { target, receiver }
}
