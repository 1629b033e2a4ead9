//! Mining session lifecycle.
//!
//! A [`SessionController`] runs as a single task that owns all session
//! state. Everything that can change that state (user intent, alive polls,
//! worker events) arrives as a [`SessionEvent`] on one bounded channel and
//! is applied to completion before the next is looked at. Producers talk to
//! the controller through a cloneable [`SessionHandle`]; consumers watch
//! [`SessionSnapshot`]s.
//!
//! ```text
//!  user intent ──┐
//!  alive poll  ──┼──► SessionHandle ──► inbox ──► SessionController ──► ProcessControl
//!  event bridge ─┘                                       │
//!                                                        ├──► SettingsStore (reconcile)
//!                                                        └──► watch<SessionSnapshot>
//! ```

mod controller;
mod state;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::log::LogRecord;
use crate::status::{AlivePoll, MinerSummary};

pub use controller::SessionController;
pub use state::{StartMode, WorkingState};

/// Supervisor of the worker process.
///
/// Both calls are fire-and-forget: they must not block, and the session
/// consumes no result. Success or failure shows up later through alive
/// polls.
pub trait ProcessControl: Send + Sync {
    /// Start the worker with the JSON start payload.
    fn start(&self, config: &str);

    /// Stop the worker. Must be safe to call when it isn't running.
    fn stop(&self);
}

/// A listener registration on the worker's event bridge.
///
/// The controller removes every attached subscription when the session
/// ends, before it stops the worker.
pub trait Subscription: Send {
    fn remove(&mut self);
}

/// A forwarding task counts as a subscription; removing it aborts the task.
impl Subscription for JoinHandle<()> {
    fn remove(&mut self) {
        self.abort();
    }
}

/// Events pushed by the worker over the event bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Log lines, newest first.
    Log { log: Vec<String> },

    /// The worker rewrote its configuration (self-tuning).
    ConfigUpdate { config: String },
}

/// Everything the controller reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Intent(StartMode),
    Poll(AlivePoll),
    Worker(WorkerEvent),
}

/// Sending side of a session's inbox.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionEvent>,
}

impl SessionHandle {
    fn new(tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { tx }
    }

    pub async fn set_intent(&self, mode: StartMode) -> Result<()> {
        self.send(SessionEvent::Intent(mode)).await
    }

    pub async fn start(&self) -> Result<()> {
        self.set_intent(StartMode::Start).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.set_intent(StartMode::Stop).await
    }

    pub async fn report_poll(&self, poll: AlivePoll) -> Result<()> {
        self.send(SessionEvent::Poll(poll)).await
    }

    pub async fn worker_event(&self, event: WorkerEvent) -> Result<()> {
        self.send(SessionEvent::Worker(event)).await
    }

    /// Non-waiting variant for bridges that deliver from native callbacks.
    ///
    /// A full inbox fails with [`Error::InboxFull`] and the event is not
    /// delivered; the session is still running. [`Error::SessionClosed`]
    /// means it has ended.
    pub fn try_worker_event(&self, event: WorkerEvent) -> Result<()> {
        self.tx
            .try_send(SessionEvent::Worker(event))
            .map_err(|e| match e {
                TrySendError::Full(_) => Error::InboxFull,
                TrySendError::Closed(_) => Error::SessionClosed,
            })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, event: SessionEvent) -> Result<()> {
        self.tx.send(event).await.map_err(|_| Error::SessionClosed)
    }
}

/// UI-facing view of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub start_mode: StartMode,
    pub working_state: WorkingState,
    pub miner_summary: Option<MinerSummary>,
    /// Oldest first.
    pub hashrate_history: Vec<f64>,
    /// Newest batch first, chronological within a batch. Shared between
    /// snapshots until a new batch arrives.
    pub log: Arc<[LogRecord]>,
}

#[cfg(test)]
pub(crate) fn test_channel(depth: usize) -> (SessionHandle, mpsc::Receiver<SessionEvent>) {
    let (tx, rx) = mpsc::channel(depth);
    (SessionHandle::new(tx), rx)
}
