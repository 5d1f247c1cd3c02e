//! Cloneable façade for talking to the session worker.
//!
//! [`RuntimeHandle`] hides the channel plumbing: every call sends a command
//! over mpsc and awaits the worker's oneshot reply.
use tokio::sync::{broadcast, mpsc, oneshot};

use tactics_core::SaveGame;

use super::errors::{Result, RuntimeError};
use super::events::SessionEvent;
use crate::session::{Request, Response};
use crate::workers::Command;

#[derive(Clone, Debug)]
pub struct RuntimeHandle {
    command_tx: mpsc::Sender<Command>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl RuntimeHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_tx: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            command_tx,
            event_tx,
        }
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(make(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Handle one protocol request.
    pub async fn request(&self, request: Request) -> Result<Response> {
        self.call(|reply| Command::Handle { request, reply }).await
    }

    /// Handle one raw JSON line, as the monitor binary does.
    pub async fn request_json(&self, line: String) -> Result<Response> {
        self.call(|reply| Command::HandleJson { line, reply }).await
    }

    /// Current gate and any pending narration, without a command.
    pub async fn status(&self) -> Result<Response> {
        self.call(|reply| Command::Status { reply }).await
    }

    /// Snapshot of the game as it would be saved.
    pub async fn snapshot(&self) -> Result<SaveGame> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    /// Gate changes and log entries, as they happen.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }
}
