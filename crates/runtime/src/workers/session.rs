//! Worker task that owns the [`Session`].
//!
//! Receives commands from [`RuntimeHandle`](crate::api::RuntimeHandle),
//! answers each on its oneshot and publishes [`SessionEvent`]s.
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use tactics_core::SaveGame;

use crate::api::SessionEvent;
use crate::session::{Request, Response, Session};

pub enum Command {
    Handle {
        request: Request,
        reply: oneshot::Sender<Response>,
    },
    HandleJson {
        line: String,
        reply: oneshot::Sender<Response>,
    },
    Status {
        reply: oneshot::Sender<Response>,
    },
    Snapshot {
        reply: oneshot::Sender<SaveGame>,
    },
}

pub struct SessionWorker {
    session: Session,
    command_rx: mpsc::Receiver<Command>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl SessionWorker {
    pub fn new(
        session: Session,
        command_rx: mpsc::Receiver<Command>,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            session,
            command_rx,
            event_tx,
        }
    }

    /// Runs until every handle is dropped or the session is shut down.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(cmd) = self.command_rx.recv() => {
                    self.handle_command(cmd);
                    if self.session.is_closed() {
                        debug!(target: "runtime::worker", "session closed");
                        break;
                    }
                }
                else => break,
            }
        }
        debug!(target: "runtime::worker", round = self.session.state().round, "session worker stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Handle { request, reply } => {
                let response = self.respond(|session| session.handle(request));
                let _ = reply.send(response);
            }
            Command::HandleJson { line, reply } => {
                let response = self.respond(|session| session.handle_json(&line));
                let _ = reply.send(response);
            }
            Command::Status { reply } => {
                let _ = reply.send(self.session.status());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.session.state().to_save());
            }
        }
    }

    fn respond(&mut self, f: impl FnOnce(&mut Session) -> Response) -> Response {
        let before = self.session.gate();
        let response = f(&mut self.session);
        self.publish(before.name(), &response);
        response
    }

    fn publish(&self, gate_before: &str, response: &Response) {
        // no subscribers is fine
        for line in &response.log {
            let _ = self.event_tx.send(SessionEvent::Logged {
                tag: line.tag.clone(),
                msg: line.msg.clone(),
            });
        }
        if response.waiting != gate_before {
            debug!(target: "runtime::worker", from = gate_before, to = %response.waiting, round = response.round, "gate reached");
            let _ = self.event_tx.send(SessionEvent::GateReached {
                gate: response.waiting.clone(),
                round: response.round,
            });
        }
    }
}
