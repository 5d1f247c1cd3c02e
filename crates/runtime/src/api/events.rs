//! Notifications published by the session worker.
use serde::Serialize;

/// Broadcast after each handled request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The engine moved on to a different gate.
    GateReached { gate: String, round: u32 },
    /// One structured log entry, in journal order.
    Logged { tag: String, msg: String },
}
