//! JSON wire format spoken by drivers.
//!
//! A request is one object:
//!
//! ```json
//! {"cmd": "cast", "spell": "fireball", "pos": [4, 2], "gate": "action", "su": false}
//! ```
//!
//! `cmd` selects a [`Command`]; its remaining fields are the command's
//! arguments. `gate` acknowledges the named gate once the command has run.
//! `su` lets an action run outside the action gate without spending energy.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tactics_core::{LogEntry, Pos};

use super::SessionError;

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub su: bool,
    #[serde(flatten)]
    pub args: Map<String, Value>,
}

impl Request {
    pub fn command(cmd: impl Into<String>) -> Self {
        Self {
            cmd: Some(cmd.into()),
            ..Self::default()
        }
    }

    pub fn gate(gate: impl Into<String>) -> Self {
        Self {
            gate: Some(gate.into()),
            ..Self::default()
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Acknowledge `gate` after the command, in the same request.
    pub fn at_gate(mut self, gate: impl Into<String>) -> Self {
        self.gate = Some(gate.into());
        self
    }

    pub fn su(mut self) -> Self {
        self.su = true;
        self
    }

    /// Decode `cmd` and its arguments. No `cmd` is `Ok(None)`.
    pub fn parse(&self) -> Result<Option<Command>, SessionError> {
        let Some(cmd) = &self.cmd else {
            return Ok(None);
        };
        let mut object = self.args.clone();
        object.insert("cmd".into(), Value::String(cmd.clone()));
        serde_json::from_value(Value::Object(object))
            .map(Some)
            .map_err(|e| SessionError::BadRequest {
                cmd: cmd.clone(),
                reason: e.to_string(),
            })
    }
}

/// `[x, y]` on the wire.
pub type WirePos = [i32; 2];

pub fn to_pos([x, y]: WirePos) -> Pos {
    Pos::new(x, y)
}

pub fn from_pos(pos: Pos) -> WirePos {
    [pos.x, pos.y]
}

/// A unit named by id or by (fuzzy) name.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum UnitRef {
    Id(u32),
    Name(String),
}

fn default_amount() -> i32 {
    1
}

fn default_damage_type() -> String {
    "force".to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    // ===== queries =====
    Units,
    Inspect {
        pos: WirePos,
    },
    InspectU {
        #[serde(default)]
        target: Option<UnitRef>,
    },
    Query {
        key: String,
        #[serde(default)]
        target: Option<UnitRef>,
        #[serde(default)]
        arg: Option<String>,
        #[serde(default)]
        against: Option<UnitRef>,
    },
    Facts {
        #[serde(default)]
        target: Option<UnitRef>,
    },

    // ===== setup =====
    Spawn {
        monster: String,
        #[serde(default)]
        pos: Option<WirePos>,
    },
    Grant {
        #[serde(default)]
        fact: Option<String>,
        /// Teach an ability instead of granting a fact.
        #[serde(default)]
        action: Option<String>,
        #[serde(default)]
        target: Option<UnitRef>,
        #[serde(default)]
        duration: Option<u32>,
        #[serde(default)]
        stacks: Option<u32>,
    },
    Revoke {
        fact: String,
        #[serde(default)]
        target: Option<UnitRef>,
        /// Peel this many stacks instead of removing the fact.
        #[serde(default)]
        stacks: Option<u32>,
    },
    Kill {
        target: UnitRef,
    },
    DoDmg {
        target: UnitRef,
        #[serde(default = "default_amount")]
        amount: i32,
        #[serde(rename = "type", default = "default_damage_type")]
        damage_type: String,
    },
    Sethp {
        hp: i32,
        #[serde(default)]
        target: Option<UnitRef>,
    },
    PlaceArea {
        brick: String,
        pos: WirePos,
        #[serde(default)]
        radius: i32,
        #[serde(default)]
        duration: Option<u32>,
        #[serde(default)]
        difficult: bool,
    },
    /// Die faces (1-based) consumed by the next rolls, in order.
    ForceRolls {
        rolls: Vec<u32>,
    },
    Save {
        slot: String,
    },
    Load {
        slot: String,
    },

    // ===== player actions =====
    Move {
        dir: WirePos,
    },
    Attack {
        target: UnitRef,
    },
    Cast {
        spell: String,
        #[serde(default)]
        target: Option<UnitRef>,
        #[serde(default)]
        dir: Option<WirePos>,
        #[serde(default)]
        pos: Option<WirePos>,
    },
    Use {
        ability: String,
    },
    Wait,

    Shutdown,
}

/// How a command interacts with the gate contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Query,
    Setup,
    Action,
    Control,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Units | Self::Inspect { .. } | Self::InspectU { .. } | Self::Query { .. } | Self::Facts { .. } => {
                CommandKind::Query
            }
            Self::Spawn { .. }
            | Self::Grant { .. }
            | Self::Revoke { .. }
            | Self::Kill { .. }
            | Self::DoDmg { .. }
            | Self::Sethp { .. }
            | Self::PlaceArea { .. }
            | Self::ForceRolls { .. }
            | Self::Save { .. }
            | Self::Load { .. } => CommandKind::Setup,
            Self::Move { .. } | Self::Attack { .. } | Self::Cast { .. } | Self::Use { .. } | Self::Wait => {
                CommandKind::Action
            }
            Self::Shutdown => CommandKind::Control,
        }
    }
}

/// One structured log entry as sent to the driver.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LogLine {
    pub tag: String,
    pub msg: String,
    pub data: Value,
}

impl From<LogEntry> for LogLine {
    fn from(entry: LogEntry) -> Self {
        let data = serde_json::to_value(&entry.data).unwrap_or(Value::Null);
        Self {
            tag: entry.tag,
            msg: entry.msg,
            data,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Name of the gate the engine now waits on.
    pub waiting: String,
    pub round: u32,
    /// Player energy, only while waiting on the action gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<i32>,
    /// Player position; absent once the player is gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<WirePos>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plines: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<LogLine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Response {
    pub fn ok(result: Option<Value>) -> Self {
        Self {
            ok: true,
            result,
            ..Self::default()
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Log lines carrying `tag`.
    pub fn tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a LogLine> + 'a {
        self.log.iter().filter(move |l| l.tag == tag)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_command_arguments_from_the_request_object() {
        let request: Request = serde_json::from_value(json!({
            "cmd": "do_dmg", "target": "goblin", "amount": 7, "type": "fire", "gate": "action"
        }))
        .unwrap();
        assert_eq!(request.gate.as_deref(), Some("action"));
        assert_eq!(
            request.parse().unwrap(),
            Some(Command::DoDmg {
                target: UnitRef::Name("goblin".into()),
                amount: 7,
                damage_type: "fire".into(),
            })
        );
    }

    #[test]
    fn defaults_and_gate_only_requests() {
        let request = Request::command("do_dmg").arg("target", 3);
        match request.parse().unwrap() {
            Some(Command::DoDmg { amount, damage_type, target }) => {
                assert_eq!((amount, damage_type.as_str()), (1, "force"));
                assert_eq!(target, UnitRef::Id(3));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(Request::gate("start_round").parse().unwrap(), None);
    }

    #[test]
    fn malformed_commands_are_bad_requests() {
        let unknown = Request::command("dance").parse();
        assert!(matches!(unknown, Err(SessionError::BadRequest { .. })));
        let missing = Request::command("move").parse();
        assert!(matches!(missing, Err(SessionError::BadRequest { .. })));
    }

    #[test]
    fn response_omits_empty_fields() {
        let value = serde_json::to_value(Response {
            waiting: "start_round".into(),
            ..Response::ok(None)
        })
        .unwrap();
        assert_eq!(value, json!({"ok": true, "waiting": "start_round", "round": 0}));
    }
}
