//! One game driven through the gate contract.
//!
//! [`Session::handle`] takes a [`Request`] and always answers with a
//! [`Response`]. Queries and setup commands run at any gate and never spend a
//! turn. Player actions are accepted only at the action gate, unless the
//! request carries `su`, in which case they resolve immediately and cost
//! nothing. A failed request is `ok: false` and leaves the game as it was.
mod commands;
mod error;
pub mod protocol;

use std::sync::Arc;

use serde_json::Value;
use tactics_content::{LoadError, TemplateBook};
use tactics_core::{
    ActorPolicy, BrickRegistry, EntityId, Faction, GameConfig, GameError, GameState, Gate, Pos,
    Scheduler, SchedulerError, UnitSpec, scheduler,
};

pub use error::SessionError;
pub use protocol::{Command, CommandKind, LogLine, Request, Response, UnitRef};

use crate::repository::SaveRepository;

pub type Result<T> = std::result::Result<T, SessionError>;

pub struct Session {
    state: GameState,
    registry: Arc<BrickRegistry>,
    scheduler: Scheduler,
    templates: TemplateBook,
    repository: Option<Arc<dyn SaveRepository>>,
    closed: bool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("round", &self.state.round)
            .field("gate", &self.state.gate)
            .field("templates", &self.templates.len())
            .field("repository", &self.repository.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Session {
    pub const PLAYER_START: Pos = Pos::new(5, 5);

    /// A fresh game with the book's `player` template at [`Self::PLAYER_START`].
    pub fn new(config: GameConfig, templates: TemplateBook, registry: Arc<BrickRegistry>) -> Self {
        let player = templates.get("player").cloned().unwrap_or_else(|_| {
            UnitSpec::new("player", config.player_hp).with_faction(Faction::Player)
        });
        let mut state = GameState::new(config, Arc::clone(&registry));
        state.spawn_player(&player, Self::PLAYER_START);
        // spawning may narrate; a new game starts with an empty journal
        state.journal.clear();

        tracing::info!(
            target: "runtime::session",
            seed = state.config.seed,
            templates = templates.len(),
            "session started"
        );
        Self {
            state,
            registry,
            scheduler: Scheduler::default(),
            templates,
            repository: None,
            closed: false,
        }
    }

    /// Built-in templates and bricks.
    pub fn with_builtin_content(config: GameConfig) -> std::result::Result<Self, LoadError> {
        let templates = TemplateBook::builtin();
        let registry = tactics_content::registry(&templates)?;
        Ok(Self::new(config, templates, registry))
    }

    pub fn with_repository(mut self, repository: Arc<dyn SaveRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_policy(mut self, policy: Box<dyn ActorPolicy>) -> Self {
        self.scheduler.set_policy(policy);
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn registry(&self) -> &Arc<BrickRegistry> {
        &self.registry
    }

    pub fn templates(&self) -> &TemplateBook {
        &self.templates
    }

    pub fn gate(&self) -> Gate {
        self.state.gate
    }

    /// True after a `shutdown` request.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Where the game stands, without doing anything.
    pub fn status(&mut self) -> Response {
        self.finish(Response::ok(None))
    }

    /// Parse one JSON line and handle it. Malformed JSON is a rejected request.
    pub fn handle_json(&mut self, line: &str) -> Response {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                tracing::warn!(target: "runtime::session", error = %e, "unreadable request");
                self.finish(Response::rejected(format!("unreadable request: {e}")))
            }
        }
    }

    pub fn handle(&mut self, request: Request) -> Response {
        let response = match self.dispatch(&request) {
            Ok(result) => Response::ok(result),
            Err(e) => {
                tracing::warn!(
                    target: "runtime::session",
                    cmd = request.cmd.as_deref().unwrap_or("-"),
                    code = e.error_code(),
                    severity = e.severity().as_str(),
                    error = %e,
                    "request rejected"
                );
                Response::rejected(e.to_string())
            }
        };
        self.finish(response)
    }

    /// The gate is checked before the command runs, so a wrong gate rejects
    /// the whole request. An action that already left the named gate is not
    /// acknowledged twice.
    fn dispatch(&mut self, request: &Request) -> Result<Option<Value>> {
        let command = request.parse()?;
        if let Some(gate) = &request.gate {
            scheduler::expect_gate(&self.state, gate)?;
        }
        let result = match command {
            Some(command) => {
                tracing::debug!(target: "runtime::session", ?command, su = request.su, "command");
                self.run(command, request.su)?
            }
            None => None,
        };
        if let Some(gate) = &request.gate {
            if self.state.gate.name() == gate.as_str() {
                let reached = self.scheduler.acknowledge(&mut self.state, gate)?;
                tracing::debug!(target: "runtime::session", acknowledged = %gate, %reached, "gate");
            }
        }
        Ok(result)
    }

    fn run(&mut self, command: Command, su: bool) -> Result<Option<Value>> {
        match command.kind() {
            CommandKind::Query => self.query_command(command).map(Some),
            CommandKind::Setup => self.setup_command(command),
            CommandKind::Action => self.act(command, su),
            CommandKind::Control => {
                self.closed = true;
                tracing::info!(target: "runtime::session", round = self.state.round, "shutdown requested");
                Ok(None)
            }
        }
    }

    fn act(&mut self, command: Command, su: bool) -> Result<Option<Value>> {
        if !su {
            match self.state.gate {
                Gate::Action { .. } => {}
                Gate::GameOver => return Err(SchedulerError::GameOver.into()),
                gate => return Err(SchedulerError::NotActionGate { gate }.into()),
            }
        }
        let Some(action) = self.action_command(command)? else {
            return Ok(Some(serde_json::json!({ "taken": false })));
        };
        let outcome = if su {
            tactics_core::action::perform(&mut self.state, EntityId::PLAYER, action)
        } else {
            self.scheduler.submit(&mut self.state, action)?
        };
        Ok(Some(commands::outcome_json(&outcome)))
    }

    fn finish(&mut self, mut response: Response) -> Response {
        response.waiting = self.state.gate.name().to_string();
        response.round = self.state.round;
        if let Gate::Action { energy } = self.state.gate {
            response.energy = Some(energy);
        }
        response.pos = self.state.player().map(|p| protocol::from_pos(p.pos));
        let (plines, entries) = self.state.journal.drain();
        response.plines = plines;
        response.log = entries.into_iter().map(LogLine::from).collect();
        response
    }
}
