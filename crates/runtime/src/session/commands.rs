use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Value, json};
use tactics_core::effects::strike;
use tactics_core::{
    ActionCommand, ActionOutcome, Answer, AreaSpec, CommandTarget, DamageComponent, DamageType,
    DiceFormula, EntityId, GameState, Query, QueryKey, Target, Unit,
};

use super::protocol::{Command, UnitRef, from_pos, to_pos};
use super::{Result, Session, SessionError};
use crate::lookup::{Match, fuzzy_match, which_line};

/// How far from the requested tile `spawn` may look for room.
const SPAWN_SEARCH_RADIUS: i32 = 3;

pub(super) fn outcome_json(outcome: &ActionOutcome) -> Value {
    match outcome {
        ActionOutcome::Taken { cost } => json!({ "taken": true, "cost": cost.0 }),
        ActionOutcome::NoEffect(reason) => json!({ "taken": false, "reason": reason }),
    }
}

fn unit_json(unit: &Unit) -> Value {
    json!({
        "id": unit.id.0,
        "name": unit.name,
        "template": unit.template,
        "pos": from_pos(unit.pos),
        "hp": unit.hp.current,
        "hp_max": unit.hp.max,
        "player": unit.is_player(),
    })
}

fn unit_detail_json(state: &GameState, unit: &Unit) -> Value {
    let mut value = unit_json(unit);
    if let Value::Object(map) = &mut value {
        map.insert("temp_hp".into(), unit.hp.temp.into());
        map.insert("energy".into(), unit.energy.into());
        map.insert("faction".into(), unit.faction.to_string().into());
        map.insert("dead".into(), unit.dead.into());
        map.insert("tags".into(), json!(unit.tags));
        map.insert("abilities".into(), json!(unit.abilities));
        map.insert("facts".into(), json!(state.buff_names(unit.id)));
    }
    value
}

/// Turns raw die faces into the generator script: face `f` on any die comes up `f`.
fn script_from_faces(faces: &[u32]) -> Vec<u32> {
    faces.iter().map(|f| f.saturating_sub(1)).collect()
}

impl Session {
    /// `Some(id)` for a live match; ambiguity is narrated and yields `None`.
    fn find_unit(&mut self, unit: &UnitRef) -> Result<Option<EntityId>> {
        match unit {
            UnitRef::Id(n) => {
                let id = EntityId(*n);
                self.state
                    .unit(id)
                    .map(|u| Some(u.id))
                    .ok_or(SessionError::UnknownUnit(id))
            }
            UnitRef::Name(name) => {
                if matches!(name.to_lowercase().as_str(), "you" | "me" | "player") {
                    return Ok(Some(EntityId::PLAYER));
                }
                let candidates: Vec<(String, EntityId)> = self
                    .state
                    .units()
                    .filter(|u| u.is_alive())
                    .map(|u| (format!("{} {}", u.name, u.id), u.id))
                    .collect();
                match fuzzy_match(name, candidates) {
                    Match::Found(id) => Ok(Some(id)),
                    Match::Ambiguous(names) => {
                        self.state.journal.pline(which_line(&names));
                        Ok(None)
                    }
                    Match::NotFound => Err(SessionError::NoSuchName(name.clone())),
                }
            }
        }
    }

    fn target_or_player(&mut self, target: Option<&UnitRef>) -> Result<Option<EntityId>> {
        match target {
            Some(unit) => self.find_unit(unit),
            None => Ok(Some(EntityId::PLAYER)),
        }
    }

    pub(super) fn query_command(&mut self, command: Command) -> Result<Value> {
        match command {
            Command::Units => {
                let units: Vec<Value> = self.state.units().filter(|u| u.is_alive()).map(unit_json).collect();
                Ok(json!({ "units": units }))
            }
            Command::Inspect { pos } => {
                let pos = to_pos(pos);
                let unit = self
                    .state
                    .unit_at(pos)
                    .and_then(|id| self.state.unit(id))
                    .map(|u| unit_detail_json(&self.state, u));
                let round = self.state.round;
                let areas: Vec<Value> = self
                    .state
                    .areas_at(pos)
                    .into_iter()
                    .filter_map(|id| self.state.area(id))
                    .map(|a| json!({ "id": a.id.0, "name": a.name, "remaining": a.remaining_rounds(round) }))
                    .collect();
                Ok(json!({
                    "pos": from_pos(pos),
                    "unit": unit,
                    "areas": areas,
                    "difficult": self.state.is_difficult_terrain(pos),
                }))
            }
            Command::InspectU { target } => {
                let Some(id) = self.target_or_player(target.as_ref())? else {
                    return Ok(Value::Null);
                };
                let unit = self.state.unit(id).ok_or(SessionError::UnknownUnit(id))?;
                Ok(unit_detail_json(&self.state, unit))
            }
            Command::Query {
                key,
                target,
                arg,
                against,
            } => {
                let query_key = QueryKey::from_str(&key.to_lowercase())
                    .map_err(|_| SessionError::UnknownQueryKey(key.clone()))?;
                let Some(id) = self.target_or_player(target.as_ref())? else {
                    return Ok(Value::Null);
                };
                let against = match against {
                    Some(other) => self.find_unit(&other)?,
                    None => None,
                };
                let unit = self.state.unit(id).ok_or(SessionError::UnknownUnit(id))?;
                let base = unit.stats.base_for(query_key);

                let mut query = Query::new(query_key).against(against);
                if let Some(arg) = arg.as_deref() {
                    query = query.arg(arg);
                }
                let mods = self.state.query_modifiers(id, query);
                let flag = self
                    .state
                    .answers(id, query)
                    .iter()
                    .any(|a| matches!(a, Answer::Flag(true)));
                Ok(json!({
                    "key": query_key.as_ref(),
                    "base": base,
                    "value": base + mods.calculate(),
                    "breakdown": mods.to_string(),
                    "flag": flag,
                }))
            }
            Command::Facts { target } => {
                let Some(id) = self.target_or_player(target.as_ref())? else {
                    return Ok(Value::Null);
                };
                let round = self.state.round;
                let facts: Vec<Value> = self
                    .state
                    .facts(id)
                    .map(|f| {
                        json!({
                            "id": f.id().0,
                            "brick": f.brick_id(),
                            "name": f.brick().display_name(),
                            "stacks": f.stacks(),
                            "remaining": f.remaining_rounds(round),
                            "data": serde_json::to_value(&f.data).unwrap_or(Value::Null),
                        })
                    })
                    .collect();
                Ok(json!({ "unit": id.0, "facts": facts }))
            }
            other => Err(SessionError::BadRequest {
                cmd: format!("{other:?}"),
                reason: "not a query".into(),
            }),
        }
    }

    pub(super) fn setup_command(&mut self, command: Command) -> Result<Option<Value>> {
        match command {
            Command::Spawn { monster, pos } => {
                let names: Vec<(String, String)> = self
                    .templates
                    .names()
                    .filter(|n| *n != "player")
                    .map(|n| (n.to_string(), n.to_string()))
                    .collect();
                let template = match fuzzy_match(&monster, names) {
                    Match::Found(name) => name,
                    Match::Ambiguous(names) => {
                        self.state.journal.pline(which_line(&names));
                        return Ok(None);
                    }
                    Match::NotFound => {
                        return Err(tactics_content::LoadError::UnknownTemplate(monster).into());
                    }
                };
                let spec = self.templates.get(&template)?.clone();
                let near = match pos {
                    Some(p) => to_pos(p),
                    None => self.state.player().map_or(Self::PLAYER_START, |p| p.pos),
                };
                let at = self
                    .state
                    .free_tile_near(near, SPAWN_SEARCH_RADIUS)
                    .ok_or_else(|| SessionError::NoRoom(template.clone()))?;
                let id = self
                    .state
                    .spawn_unit(&spec, at)
                    .ok_or_else(|| SessionError::NoRoom(template.clone()))?;
                let unit = self.state.unit(id).ok_or(SessionError::UnknownUnit(id))?;
                Ok(Some(unit_json(unit)))
            }
            Command::Grant {
                fact,
                action,
                target,
                duration,
                stacks,
            } => {
                let Some(id) = self.target_or_player(target.as_ref())? else {
                    return Ok(None);
                };
                if self.state.unit(id).is_none() {
                    return Err(SessionError::UnknownUnit(id));
                }
                if let Some(ability) = action {
                    self.registry
                        .resolve_action(&ability)
                        .map_err(|e| SessionError::brick(&ability, e))?;
                    if let Some(unit) = self.state.unit_mut(id)
                        && !unit.abilities.contains(&ability)
                    {
                        unit.abilities.push(ability.clone());
                    }
                    return Ok(Some(json!({ "unit": id.0, "ability": ability })));
                }
                let brick_id = fact.ok_or(SessionError::NothingToGrant)?;
                let brick = self
                    .registry
                    .resolve(&brick_id)
                    .map_err(|e| SessionError::brick(&brick_id, e))?;
                let granted = self.state.with_resolution(None, Target::Unit(id), |state, _| {
                    state.add_fact(id, Arc::clone(&brick), duration, stacks.unwrap_or(1))
                });
                Ok(Some(json!({ "unit": id.0, "fact": granted.map(|f| f.0) })))
            }
            Command::Revoke { fact, target, stacks } => {
                let Some(id) = self.target_or_player(target.as_ref())? else {
                    return Ok(None);
                };
                let removed = self.state.with_resolution(None, Target::Unit(id), |state, _| match stacks {
                    Some(n) => state.remove_stack(id, &fact, n),
                    None => match state.find_fact(id, &fact).map(|f| f.fact_ref()) {
                        Some(fact_ref) => state.remove_fact(fact_ref),
                        None => false,
                    },
                });
                if !removed {
                    return Err(SessionError::NoSuchFact {
                        unit: id,
                        brick_id: fact,
                    });
                }
                Ok(Some(json!({ "unit": id.0, "removed": fact })))
            }
            Command::Kill { target } => {
                let Some(id) = self.find_unit(&target)? else {
                    return Ok(None);
                };
                let killer = (!id.is_player()).then_some(EntityId::PLAYER);
                let killed = self.state.kill(id, killer);
                Ok(Some(json!({ "unit": id.0, "killed": killed })))
            }
            Command::DoDmg {
                target,
                amount,
                damage_type,
            } => {
                let Some(id) = self.find_unit(&target)? else {
                    return Ok(None);
                };
                let damage_type = DamageType::from_str(&damage_type.to_lowercase())
                    .map_err(|_| SessionError::UnknownDamageType(damage_type.clone()))?;
                let component = DamageComponent::new(DiceFormula::flat(amount), damage_type);
                let report = strike(&mut self.state, None, id, vec![component], None, "do_dmg");
                let total = report.as_ref().map(|r| r.total);
                let killed = report.is_some_and(|r| r.killed);
                Ok(Some(json!({ "unit": id.0, "total": total, "killed": killed })))
            }
            Command::Sethp { hp, target } => {
                let Some(id) = self.target_or_player(target.as_ref())? else {
                    return Ok(None);
                };
                if !self.state.set_hp(id, hp) {
                    return Err(SessionError::UnknownUnit(id));
                }
                Ok(Some(json!({ "unit": id.0, "hp": hp })))
            }
            Command::PlaceArea {
                brick,
                pos,
                radius,
                duration,
                difficult,
            } => {
                let resolved = self
                    .registry
                    .resolve(&brick)
                    .map_err(|e| SessionError::brick(&brick, e))?;
                let mut spec = AreaSpec::burst(resolved, to_pos(pos), radius.max(0));
                if let Some(rounds) = duration {
                    spec = spec.lasting(rounds);
                }
                spec.difficult_terrain = difficult;
                let area = self.state.place_area(spec);
                Ok(Some(json!({ "area": area.0 })))
            }
            Command::ForceRolls { rolls } => {
                self.state.rng.push_script(script_from_faces(&rolls));
                Ok(Some(json!({ "queued": self.state.rng.scripted_len() })))
            }
            Command::Save { slot } => {
                let repository = self.repository.clone().ok_or(SessionError::NoRepository)?;
                let save = self.state.to_save();
                repository.save(&slot, &save)?;
                tracing::info!(target: "runtime::session", slot = %slot, round = save.round, facts = save.fact_count(), "game saved");
                Ok(Some(json!({ "slot": slot, "units": save.units.len(), "facts": save.fact_count() })))
            }
            Command::Load { slot } => {
                let repository = self.repository.clone().ok_or(SessionError::NoRepository)?;
                let save = repository
                    .load(&slot)?
                    .ok_or_else(|| SessionError::EmptySlot(slot.clone()))?;
                let restored = GameState::from_save(&save, Arc::clone(&self.registry))?;
                self.state = restored;
                tracing::info!(target: "runtime::session", slot = %slot, round = save.round, "game loaded");
                Ok(Some(json!({ "slot": slot, "units": save.units.len(), "facts": save.fact_count() })))
            }
            other => Err(SessionError::BadRequest {
                cmd: format!("{other:?}"),
                reason: "not a setup command".into(),
            }),
        }
    }

    /// Translate a player action. Names that do not pick out one thing are
    /// narrated and the action is not taken.
    pub(super) fn action_command(&mut self, command: Command) -> Result<Option<ActionCommand>> {
        let action = match command {
            Command::Move { dir } => ActionCommand::Move(to_pos(dir)),
            Command::Wait => ActionCommand::Wait,
            Command::Attack { target } => match self.named_target(&target)? {
                Some(id) => ActionCommand::Attack(id),
                None => return Ok(None),
            },
            Command::Cast { spell, target, dir, pos } => {
                let Some(ability) = self.known_ability(&spell) else {
                    return Ok(None);
                };
                let target = if let Some(p) = pos {
                    CommandTarget::Pos(to_pos(p))
                } else if let Some(unit) = target {
                    match self.named_target(&unit)? {
                        Some(id) => CommandTarget::Unit(id),
                        None => return Ok(None),
                    }
                } else if let Some(d) = dir {
                    CommandTarget::Dir(to_pos(d))
                } else {
                    CommandTarget::None
                };
                ActionCommand::Cast { ability, target }
            }
            Command::Use { ability } => match self.known_ability(&ability) {
                Some(ability) => ActionCommand::Use { ability },
                None => return Ok(None),
            },
            other => {
                return Err(SessionError::BadRequest {
                    cmd: format!("{other:?}"),
                    reason: "not an action".into(),
                });
            }
        };
        Ok(Some(action))
    }

    /// Like [`Self::find_unit`], but a name nobody answers to is narrated.
    fn named_target(&mut self, unit: &UnitRef) -> Result<Option<EntityId>> {
        match self.find_unit(unit) {
            Err(SessionError::NoSuchName(name)) => {
                self.state.journal.pline(format!("There is no {name} here."));
                Ok(None)
            }
            other => other,
        }
    }

    fn known_ability(&mut self, name: &str) -> Option<String> {
        let known: Vec<(String, String)> = self
            .state
            .player()
            .map(|p| p.abilities.iter().map(|a| (a.clone(), a.clone())).collect())
            .unwrap_or_default();
        match fuzzy_match(name, known) {
            Match::Found(ability) => Some(ability),
            Match::Ambiguous(names) => {
                self.state.journal.pline(which_line(&names));
                None
            }
            Match::NotFound => {
                self.state.journal.pline(format!("You don't know how to {name}."));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faces_map_to_the_same_faces() {
        assert_eq!(script_from_faces(&[20, 1, 0]), [19, 0, 0]);
    }
}
