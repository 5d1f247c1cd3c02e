use std::sync::Arc;

use serde_json::Value;
use tactics_core::{EntityId, GameConfig};
use tactics_runtime::{FileSaveRepository, InMemorySaveRepository, Request, Response, SaveRepository, Session};

fn session() -> Session {
    Session::with_builtin_content(GameConfig::with_seed(7)).unwrap()
}

fn spawn(session: &mut Session, template: &str, pos: [i32; 2]) -> u32 {
    let response = session.handle(Request::command("spawn").arg("monster", template).arg("pos", pos.to_vec()));
    assert!(response.ok, "{response:?}");
    response.result.unwrap()["id"].as_u64().unwrap() as u32
}

fn hp(session: &Session, id: u32) -> i32 {
    session.state().unit(EntityId(id)).unwrap().hp.current
}

fn result(response: &Response) -> &Value {
    response.result.as_ref().unwrap()
}

#[test]
fn gates_are_acknowledged_in_order() {
    let mut session = session();
    let status = session.status();
    assert_eq!((status.waiting.as_str(), status.round), ("start_round", 1));
    assert_eq!(status.pos, Some([5, 5]));

    let early = session.handle(Request::command("wait"));
    assert!(!early.ok);
    assert!(early.error.unwrap().contains("action gate"));
    assert_eq!(early.waiting, "start_round");

    let wrong = session.handle(Request::gate("end_player_turn"));
    assert!(!wrong.ok);

    let action = session.handle(Request::gate("start_round"));
    assert!(action.ok);
    assert_eq!(action.waiting, "action");
    assert_eq!(action.energy, Some(12));

    let waited = session.handle(Request::command("wait"));
    assert!(waited.ok);
    assert_eq!(result(&waited)["taken"], true);
    assert_eq!(waited.waiting, "end_player_turn");
    assert_eq!(waited.energy, None);

    let next = session.handle(Request::gate("end_player_turn"));
    assert_eq!((next.waiting.as_str(), next.round), ("start_round", 2));
}

#[test]
fn wrong_gate_rejects_the_whole_request() {
    let mut session = session();
    let response = session.handle(Request::command("grant").arg("fact", "bless").at_gate("end_player_turn"));
    assert!(!response.ok);
    assert!(response.error.unwrap().contains("start_round"));
    assert!(response.plines.is_empty());
    assert!(response.log.is_empty());
    assert!(!session.state().has_fact(EntityId::PLAYER, "bless"));
    assert_eq!(session.gate().name(), "start_round");

    let granted = session.handle(Request::command("grant").arg("fact", "bless").at_gate("start_round"));
    assert!(granted.ok, "{granted:?}");
    assert!(session.state().has_fact(EntityId::PLAYER, "bless"));
    assert_eq!(granted.waiting, "action");
}

#[test]
fn action_that_leaves_its_gate_is_not_acknowledged_again() {
    let mut session = session();
    session.handle(Request::gate("start_round"));
    let waited = session.handle(Request::command("wait").at_gate("action"));
    assert!(waited.ok, "{waited:?}");
    assert_eq!((waited.waiting.as_str(), waited.round), ("end_player_turn", 1));
}

#[test]
fn setup_and_queries_never_spend_the_turn() {
    let mut session = session();
    session.handle(Request::gate("start_round"));
    let dummy = spawn(&mut session, "dummy", [8, 5]);

    let units = session.handle(Request::command("units"));
    assert_eq!(result(&units)["units"].as_array().unwrap().len(), 2);
    session.handle(Request::command("sethp").arg("hp", 40).arg("target", dummy));
    session.handle(Request::command("inspect").arg("pos", vec![8, 5]));

    let response = session.status();
    assert_eq!(response.waiting, "action");
    assert_eq!(response.energy, Some(12));
    assert_eq!(hp(&session, dummy), 40);
}

#[test]
fn resistance_applies_to_its_own_type_only() {
    let mut session = session();
    let dummy = spawn(&mut session, "dummy", [8, 5]);
    let granted = session.handle(
        Request::command("grant")
            .arg("fact", "energy_res+fire/5")
            .arg("target", dummy),
    );
    assert!(granted.ok, "{granted:?}");

    let fire = session.handle(
        Request::command("do_dmg")
            .arg("target", dummy)
            .arg("amount", 20)
            .arg("type", "fire"),
    );
    assert_eq!(result(&fire)["total"], 15);
    assert_eq!(fire.tagged("damage").count(), 1);

    let cold = session.handle(
        Request::command("do_dmg")
            .arg("target", dummy)
            .arg("amount", 20)
            .arg("type", "cold"),
    );
    assert_eq!(result(&cold)["total"], 20);
    assert_eq!(hp(&session, dummy), 100 - 15 - 20);
}

#[test]
fn fireball_resolves_each_unit_in_the_burst_once() {
    let mut session = session();
    let inside: Vec<u32> = [[8, 5], [9, 5], [8, 6]]
        .into_iter()
        .map(|pos| spawn(&mut session, "dummy", pos))
        .collect();
    let outside = spawn(&mut session, "dummy", [12, 5]);

    session.handle(Request::gate("start_round"));
    let cast = session.handle(Request::command("cast").arg("spell", "fireb").arg("pos", vec![8, 5]));
    assert!(cast.ok, "{cast:?}");
    assert_eq!(result(&cast)["taken"], true);
    assert_eq!(cast.plines.first().map(String::as_str), Some("You cast fireball."));

    assert_eq!(cast.tagged("damage").count(), inside.len());
    for id in inside {
        assert!(hp(&session, id) < 100);
    }
    assert_eq!(hp(&session, outside), 100);
    assert_eq!(cast.waiting, "end_player_turn");
}

#[test]
fn death_is_logged_once() {
    let mut session = session();
    let goblin = spawn(&mut session, "goblin", [9, 9]);

    let killed = session.handle(Request::command("kill").arg("target", goblin));
    assert_eq!(result(&killed)["killed"], true);
    assert_eq!(killed.tagged("death").count(), 1);

    let again = session.handle(Request::command("kill").arg("target", goblin));
    assert_eq!(result(&again)["killed"], false);
    assert_eq!(again.tagged("death").count(), 0);

    let more = session.handle(Request::command("do_dmg").arg("target", goblin).arg("amount", 5));
    assert!(more.ok);
    assert!(more.log.is_empty());
}

#[test]
fn ambiguous_names_are_narrated_and_not_taken() {
    let mut session = session();
    spawn(&mut session, "goblin", [6, 5]);
    spawn(&mut session, "goblin", [4, 5]);
    session.handle(Request::gate("start_round"));

    let attack = session.handle(Request::command("attack").arg("target", "goblin"));
    assert!(attack.ok);
    assert_eq!(result(&attack)["taken"], false);
    assert!(attack.plines[0].starts_with("Which do you mean: goblin #"));
    assert_eq!(attack.energy, Some(12));

    let unknown = session.handle(Request::command("cast").arg("spell", "wish"));
    assert_eq!(unknown.plines, ["You don't know how to wish."]);
    assert_eq!(unknown.waiting, "action");
}

#[test]
fn su_actions_resolve_outside_the_action_gate() {
    let mut session = session();
    let dummy = spawn(&mut session, "dummy", [7, 5]);

    let cast = session.handle(
        Request::command("cast")
            .arg("spell", "magic_missile")
            .arg("target", dummy)
            .su(),
    );
    assert!(cast.ok, "{cast:?}");
    assert_eq!(cast.waiting, "start_round");
    assert!(hp(&session, dummy) < 100);
}

#[test]
fn queries_report_stacked_modifiers() {
    let mut session = session();
    session.handle(Request::command("grant").arg("fact", "bless").arg("duration", 5));

    let query = session.handle(Request::command("query").arg("key", "attack_bonus"));
    let value = result(&query);
    assert_eq!(value["base"], 5);
    assert_eq!(value["value"], 6);
    assert!(!value["breakdown"].as_str().unwrap().is_empty());

    let facts = session.handle(Request::command("facts"));
    let facts = result(&facts)["facts"].as_array().unwrap().clone();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0]["brick"], "bless");
    assert_eq!(facts[0]["remaining"], 5);

    let bad = session.handle(Request::command("query").arg("key", "luck"));
    assert!(!bad.ok);
}

#[test]
fn forced_rolls_are_queued_as_faces() {
    let mut session = session();
    let response = session.handle(Request::command("force_rolls").arg("rolls", vec![20, 1]));
    assert_eq!(result(&response)["queued"], 2);
    assert_eq!(session.state_mut().rng.d(20), 20);
    assert_eq!(session.state_mut().rng.d(20), 1);
}

#[test]
fn saves_round_trip_through_the_registry() {
    let repository = Arc::new(InMemorySaveRepository::new());
    let mut session = session().with_repository(repository.clone());
    let dummy = spawn(&mut session, "dummy", [8, 5]);
    session.handle(Request::command("grant").arg("fact", "bless").arg("stacks", 2).arg("duration", 5));
    session.handle(Request::command("grant").arg("fact", "persistent+acid/d6").arg("target", dummy));

    let saved = session.handle(Request::command("save").arg("slot", "one"));
    assert!(saved.ok, "{saved:?}");
    assert_eq!(result(&saved)["facts"], 2);

    session.handle(Request::command("revoke").arg("fact", "bless"));
    assert!(!session.state().has_fact(EntityId::PLAYER, "bless"));

    let loaded = session.handle(Request::command("load").arg("slot", "one"));
    assert!(loaded.ok, "{loaded:?}");
    let bless = session.state().find_fact(EntityId::PLAYER, "bless").unwrap();
    assert_eq!(bless.stacks(), 2);
    assert!(session.state().has_fact(EntityId(dummy), "persistent+acid/d6"));
}

fn fact_summary(session: &mut Session, target: u32) -> Vec<(String, u64, Value)> {
    let facts = session.handle(Request::command("facts").arg("target", target));
    result(&facts)["facts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| (f["brick"].as_str().unwrap().to_string(), f["stacks"].as_u64().unwrap(), f["remaining"].clone()))
        .collect()
}

fn area_summary(session: &mut Session, pos: [i32; 2]) -> (Vec<(String, Value)>, bool) {
    let inspect = session.handle(Request::command("inspect").arg("pos", pos.to_vec()));
    let value = result(&inspect);
    let areas = value["areas"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| (a["name"].as_str().unwrap().to_string(), a["remaining"].clone()))
        .collect();
    (areas, value["difficult"].as_bool().unwrap())
}

#[test]
fn binary_save_files_restore_facts_and_areas() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session().with_repository(Arc::new(FileSaveRepository::new(dir.path()).unwrap()));
    session.handle(Request::gate("start_round"));
    let dummy = spawn(&mut session, "dummy", [8, 5]);
    session.handle(Request::command("grant").arg("fact", "bless").arg("stacks", 2).arg("duration", 5));
    session.handle(Request::command("grant").arg("fact", "persistent+acid/d6").arg("target", dummy));
    let placed = session.handle(
        Request::command("place_area")
            .arg("brick", "burning_ground")
            .arg("pos", vec![8, 5])
            .arg("duration", 4)
            .arg("difficult", true),
    );
    assert!(placed.ok, "{placed:?}");

    let attack = result(&session.handle(Request::command("query").arg("key", "attack_bonus"))).clone();
    let player_facts = fact_summary(&mut session, 0);
    let dummy_facts = fact_summary(&mut session, dummy);
    let areas = area_summary(&mut session, [8, 5]);
    assert_eq!(areas.0.len(), 1);
    assert!(areas.1);

    let saved = session.handle(Request::command("save").arg("slot", "mid_game"));
    assert!(saved.ok, "{saved:?}");
    assert!(dir.path().join("mid_game.bin").exists());

    let mut restored = self::session().with_repository(Arc::new(FileSaveRepository::new(dir.path()).unwrap()));
    let loaded = restored.handle(Request::command("load").arg("slot", "mid_game"));
    assert!(loaded.ok, "{loaded:?}");

    assert_eq!(restored.status().waiting, "action");
    assert_eq!(result(&restored.handle(Request::command("query").arg("key", "attack_bonus"))), &attack);
    assert_eq!(fact_summary(&mut restored, 0), player_facts);
    assert_eq!(fact_summary(&mut restored, dummy), dummy_facts);
    assert_eq!(area_summary(&mut restored, [8, 5]), areas);
    assert!(restored.state().has_fact(EntityId(dummy), "persistent+acid/d6"));
}

#[test]
fn a_save_with_an_unknown_brick_leaves_the_game_untouched() {
    let repository = Arc::new(InMemorySaveRepository::new());
    let mut session = session().with_repository(repository.clone());
    session.handle(Request::command("grant").arg("fact", "shield").arg("duration", 3));

    let mut save = session.state().to_save();
    save.units[0].facts[0].brick_id = "no_such_brick".into();
    repository.save("broken", &save).unwrap();
    session.handle(Request::command("revoke").arg("fact", "shield"));
    session.handle(Request::command("grant").arg("fact", "heroism").arg("duration", 3));

    let load = session.handle(Request::command("load").arg("slot", "broken"));
    assert!(!load.ok);
    assert!(load.error.unwrap().contains("no_such_brick"));
    assert!(session.state().has_fact(EntityId::PLAYER, "heroism"));
    assert!(!session.state().has_fact(EntityId::PLAYER, "shield"));

    let missing = session.handle(Request::command("load").arg("slot", "nothing"));
    assert!(!missing.ok);
}

#[test]
fn malformed_requests_are_rejected() {
    let mut session = session();
    assert!(!session.handle_json("{not json").ok);
    assert!(!session.handle_json(r#"{"cmd": "teleport"}"#).ok);
    let gate_only = session.handle_json(r#"{"gate": "start_round"}"#);
    assert!(gate_only.ok);
    assert_eq!(gate_only.waiting, "action");
}
