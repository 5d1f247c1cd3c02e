use tactics_core::GameConfig;
use tactics_runtime::{
    Request, Runtime, RuntimeConfig, RuntimeError, SaveFormat, SessionEvent, Session,
};

fn config() -> RuntimeConfig {
    RuntimeConfig {
        game_config: GameConfig::with_seed(11),
        ..RuntimeConfig::default()
    }
}

#[tokio::test]
async fn handle_round_trips_requests_and_publishes_gates() {
    let config = config();
    let session = Session::with_builtin_content(config.game_config.clone()).unwrap();
    let runtime = Runtime::start(&config, session);
    let handle = runtime.handle();
    let mut events = handle.subscribe();

    let status = handle.status().await.unwrap();
    assert_eq!(status.waiting, "start_round");

    let response = handle.request(Request::gate("start_round")).await.unwrap();
    assert_eq!(response.waiting, "action");
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::GateReached {
            gate: "action".into(),
            round: 1,
        }
    );

    let hit = handle
        .request_json(r#"{"cmd": "do_dmg", "target": "you", "amount": 3}"#.to_string())
        .await
        .unwrap();
    assert!(hit.ok, "{hit:?}");
    assert!(matches!(
        events.try_recv().unwrap(),
        SessionEvent::Logged { ref tag, .. } if tag == "damage"
    ));

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.units[0].unit.hp.current, 30 - 3);

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_request_stops_the_worker() {
    let config = config();
    let session = Session::with_builtin_content(config.game_config.clone()).unwrap();
    let runtime = Runtime::start(&config, session);
    let handle = runtime.handle();

    let bye = handle.request(Request::command("shutdown")).await.unwrap();
    assert!(bye.ok);
    runtime.shutdown().await.unwrap();

    assert!(matches!(
        handle.status().await,
        Err(RuntimeError::CommandChannelClosed)
    ));
}

#[tokio::test]
async fn configured_sessions_save_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = RuntimeConfig {
        save_dir: dir.path().to_path_buf(),
        save_format: SaveFormat::Json,
        ..config()
    };
    let runtime = Runtime::from_config(&config).unwrap();
    let handle = runtime.handle();

    let saved = handle
        .request(Request::command("save").arg("slot", "autosave"))
        .await
        .unwrap();
    assert!(saved.ok, "{saved:?}");
    assert!(dir.path().join("autosave.json").exists());

    handle
        .request(Request::command("sethp").arg("hp", 4))
        .await
        .unwrap();
    let loaded = handle
        .request(Request::command("load").arg("slot", "autosave"))
        .await
        .unwrap();
    assert!(loaded.ok, "{loaded:?}");
    assert_eq!(handle.snapshot().await.unwrap().units[0].unit.hp.current, 30);

    drop(handle);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn bundled_content_directory_loads() {
    let dir = tempfile::tempdir().unwrap();
    let config = RuntimeConfig {
        save_dir: dir.path().to_path_buf(),
        data_dir: Some(tactics_content::ContentFactory::bundled().data_dir().to_path_buf()),
        ..config()
    };
    let runtime = Runtime::from_config(&config).unwrap();
    let handle = runtime.handle();

    let spawned = handle
        .request(Request::command("spawn").arg("monster", "shaman"))
        .await
        .unwrap();
    assert!(spawned.ok, "{spawned:?}");
    assert_eq!(spawned.result.unwrap()["template"], "goblin_shaman");

    drop(handle);
    runtime.shutdown().await.unwrap();
}
