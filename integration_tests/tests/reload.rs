use bevy::prelude::*;
use integration_tests::{
    add_player, add_players, props, scratch_module, start_map, start_round, write_config,
};
use restrictions_core::{
    build_headless_app, CommandOutcome, ConsoleCommandIssued, LastCommandOutcome, PlayerSlot,
    PluginSettings, ReloadReport, ServerOutput, Team, RELOAD_COMMAND,
};

const TWO_AREAS: &str = r#"{
    "MapName": "de_scratch",
    "Restrictions": {
        "Model": "models/props/crate.vmdl",
        "Messages": { "all": { "Message": "Crates placed" } },
        "Areas": {
            "left": { "Origin": "-64 0 0", "Angles": "0 0 0" },
            "right": { "Origin": "64 0 0", "Angles": "0 0 0", "Scale": "2" }
        }
    }
}"#;

const ONE_AREA: &str = r#"{
    "MapName": "de_scratch",
    "Restrictions": {
        "Model": "models/props/crate.vmdl",
        "Areas": { "center": { "Origin": "0 0 0", "Angles": "0 45 0" } }
    }
}"#;

fn issue(app: &mut App, caller: Option<PlayerSlot>) -> Option<CommandOutcome> {
    app.world.send_event(ConsoleCommandIssued {
        caller,
        command: RELOAD_COMMAND.to_string(),
    });
    app.update();
    app.update();
    app.world.resource::<LastCommandOutcome>().0.clone()
}

#[test]
fn server_console_reload_rereads_file() {
    let dir = scratch_module(&[("de_scratch", TWO_AREAS)]).unwrap();
    let mut app = build_headless_app(PluginSettings::with_module_dir(dir.path()), None);
    add_players(&mut app, 1, 1);
    start_map(&mut app, "de_scratch");
    start_round(&mut app);
    assert_eq!(props(&mut app).len(), 2);

    write_config(dir.path(), "de_scratch", ONE_AREA).unwrap();
    let outcome = issue(&mut app, None);

    assert_eq!(
        outcome,
        Some(CommandOutcome::Reloaded(Some(ReloadReport {
            map_name: Some("de_scratch".to_string()),
            areas: 1,
            messages: 0,
        })))
    );
    let output = app.world.resource::<ServerOutput>();
    assert_eq!(
        output.console,
        vec![
            "[MapRestrictions] Reloaded map restrictions for de_scratch, found 1 restrictions and 0 messages"
                .to_string()
        ]
    );

    let remaining = props(&mut app);
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].yaw, 45.0);
    assert_eq!(remaining[0].model.as_deref(), Some("models/props/crate.vmdl"));
}

#[test]
fn admin_reload_replies_to_caller() {
    let dir = scratch_module(&[("de_scratch", TWO_AREAS)]).unwrap();
    let mut app = build_headless_app(PluginSettings::with_module_dir(dir.path()), None);
    let admin = add_player(&mut app, Team::CounterTerrorist, true);
    start_map(&mut app, "de_scratch");

    let outcome = issue(&mut app, Some(admin));
    assert!(matches!(outcome, Some(CommandOutcome::Reloaded(Some(_)))));

    let output = app.world.resource::<ServerOutput>();
    assert!(output.console.is_empty());
    assert_eq!(output.direct.len(), 1);
    assert_eq!(output.direct[0].0, admin);
    assert_eq!(
        output.direct[0].1,
        "MapRestrictions - Reloaded map restrictions for de_scratch, found 2 restrictions and 1 messages"
    );
    assert_eq!(output.chat.len(), 1, "reload re-runs the spawn pass");
    assert_eq!(props(&mut app).len(), 2);
}

#[test]
fn player_without_permission_is_refused() {
    let dir = scratch_module(&[("de_scratch", TWO_AREAS)]).unwrap();
    let mut app = build_headless_app(PluginSettings::with_module_dir(dir.path()), None);
    let player = add_player(&mut app, Team::Terrorist, false);
    start_map(&mut app, "de_scratch");
    start_round(&mut app);

    write_config(dir.path(), "de_scratch", ONE_AREA).unwrap();
    let outcome = issue(&mut app, Some(player));

    assert_eq!(outcome, Some(CommandOutcome::Denied));
    let output = app.world.resource::<ServerOutput>();
    assert_eq!(output.direct.len(), 1);
    assert_eq!(output.direct[0].0, player);
    assert_eq!(props(&mut app).len(), 2);
}

#[test]
fn reload_before_any_map_only_clears() {
    let dir = scratch_module(&[]).unwrap();
    let mut app = build_headless_app(PluginSettings::with_module_dir(dir.path()), None);

    assert_eq!(issue(&mut app, None), Some(CommandOutcome::Reloaded(None)));
    assert!(app.world.resource::<ServerOutput>().console.is_empty());
}

#[test]
fn reload_picks_up_config_created_after_map_start() {
    let dir = scratch_module(&[]).unwrap();
    let mut app = build_headless_app(PluginSettings::with_module_dir(dir.path()), None);
    add_players(&mut app, 1, 0);
    start_map(&mut app, "de_scratch");
    start_round(&mut app);
    assert!(props(&mut app).is_empty());

    write_config(dir.path(), "de_scratch", TWO_AREAS).unwrap();
    issue(&mut app, None);

    assert_eq!(props(&mut app).len(), 2);
}

#[test]
fn reload_to_broken_file_removes_everything() {
    let dir = scratch_module(&[("de_scratch", TWO_AREAS)]).unwrap();
    let mut app = build_headless_app(PluginSettings::with_module_dir(dir.path()), None);
    add_players(&mut app, 2, 0);
    start_map(&mut app, "de_scratch");
    start_round(&mut app);

    write_config(dir.path(), "de_scratch", "{ \"Restrictions\": ").unwrap();
    let outcome = issue(&mut app, None);

    assert_eq!(
        outcome,
        Some(CommandOutcome::Reloaded(Some(ReloadReport {
            map_name: None,
            areas: 0,
            messages: 0,
        })))
    );
    assert!(props(&mut app).is_empty());
}
