//! Shared helpers for end-to-end scenarios against the headless host.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use bevy::prelude::*;
use restrictions_core::{
    build_headless_app, ConnectionState, GameRulesProxy, MapStarted, Player, PlayerSlot,
    PluginSettings, Prop, PropPlacement, PropScale, RoundStarted, ServerOutput, Team,
    CONFIG_SUBDIR,
};
use serde::Serialize;

/// Module directory with the checked-in fixture configs.
pub fn fixture_module_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("module")
}

/// Scratch module directory seeded with `configs`.
pub fn scratch_module(configs: &[(&str, &str)]) -> Result<tempfile::TempDir> {
    let dir = tempfile::tempdir().context("creating scratch module dir")?;
    fs::create_dir_all(dir.path().join(CONFIG_SUBDIR))?;
    for (map, body) in configs {
        write_config(dir.path(), map, body)?;
    }
    Ok(dir)
}

pub fn write_config(module_dir: &Path, map: &str, body: &str) -> Result<()> {
    let path = module_dir.join(CONFIG_SUBDIR).join(format!("{map}.json"));
    fs::write(&path, body).with_context(|| format!("writing {}", path.display()))
}

/// App on no map yet, using the fixture module directory.
pub fn fixture_app() -> App {
    build_headless_app(PluginSettings::with_module_dir(fixture_module_dir()), None)
}

pub fn add_player(app: &mut App, team: Team, admin: bool) -> PlayerSlot {
    let slot = PlayerSlot(
        app.world
            .iter_entities()
            .filter_map(|entity| entity.get::<Player>())
            .map(|player| player.slot.0 + 1)
            .max()
            .unwrap_or(0),
    );
    let permissions = if admin {
        vec!["@css/root".to_string()]
    } else {
        Vec::new()
    };
    app.world.spawn(Player {
        slot,
        team,
        connection: ConnectionState::Connected,
        permissions,
    });
    slot
}

pub fn add_players(app: &mut App, terrorists: usize, counter_terrorists: usize) {
    for _ in 0..terrorists {
        add_player(app, Team::Terrorist, false);
    }
    for _ in 0..counter_terrorists {
        add_player(app, Team::CounterTerrorist, false);
    }
}

pub fn set_warmup(app: &mut App, warmup_period: bool) {
    let mut query = app.world.query::<&mut GameRulesProxy>();
    for mut proxy in query.iter_mut(&mut app.world) {
        proxy.warmup_period = warmup_period;
    }
}

pub fn start_map(app: &mut App, map_name: &str) {
    app.world.send_event(MapStarted {
        map_name: map_name.to_string(),
    });
    app.update();
}

/// Fire a round start and run one more frame so deferred model and scale land.
pub fn start_round(app: &mut App) {
    app.world.send_event(RoundStarted);
    app.update();
    app.update();
}

/// Flattened view of a prop entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropView {
    pub model: Option<String>,
    pub origin: [f32; 3],
    pub yaw: f32,
    pub scale: Option<f32>,
}

pub fn props(app: &mut App) -> Vec<PropView> {
    let mut query = app
        .world
        .query::<(&Prop, &PropPlacement, Option<&PropScale>)>();
    let mut views: Vec<PropView> = query
        .iter(&app.world)
        .map(|(prop, placement, scale)| PropView {
            model: prop.model.clone(),
            origin: placement.origin.to_array(),
            yaw: placement.angles.yaw,
            scale: scale.map(|scale| scale.0),
        })
        .collect();
    views.sort_by(|a, b| a.origin.partial_cmp(&b.origin).unwrap_or(std::cmp::Ordering::Equal));
    views
}

pub fn props_json(app: &mut App) -> serde_json::Value {
    serde_json::to_value(props(app)).unwrap_or_default()
}

pub fn chat(app: &App) -> Vec<String> {
    app.world.resource::<ServerOutput>().chat.clone()
}
