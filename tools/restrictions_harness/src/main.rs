mod command_text;

use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::PathBuf,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use bevy::prelude::*;
use clap::Parser;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use restrictions_core::{
    build_headless_app, unload_restrictions, ConnectionState, ConsoleCommandIssued,
    GameRulesProxy, MapStarted, Player, PlayerSlot, PluginSettings, Prop, PropPlacement,
    PropScale, RestrictionsState, RoundStarted, ServerOutput, RELOAD_COMMAND,
};
use tracing::{info, warn};

use command_text::{parse_command_line, HarnessCommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless driver for the map restrictions plugin", long_about = None)]
struct Args {
    /// Plugin module directory holding configs/ and lang/ (defaults to MAP_RESTRICTIONS_MODULE_DIR or .)
    #[arg(long)]
    module_dir: Option<PathBuf>,

    /// Locale used for chat templates
    #[arg(long)]
    locale: Option<String>,

    /// Command script to run instead of reading stdin
    #[arg(long)]
    script: Option<PathBuf>,

    /// Map already running when the plugin loads (loaded as a hot reload)
    #[arg(long)]
    map: Option<String>,

    /// Idle frame interval in milliseconds; 0 only advances on `tick`
    #[arg(long, default_value_t = 0)]
    tick_ms: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut settings = PluginSettings::from_env();
    if let Some(dir) = args.module_dir {
        settings.module_dir = dir;
    }
    if let Some(locale) = args.locale {
        settings.locale = locale;
    }

    let input: Box<dyn BufRead + Send> = match &args.script {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open script {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut app = build_headless_app(settings, args.map.as_deref());
    info!(
        target: "map_restrictions::harness",
        map = args.map.as_deref().unwrap_or(""),
        "harness.ready"
    );

    let commands = spawn_command_reader(input);
    let idle = (args.tick_ms > 0).then(|| Duration::from_millis(args.tick_ms));
    let mut unloaded = false;

    loop {
        let command = match idle {
            Some(interval) => match commands.recv_timeout(interval) {
                Ok(command) => command,
                Err(RecvTimeoutError::Timeout) => {
                    app.update();
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match commands.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            HarnessCommand::Quit => break,
            HarnessCommand::Unload => {
                unload_plugin(&mut app);
                unloaded = true;
            }
            other => apply_command(&mut app, other)?,
        }
    }

    if !unloaded {
        unload_plugin(&mut app);
    }
    Ok(())
}

fn spawn_command_reader(input: Box<dyn BufRead + Send>) -> Receiver<HarnessCommand> {
    let (sender, receiver) = unbounded::<HarnessCommand>();
    thread::spawn(move || {
        for (index, line) in input.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!("Command read error: {}", err);
                    break;
                }
            };
            match parse_command_line(&line) {
                Ok(Some(command)) => {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => warn!("line {}: {}", index + 1, err),
            }
        }
    });
    receiver
}

fn apply_command(app: &mut App, command: HarnessCommand) -> Result<()> {
    match command {
        HarnessCommand::Map { name } => {
            app.world.send_event(MapStarted { map_name: name });
            app.update();
        }
        HarnessCommand::Round => {
            app.world.send_event(RoundStarted);
            app.update();
        }
        HarnessCommand::Join { team, admin } => {
            let slot = next_free_slot(app);
            let permissions = if admin {
                vec![app_admin_permission(app)]
            } else {
                Vec::new()
            };
            app.world.spawn(Player {
                slot,
                team,
                connection: ConnectionState::Connected,
                permissions,
            });
            info!(
                target: "map_restrictions::harness",
                %slot,
                team = team.as_str(),
                admin,
                "player.joined"
            );
        }
        HarnessCommand::Leave { slot } => {
            let mut query = app.world.query::<(Entity, &Player)>();
            let leaving: Vec<Entity> = query
                .iter(&app.world)
                .filter(|(_, player)| player.slot == slot)
                .map(|(entity, _)| entity)
                .collect();
            if leaving.is_empty() {
                warn!("No player in slot {}", slot);
            }
            for entity in leaving {
                app.world.despawn(entity);
            }
        }
        HarnessCommand::Warmup { enabled } => {
            let mut query = app.world.query::<&mut GameRulesProxy>();
            for mut proxy in query.iter_mut(&mut app.world) {
                proxy.warmup_period = enabled;
            }
        }
        HarnessCommand::Reload { caller } => {
            app.world.send_event(ConsoleCommandIssued {
                caller,
                command: RELOAD_COMMAND.to_string(),
            });
            app.update();
        }
        HarnessCommand::Tick { frames } => {
            for _ in 0..frames {
                app.update();
            }
        }
        HarnessCommand::Status => {
            let status = status_json(app);
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        HarnessCommand::Unload | HarnessCommand::Quit => {}
    }
    Ok(())
}

fn unload_plugin(app: &mut App) {
    match unload_restrictions(&mut app.world) {
        Some(summary) => info!(
            target: "map_restrictions::harness",
            removed = summary.removed,
            stale = summary.stale,
            "harness.unloaded"
        ),
        None => warn!("Plugin already unloaded"),
    }
}

fn next_free_slot(app: &mut App) -> PlayerSlot {
    let mut query = app.world.query::<&Player>();
    let next = query
        .iter(&app.world)
        .map(|player| player.slot.0 + 1)
        .max()
        .unwrap_or(0);
    PlayerSlot(next)
}

fn app_admin_permission(app: &App) -> String {
    app.world
        .get_resource::<RestrictionsState>()
        .map(|state| state.0.settings().admin_permission.clone())
        .unwrap_or_else(|| restrictions_core::settings::DEFAULT_ADMIN_PERMISSION.to_string())
}

fn status_json(app: &mut App) -> serde_json::Value {
    let mut query = app
        .world
        .query::<(&Prop, &PropPlacement, Option<&PropScale>)>();
    let props: Vec<serde_json::Value> = query
        .iter(&app.world)
        .map(|(prop, placement, scale)| {
            serde_json::json!({
                "model": prop.model,
                "origin": placement.origin.to_array(),
                "angles": [placement.angles.pitch, placement.angles.yaw, placement.angles.roll],
                "scale": scale.map(|scale| scale.0),
            })
        })
        .collect();

    let players = app
        .world
        .query::<&Player>()
        .iter(&app.world)
        .filter(|player| player.connection == ConnectionState::Connected)
        .count();

    let (state, map, config_path, tracked) = match app.world.get_resource::<RestrictionsState>() {
        Some(state) => (
            format!("{:?}", state.0.state()),
            state.0.config().and_then(|config| config.map_name.clone()),
            state.0.config_path().map(|path| path.display().to_string()),
            state.0.props().len(),
        ),
        None => ("Unloaded".to_string(), None, None, 0),
    };

    let output = app.world.resource::<ServerOutput>();
    serde_json::json!({
        "state": state,
        "map": map,
        "config_path": config_path,
        "players": players,
        "tracked_props": tracked,
        "props": props,
        "chat": output.chat,
        "console": output.console,
        "direct": output
            .direct
            .iter()
            .map(|(slot, text)| serde_json::json!({ "slot": slot.0, "text": text }))
            .collect::<Vec<_>>(),
    })
}
