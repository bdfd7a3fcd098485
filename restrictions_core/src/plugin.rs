//! Lifecycle of the map restrictions plugin.
//!
//! The host drives a single [`MapRestrictions`] value through its callbacks:
//! load, map start, round start, tick, console command and unload. Every
//! failure is logged and absorbed; the next map start or reload retries.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    config::{config_path, MapConfig, MapConfigError},
    host::{GameRulesHandle, Host, PlayerSlot, TeamCounts},
    locale::{load_localizer, Localizer, RELOAD_DENIED_KEY},
    props::{ClearSummary, PropSpawner},
    settings::PluginSettings,
    thresholds::evaluate,
};

pub const MODULE_NAME: &str = "MapRestrictions";
pub const RELOAD_COMMAND: &str = "maprestrictions_reload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unloaded,
    Idle,
    Active,
}

/// What the reload command found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    pub map_name: Option<String>,
    pub areas: usize,
    pub messages: usize,
}

impl fmt::Display for ReloadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reloaded map restrictions for {}, found {} restrictions and {} messages",
            self.map_name.as_deref().unwrap_or(""),
            self.areas,
            self.messages
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Reload ran; `None` when no config path was ever resolved.
    Reloaded(Option<ReloadReport>),
    Denied,
    Unknown,
}

/// What a spawn pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnSummary {
    pub player_count: usize,
    pub broadcast: Option<String>,
    pub spawned: usize,
    pub skipped: usize,
}

/// Plugin state owned by the host for the lifetime of the plugin.
#[derive(Debug)]
pub struct MapRestrictions {
    settings: PluginSettings,
    localizer: Localizer,
    loaded: bool,
    config: Option<MapConfig>,
    config_path: Option<PathBuf>,
    game_rules: Option<GameRulesHandle>,
    props: PropSpawner,
}

impl MapRestrictions {
    pub fn new(settings: PluginSettings) -> Self {
        let localizer = load_localizer(&settings.module_dir, &settings.locale);
        Self::with_localizer(settings, localizer)
    }

    pub fn with_localizer(settings: PluginSettings, localizer: Localizer) -> Self {
        Self {
            settings,
            localizer,
            loaded: false,
            config: None,
            config_path: None,
            game_rules: None,
            props: PropSpawner::new(),
        }
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    pub fn config(&self) -> Option<&MapConfig> {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn game_rules(&self) -> Option<GameRulesHandle> {
        self.game_rules
    }

    pub fn props(&self) -> &PropSpawner {
        &self.props
    }

    pub fn state(&self) -> LifecycleState {
        match (self.loaded, self.config.is_some()) {
            (false, _) => LifecycleState::Unloaded,
            (true, false) => LifecycleState::Idle,
            (true, true) => LifecycleState::Active,
        }
    }

    /// Plugin load. On hot reload the current map's config is picked up
    /// immediately instead of waiting for the next map start.
    pub fn on_load<H: Host + ?Sized>(&mut self, host: &mut H, hot_reload: bool) {
        self.loaded = true;
        tracing::info!(
            target: "map_restrictions::lifecycle",
            hot_reload,
            module_dir = %self.settings.module_dir.display(),
            "plugin.loaded"
        );

        if !hot_reload || self.config.is_some() {
            return;
        }
        match host.map_name().filter(|name| !name.is_empty()) {
            Some(map_name) => self.load_config(&map_name),
            None => tracing::debug!(
                target: "map_restrictions::lifecycle",
                "plugin.hot_reload.no_map"
            ),
        }
    }

    pub fn on_map_start(&mut self, map_name: &str) {
        self.load_config(map_name);
    }

    pub fn on_round_start<H: Host + ?Sized>(&mut self, host: &mut H) -> Option<SpawnSummary> {
        self.config.as_ref()?;
        self.props.clear_all(host);
        self.game_rules = host.find_game_rules();
        self.spawn_restrictions(host)
    }

    /// Once per host frame; applies prop mutations queued on earlier frames.
    pub fn on_tick<H: Host + ?Sized>(&mut self, host: &mut H) -> usize {
        self.props.run_deferred(host)
    }

    /// Dispatch a console command. `caller` is `None` for the server console.
    pub fn on_console_command<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        caller: Option<PlayerSlot>,
        command: &str,
    ) -> CommandOutcome {
        let name = command.split_whitespace().next().unwrap_or_default();
        if !name.eq_ignore_ascii_case(RELOAD_COMMAND) {
            return CommandOutcome::Unknown;
        }

        if let Some(player) = caller {
            if !host.has_permission(player, &self.settings.admin_permission) {
                tracing::info!(
                    target: "map_restrictions::command",
                    %player,
                    command = RELOAD_COMMAND,
                    "command.denied"
                );
                let reply = self.localizer.get(RELOAD_DENIED_KEY).to_string();
                host.print_to_player(player, &reply);
                return CommandOutcome::Denied;
            }
        }

        CommandOutcome::Reloaded(self.reload(host, caller))
    }

    /// Re-read the cached config path, report the result and respawn.
    pub fn reload<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        caller: Option<PlayerSlot>,
    ) -> Option<ReloadReport> {
        self.props.clear_all(host);

        let path = self.config_path.clone()?;
        self.config = match MapConfig::from_file(&path) {
            Ok(config) => Some(config),
            Err(err) => {
                log_load_failure(&err, Some(path.as_path()), "reload");
                None
            }
        };

        let report = ReloadReport {
            map_name: self.config.as_ref().and_then(|config| config.map_name.clone()),
            areas: self.config.as_ref().map_or(0, MapConfig::area_count),
            messages: self.config.as_ref().map_or(0, MapConfig::message_count),
        };
        tracing::info!(
            target: "map_restrictions::command",
            path = %path.display(),
            areas = report.areas,
            messages = report.messages,
            "map_config.reloaded"
        );
        match caller {
            None => host.print_to_console(&format!("[{MODULE_NAME}] {report}")),
            Some(player) => host.print_to_player(player, &format!("{MODULE_NAME} - {report}")),
        }

        if self.game_rules.is_none() {
            self.game_rules = host.find_game_rules();
        }
        self.spawn_restrictions(host);
        Some(report)
    }

    /// Plugin unload: every tracked prop goes, whatever the config state.
    pub fn on_unload<H: Host + ?Sized>(&mut self, host: &mut H) -> ClearSummary {
        let summary = self.props.clear_all(host);
        self.loaded = false;
        tracing::info!(
            target: "map_restrictions::lifecycle",
            removed = summary.removed,
            stale = summary.stale,
            "plugin.unloaded"
        );
        summary
    }

    fn load_config(&mut self, map_name: &str) {
        if let Some(mut previous) = self.config.take() {
            previous.restrictions.areas.clear();
            previous.restrictions.messages.clear();
        }

        let path = match config_path(&self.settings.module_dir, map_name) {
            Ok(path) => path,
            Err(err) => {
                self.config_path = None;
                log_load_failure(&err, None, "map_start");
                return;
            }
        };
        self.config_path = Some(path.clone());

        match MapConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "map_restrictions::config",
                    path = %path.display(),
                    map = map_name,
                    areas = config.area_count(),
                    messages = config.message_count(),
                    "map_config.loaded=file"
                );
                self.config = Some(config);
            }
            Err(err) => log_load_failure(&err, Some(path.as_path()), "map_start"),
        }
    }

    fn spawn_restrictions<H: Host + ?Sized>(&mut self, host: &mut H) -> Option<SpawnSummary> {
        let config = self.config.as_ref()?;
        let Some(rules) = self.game_rules else {
            tracing::debug!(target: "map_restrictions::lifecycle", "spawn.skipped=no_game_rules");
            return None;
        };
        if host.is_warmup_period(rules) {
            tracing::debug!(target: "map_restrictions::lifecycle", "spawn.skipped=warmup");
            return None;
        }

        let counts = TeamCounts::from_players(&host.players());
        let evaluation = evaluate(counts.connected, &config.restrictions);
        let mut summary = SpawnSummary {
            player_count: counts.connected,
            ..SpawnSummary::default()
        };

        if let Some(text) = evaluation.broadcast_text() {
            let rendered = self.localizer.render_start_message(counts, text);
            host.print_to_chat_all(&rendered);
            summary.broadcast = Some(rendered);
        }

        let model = config.restrictions.model.as_str();
        for (key, area) in &evaluation.areas {
            let spawned = area.placement().and_then(|(origin, angles)| {
                self.props.spawn(host, model, origin, angles, area.scale())
            });
            match spawned {
                Some(_) => summary.spawned += 1,
                None => {
                    summary.skipped += 1;
                    tracing::debug!(
                        target: "map_restrictions::props",
                        area = *key,
                        "area.not_spawned"
                    );
                }
            }
        }

        tracing::info!(
            target: "map_restrictions::lifecycle",
            players = counts.connected,
            terrorists = counts.terrorists,
            counter_terrorists = counts.counter_terrorists,
            spawned = summary.spawned,
            skipped = summary.skipped,
            broadcast = summary.broadcast.is_some(),
            "restrictions.applied"
        );
        Some(summary)
    }
}

fn log_load_failure(err: &MapConfigError, path: Option<&Path>, during: &'static str) {
    let path = path.map(|path| path.display().to_string()).unwrap_or_default();
    if err.is_missing() {
        tracing::info!(
            target: "map_restrictions::config",
            path = %path,
            during,
            reason = %err,
            "map_config.absent"
        );
    } else {
        tracing::warn!(
            target: "map_restrictions::config",
            path = %path,
            during,
            error = %err,
            "map_config.load_failed"
        );
    }
}
