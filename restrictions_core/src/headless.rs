//! Headless reference host backed by a Bevy [`World`].
//!
//! Players, the game-rules proxy and restriction props are plain entities.
//! Host notifications arrive as events; the plugin lives in the
//! [`RestrictionsState`] resource and is driven by exclusive systems.

use bevy::{math::Vec3, prelude::*};

use crate::{
    config::Angles,
    host::{
        ConnectionState, GameRulesHandle, Host, HostError, PlayerInfo, PlayerSlot, PropHandle,
        PropSpawnRequest, SolidType, Team,
    },
    plugin::{CommandOutcome, MapRestrictions},
    props::ClearSummary,
    settings::PluginSettings,
};

#[derive(Component, Debug, Clone)]
pub struct Player {
    pub slot: PlayerSlot,
    pub team: Team,
    pub connection: ConnectionState,
    pub permissions: Vec<String>,
}

/// Engine-side prop entity.
#[derive(Component, Debug, Clone)]
pub struct Prop {
    pub kind: &'static str,
    pub model: Option<String>,
    pub solid: SolidType,
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct PropPlacement {
    pub origin: Vec3,
    pub angles: Angles,
    pub velocity: Vec3,
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct PropScale(pub f32);

#[derive(Component, Debug, Clone, Default)]
pub struct GameRulesProxy {
    pub warmup_period: bool,
}

#[derive(Resource, Debug, Clone, Default)]
pub struct ServerInfo {
    pub map_name: Option<String>,
}

/// Caps how many more props the host accepts; `None` is unlimited.
#[derive(Resource, Debug, Clone, Default)]
pub struct PropSpawnLimit(pub Option<usize>);

/// Text the plugin sent to players or the console.
#[derive(Resource, Debug, Clone, Default)]
pub struct ServerOutput {
    pub chat: Vec<String>,
    pub console: Vec<String>,
    pub direct: Vec<(PlayerSlot, String)>,
}

#[derive(Resource, Debug)]
pub struct RestrictionsState(pub MapRestrictions);

#[derive(Event, Debug, Clone)]
pub struct MapStarted {
    pub map_name: String,
}

#[derive(Event, Debug, Clone, Default)]
pub struct RoundStarted;

#[derive(Event, Debug, Clone)]
pub struct ConsoleCommandIssued {
    pub caller: Option<PlayerSlot>,
    pub command: String,
}

/// Result of the most recent console command handled by the plugin.
#[derive(Resource, Debug, Clone, Default)]
pub struct LastCommandOutcome(pub Option<CommandOutcome>);

/// [`Host`] implementation over a borrowed world.
pub struct WorldHost<'w> {
    world: &'w mut World,
}

impl<'w> WorldHost<'w> {
    pub fn new(world: &'w mut World) -> Self {
        Self { world }
    }

    fn prop_entity(&self, prop: PropHandle) -> Option<Entity> {
        let entity = Entity::try_from_bits(prop.0).ok()?;
        self.world
            .get_entity(entity)
            .filter(|entity_ref| entity_ref.contains::<Prop>())
            .map(|entity_ref| entity_ref.id())
    }

    fn output(&mut self) -> Mut<'_, ServerOutput> {
        if !self.world.contains_resource::<ServerOutput>() {
            self.world.init_resource::<ServerOutput>();
        }
        self.world.resource_mut::<ServerOutput>()
    }
}

impl Host for WorldHost<'_> {
    fn map_name(&self) -> Option<String> {
        self.world
            .get_resource::<ServerInfo>()
            .and_then(|info| info.map_name.clone())
    }

    fn players(&self) -> Vec<PlayerInfo> {
        let mut players: Vec<PlayerInfo> = self
            .world
            .iter_entities()
            .filter_map(|entity| entity.get::<Player>())
            .map(|player| PlayerInfo {
                slot: player.slot,
                team: player.team,
                connection: player.connection,
            })
            .collect();
        players.sort_by_key(|player| player.slot);
        players
    }

    fn create_prop(&mut self, request: &PropSpawnRequest) -> Result<PropHandle, HostError> {
        if let Some(mut limit) = self.world.get_resource_mut::<PropSpawnLimit>() {
            if let Some(remaining) = limit.0.as_mut() {
                if *remaining == 0 {
                    return Err(HostError::EntityCreationFailed { kind: request.kind });
                }
                *remaining -= 1;
            }
        }

        let entity = self
            .world
            .spawn((
                Prop {
                    kind: request.kind,
                    model: None,
                    solid: request.solid,
                },
                PropPlacement {
                    origin: request.origin,
                    angles: request.angles,
                    velocity: request.velocity,
                },
            ))
            .id();
        Ok(PropHandle(entity.to_bits()))
    }

    fn is_prop_valid(&self, prop: PropHandle) -> bool {
        self.prop_entity(prop).is_some()
    }

    fn remove_prop(&mut self, prop: PropHandle) {
        if let Some(entity) = self.prop_entity(prop) {
            self.world.despawn(entity);
        }
    }

    fn set_prop_model(&mut self, prop: PropHandle, model: &str) -> Result<(), HostError> {
        let entity = self.prop_entity(prop).ok_or(HostError::StaleHandle(prop))?;
        let mut component = self
            .world
            .get_mut::<Prop>(entity)
            .ok_or(HostError::StaleHandle(prop))?;
        component.model = Some(model.to_string());
        Ok(())
    }

    fn set_prop_scale(&mut self, prop: PropHandle, scale: f32) -> Result<(), HostError> {
        let entity = self.prop_entity(prop).ok_or(HostError::StaleHandle(prop))?;
        self.world.entity_mut(entity).insert(PropScale(scale));
        Ok(())
    }

    fn find_game_rules(&self) -> Option<GameRulesHandle> {
        self.world
            .iter_entities()
            .find(|entity| entity.contains::<GameRulesProxy>())
            .map(|entity| GameRulesHandle(entity.id().to_bits()))
    }

    fn is_warmup_period(&self, rules: GameRulesHandle) -> bool {
        Entity::try_from_bits(rules.0)
            .ok()
            .and_then(|entity| self.world.get::<GameRulesProxy>(entity))
            .is_some_and(|proxy| proxy.warmup_period)
    }

    fn print_to_chat_all(&mut self, text: &str) {
        tracing::info!(target: "map_restrictions::chat", text, "chat.all");
        self.output().chat.push(text.to_string());
    }

    fn print_to_console(&mut self, text: &str) {
        tracing::info!(target: "map_restrictions::console", text, "console.print");
        self.output().console.push(text.to_string());
    }

    fn print_to_player(&mut self, player: PlayerSlot, text: &str) {
        tracing::info!(target: "map_restrictions::chat", %player, text, "chat.player");
        self.output().direct.push((player, text.to_string()));
    }

    fn has_permission(&self, player: PlayerSlot, permission: &str) -> bool {
        self.world
            .iter_entities()
            .filter_map(|entity| entity.get::<Player>())
            .find(|candidate| candidate.slot == player)
            .is_some_and(|candidate| {
                candidate
                    .permissions
                    .iter()
                    .any(|granted| granted == permission)
            })
    }
}

/// Run `f` against the plugin with the world as its host.
pub fn with_plugin<R>(
    world: &mut World,
    f: impl FnOnce(&mut MapRestrictions, &mut WorldHost<'_>) -> R,
) -> R {
    world.resource_scope(|world, mut state: Mut<RestrictionsState>| {
        let mut host = WorldHost::new(world);
        f(&mut state.0, &mut host)
    })
}

/// Installs the plugin into an [`App`].
///
/// With `hot_reload` set, the config of the map already in [`ServerInfo`] is
/// loaded during [`Plugin::build`].
pub struct MapRestrictionsPlugin {
    pub settings: PluginSettings,
    pub hot_reload: bool,
}

impl Plugin for MapRestrictionsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ServerInfo>()
            .init_resource::<ServerOutput>()
            .init_resource::<PropSpawnLimit>()
            .init_resource::<LastCommandOutcome>()
            .add_event::<MapStarted>()
            .add_event::<RoundStarted>()
            .add_event::<ConsoleCommandIssued>()
            .insert_resource(RestrictionsState(MapRestrictions::new(
                self.settings.clone(),
            )))
            .add_systems(First, run_deferred_prop_tasks)
            .add_systems(Update, dispatch_host_events);

        let hot_reload = self.hot_reload;
        with_plugin(&mut app.world, |plugin, host| plugin.on_load(host, hot_reload));
    }
}

/// Build an app with the game-rules proxy spawned and the plugin installed.
pub fn build_headless_app(settings: PluginSettings, map_name: Option<&str>) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.world.insert_resource(ServerInfo {
        map_name: map_name.map(str::to_string),
    });
    app.world.spawn(GameRulesProxy::default());
    app.add_plugins(MapRestrictionsPlugin {
        settings,
        hot_reload: map_name.is_some(),
    });
    app
}

/// Tear the plugin down, removing every prop it still tracks.
pub fn unload_restrictions(world: &mut World) -> Option<ClearSummary> {
    if !world.contains_resource::<RestrictionsState>() {
        return None;
    }
    let summary = with_plugin(world, |plugin, host| plugin.on_unload(host));
    world.remove_resource::<RestrictionsState>();
    Some(summary)
}

fn run_deferred_prop_tasks(world: &mut World) {
    if !world.contains_resource::<RestrictionsState>() {
        return;
    }
    with_plugin(world, |plugin, host| plugin.on_tick(host));
}

fn dispatch_host_events(world: &mut World) {
    if !world.contains_resource::<RestrictionsState>() {
        return;
    }

    let maps: Vec<MapStarted> = world.resource_mut::<Events<MapStarted>>().drain().collect();
    for event in maps {
        world.resource_mut::<ServerInfo>().map_name = Some(event.map_name.clone());
        with_plugin(world, |plugin, _| plugin.on_map_start(&event.map_name));
    }

    let rounds = world.resource_mut::<Events<RoundStarted>>().drain().count();
    for _ in 0..rounds {
        with_plugin(world, |plugin, host| plugin.on_round_start(host));
    }

    let commands: Vec<ConsoleCommandIssued> = world
        .resource_mut::<Events<ConsoleCommandIssued>>()
        .drain()
        .collect();
    for event in commands {
        let outcome = with_plugin(world, |plugin, host| {
            plugin.on_console_command(host, event.caller, &event.command)
        });
        world.resource_mut::<LastCommandOutcome>().0 = Some(outcome);
    }
}
