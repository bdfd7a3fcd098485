//! Seam between the plugin and the game server hosting it.

use std::fmt;

use bevy::math::Vec3;
use thiserror::Error;

use crate::config::Angles;

/// Entity class used for every restriction prop.
pub const PROP_ENTITY_KIND: &str = "prop_dynamic_override";

/// Opaque reference to a host entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropHandle(pub u64);

impl fmt::Display for PropHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to the host's game-rules object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GameRulesHandle(pub u64);

/// Player slot on the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerSlot(pub u32);

impl fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Team {
    #[default]
    Unassigned,
    Spectator,
    Terrorist,
    CounterTerrorist,
}

impl Team {
    pub fn as_str(&self) -> &'static str {
        match self {
            Team::Unassigned => "none",
            Team::Spectator => "spec",
            Team::Terrorist => "t",
            Team::CounterTerrorist => "ct",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Reserved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerInfo {
    pub slot: PlayerSlot,
    pub team: Team,
    pub connection: ConnectionState,
}

/// Head counts over connected players.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeamCounts {
    pub connected: usize,
    pub terrorists: usize,
    pub counter_terrorists: usize,
}

impl TeamCounts {
    pub fn from_players(players: &[PlayerInfo]) -> Self {
        players
            .iter()
            .filter(|player| player.connection == ConnectionState::Connected)
            .fold(TeamCounts::default(), |mut counts, player| {
                counts.connected += 1;
                match player.team {
                    Team::Terrorist => counts.terrorists += 1,
                    Team::CounterTerrorist => counts.counter_terrorists += 1,
                    Team::Unassigned | Team::Spectator => {}
                }
                counts
            })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolidType {
    #[default]
    None,
    VPhysics,
}

/// Everything the host needs to materialize one prop.
#[derive(Clone, Debug, PartialEq)]
pub struct PropSpawnRequest {
    pub kind: &'static str,
    pub origin: Vec3,
    pub angles: Angles,
    pub velocity: Vec3,
    pub solid: SolidType,
}

impl PropSpawnRequest {
    pub fn restriction_prop(origin: Vec3, angles: Angles) -> Self {
        Self {
            kind: PROP_ENTITY_KIND,
            origin,
            angles,
            velocity: Vec3::ZERO,
            solid: SolidType::VPhysics,
        }
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("host refused to create entity '{kind}'")]
    EntityCreationFailed { kind: &'static str },
    #[error("entity {0} is no longer valid")]
    StaleHandle(PropHandle),
}

/// Primitives the plugin consumes from the game server.
///
/// All calls happen on the host's simulation thread.
pub trait Host {
    /// Name of the currently running map, if any.
    fn map_name(&self) -> Option<String>;

    fn players(&self) -> Vec<PlayerInfo>;

    /// Create and dispatch a prop entity. The model is assigned later through
    /// [`Host::set_prop_model`].
    fn create_prop(&mut self, request: &PropSpawnRequest) -> Result<PropHandle, HostError>;

    fn is_prop_valid(&self, prop: PropHandle) -> bool;

    fn remove_prop(&mut self, prop: PropHandle);

    fn set_prop_model(&mut self, prop: PropHandle, model: &str) -> Result<(), HostError>;

    /// Scale the prop's skeleton. Only valid once the entity finished spawning.
    fn set_prop_scale(&mut self, prop: PropHandle, scale: f32) -> Result<(), HostError>;

    fn find_game_rules(&self) -> Option<GameRulesHandle>;

    /// Whether the match is in warmup. A stale handle reads as not in warmup.
    fn is_warmup_period(&self, rules: GameRulesHandle) -> bool;

    fn print_to_chat_all(&mut self, text: &str);

    fn print_to_console(&mut self, text: &str);

    fn print_to_player(&mut self, player: PlayerSlot, text: &str);

    fn has_permission(&self, player: PlayerSlot, permission: &str) -> bool;
}
