//! Population-gated map restrictions for a game-server host.
//!
//! A per-map JSON config lists props and chat messages, each bound to an open
//! interval of connected players. On every round start the plugin removes the
//! props it placed, re-evaluates the intervals and spawns what applies. The
//! host is reached only through the [`Host`] trait; [`headless`] provides a
//! Bevy-backed implementation for tools and tests.

pub mod config;
#[cfg(feature = "headless")]
pub mod headless;
pub mod host;
pub mod locale;
pub mod plugin;
pub mod props;
pub mod settings;
pub mod thresholds;

#[cfg(test)]
mod test_support;

pub use config::{
    config_path, Angles, AreaRule, AreaRuleError, MapConfig, MapConfigError, MessageRule,
    Restriction, RuleSet, CONFIG_SUBDIR,
};
#[cfg(feature = "headless")]
pub use headless::{
    build_headless_app, unload_restrictions, with_plugin, ConsoleCommandIssued, GameRulesProxy,
    LastCommandOutcome, MapRestrictionsPlugin, MapStarted, Player, Prop, PropPlacement, PropScale,
    PropSpawnLimit, RestrictionsState, RoundStarted, ServerInfo, ServerOutput, WorldHost,
};
pub use host::{
    ConnectionState, GameRulesHandle, Host, HostError, PlayerInfo, PlayerSlot, PropHandle,
    PropSpawnRequest, SolidType, Team, TeamCounts, PROP_ENTITY_KIND,
};
pub use locale::{load_localizer, LocalizationError, Localizer};
pub use plugin::{
    CommandOutcome, LifecycleState, MapRestrictions, ReloadReport, SpawnSummary, MODULE_NAME,
    RELOAD_COMMAND,
};
pub use props::{ClearSummary, DeferredPropTask, PropSpawner};
pub use settings::PluginSettings;
pub use thresholds::{evaluate, Evaluation, PopulationBounds};
