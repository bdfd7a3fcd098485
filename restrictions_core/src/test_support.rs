use std::collections::{BTreeMap, HashSet};

use crate::host::{
    ConnectionState, GameRulesHandle, Host, HostError, PlayerInfo, PlayerSlot, PropHandle,
    PropSpawnRequest, Team,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedProp {
    pub request: PropSpawnRequest,
    pub model: Option<String>,
    pub scale: Option<f32>,
}

/// In-memory host that records every call.
#[derive(Debug)]
pub struct RecordingHost {
    pub map_name: Option<String>,
    pub players: Vec<PlayerInfo>,
    pub admins: HashSet<PlayerSlot>,
    pub game_rules: Option<GameRulesHandle>,
    pub warmup: bool,
    /// Remaining successful creations; `None` is unlimited.
    pub spawn_budget: Option<usize>,
    pub props: BTreeMap<PropHandle, RecordedProp>,
    pub removed: Vec<PropHandle>,
    pub chat: Vec<String>,
    pub console: Vec<String>,
    pub direct: Vec<(PlayerSlot, String)>,
    next_handle: u64,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self {
            map_name: None,
            players: Vec::new(),
            admins: HashSet::new(),
            game_rules: Some(GameRulesHandle(1)),
            warmup: false,
            spawn_budget: None,
            props: BTreeMap::new(),
            removed: Vec::new(),
            chat: Vec::new(),
            console: Vec::new(),
            direct: Vec::new(),
            next_handle: 100,
        }
    }
}

impl RecordingHost {
    pub fn with_players(terrorists: u32, counter_terrorists: u32) -> Self {
        let mut host = Self::default();
        host.set_players(terrorists, counter_terrorists);
        host
    }

    pub fn with_map(mut self, map_name: &str) -> Self {
        self.map_name = Some(map_name.to_string());
        self
    }

    pub fn with_spawn_budget(mut self, budget: usize) -> Self {
        self.spawn_budget = Some(budget);
        self
    }

    pub fn set_players(&mut self, terrorists: u32, counter_terrorists: u32) {
        self.players = (0..terrorists)
            .map(|_| Team::Terrorist)
            .chain((0..counter_terrorists).map(|_| Team::CounterTerrorist))
            .enumerate()
            .map(|(slot, team)| PlayerInfo {
                slot: PlayerSlot(slot as u32),
                team,
                connection: ConnectionState::Connected,
            })
            .collect();
    }

    pub fn prop(&self, handle: PropHandle) -> Option<&RecordedProp> {
        self.props.get(&handle)
    }

    pub fn live_props(&self) -> usize {
        self.props.len()
    }

    pub fn destroy_externally(&mut self, handle: PropHandle) {
        self.props.remove(&handle);
    }
}

impl Host for RecordingHost {
    fn map_name(&self) -> Option<String> {
        self.map_name.clone()
    }

    fn players(&self) -> Vec<PlayerInfo> {
        self.players.clone()
    }

    fn create_prop(&mut self, request: &PropSpawnRequest) -> Result<PropHandle, HostError> {
        if let Some(budget) = self.spawn_budget.as_mut() {
            if *budget == 0 {
                return Err(HostError::EntityCreationFailed { kind: request.kind });
            }
            *budget -= 1;
        }
        let handle = PropHandle(self.next_handle);
        self.next_handle += 1;
        self.props.insert(
            handle,
            RecordedProp {
                request: request.clone(),
                model: None,
                scale: None,
            },
        );
        Ok(handle)
    }

    fn is_prop_valid(&self, prop: PropHandle) -> bool {
        self.props.contains_key(&prop)
    }

    fn remove_prop(&mut self, prop: PropHandle) {
        self.props.remove(&prop);
        self.removed.push(prop);
    }

    fn set_prop_model(&mut self, prop: PropHandle, model: &str) -> Result<(), HostError> {
        let state = self
            .props
            .get_mut(&prop)
            .ok_or(HostError::StaleHandle(prop))?;
        state.model = Some(model.to_string());
        Ok(())
    }

    fn set_prop_scale(&mut self, prop: PropHandle, scale: f32) -> Result<(), HostError> {
        let state = self
            .props
            .get_mut(&prop)
            .ok_or(HostError::StaleHandle(prop))?;
        state.scale = Some(scale);
        Ok(())
    }

    fn find_game_rules(&self) -> Option<GameRulesHandle> {
        self.game_rules
    }

    fn is_warmup_period(&self, rules: GameRulesHandle) -> bool {
        self.game_rules == Some(rules) && self.warmup
    }

    fn print_to_chat_all(&mut self, text: &str) {
        self.chat.push(text.to_string());
    }

    fn print_to_console(&mut self, text: &str) {
        self.console.push(text.to_string());
    }

    fn print_to_player(&mut self, player: PlayerSlot, text: &str) {
        self.direct.push((player, text.to_string()));
    }

    fn has_permission(&self, player: PlayerSlot, _permission: &str) -> bool {
        self.admins.contains(&player)
    }
}
