use std::collections::HashMap;

use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    North,
    #[default]
    South,
    East,
    West,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub facing: Facing,
    #[serde(default)]
    pub animation_frame: u32,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Player {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            username: None,
            x,
            y,
            facing: Facing::default(),
            animation_frame: 0,
            avatar: None,
        }
    }

    pub fn apply_patch(&mut self, patch: &PlayerPatch) {
        if let Some(username) = &patch.username {
            self.username = Some(username.clone());
        }
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(facing) = patch.facing {
            self.facing = facing;
        }
        if let Some(frame) = patch.animation_frame {
            self.animation_frame = frame;
        }
        if let Some(avatar) = &patch.avatar {
            self.avatar = Some(avatar.clone());
        }
    }
}

/// Fields a server delta may overwrite. Anything else on the wire is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPatch {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub facing: Option<Facing>,
    #[serde(default)]
    pub animation_frame: Option<u32>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl PlayerPatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub applied: usize,
    pub unknown_ids: Vec<String>,
    pub local_player_changed: bool,
}

#[derive(Debug, Default)]
pub struct PlayerStateStore {
    local_id: Option<String>,
    players: HashMap<String, Player>,
}

impl PlayerStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_snapshot(
        &mut self,
        local_id: impl Into<String>,
        players: HashMap<String, Player>,
    ) {
        let local_id = local_id.into();
        self.players = players
            .into_iter()
            .map(|(key, mut player)| {
                if player.id.is_empty() {
                    player.id = key.clone();
                }
                (key, player)
            })
            .collect();
        debug!(
            local_id = %local_id,
            player_count = self.players.len(),
            "player_snapshot_applied"
        );
        self.local_id = Some(local_id);
    }

    pub fn merge_updates(&mut self, updates: &HashMap<String, PlayerPatch>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for (id, patch) in updates {
            let Some(player) = self.players.get_mut(id) else {
                warn!(player_id = %id, "player_update_for_unknown_id");
                outcome.unknown_ids.push(id.clone());
                continue;
            };
            player.apply_patch(patch);
            outcome.applied += 1;
            if self.local_id.as_deref() == Some(id.as_str()) {
                outcome.local_player_changed = true;
            }
        }
        outcome
    }

    pub fn upsert_player(&mut self, player: Player) -> bool {
        let is_local = self.is_local(&player.id);
        self.players.insert(player.id.clone(), player);
        is_local
    }

    pub fn remove_player(&mut self, id: &str) -> Option<Player> {
        self.players.remove(id)
    }

    pub fn all_players(&self) -> impl Iterator<Item = &Player> + '_ {
        self.players.values()
    }

    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.local_id.as_deref().and_then(|id| self.players.get(id))
    }

    pub fn is_local(&self, id: &str) -> bool {
        self.local_id.as_deref() == Some(id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
