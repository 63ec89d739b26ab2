use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::app::MoveDirection;
use crate::world::{AvatarDef, Player, PlayerPatch};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinGame { username: String },
    Move { direction: MoveDirection },
    Stop,
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    JoinAccepted {
        player_id: String,
        players: HashMap<String, Player>,
        avatars: HashMap<String, AvatarDef>,
    },
    PlayersMoved {
        players: HashMap<String, PlayerPatch>,
    },
    PlayerJoined {
        player: Player,
        avatar: Option<AvatarDef>,
    },
    PlayerLeft {
        player_id: String,
    },
    /// Any response carrying `success: false`.
    Rejected {
        action: Option<String>,
        error: Option<String>,
    },
    Unknown {
        action: String,
    },
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid json: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("frame is not a json object")]
    NotAnObject,
    #[error("frame has no action")]
    MissingAction,
    #[error("malformed {action} payload: {source}")]
    MalformedPayload {
        action: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode client message: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinAcceptedPayload {
    player_id: String,
    #[serde(default)]
    players: HashMap<String, Value>,
    #[serde(default)]
    avatars: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct PlayersMovedPayload {
    players: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct PlayerJoinedPayload {
    player: Player,
    #[serde(default)]
    avatar: Option<AvatarDef>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerLeftPayload {
    player_id: String,
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::InvalidJson)?;
        let Value::Object(object) = value else {
            return Err(ProtocolError::NotAnObject);
        };
        let action = object.get("action").and_then(Value::as_str).map(str::to_string);

        if object.get("success").and_then(Value::as_bool) == Some(false) {
            let error = object.get("error").map(|error| match error {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            });
            return Ok(Self::Rejected { action, error });
        }

        let Some(action) = action else {
            return Err(ProtocolError::MissingAction);
        };
        match action.as_str() {
            "join_game" => {
                let payload: JoinAcceptedPayload = payload("join_game", object)?;
                let avatars = records::<AvatarDef>("join_game", "avatars", payload.avatars)
                    .into_iter()
                    .map(|(name, mut def)| {
                        if def.name.is_empty() {
                            def.name = name.clone();
                        }
                        (name, def)
                    })
                    .collect();
                Ok(Self::JoinAccepted {
                    player_id: payload.player_id,
                    players: records("join_game", "players", payload.players),
                    avatars,
                })
            }
            "players_moved" => {
                let payload: PlayersMovedPayload = payload("players_moved", object)?;
                Ok(Self::PlayersMoved {
                    players: records("players_moved", "players", payload.players),
                })
            }
            "player_joined" => {
                let payload: PlayerJoinedPayload = payload("player_joined", object)?;
                Ok(Self::PlayerJoined {
                    player: payload.player,
                    avatar: payload.avatar,
                })
            }
            "player_left" => {
                let payload: PlayerLeftPayload = payload("player_left", object)?;
                Ok(Self::PlayerLeft {
                    player_id: payload.player_id,
                })
            }
            _ => Ok(Self::Unknown { action }),
        }
    }
}

fn payload<T: DeserializeOwned>(
    action: &'static str,
    object: Map<String, Value>,
) -> Result<T, ProtocolError> {
    serde_json::from_value(Value::Object(object))
        .map_err(|source| ProtocolError::MalformedPayload { action, source })
}

/// Converts each keyed record on its own so one bad entry only drops itself.
fn records<T: DeserializeOwned>(
    action: &'static str,
    field: &'static str,
    raw: HashMap<String, Value>,
) -> HashMap<String, T> {
    raw.into_iter()
        .filter_map(|(key, value)| match serde_json::from_value(value) {
            Ok(record) => Some((key, record)),
            Err(error) => {
                warn!(action, field, key = %key, error = %error, "server_record_dropped");
                None
            }
        })
        .collect()
}
