//! Event contracts.
//!
//! Messages are JSON, adjacently tagged: `{"event": "makeGuess", "data": {...}}`.
//! Events without a payload carry only the tag.

use serde::{Deserialize, Serialize};

/// Events sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    CreateGame { player_name: String },

    #[serde(rename_all = "camelCase")]
    JoinGame {
        game_code: String,
        player_name: String,
    },

    #[serde(rename_all = "camelCase")]
    ReconnectGame {
        game_code: String,
        player_name: String,
    },

    #[serde(rename_all = "camelCase")]
    SetWord { game_code: String, word: String },

    #[serde(rename_all = "camelCase")]
    MakeGuess { game_code: String, letter: String },

    #[serde(rename_all = "camelCase")]
    StartNextRound { game_code: String },

    #[serde(rename_all = "camelCase")]
    StopGame { game_code: String },

    #[serde(rename_all = "camelCase")]
    LeaveGame {
        game_code: String,
        player_name: String,
    },
}

impl ClientEvent {
    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateGame { .. } => "createGame",
            Self::JoinGame { .. } => "joinGame",
            Self::ReconnectGame { .. } => "reconnectGame",
            Self::SetWord { .. } => "setWord",
            Self::MakeGuess { .. } => "makeGuess",
            Self::StartNextRound { .. } => "startNextRound",
            Self::StopGame { .. } => "stopGame",
            Self::LeaveGame { .. } => "leaveGame",
        }
    }

    /// Parse a client message.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Events sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Tells the creator which code to share
    #[serde(rename_all = "camelCase")]
    GameCreated { game_code: String },

    /// Full session snapshot, tailored to the recipient
    GameUpdate(serde_json::Value),

    GameNotFound,

    ReconnectFailed,

    /// Join refused: a connected player already uses that name
    NameTaken,
}

impl ServerEvent {
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
