//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Enter the arena at the client-chosen spawn point
    Join {
        x: f32,
        y: f32,
        /// Display name; the server generates one when absent or blank
        #[serde(default)]
        name: Option<String>,
        /// Presentation colour; the server picks one when absent
        #[serde(default)]
        color: Option<String>,
    },

    /// Client-simulated position (accepted as reported)
    Move { x: f32, y: f32 },

    /// Facing angle in radians
    Rotate { angle: f32 },

    /// Fire a bullet from (x, y) travelling (vx, vy) units per tick
    Shoot { x: f32, y: f32, vx: f32, vy: f32 },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Sent once after the socket is accepted
    Welcome { id: Uuid, server_time: u64 },

    /// Full state for a joining connection (joiner only)
    InitState { players: Vec<PlayerInfo>, timer: u32 },

    /// Someone else joined
    PlayerJoined { id: Uuid, data: PlayerInfo },

    PlayerLeft { id: Uuid },

    PlayerMoved { id: Uuid, x: f32, y: f32 },

    PlayerRotated { id: Uuid, angle: f32 },

    BulletFired {
        x: f32,
        y: f32,
        vx: f32,
        vy: f32,
        owner: Uuid,
    },

    PlayerHit { id: Uuid, hp: u32 },

    PlayerRespawn { id: Uuid, x: f32, y: f32, hp: u32 },

    ScoreUpdate { id: Uuid, score: u32 },

    /// Seconds left in the running round
    TimerUpdate { seconds: u32 },

    /// A new round began; positions and health were reset
    RoundStart {
        round: u32,
        players: Vec<PlayerInfo>,
        timer: u32,
    },

    /// Final standings, best first
    RoundEnd { ranking: Vec<RankEntry> },
}

/// Replicated view of a player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: Uuid,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub hp: u32,
    pub name: String,
    pub color: String,
    pub score: u32,
}

/// One line of the round-end ranking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    pub name: String,
    pub score: u32,
}

/// Wire (de)serialization failures
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed client message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported frame type: {0}")]
    UnsupportedFrame(&'static str),

    #[error("WebSocket send failed: {0}")]
    Send(#[from] axum::Error),
}

/// Parse a text frame into a client message
pub fn decode_client(text: &str) -> Result<ClientMsg, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode a server message as a text frame
pub fn encode_server(msg: &ServerMsg) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(msg)?)
}
