//! Game simulation modules

pub mod arena;
pub mod physics;
pub mod projectile;
pub mod registry;
pub mod replication;
pub mod round;

pub use arena::{Arena, ArenaHandle};

use uuid::Uuid;

use crate::ws::protocol::ClientMsg;

use registry::JoinRequest;

/// Opaque identity of a transport connection
pub type ConnectionId = Uuid;

/// Every state mutation the arena accepts from a connection
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join(JoinRequest),
    Move { x: f32, y: f32 },
    Rotate { angle: f32 },
    Shoot { x: f32, y: f32, vx: f32, vy: f32 },
    /// Transport-level, never sent by the client
    Disconnect,
}

impl From<ClientMsg> for Command {
    fn from(msg: ClientMsg) -> Self {
        match msg {
            ClientMsg::Join { x, y, name, color } => {
                Command::Join(JoinRequest { x, y, name, color })
            }
            ClientMsg::Move { x, y } => Command::Move { x, y },
            ClientMsg::Rotate { angle } => Command::Rotate { angle },
            ClientMsg::Shoot { x, y, vx, vy } => Command::Shoot { x, y, vx, vy },
        }
    }
}

/// A command tagged with the connection that produced it
#[derive(Debug, Clone)]
pub struct ArenaInput {
    pub conn_id: ConnectionId,
    pub command: Command,
}
