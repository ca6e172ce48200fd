//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{Arena, ArenaHandle};
use crate::ws::hub::ConnectionHub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: ArenaHandle,
    pub hub: Arc<ConnectionHub>,
}

impl AppState {
    /// Build the state and the arena task it feeds; the caller spawns the arena
    pub fn new(config: Config) -> (Self, Arena) {
        let config = Arc::new(config);

        // Outbound queues for every open connection
        let hub = Arc::new(ConnectionHub::new());

        // Single arena, single writer
        let (arena, handle) = Arena::new(&config.arena, hub.clone());

        let state = Self {
            config,
            arena: handle,
            hub,
        };

        (state, arena)
    }
}
