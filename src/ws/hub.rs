//! Connection hub - routes outbound messages to connection queues

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::game::replication::{Delivery, Outbound};
use crate::game::ConnectionId;
use crate::ws::protocol::ServerMsg;

/// Default per-connection outbound queue depth
pub const OUTBOUND_QUEUE: usize = 256;

struct Slot {
    tx: mpsc::Sender<ServerMsg>,
    /// Set once the connection has received its init-state
    synced: bool,
}

/// Registered connections and their outbound queues.
///
/// Delivery is fire-and-forget: a full or closed queue drops the message.
/// Broadcasts skip connections that have not been sent init-state yet.
pub struct ConnectionHub {
    slots: DashMap<ConnectionId, Slot>,
    queue_depth: usize,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::with_queue_depth(OUTBOUND_QUEUE)
    }

    pub fn with_queue_depth(queue_depth: usize) -> Self {
        Self {
            slots: DashMap::new(),
            queue_depth: queue_depth.max(1),
        }
    }

    /// Register a connection, returns the receiving end of its queue
    pub fn register(&self, id: ConnectionId) -> mpsc::Receiver<ServerMsg> {
        let (tx, rx) = mpsc::channel(self.queue_depth);
        self.slots.insert(id, Slot { tx, synced: false });
        rx
    }

    pub fn unregister(&self, id: ConnectionId) {
        self.slots.remove(&id);
    }

    /// Number of open connections
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn deliver(&self, outbound: Outbound) {
        match outbound.delivery {
            Delivery::Only(id) => {
                let Some(mut slot) = self.slots.get_mut(&id) else {
                    debug!(conn_id = %id, "Dropping message for closed connection");
                    return;
                };
                if matches!(outbound.msg, ServerMsg::InitState { .. }) {
                    slot.synced = true;
                }
                push(id, &slot.tx, outbound.msg);
            }
            Delivery::AllExcept(origin) => self.broadcast(Some(origin), outbound.msg),
            Delivery::All => self.broadcast(None, outbound.msg),
        }
    }

    fn broadcast(&self, except: Option<ConnectionId>, msg: ServerMsg) {
        for entry in self.slots.iter() {
            let id = *entry.key();
            if Some(id) == except || !entry.synced {
                continue;
            }
            push(id, &entry.tx, msg.clone());
        }
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

fn push(id: ConnectionId, tx: &mpsc::Sender<ServerMsg>, msg: ServerMsg) {
    match tx.try_send(msg) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            warn!(conn_id = %id, "Outbound queue full, dropping message");
        }
        Err(TrySendError::Closed(_)) => {
            debug!(conn_id = %id, "Outbound queue closed");
        }
    }
}
