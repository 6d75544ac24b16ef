//! Per-session room membership.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tokio::sync::RwLock;

use super::client::Client;

/// Broadcast group for one quiz session.
///
/// Membership is two-tier: `players` holds every player authorized to connect
/// (via join), `clients` holds the subset with a live connection. A player may
/// be authorized without a live client before their WebSocket arrives. Room
/// deletion is keyed solely off the live map becoming empty; the authorized
/// set is not consulted.
pub struct Room {
    pub(crate) state: RwLock<RoomState>,
}

pub(crate) struct RoomState {
    /// playerID -> live connection.
    pub(crate) clients: HashMap<String, Arc<Client>>,
    /// playerIDs authorized to connect.
    pub(crate) players: HashSet<String>,
}

impl Room {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(RoomState {
                clients: HashMap::new(),
                players: HashSet::new(),
            }),
        }
    }

    /// Number of live connections.
    pub async fn live_count(&self) -> usize {
        self.state.read().await.clients.len()
    }

    /// Whether the player was authorized via a join.
    pub async fn is_authorized(&self, player_id: &str) -> bool {
        self.state.read().await.players.contains(player_id)
    }
}
