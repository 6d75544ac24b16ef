//! Broadcast hub: the room registry, its control loop, and the membership
//! operations called by the quiz service and the WebSocket handler.
//!
//! Two classes of membership mutation exist. Connection lifecycle transitions
//! (register, unregister) all funnel through two channels consumed by a
//! single control loop, which gives them a total order across every room.
//! Direct operations (create/join/leave/broadcast/send) lock the registry
//! only to find a room, release it, then take that room's own lock: the
//! registry lock is never held while waiting on a room lock, and no lock is
//! held across I/O.

mod client;
mod room;

pub use client::Client;
pub use room::Room;

use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{Mutex, RwLock, mpsc},
};

use crate::{domain::WsMessage, ws::Connection};
use client::{Outbound, read_pump, write_pump};

#[derive(Debug, Error)]
pub enum HubError {
    #[error("room already exists")]
    RoomExists,

    #[error("room not found")]
    RoomNotFound,

    #[error("player already in room")]
    PlayerAlreadyConnected,

    #[error("player not in room")]
    PlayerNotConnected,

    #[error("player not registered in room")]
    PlayerNotAuthorized,

    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

struct ControlChannels {
    register_rx: mpsc::UnboundedReceiver<Arc<Client>>,
    unregister_rx: mpsc::UnboundedReceiver<Arc<Client>>,
}

/// Top-level room registry.
pub struct Hub {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
    register_tx: mpsc::UnboundedSender<Arc<Client>>,
    unregister_tx: mpsc::UnboundedSender<Arc<Client>>,
    control: Mutex<Option<ControlChannels>>,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Hub {
    pub fn new() -> Self {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        Self {
            rooms: RwLock::new(HashMap::new()),
            register_tx,
            unregister_tx,
            control: Mutex::new(Some(ControlChannels {
                register_rx,
                unregister_rx,
            })),
        }
    }

    /// The control loop. Consumes all register/unregister transitions in a
    /// single task, giving them a total order across the whole registry.
    /// Call once, in its own task; a second call returns immediately.
    pub async fn run(self: Arc<Self>) {
        let Some(mut channels) = self.control.lock().await.take() else {
            tracing::warn!("hub control loop already running");
            return;
        };

        loop {
            tokio::select! {
                client = channels.register_rx.recv() => match client {
                    Some(client) => self.handle_register(client).await,
                    None => break,
                },
                client = channels.unregister_rx.recv() => match client {
                    Some(client) => self.handle_unregister(client).await,
                    None => break,
                },
            }
        }
    }

    /// Register transition: a connection finished its handshake. If the room
    /// was deleted concurrently the signal is dropped; an existing live
    /// client for the player is replaced, since a reconnect supersedes the
    /// stale connection.
    async fn handle_register(&self, client: Arc<Client>) {
        let room = self.find_room(&client.session_id).await;
        let Some(room) = room else {
            tracing::warn!(
                session_id = %client.session_id,
                "register for non-existent room dropped"
            );
            return;
        };

        let mut state = room.state.write().await;
        state.clients.insert(client.player_id.clone(), client);
    }

    /// Unregister transition. The client is removed only if it is still the
    /// currently registered one for its player; an older unregister must
    /// never evict a newer reconnect. An empty live map deletes the room.
    async fn handle_unregister(&self, client: Arc<Client>) {
        let Some(room) = self.find_room(&client.session_id).await else {
            return;
        };

        let mut state = room.state.write().await;
        if let Some(current) = state.clients.get(&client.player_id)
            && Arc::ptr_eq(current, &client)
        {
            state.clients.remove(&client.player_id);
            // Actually disconnect the evicted client: its write pump sends a
            // Close frame and drops the socket.
            client.signal_shutdown();
        }
        if state.clients.is_empty() {
            self.rooms.write().await.remove(&client.session_id);
        }
    }

    async fn find_room(&self, session_id: &str) -> Option<Arc<Room>> {
        self.rooms.read().await.get(session_id).cloned()
    }

    /// Allocate an empty room for a session. Fails if one already exists.
    pub async fn create_room(&self, session_id: &str) -> Result<(), HubError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(session_id) {
            return Err(HubError::RoomExists);
        }
        rooms.insert(session_id.to_owned(), Arc::new(Room::new()));
        Ok(())
    }

    /// Authorize a player into a room. No client is created yet; the
    /// WebSocket connection arrives later. Fails if the player already has a
    /// live connection.
    pub async fn join_room(&self, session_id: &str, player_id: &str) -> Result<(), HubError> {
        let room = self
            .find_room(session_id)
            .await
            .ok_or(HubError::RoomNotFound)?;

        let mut state = room.state.write().await;
        if state.clients.contains_key(player_id) {
            return Err(HubError::PlayerAlreadyConnected);
        }
        state.players.insert(player_id.to_owned());
        Ok(())
    }

    /// Remove a player's live client. Authorization persists, so the player
    /// may reconnect.
    pub async fn leave_room(&self, session_id: &str, player_id: &str) -> Result<(), HubError> {
        let room = self
            .find_room(session_id)
            .await
            .ok_or(HubError::RoomNotFound)?;

        let mut state = room.state.write().await;
        if state.clients.remove(player_id).is_none() {
            return Err(HubError::PlayerNotConnected);
        }
        Ok(())
    }

    /// Serialize the message once and enqueue it on every live client
    /// without blocking. A full queue triggers asynchronous unregistration of
    /// that client instead of stalling fan-out to the others; the drop is
    /// never surfaced to the broadcaster.
    pub async fn broadcast_to_room(
        &self,
        session_id: &str,
        message: &WsMessage,
    ) -> Result<(), HubError> {
        let room = self
            .find_room(session_id)
            .await
            .ok_or(HubError::RoomNotFound)?;

        let data = Bytes::from(serde_json::to_vec(message)?);

        let state = room.state.read().await;
        for client in state.clients.values() {
            if client.try_enqueue(Outbound::Message(data.clone())).is_err() {
                let _ = self.unregister_tx.send(client.clone());
            }
        }
        Ok(())
    }

    /// Send to a single live client, with the same drop-on-full policy as
    /// broadcast.
    pub async fn send_to_player(
        &self,
        session_id: &str,
        player_id: &str,
        message: &WsMessage,
    ) -> Result<(), HubError> {
        let room = self
            .find_room(session_id)
            .await
            .ok_or(HubError::RoomNotFound)?;

        let data = Bytes::from(serde_json::to_vec(message)?);

        let state = room.state.read().await;
        let client = state
            .clients
            .get(player_id)
            .ok_or(HubError::PlayerNotConnected)?;
        if client.try_enqueue(Outbound::Message(data)).is_err() {
            let _ = self.unregister_tx.send(client.clone());
        }
        Ok(())
    }

    /// Whether the player was authorized into the room via [`join_room`].
    ///
    /// [`join_room`]: Hub::join_room
    pub async fn is_player_authorized(&self, session_id: &str, player_id: &str) -> bool {
        match self.find_room(session_id).await {
            Some(room) => room.is_authorized(player_id).await,
            None => false,
        }
    }

    /// Attach an upgraded connection as a live client and start its pumps.
    ///
    /// The client is installed directly into the room under the room's lock
    /// before the register signal is sent, so a broadcast running between the
    /// two cannot miss a just-connected client.
    pub async fn attach<S>(
        self: &Arc<Self>,
        session_id: String,
        player_id: String,
        connection: Connection<S>,
    ) -> Result<(), HubError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        if !self.is_player_authorized(&session_id, &player_id).await {
            return Err(HubError::PlayerNotAuthorized);
        }

        let room = self
            .find_room(&session_id)
            .await
            .ok_or(HubError::RoomNotFound)?;

        let (client, channels) = Client::new(session_id, player_id);
        {
            let mut state = room.state.write().await;
            state.clients.insert(client.player_id.clone(), client.clone());
        }

        let _ = self.register_tx.send(client.clone());

        let (reader, writer) = connection.into_split();
        tokio::spawn(write_pump(
            client.clone(),
            writer,
            channels.outbound_rx,
            channels.shutdown_rx,
            self.unregister_tx.clone(),
        ));
        tokio::spawn(read_pump(client, reader, self.unregister_tx.clone()));

        Ok(())
    }
}
