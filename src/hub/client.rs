//! Per-connection client actor: one bounded outbound queue, one read pump and
//! one write pump bridging the WebSocket connection to the hub.

use std::sync::Arc;

use bytes::Bytes;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc, watch},
};

use crate::ws::{ConnectionReader, ConnectionWriter, Frame, OpCode};

/// Capacity of each client's outbound queue. Broadcasts never block on a full
/// queue; the client is dropped instead.
pub(crate) const OUTBOUND_QUEUE_SIZE: usize = 256;

/// Items travelling through a client's outbound queue toward its write pump.
#[derive(Debug)]
pub(crate) enum Outbound {
    /// An application message, written as a text frame.
    Message(Bytes),
    /// A pong reply carrying the payload of the ping that triggered it.
    Pong(Bytes),
}

/// One live (session, player) WebSocket connection.
///
/// Identity matters: the hub compares clients by pointer so that a stale
/// unregister for a replaced connection never evicts its successor.
pub struct Client {
    pub session_id: String,
    pub player_id: String,
    outbound: mpsc::Sender<Outbound>,
    shutdown: watch::Sender<bool>,
}

/// Receiver ends handed to the pumps when a client is constructed.
pub(crate) struct ClientChannels {
    pub(crate) outbound_rx: mpsc::Receiver<Outbound>,
    pub(crate) shutdown_rx: watch::Receiver<bool>,
}

impl Client {
    pub(crate) fn new(session_id: String, player_id: String) -> (Arc<Self>, ClientChannels) {
        Self::with_queue_size(session_id, player_id, OUTBOUND_QUEUE_SIZE)
    }

    pub(crate) fn with_queue_size(
        session_id: String,
        player_id: String,
        queue_size: usize,
    ) -> (Arc<Self>, ClientChannels) {
        let (outbound, outbound_rx) = mpsc::channel(queue_size);
        let (shutdown, shutdown_rx) = watch::channel(false);
        (
            Arc::new(Self {
                session_id,
                player_id,
                outbound,
                shutdown,
            }),
            ClientChannels {
                outbound_rx,
                shutdown_rx,
            },
        )
    }

    /// Non-blocking enqueue. `Err` means the queue is full or the write pump
    /// is gone; the caller decides what to do with the unresponsive client.
    pub(crate) fn try_enqueue(&self, item: Outbound) -> Result<(), ()> {
        self.outbound.try_send(item).map_err(|_| ())
    }

    /// Ask the write pump to send a Close frame and drop the socket.
    pub(crate) fn signal_shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

/// Drains the outbound queue into text frames. Stops on any write failure and
/// signals unregistration; closing the connection is left to the shutdown
/// path so the read pump keeps its ordinary exit.
pub(crate) async fn write_pump<S>(
    client: Arc<Client>,
    mut writer: ConnectionWriter<S>,
    mut channels_rx: mpsc::Receiver<Outbound>,
    mut shutdown_rx: watch::Receiver<bool>,
    unregister: mpsc::UnboundedSender<Arc<Client>>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            item = channels_rx.recv() => {
                let frame = match item {
                    Some(Outbound::Message(data)) => Frame::text(data),
                    Some(Outbound::Pong(payload)) => Frame::pong(payload),
                    // Every sender dropped: the client was discarded.
                    None => {
                        let _ = writer.close().await;
                        break;
                    }
                };
                if let Err(err) = writer.write_frame(frame).await {
                    tracing::debug!(
                        player_id = %client.player_id,
                        "write pump stopping: {err}"
                    );
                    break;
                }
            }
            _ = shutdown_rx.changed() => {
                let _ = writer.close().await;
                break;
            }
        }
    }

    let _ = unregister.send(client);
}

/// Reads frames until the peer closes or errors. Close and read errors stop
/// the pump, signal unregistration and close the connection; pings are
/// answered with pongs carrying the identical payload; text is logged only,
/// since this protocol is push-dominant and inbound commands are out of
/// scope.
pub(crate) async fn read_pump<S>(
    client: Arc<Client>,
    mut reader: ConnectionReader<S>,
    unregister: mpsc::UnboundedSender<Arc<Client>>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let frame = match reader.read_frame().await {
            Ok(frame) => frame,
            Err(err) => {
                tracing::debug!(player_id = %client.player_id, "read pump stopping: {err}");
                break;
            }
        };

        match frame.opcode {
            OpCode::Close => break,
            OpCode::Ping => {
                // A full queue loses the pong; the next ping will retry.
                let _ = client.try_enqueue(Outbound::Pong(frame.payload));
            }
            OpCode::Text => {
                tracing::debug!(
                    player_id = %client.player_id,
                    "received text frame: {}",
                    String::from_utf8_lossy(&frame.payload)
                );
            }
            _ => {}
        }
    }

    let _ = unregister.send(client.clone());
    // Make the write pump emit a Close frame and drop the socket.
    client.signal_shutdown();
}
