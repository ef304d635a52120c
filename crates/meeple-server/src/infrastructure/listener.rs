//! TCP listener: accepts connections, runs the handshake, and shuttles
//! frames between sockets and the [`GameHub`].
//!
//! # Task layout
//!
//! ```text
//! accept loop ──spawn──► connection task (writer + shutdown)
//!      │                      └─spawn──► reader task
//!      │                                     │ HubEvent::Request
//!      └────────── hub task ◄────────────────┘
//!                    │ Outbound → per-connection mpsc
//! ```
//!
//! The hub task is the only owner of the game.  Every connection has its own
//! unbounded outbound queue, so the order in which the hub emits messages is
//! the order in which each client receives them.  Reading happens in a
//! dedicated task because `read_frame` is not cancel-safe and must never be
//! raced inside a `select!`.
//!
//! Writes are raced against shutdown: a peer that stops reading must not be
//! able to keep [`ServerHandle::stop`] waiting.  Connections still running
//! after [`SHUTDOWN_GRACE`] are aborted.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use meeple_core::{
    protocol::messages::{ClientRequest, DisconnectReason, ServerMessage, PROTOCOL_VERSION},
    read_frame, write_frame, ClientId, FrameError,
};
pub use meeple_core::DEFAULT_PORT;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::application::hub::{GameHub, Outbound, Recipient};

/// How long connections get to say goodbye once shutdown is signalled.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Upper bound for the farewell frame and the socket shutdown of a closing
/// connection.
const FAREWELL_TIMEOUT: Duration = Duration::from_millis(500);

/// Error type for the listener.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("listener I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server task failed: {0}")]
    Stop(#[from] tokio::task::JoinError),
}

/// Configuration for the listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    /// `0` picks a free port; see [`ServerHandle::local_addr`].
    pub port: u16,
    /// How long a new connection may take to send its `Hello`.
    pub handshake_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

/// A running server.  Dropping the handle also shuts the server down, but
/// only [`ServerHandle::stop`] waits for it to finish.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Signals shutdown and waits until every connection has been told and
    /// closed.
    ///
    /// # Errors
    ///
    /// [`ServerError::Stop`] if the server task panicked.
    pub async fn stop(self) -> Result<(), ServerError> {
        let _ = self.shutdown.send(true);
        self.task.await?;
        info!("server on {} stopped", self.local_addr);
        Ok(())
    }
}

/// Internal messages into the hub task.
enum HubEvent {
    Connected {
        nickname: String,
        outbound: mpsc::UnboundedSender<ServerMessage>,
        reply: oneshot::Sender<ClientId>,
    },
    Request {
        client: ClientId,
        request: ClientRequest,
    },
    Disconnected {
        client: ClientId,
    },
}

/// Binds the listener and starts serving `hub`.
///
/// Returns once the socket is bound, so a caller can connect immediately.
///
/// # Errors
///
/// [`ServerError::BindFailed`] when the address is unavailable.
pub async fn start_server(config: &ServerConfig, hub: GameHub) -> Result<ServerHandle, ServerError> {
    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::BindFailed { addr, source })?;
    let local_addr = listener.local_addr()?;
    info!("serving game {} on {local_addr}", hub.game().id);

    let (shutdown, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(accept_loop(
        listener,
        hub,
        shutdown_rx,
        config.handshake_timeout,
    ));

    Ok(ServerHandle {
        local_addr,
        shutdown,
        task,
    })
}

async fn accept_loop(
    listener: TcpListener,
    hub: GameHub,
    mut shutdown: watch::Receiver<bool>,
    handshake_timeout: Duration,
) {
    let (hub_tx, hub_rx) = mpsc::unbounded_channel();
    let hub_task = tokio::spawn(run_hub(hub, hub_rx));
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("connection from {peer}");
                    connections.spawn(serve_connection(
                        stream,
                        peer,
                        hub_tx.clone(),
                        shutdown.clone(),
                        handshake_timeout,
                    ));
                }
                Err(e) => warn!("accept failed: {e}"),
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    warn!("connection task failed: {e}");
                }
            }
        }
    }

    drop(listener);
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while let Some(joined) = connections.join_next().await {
            if let Err(e) = joined {
                warn!("connection task failed during shutdown: {e}");
            }
        }
    })
    .await;
    if drained.is_err() {
        warn!("aborting {} connections that did not close in time", connections.len());
        connections.abort_all();
        while connections.join_next().await.is_some() {}
    }
    drop(hub_tx);
    if let Err(e) = hub_task.await {
        warn!("hub task failed: {e}");
    }
}

/// Owns the hub and the outbound queue of every admitted connection.
async fn run_hub(mut hub: GameHub, mut events: mpsc::UnboundedReceiver<HubEvent>) {
    let mut clients: HashMap<ClientId, mpsc::UnboundedSender<ServerMessage>> = HashMap::new();

    while let Some(event) = events.recv().await {
        let outbound = match event {
            HubEvent::Connected {
                nickname,
                outbound,
                reply,
            } => {
                let (client_id, welcome) = hub.register(&nickname);
                let _ = outbound.send(welcome);
                clients.insert(client_id, outbound);
                if reply.send(client_id).is_err() {
                    clients.remove(&client_id);
                    hub.unregister(client_id)
                } else {
                    Vec::new()
                }
            }
            HubEvent::Request { client, request } => hub.handle(client, request),
            HubEvent::Disconnected { client } => {
                clients.remove(&client);
                hub.unregister(client)
            }
        };
        deliver(&clients, outbound);
    }
    debug!("hub stopped with {} clients registered", hub.client_count());
}

fn deliver(clients: &HashMap<ClientId, mpsc::UnboundedSender<ServerMessage>>, outbound: Vec<Outbound>) {
    for Outbound { to, message } in outbound {
        match to {
            Recipient::One(client) => {
                if let Some(tx) = clients.get(&client) {
                    let _ = tx.send(message);
                }
            }
            Recipient::All => {
                for tx in clients.values() {
                    let _ = tx.send(message.clone());
                }
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub_tx: mpsc::UnboundedSender<HubEvent>,
    mut shutdown: watch::Receiver<bool>,
    handshake_timeout: Duration,
) {
    let _ = stream.set_nodelay(true);
    let (mut reader, mut writer) = stream.into_split();

    // ── Handshake ─────────────────────────────────────────────────────────────
    let hello = tokio::select! {
        _ = shutdown.changed() => return,
        hello = tokio::time::timeout(handshake_timeout, read_frame::<_, ClientRequest>(&mut reader)) => hello,
    };
    let nickname = match hello {
        Ok(Ok(ClientRequest::Hello {
            protocol_version,
            nickname,
        })) if protocol_version == PROTOCOL_VERSION => nickname,
        Ok(Ok(ClientRequest::Hello {
            protocol_version, ..
        })) => {
            reject(
                &mut writer,
                format!("unsupported protocol version {protocol_version}, server speaks {PROTOCOL_VERSION}"),
            )
            .await;
            return;
        }
        Ok(Ok(other)) => {
            debug!("{peer} sent {other:?} before Hello");
            reject(&mut writer, "expected Hello".to_string()).await;
            return;
        }
        Ok(Err(e)) => {
            debug!("{peer} dropped during handshake: {e}");
            return;
        }
        Err(_) => {
            warn!("{peer} did not complete the handshake in time");
            return;
        }
    };

    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    let (reply_tx, reply_rx) = oneshot::channel();
    let connected = HubEvent::Connected {
        nickname,
        outbound: out_tx,
        reply: reply_tx,
    };
    if hub_tx.send(connected).is_err() {
        return;
    }
    let Ok(client) = reply_rx.await else {
        return;
    };

    // ── Session ───────────────────────────────────────────────────────────────
    let reader_hub = hub_tx.clone();
    let mut reader_task = ReaderTask(tokio::spawn(async move {
        loop {
            match read_frame::<_, ClientRequest>(&mut reader).await {
                Ok(ClientRequest::Goodbye) => break,
                Ok(request) => {
                    if reader_hub.send(HubEvent::Request { client, request }).is_err() {
                        break;
                    }
                }
                Err(FrameError::Closed) => break,
                Err(e) => {
                    warn!("dropping {client}: {e}");
                    break;
                }
            }
        }
    }));

    let mut reader_done = false;
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                let bye = ServerMessage::Disconnect { reason: DisconnectReason::ServerShutdown };
                let _ = tokio::time::timeout(FAREWELL_TIMEOUT, write_frame(&mut writer, &bye)).await;
                break;
            }
            message = out_rx.recv() => match message {
                Some(message) => {
                    // A half-written frame is never followed by another one.
                    let written = tokio::select! {
                        _ = shutdown.changed() => break,
                        written = write_frame(&mut writer, &message) => written,
                    };
                    if let Err(e) = written {
                        debug!("write to {client} failed: {e}");
                        break;
                    }
                }
                None => break,
            },
            _ = &mut reader_task.0, if !reader_done => {
                reader_done = true;
                break;
            }
        }
    }

    if !reader_done {
        reader_task.0.abort();
        let _ = (&mut reader_task.0).await;
    }
    let _ = hub_tx.send(HubEvent::Disconnected { client });
    let _ = tokio::time::timeout(FAREWELL_TIMEOUT, writer.shutdown()).await;
    debug!("connection {client} ({peer}) closed");
}

/// Reader half of a connection.  Aborted when dropped, so aborting the
/// connection task also releases the reader's handle on the hub.
struct ReaderTask(JoinHandle<()>);

impl Drop for ReaderTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn reject(writer: &mut OwnedWriteHalf, reason: String) {
    let rejected = ServerMessage::Rejected { reason };
    let _ = tokio::time::timeout(FAREWELL_TIMEOUT, write_frame(writer, &rejected)).await;
    let _ = tokio::time::timeout(FAREWELL_TIMEOUT, writer.shutdown()).await;
}
