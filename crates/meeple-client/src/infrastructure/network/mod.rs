//! Network infrastructure for the client application.
//!
//! [`ServerStub`] is the client's end of one TCP connection to a game
//! server.  It performs the `Hello`/`Welcome` handshake, then runs two
//! tasks for the life of the connection:
//!
//! - a **writer** that drains the outbound request queue onto the socket,
//!   so [`ServerStub::send`] never waits for the network;
//! - a **reader** that decodes pushed [`ServerMessage`]s and hands every
//!   event to the UI task through an [`EventMarshaller`].
//!
//! The reader never touches session state.  When the stream ends on its own
//! it reports `connection_lost` and stops; the UI task decides what that
//! means for the session.

use std::time::Duration;

use meeple_core::{
    protocol::messages::PROTOCOL_VERSION, read_frame, write_frame, ClientId, ClientRequest,
    FrameError, Game, Player, ServerMessage,
};
use thiserror::Error;
use tokio::{
    io::AsyncWriteExt,
    net::TcpStream,
    sync::mpsc,
    task::JoinHandle,
    time,
};
use tracing::{debug, info, warn};

use crate::application::ports::ServerConnection;
use crate::infrastructure::ui_bridge::EventMarshaller;

/// Errors that can occur while opening a connection.
#[derive(Debug, Error)]
pub enum ClientNetworkError {
    /// TCP connection to the server failed.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    /// The server did not answer in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The server refused the handshake.
    #[error("rejected by server: {0}")]
    Rejected(String),
    /// The server answered with something other than a handshake reply.
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// An open connection to a game server.
///
/// Dropping the stub stops the reader at once, so nothing more is queued
/// for the UI.  Requests already queued are still written before the writer
/// exits.
pub struct ServerStub {
    client_id: ClientId,
    requests: mpsc::UnboundedSender<ClientRequest>,
    reader: JoinHandle<()>,
}

impl ServerStub {
    /// Connects to `host:port` and completes the handshake.  Returns the
    /// stub and the game the server welcomed it into.
    ///
    /// `timeout` bounds the TCP connect and the wait for `Welcome`
    /// separately.
    ///
    /// # Errors
    ///
    /// Any [`ClientNetworkError`]; nothing is spawned on failure.
    pub async fn connect(
        host: &str,
        port: u16,
        nickname: &str,
        marshaller: EventMarshaller,
        timeout: Duration,
    ) -> Result<(Self, Game), ClientNetworkError> {
        let addr = format!("{host}:{port}");
        let stream = match time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(ClientNetworkError::ConnectFailed { addr, source }),
            Err(_) => return Err(ClientNetworkError::Timeout(timeout)),
        };
        let _ = stream.set_nodelay(true);
        let (mut reader, mut writer) = stream.into_split();

        let hello = ClientRequest::Hello {
            protocol_version: PROTOCOL_VERSION,
            nickname: nickname.to_string(),
        };
        write_frame(&mut writer, &hello).await?;

        let reply = time::timeout(timeout, read_frame::<_, ServerMessage>(&mut reader))
            .await
            .map_err(|_| ClientNetworkError::Timeout(timeout))??;
        let (client_id, game) = match reply {
            ServerMessage::Welcome { client_id, game } => (client_id, game),
            ServerMessage::Rejected { reason } => return Err(ClientNetworkError::Rejected(reason)),
            other => {
                return Err(ClientNetworkError::Protocol(format!(
                    "expected Welcome, got {other:?}"
                )))
            }
        };
        info!("connected to {addr} as {client_id}");

        let (requests, mut request_rx) = mpsc::unbounded_channel::<ClientRequest>();
        tokio::spawn(async move {
            while let Some(request) = request_rx.recv().await {
                let goodbye = request == ClientRequest::Goodbye;
                if let Err(e) = write_frame(&mut writer, &request).await {
                    debug!("stopped writing to server: {e}");
                    break;
                }
                if goodbye {
                    break;
                }
            }
            let _ = writer.shutdown().await;
        });

        let reader = tokio::spawn(async move {
            loop {
                match read_frame::<_, ServerMessage>(&mut reader).await {
                    Ok(ServerMessage::Event(event)) => marshaller.dispatch(event),
                    Ok(ServerMessage::Pong(n)) => debug!("pong {n}"),
                    Ok(ServerMessage::Disconnect { reason }) => {
                        marshaller.connection_lost(format!("server closed the session ({reason:?})"));
                        break;
                    }
                    Ok(other) => warn!("ignoring unexpected {other:?}"),
                    Err(FrameError::Closed) => {
                        marshaller.connection_lost("server closed the connection");
                        break;
                    }
                    Err(e) => {
                        marshaller.connection_lost(e.to_string());
                        break;
                    }
                }
            }
        });

        Ok((
            Self {
                client_id,
                requests,
                reader,
            },
            game,
        ))
    }

    /// Sends a `Ping`; the matching `Pong` is logged at debug level.
    pub fn ping(&self, n: u64) {
        self.send(ClientRequest::Ping(n));
    }
}

impl ServerConnection for ServerStub {
    fn client_id(&self) -> ClientId {
        self.client_id
    }

    fn is_local_player(&self, player: &Player) -> bool {
        player.slot.is_owned_by(self.client_id)
    }

    fn send(&self, request: ClientRequest) {
        if self.requests.send(request).is_err() {
            debug!("connection writer has stopped; request dropped");
        }
    }
}

impl Drop for ServerStub {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
