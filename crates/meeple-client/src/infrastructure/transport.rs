//! TCP implementation of [`SessionTransport`].

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{Connection, GameHost, HostSeed, SessionError, SessionTransport};
use crate::infrastructure::embedded_server::EmbeddedServer;
use crate::infrastructure::network::ServerStub;
use crate::infrastructure::ui_bridge::UiQueue;

/// Hosts games with [`EmbeddedServer`] and connects with [`ServerStub`].
/// Every connection's events go to the same UI queue.
#[derive(Debug, Clone)]
pub struct NetworkTransport {
    queue: UiQueue,
    /// Interface an embedded server listens on.
    pub bind_address: IpAddr,
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
}

impl NetworkTransport {
    pub fn new(queue: UiQueue) -> Self {
        Self {
            queue,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            connect_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
        }
    }
}

#[async_trait]
impl SessionTransport for NetworkTransport {
    async fn host(&self, seed: HostSeed, port: u16) -> Result<Box<dyn GameHost>, SessionError> {
        let server = EmbeddedServer::start(seed, self.bind_address, port, self.handshake_timeout)
            .await
            .map_err(|e| SessionError::Host(e.to_string()))?;
        Ok(Box::new(server))
    }

    async fn connect(
        &self,
        host: &str,
        port: u16,
        nickname: &str,
        epoch: u64,
    ) -> Result<Connection, SessionError> {
        let marshaller = self.queue.marshaller(epoch);
        let (stub, game) = ServerStub::connect(host, port, nickname, marshaller, self.connect_timeout)
            .await
            .map_err(|e| SessionError::Connect {
                addr: format!("{host}:{port}"),
                reason: e.to_string(),
            })?;
        Ok(Connection {
            server: Box::new(stub),
            game,
        })
    }
}
