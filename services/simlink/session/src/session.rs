//! Client session with a simulation endpoint.
//!
//! A [`Session`] owns the connection, performs the HELLO handshake within a
//! timeout and then exchanges node trees. Connection retries are left to the
//! caller.

use anyhow::{bail, Context};
use simlink_wire::{Node, StreamDecoder, WireError};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::handshake::{recv_ack_hello, send_hello, AckHello, ClientType, Hello, PROTOCOL_VERSION};
use crate::transport::{connect_tcp, recv_node, send_node};

/// Configuration for a simulator session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Simulator address
    pub addr: SocketAddr,
    /// Kind of client announced in HELLO
    pub client_type: ClientType,
    /// Client name announced in HELLO
    pub client_name: String,
    /// Client version announced in HELLO
    pub client_version: String,
    /// Protocol version announced in HELLO
    pub protocol_version: u16,
    /// Timeout for connecting and for the handshake
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 1436)),
            client_type: ClientType::ControlDesk,
            client_name: "simlink".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            protocol_version: PROTOCOL_VERSION,
            timeout: Duration::from_secs(10),
        }
    }
}

impl SessionConfig {
    /// HELLO message described by this configuration
    pub fn hello(&self) -> Hello {
        Hello {
            protocol_version: self.protocol_version,
            client_type: self.client_type,
            name: self.client_name.clone(),
            version: self.client_version.clone(),
        }
    }
}

/// Statistics for a session
#[derive(Clone, Debug, Default)]
pub struct SessionStats {
    /// Total bytes sent
    pub bytes_out: u64,
    /// Number of trees sent
    pub messages_sent: u64,
    /// Number of trees received
    pub messages_received: u64,
    /// Timestamp of last received tree
    pub last_message_in: Option<Instant>,
}

/// An established, handshaken session
pub struct Session<S = TcpStream> {
    stream: BufStream<S>,
    decoder: StreamDecoder,
    ack: AckHello,
    stats: SessionStats,
}

impl Session<TcpStream> {
    /// Connect to the configured address and perform the handshake
    pub async fn connect(config: &SessionConfig) -> anyhow::Result<Self> {
        info!("Connecting to simulator at {}", config.addr);
        let stream = tokio::time::timeout(config.timeout, connect_tcp(config.addr))
            .await
            .with_context(|| format!("timed out connecting to {}", config.addr))?
            .with_context(|| format!("failed to connect to {}", config.addr))?;
        Self::establish(stream, config).await
    }

    /// Address of the simulator
    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.get_ref().peer_addr()
    }
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Run the handshake over an already connected stream.
    ///
    /// Fails if the simulator does not answer within the configured timeout
    /// or rejects the client.
    pub async fn establish(stream: S, config: &SessionConfig) -> anyhow::Result<Self> {
        let mut stream = BufStream::new(stream);
        let mut decoder = StreamDecoder::new();

        let hello = config.hello();
        let ack = tokio::time::timeout(config.timeout, async {
            send_hello(&mut stream, &hello).await?;
            recv_ack_hello(&mut stream, &mut decoder).await
        })
        .await
        .context("timed out waiting for ACK_HELLO")??;

        if !ack.accepted() {
            bail!("simulator rejected HELLO with status {}", ack.status);
        }
        info!(
            "Handshake complete: simulator version {}, info '{}'",
            ack.server_version, ack.connection_info
        );

        Ok(Self {
            stream,
            decoder,
            ack,
            stats: SessionStats::default(),
        })
    }

    /// ACK_HELLO received during the handshake
    pub fn ack(&self) -> &AckHello {
        &self.ack
    }

    /// Traffic counters
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Send a node tree
    pub async fn send(&mut self, node: &Node) -> Result<(), WireError> {
        let written = send_node(&mut self.stream, node).await?;
        self.stats.bytes_out += written as u64;
        self.stats.messages_sent += 1;
        Ok(())
    }

    /// Wait for the next node tree. No timeout: push streams may idle.
    pub async fn recv(&mut self) -> Result<Node, WireError> {
        let node = recv_node(&mut self.stream, &mut self.decoder).await?;
        self.stats.messages_received += 1;
        self.stats.last_message_in = Some(Instant::now());
        Ok(node)
    }

    /// Flush and shut down the write side
    pub async fn close(mut self) -> std::io::Result<()> {
        debug!(
            "Closing session after {} sent / {} received",
            self.stats.messages_sent, self.stats.messages_received
        );
        self.stream.shutdown().await
    }
}
