//! Handshake protocol for simulator sessions.
//!
//! This module implements the HELLO / ACK_HELLO exchange that occurs
//! immediately after connection establishment, and the mapping of both
//! messages onto node trees.

use anyhow::{anyhow, bail, Context};
use simlink_wire::{ContentKind, Node, StreamDecoder, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use crate::transport::{recv_node, send_node};

/// Node group for connection setup messages
pub const GROUP_CONNECTION: u16 = 0x0001;
/// HELLO command inside the connection group
pub const CMD_HELLO: u16 = 0x0001;
/// ACK_HELLO command inside the connection group
pub const CMD_ACK_HELLO: u16 = 0x0002;
/// Protocol version announced by default
pub const PROTOCOL_VERSION: u16 = 2;
/// ACK_HELLO status meaning the client was accepted
pub const STATUS_ACCEPTED: u8 = 0;

/// Kind of client announced in HELLO
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    /// Another simulator instance
    Sim = 1,
    /// Control desk / cab hardware
    ControlDesk = 2,
}

impl TryFrom<u16> for ClientType {
    type Error = anyhow::Error;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ClientType::Sim),
            2 => Ok(ClientType::ControlDesk),
            _ => Err(anyhow!("unknown client type {}", value)),
        }
    }
}

/// HELLO message data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    /// Protocol version spoken by the client
    pub protocol_version: u16,
    /// Kind of client
    pub client_type: ClientType,
    /// Free-form client name
    pub name: String,
    /// Client software version
    pub version: String,
}

impl Hello {
    /// HELLO with the default protocol version
    pub fn new(client_type: ClientType, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            client_type,
            name: name.into(),
            version: version.into(),
        }
    }

    /// Map onto the wire tree
    pub fn to_node(&self) -> Node {
        Node::new(GROUP_CONNECTION).with_child(
            Node::new(CMD_HELLO)
                .with_child(Node::leaf(0x0001, ContentKind::Word, self.protocol_version))
                .with_child(Node::leaf(
                    0x0002,
                    ContentKind::Word,
                    self.client_type as u16,
                ))
                .with_child(Node::leaf(0x0003, ContentKind::String, self.name.as_str()))
                .with_child(Node::leaf(0x0004, ContentKind::String, self.version.as_str())),
        )
    }

    /// Parse a decoded HELLO tree
    pub fn from_node(root: &Node) -> anyhow::Result<Self> {
        let cmd = command(root, CMD_HELLO)?;
        let client_type = int_attr(cmd, 0x0002, ContentKind::Word)? as u16;
        Ok(Self {
            protocol_version: int_attr(cmd, 0x0001, ContentKind::Word)? as u16,
            client_type: ClientType::try_from(client_type)?,
            name: text_attr(cmd, 0x0003)?,
            version: text_attr(cmd, 0x0004)?,
        })
    }
}

/// ACK_HELLO message data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckHello {
    /// Version of the simulator
    pub server_version: String,
    /// Connection information reported by the simulator
    pub connection_info: String,
    /// Result of the handshake, [`STATUS_ACCEPTED`] on success
    pub status: u8,
}

impl AckHello {
    /// Whether the simulator accepted the client
    pub fn accepted(&self) -> bool {
        self.status == STATUS_ACCEPTED
    }

    /// Map onto the wire tree
    pub fn to_node(&self) -> Node {
        Node::new(GROUP_CONNECTION).with_child(
            Node::new(CMD_ACK_HELLO)
                .with_child(Node::leaf(
                    0x0001,
                    ContentKind::String,
                    self.server_version.as_str(),
                ))
                .with_child(Node::leaf(
                    0x0002,
                    ContentKind::String,
                    self.connection_info.as_str(),
                ))
                .with_child(Node::leaf(0x0003, ContentKind::Byte, self.status)),
        )
    }

    /// Parse a decoded ACK_HELLO tree
    pub fn from_node(root: &Node) -> anyhow::Result<Self> {
        let cmd = command(root, CMD_ACK_HELLO)?;
        Ok(Self {
            server_version: text_attr(cmd, 0x0001)?,
            connection_info: text_attr(cmd, 0x0002)?,
            status: int_attr(cmd, 0x0003, ContentKind::Byte)? as u8,
        })
    }
}

/// Send a HELLO to open the session
pub async fn send_hello<W>(writer: &mut W, hello: &Hello) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    send_node(writer, &hello.to_node())
        .await
        .context("failed to send HELLO")?;
    debug!("Sent HELLO as {:?} client '{}'", hello.client_type, hello.name);
    Ok(())
}

/// Wait for the simulator's ACK_HELLO
pub async fn recv_ack_hello<R>(reader: &mut R, decoder: &mut StreamDecoder) -> anyhow::Result<AckHello>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let root = recv_node(reader, decoder)
        .await
        .context("failed to read ACK_HELLO")?;
    let ack = AckHello::from_node(&root)?;
    debug!(
        "Received ACK_HELLO: version={}, status={}",
        ack.server_version, ack.status
    );
    Ok(ack)
}

fn command(root: &Node, cmd: u16) -> anyhow::Result<&Node> {
    if root.id != Some(GROUP_CONNECTION) {
        bail!(
            "expected connection group {:#06x}, got {:?}",
            GROUP_CONNECTION,
            root.id
        );
    }
    root.child(cmd)
        .ok_or_else(|| anyhow!("command {:#06x} missing from connection group", cmd))
}

fn attr(cmd: &Node, id: u16, kind: ContentKind) -> anyhow::Result<Value> {
    let node = cmd
        .child(id)
        .ok_or_else(|| anyhow!("attribute {:#06x} missing", id))?;
    match node.read_as(kind)? {
        Some(value) => Ok(value),
        // Locally built trees still carry their typed content
        None => node
            .content
            .clone()
            .ok_or_else(|| anyhow!("attribute {:#06x} has no content", id)),
    }
}

fn int_attr(cmd: &Node, id: u16, kind: ContentKind) -> anyhow::Result<i64> {
    attr(cmd, id, kind)?
        .as_int()
        .ok_or_else(|| anyhow!("attribute {:#06x} is not an integer", id))
}

fn text_attr(cmd: &Node, id: u16) -> anyhow::Result<String> {
    match attr(cmd, id, ContentKind::String)? {
        Value::Text(s) => Ok(s),
        other => bail!("attribute {:#06x} is not text: {}", id, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlink_wire::decode;
    use std::io::Cursor;

    #[test]
    fn test_hello_tree_shape() {
        let hello = Hello::new(ClientType::ControlDesk, "Desk", "1.0");
        let bytes = hello.to_node().encode().unwrap();

        assert_eq!(&bytes[..6], &[0x00, 0x00, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(&bytes[6..12], &[0x00, 0x00, 0x00, 0x00, 0x01, 0x00]);
        // protocol version leaf: len 4, id 1, word 2
        assert_eq!(&bytes[12..20], &[0x04, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00]);

        let parsed = Hello::from_node(&decode(&bytes).unwrap()).unwrap();
        assert_eq!(parsed, hello);
    }

    #[test]
    fn test_ack_hello_parse() {
        let ack = AckHello {
            server_version: "3.4.0.0".to_string(),
            connection_info: "0".to_string(),
            status: STATUS_ACCEPTED,
        };
        let parsed = AckHello::from_node(&decode(&ack.to_node().encode().unwrap()).unwrap()).unwrap();
        assert_eq!(parsed, ack);
        assert!(parsed.accepted());

        // typed trees parse without a wire round trip
        let rejected = AckHello { status: 1, ..ack };
        assert!(!AckHello::from_node(&rejected.to_node()).unwrap().accepted());
    }

    #[test]
    fn test_wrong_message() {
        let hello = Hello::new(ClientType::Sim, "x", "y").to_node();
        let err = AckHello::from_node(&hello).unwrap_err();
        assert!(err.to_string().contains("0x0002"));

        let other_group = Node::new(0x0002).with_child(Node::new(CMD_ACK_HELLO));
        assert!(AckHello::from_node(&other_group).is_err());
    }

    #[tokio::test]
    async fn test_hello_roundtrip() {
        let hello = Hello::new(ClientType::ControlDesk, "Pult", "2.1");

        // Send HELLO to a buffer
        let mut buffer = Vec::new();
        send_hello(&mut buffer, &hello).await.unwrap();

        // Read it back
        let mut decoder = StreamDecoder::new();
        let mut cursor = Cursor::new(buffer);
        let root = recv_node(&mut cursor, &mut decoder).await.unwrap();
        assert_eq!(Hello::from_node(&root).unwrap(), hello);
    }

    #[tokio::test]
    async fn test_recv_ack_hello() {
        let ack = AckHello {
            server_version: "3.5".to_string(),
            connection_info: "ok".to_string(),
            status: 0,
        };
        let mut cursor = Cursor::new(ack.to_node().encode().unwrap().to_vec());
        let mut decoder = StreamDecoder::new();
        let got = recv_ack_hello(&mut cursor, &mut decoder).await.unwrap();
        assert_eq!(got, ack);

        let mut empty = Cursor::new(Vec::new());
        assert!(recv_ack_hello(&mut empty, &mut decoder).await.is_err());
    }
}
