//! TCP transport for simulator sessions.
//!
//! Thin helpers that move encoded node trees over any tokio byte stream.

use simlink_wire::{Node, StreamDecoder, WireError};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

/// Connect to a TCP address
pub async fn connect_tcp(addr: SocketAddr) -> tokio::io::Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Encode `node` and write it out, flushing afterwards.
///
/// Returns the number of bytes written.
pub async fn send_node<W>(writer: &mut W, node: &Node) -> Result<usize, WireError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let bytes = node.encode()?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    trace!("Sent node {:?} ({} bytes)", node.id, bytes.len());
    Ok(bytes.len())
}

/// Read the next complete node tree
pub async fn recv_node<R>(reader: &mut R, decoder: &mut StreamDecoder) -> Result<Node, WireError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let node = decoder.decode_from(reader).await?;
    trace!("Received node {:?} ({} nodes)", node.id, node.subtree_len());
    Ok(node)
}
