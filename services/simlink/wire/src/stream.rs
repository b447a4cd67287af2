//! Decoding node trees from async byte sources.
//!
//! The adapter only ever asks the reader for the bytes of the field the
//! decoder is waiting for, so it never reads past the end of a message and the
//! same reader can be handed back for the next one.

use crate::codec::StreamDecoder;
use crate::error::WireError;
use crate::node::Node;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Read one complete tree from `reader` with a fresh decoder
pub async fn decode_async<R>(reader: &mut R) -> Result<Node, WireError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    StreamDecoder::new().decode_from(reader).await
}

impl StreamDecoder {
    /// Read one complete tree from `reader`.
    ///
    /// Suspends only while waiting for bytes; all progress is kept in the
    /// decoder. If a previous call was cancelled mid-message its partial tree
    /// is discarded first. End of stream before the root closes yields the
    /// same errors as a truncated buffer.
    pub async fn decode_from<R>(&mut self, reader: &mut R) -> Result<Node, WireError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if self.in_progress() {
            debug!("Previous decode was abandoned");
            self.reset();
        }

        let result = self.read_tree(reader).await;
        if result.is_err() {
            self.reset();
        }
        result
    }

    async fn read_tree<R>(&mut self, reader: &mut R) -> Result<Node, WireError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        loop {
            let need = self.field_len();
            let mut field = BytesMut::zeroed(need);
            let mut filled = 0;
            while filled < need {
                let n = reader.read(&mut field[filled..]).await?;
                if n == 0 {
                    return Err(self.starved(filled));
                }
                filled += n;
            }

            if let Some(root) = self.step(field.freeze())? {
                return Ok(root);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentKind, Value};
    use std::io::Cursor;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn telemetry(id: u16, speed: f32) -> Node {
        Node::new(2).with_child(
            Node::new(id)
                .with_child(Node::leaf(1, ContentKind::Single, speed))
                .with_child(Node::leaf(2, ContentKind::String, "Hauptsignal")),
        )
    }

    #[tokio::test]
    async fn test_decode_from_trickling_writer() {
        let tree = telemetry(0x0A, 33.0);
        let bytes = tree.encode().unwrap();
        let (mut client, mut server) = tokio::io::duplex(8);

        let writer = tokio::spawn(async move {
            for chunk in bytes.chunks(3) {
                client.write_all(chunk).await.unwrap();
                tokio::task::yield_now().await;
            }
        });

        let root = decode_async(&mut server).await.unwrap();
        writer.await.unwrap();

        assert_eq!(root.id, Some(2));
        let inner = root.child(0x0A).unwrap();
        assert_eq!(
            inner.child(1).unwrap().read_as(ContentKind::Single).unwrap(),
            Some(Value::Float(33.0))
        );
        assert_eq!(inner.child(2).unwrap().raw_content(), Some(&b"Hauptsignal"[..]));
    }

    #[tokio::test]
    async fn test_consecutive_messages_share_reader() {
        let mut bytes = telemetry(1, 1.0).encode().unwrap().to_vec();
        bytes.extend_from_slice(&telemetry(2, 2.0).encode().unwrap());
        let mut reader = Cursor::new(bytes);

        let mut decoder = StreamDecoder::new();
        let first = decoder.decode_from(&mut reader).await.unwrap();
        let second = decoder.decode_from(&mut reader).await.unwrap();
        assert!(first.child(1).is_some());
        assert!(second.child(2).is_some());

        assert!(matches!(
            decoder.decode_from(&mut reader).await,
            Err(WireError::MissingBytes {
                needed: 4,
                available: 0
            })
        ));
    }

    #[tokio::test]
    async fn test_eof_errors() {
        let bytes = telemetry(1, 1.0).encode().unwrap();

        let mut mid_field = Cursor::new(bytes[..bytes.len() - 2].to_vec());
        assert!(matches!(
            decode_async(&mut mid_field).await,
            Err(WireError::MissingBytes {
                needed: 4,
                available: 2
            })
        ));

        let mut between_frames = Cursor::new(bytes[..bytes.len() - 4].to_vec());
        assert!(matches!(
            decode_async(&mut between_frames).await,
            Err(WireError::Incomplete { open: 1 })
        ));

        let mut garbage = Cursor::new(vec![0xFFu8; 8]);
        assert!(matches!(
            decode_async(&mut garbage).await,
            Err(WireError::Framing(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_decode_discards_partial_tree() {
        let bytes = telemetry(1, 1.0).encode().unwrap();
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&bytes[..10]).await.unwrap();

        let mut decoder = StreamDecoder::new();
        let timed_out =
            tokio::time::timeout(Duration::from_millis(50), decoder.decode_from(&mut server))
                .await;
        assert!(timed_out.is_err());
        assert!(decoder.in_progress());

        let mut fresh = Cursor::new(telemetry(5, 5.0).encode().unwrap().to_vec());
        let root = decoder.decode_from(&mut fresh).await.unwrap();
        assert!(root.child(5).is_some());
        assert!(!decoder.in_progress());
    }
}
