//! Node-tree wire codec for the simulator link.
//!
//! This crate provides the low-level codec used to talk to a simulation
//! endpoint: a recursive tree of nodes with typed leaf content, its encoder,
//! and an incremental decoder that can be fed from a fixed buffer, chunk by
//! chunk, or from an async reader.
//!
//! ## Features
//!
//! - **Typed content**: fixed-width little-endian integers and floats with range
//!   checks, Latin-1 text, raw byte blobs
//! - **Streaming decode**: explicit state machine, resumable at any field boundary
//! - **Async adapter**: reads exactly one field at a time from a tokio `AsyncRead`
//!
//! ## Wire Format
//!
//! ```text
//! container:  u32 0x00000000 | u16 id | child frames ... | u32 0xFFFFFFFF
//! leaf:       u32 len        | u16 id | (len - 2) content bytes
//! ```
//!
//! All integers are little-endian. A message is one container; there is no
//! outer length or checksum.
//!
//! ## Example
//!
//! ```rust
//! use simlink_wire::{decode, ContentKind, Node};
//!
//! let msg = Node::new(1).with_child(Node::leaf(2, ContentKind::Byte, 42u8));
//! let bytes = msg.encode().unwrap();
//! let back = decode(&bytes).unwrap();
//! assert_eq!(back.child(2).unwrap().raw_content(), Some(&[42u8][..]));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod content;
pub mod error;
pub mod node;
pub mod stream;

// Re-export main types
pub use codec::{decode, DecoderState, StreamDecoder, DEFAULT_MAX_CONTENT_LEN, DEFAULT_MAX_DEPTH};
pub use content::{ContentKind, Value};
pub use error::WireError;
pub use node::{Node, CLOSE_MARKER, ID_SIZE, LENGTH_SIZE, OPEN_MARKER};
pub use stream::decode_async;
