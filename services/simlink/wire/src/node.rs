//! The recursive node tree and its encoder.

use crate::content::{ContentKind, Value};
use crate::error::WireError;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// Length-or-zero value that opens a container
pub const OPEN_MARKER: u32 = 0x0000_0000;
/// Sentinel that closes the innermost open container
pub const CLOSE_MARKER: u32 = 0xFFFF_FFFF;
/// Size of the length-or-zero field
pub const LENGTH_SIZE: usize = 4;
/// Size of a node id
pub const ID_SIZE: usize = 2;

/// A unit of the tree: either a content leaf or a structural container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node id; required for encoding containers and content leaves
    pub id: Option<u16>,
    /// Leaf content
    pub content: Option<Value>,
    /// Kind the content is packed as; required when `content` is set
    pub content_kind: Option<ContentKind>,
    /// Ordered child nodes
    pub children: Vec<Node>,
}

impl Node {
    /// Create an empty node with the given id
    pub fn new(id: u16) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Create a content leaf
    pub fn leaf(id: u16, kind: ContentKind, value: impl Into<Value>) -> Self {
        Self {
            id: Some(id),
            content: Some(value.into()),
            content_kind: Some(kind),
            children: Vec::new(),
        }
    }

    /// Create a raw leaf, the shape every decoded leaf has
    pub fn raw(id: u16, bytes: impl Into<Bytes>) -> Self {
        Self::leaf(id, ContentKind::Raw, Value::Bytes(bytes.into()))
    }

    /// Append a child, builder style
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child
    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    /// First child carrying `id`
    pub fn child(&self, id: u16) -> Option<&Node> {
        self.children.iter().find(|c| c.id == Some(id))
    }

    /// All children carrying `id`, in order
    pub fn children_with_id(&self, id: u16) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(move |c| c.id == Some(id))
    }

    /// Whether the node is framed as a container
    pub fn is_container(&self) -> bool {
        !self.children.is_empty()
    }

    /// Content bytes of a raw/file leaf
    pub fn raw_content(&self) -> Option<&[u8]> {
        self.content.as_ref().and_then(Value::as_bytes)
    }

    /// Content of a raw leaf reinterpreted as `kind`.
    ///
    /// Returns `Ok(None)` when the node has no byte content.
    pub fn read_as(&self, kind: ContentKind) -> Result<Option<Value>, WireError> {
        self.raw_content().map(|raw| kind.read_value(raw)).transpose()
    }

    /// Number of nodes in this subtree, including `self`
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_len).sum::<usize>()
    }

    /// Encode the subtree into a contiguous buffer
    pub fn encode(&self) -> Result<Bytes, WireError> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Encode the subtree, appending to `buf`.
    ///
    /// On error `buf` may hold a partially written tree.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<(), WireError> {
        let container = self.is_container();
        if container {
            // The decoder reads the field after an open marker as the id
            if self.id.is_none() {
                return Err(WireError::MissingId);
            }
            buf.put_u32_le(OPEN_MARKER);
        }

        let content = match &self.content {
            Some(value) => {
                let kind = self
                    .content_kind
                    .ok_or(WireError::MissingContentType(self.id))?;
                let bytes = kind.encode(value)?;
                let frame_len = u32::try_from(bytes.len() + ID_SIZE)
                    .ok()
                    .filter(|len| *len != CLOSE_MARKER)
                    .ok_or(WireError::Size(bytes.len()))?;
                if self.id.is_none() {
                    return Err(WireError::MissingId);
                }
                buf.put_u32_le(frame_len);
                Some(bytes)
            }
            None => None,
        };

        if let Some(id) = self.id {
            buf.put_u16_le(id);
        }
        if let Some(bytes) = content {
            buf.put_slice(&bytes);
        }

        if container {
            for child in &self.children {
                child.encode_into(buf)?;
            }
            buf.put_u32_le(CLOSE_MARKER);
        }

        Ok(())
    }
}
