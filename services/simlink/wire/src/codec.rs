//! Incremental decoding of node trees.
//!
//! [`StreamDecoder`] is a finite-state machine that consumes the wire format
//! one field at a time. It can be fed arbitrary chunks: when a field is not
//! fully buffered yet it returns `Ok(None)` and resumes from the same state on
//! the next call.
//!
//! ```text
//! Reset ──00000000──▶ NodeId ──id──▶ ContentLength ◀──────────────┐
//!                       ▲              │ 0       │ n>1    │ FFFFFFFF
//!                       └──────────────┘         ▼        ▼ (pop; root → Done)
//!                                    NodeIdForContent ──id──▶ Content(n-2)
//! ```

use crate::content::{ContentKind, Value};
use crate::error::WireError;
use crate::node::{Node, CLOSE_MARKER, ID_SIZE, LENGTH_SIZE, OPEN_MARKER};
use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace};

/// Maximum content length of a single leaf (16 MiB default)
pub const DEFAULT_MAX_CONTENT_LEN: usize = 16 * 1024 * 1024;

/// Maximum container nesting depth, root included
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Decoder states; each names the field it is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Waiting for the root open marker
    Reset,
    /// Waiting for a length-or-zero field or a close marker
    ContentLength,
    /// Waiting for the id of the container just opened
    NodeId,
    /// Waiting for the id of a leaf carrying `len` content bytes
    NodeIdForContent {
        /// Content length announced by the frame
        len: usize,
    },
    /// Waiting for the content bytes of leaf `id`
    Content {
        /// Leaf id
        id: u16,
        /// Content length
        len: usize,
    },
}

impl DecoderState {
    /// Number of bytes the state consumes in one step
    pub fn field_len(self) -> usize {
        match self {
            DecoderState::Reset | DecoderState::ContentLength => LENGTH_SIZE,
            DecoderState::NodeId | DecoderState::NodeIdForContent { .. } => ID_SIZE,
            DecoderState::Content { len, .. } => len,
        }
    }
}

/// Outcome of one decoder step
enum Step {
    /// More fields needed
    Continue,
    /// The root container closed
    Done(Node),
}

/// Streaming decoder for node trees
///
/// Holds all progress of the message being decoded (state, stack of open
/// containers) so decoding can stop at any field boundary and pick up later.
#[derive(Debug)]
pub struct StreamDecoder {
    state: DecoderState,
    /// Open containers, root at the bottom; the top is the cursor
    open: Vec<Node>,
    max_content_len: usize,
    max_depth: usize,
}

impl StreamDecoder {
    /// Create a new decoder with default limits
    pub fn new() -> Self {
        Self {
            state: DecoderState::Reset,
            open: Vec::new(),
            max_content_len: DEFAULT_MAX_CONTENT_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the largest accepted leaf content length
    pub fn with_max_content_len(mut self, max: usize) -> Self {
        self.max_content_len = max;
        self
    }

    /// Set the deepest accepted container nesting
    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    /// Current state
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Whether a message is partially decoded
    pub fn in_progress(&self) -> bool {
        self.state != DecoderState::Reset
    }

    /// Number of containers currently open
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Bytes the next step consumes
    pub fn field_len(&self) -> usize {
        self.state.field_len()
    }

    /// Drop any partially decoded tree and wait for a new root marker
    pub fn reset(&mut self) {
        if self.in_progress() {
            debug!(depth = self.open.len(), "Discarding partially decoded tree");
        }
        self.state = DecoderState::Reset;
        self.open.clear();
    }

    /// Decode one tree from a buffer.
    ///
    /// Consumes complete fields from `buf`. Returns `Ok(None)` if the buffer
    /// ran out before the root container closed; the decoder keeps its state
    /// and continues with the next call. Bytes after the closing marker are
    /// left in `buf`. On error the partial tree is discarded.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Node>, WireError> {
        loop {
            let need = self.field_len();
            if buf.len() < need {
                return Ok(None);
            }
            let field = buf.split_to(need).freeze();
            if let Some(root) = self.step(field)? {
                return Ok(Some(root));
            }
        }
    }

    /// Error describing why the byte source could not finish the tree,
    /// given `available` bytes buffered for the current field.
    ///
    /// A source that dries up exactly between frames while containers are
    /// open is incomplete; one that stops inside a field is missing bytes.
    pub fn starved(&self, available: usize) -> WireError {
        if self.state == DecoderState::ContentLength && available == 0 {
            WireError::Incomplete {
                open: self.open.len(),
            }
        } else {
            WireError::MissingBytes {
                needed: self.field_len(),
                available,
            }
        }
    }

    /// Apply one complete field (exactly [`Self::field_len`] bytes).
    ///
    /// Returns the finished tree when the root container closes.
    pub(crate) fn step(&mut self, field: Bytes) -> Result<Option<Node>, WireError> {
        debug_assert_eq!(field.len(), self.field_len());
        trace!(state = ?self.state, "Decoder step");

        match self.advance(field) {
            Ok(Step::Done(root)) => {
                debug!(nodes = root.subtree_len(), id = ?root.id, "Decoded node tree");
                Ok(Some(root))
            }
            Ok(Step::Continue) => Ok(None),
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    fn advance(&mut self, mut field: Bytes) -> Result<Step, WireError> {
        match self.state {
            DecoderState::Reset => {
                let marker = field.get_u32_le();
                if marker != OPEN_MARKER {
                    return Err(WireError::Framing(format!(
                        "expected root open marker, got {marker:#010x}"
                    )));
                }
                self.open.push(Node::default());
                self.state = DecoderState::NodeId;
            }
            DecoderState::NodeId => {
                let id = field.get_u16_le();
                let cursor = self.cursor()?;
                cursor.id = Some(id);
                trace!(id, "Set container id");
                self.state = DecoderState::ContentLength;
            }
            DecoderState::NodeIdForContent { len } => {
                let id = field.get_u16_le();
                self.state = DecoderState::Content { id, len };
            }
            DecoderState::ContentLength => {
                let value = field.get_u32_le();
                match value {
                    CLOSE_MARKER => {
                        let closed = self
                            .open
                            .pop()
                            .ok_or_else(|| WireError::Framing("close without open".into()))?;
                        trace!(id = ?closed.id, "Closed container");
                        match self.open.last_mut() {
                            Some(parent) => parent.push(closed),
                            None => {
                                self.state = DecoderState::Reset;
                                return Ok(Step::Done(closed));
                            }
                        }
                    }
                    OPEN_MARKER => {
                        if self.open.len() >= self.max_depth {
                            return Err(WireError::Framing(format!(
                                "nesting deeper than {}",
                                self.max_depth
                            )));
                        }
                        self.open.push(Node::default());
                        self.state = DecoderState::NodeId;
                    }
                    1 => {
                        return Err(WireError::Framing(
                            "frame length 1 cannot hold a node id".into(),
                        ));
                    }
                    n => {
                        let len = n as usize - ID_SIZE;
                        if len > self.max_content_len {
                            return Err(WireError::Size(len));
                        }
                        self.state = DecoderState::NodeIdForContent { len };
                    }
                }
            }
            DecoderState::Content { id, .. } => {
                trace!(id, len = field.len(), "Got leaf content");
                let leaf = Node::leaf(id, ContentKind::Raw, Value::Bytes(field));
                self.cursor()?.push(leaf);
                self.state = DecoderState::ContentLength;
            }
        }
        Ok(Step::Continue)
    }

    fn cursor(&mut self) -> Result<&mut Node, WireError> {
        self.open
            .last_mut()
            .ok_or_else(|| WireError::Framing("no open container".into()))
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a complete tree from a fixed buffer.
///
/// The id following the root open marker is the id of the returned root.
/// Bytes following the root close marker are ignored.
pub fn decode(bytes: &[u8]) -> Result<Node, WireError> {
    let mut decoder = StreamDecoder::new();
    let mut buf = BytesMut::from(bytes);
    match decoder.decode(&mut buf)? {
        Some(root) => {
            if !buf.is_empty() {
                debug!(trailing = buf.len(), "Ignoring bytes after root close");
            }
            Ok(root)
        }
        None => Err(decoder.starved(buf.len())),
    }
}
