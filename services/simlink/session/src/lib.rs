//! TCP transport, HELLO handshake and client sessions for simlink.
//!
//! This crate sits on top of the node-tree codec in `simlink-wire` and
//! provides what a client needs to talk to a simulation endpoint: connecting,
//! announcing itself with HELLO, checking the ACK_HELLO answer and then
//! exchanging node trees.
//!
//! ## Features
//!
//! - **TCP Transport**: connect helper plus `send_node` / `recv_node` for any tokio stream
//! - **Handshake Protocol**: HELLO / ACK_HELLO mapping onto node trees
//! - **Session**: connect and handshake within a timeout, then send/receive trees
//!
//! ## Example
//!
//! ```rust,no_run
//! use simlink_session::{Session, SessionConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SessionConfig {
//!     client_name: "Desk".to_string(),
//!     ..SessionConfig::default()
//! };
//!
//! let mut session = Session::connect(&config).await?;
//! println!("Connected to simulator {}", session.ack().server_version);
//!
//! // Handle pushed trees
//! loop {
//!     let tree = session.recv().await?;
//!     println!("Received tree {:?} with {} children", tree.id, tree.children.len());
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod handshake;
pub mod session;
pub mod transport;

// Re-export main types
pub use handshake::{
    recv_ack_hello, send_hello, AckHello, ClientType, Hello, CMD_ACK_HELLO, CMD_HELLO,
    GROUP_CONNECTION, PROTOCOL_VERSION, STATUS_ACCEPTED,
};
pub use session::{Session, SessionConfig, SessionStats};
pub use transport::{connect_tcp, recv_node, send_node};
