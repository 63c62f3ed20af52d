//! # Transport
//!
//! Transport-layer core of the signaling stack: it owns established
//! sockets, classifies their failures into one retryable-or-not
//! vocabulary, and keeps the live tables of connections and transactions.
//!
//! ## Core Components
//!
//! - **Target**: logical endpoint resolution with per-protocol defaults
//! - **Connection**: one socket, stream or datagram, behind one surface
//! - **ConnError**: the classified error every I/O path returns
//! - **Packet**: opaque bytes stamped with their endpoints
//! - **Pool**: a registry plus a one-shot shutdown signal
//!
//! Message parsing and the transaction state machines live above this
//! crate; they hand keys and payload bytes down and get classified errors
//! and packets back.

pub mod conn;
pub mod error;
pub mod packet;
pub mod pool;
pub mod target;

pub use conn::{Connection, MAX_DATAGRAM_SIZE, READ_TIMEOUT, WRITE_TIMEOUT};
pub use error::{is_eof_error, is_temporary_error, is_timeout_error, ConnError};
pub use packet::Packet;
pub use pool::Pool;
pub use target::{
    default_port, Protocol, Target, DEFAULT_HOST, DEFAULT_PROTOCOL, DEFAULT_TCP_PORT,
    DEFAULT_TLS_PORT, DEFAULT_UDP_PORT, MTU,
};
