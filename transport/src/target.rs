//! # Addressing
//!
//! Logical endpoint descriptions and their resolution into dialable
//! `host:port` strings, with protocol-specific default ports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::EnumString;

pub const MTU: usize = 1500;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PROTOCOL: &str = "TCP";

pub const DEFAULT_UDP_PORT: u16 = 5060;
pub const DEFAULT_TCP_PORT: u16 = 5060;
pub const DEFAULT_TLS_PORT: u16 = 5061;

#[derive(
    strum_macros::Display,
    EnumString,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Copy,
    Clone,
    Deserialize,
    Serialize,
)]
#[strum(ascii_case_insensitive)]
pub enum Protocol {
    #[strum(serialize = "udp")]
    Udp,
    #[strum(serialize = "tcp")]
    Tcp,
    #[strum(serialize = "tls")]
    Tls,
}

impl Default for Protocol {
    fn default() -> Self {
        Protocol::Tcp
    }
}

impl Protocol {
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Udp => DEFAULT_UDP_PORT,
            Protocol::Tcp => DEFAULT_TCP_PORT,
            Protocol::Tls => DEFAULT_TLS_PORT,
        }
    }
}

/// Default port for a protocol name, case-insensitive. Unrecognized
/// protocols fall back to the TCP default.
pub fn default_port(protocol: &str) -> u16 {
    Protocol::from_str(protocol.trim())
        .map(|protocol| protocol.default_port())
        .unwrap_or(DEFAULT_TCP_PORT)
}

/// A logical (protocol, host, port) endpoint prior to address resolution.
/// Constructed by upper layers per outbound attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Target {
    pub protocol: String,
    pub host: String,
    pub port: Option<u16>,
}

impl Target {
    /// The dialable `host:port` for this target. Never fails: an unset
    /// host falls back to [`DEFAULT_HOST`], an unset port to the
    /// protocol's default.
    pub fn addr(&self) -> String {
        let host = if self.host.trim().is_empty() {
            DEFAULT_HOST
        } else {
            &self.host
        };
        let port = self.port.unwrap_or_else(|| default_port(&self.protocol));
        format!("{}:{}", host, port)
    }

    /// Set the protocol and fill any unset host/port with defaults.
    /// Idempotent, and never overwrites an explicitly set host or port.
    pub fn fill_host_and_port(&mut self, protocol: &str) -> &mut Self {
        self.protocol = protocol.to_string();
        if self.host.trim().is_empty() {
            self.host = DEFAULT_HOST.to_string();
        }
        if self.port.is_none() {
            self.port = Some(default_port(&self.protocol));
        }
        self
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let protocol = if self.protocol.trim().is_empty() {
            DEFAULT_PROTOCOL.to_string()
        } else {
            self.protocol.to_uppercase()
        };
        write!(f, "{} {}", protocol, self.addr())
    }
}
