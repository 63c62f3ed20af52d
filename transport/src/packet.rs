//! # Packet
//!
//! Opaque byte buffer with the metadata the protocol layer needs to route
//! it: network kind, source, destination. No framing is defined here.

use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    pub data: Vec<u8>,
    pub net: String,
    pub src: String,
    pub dest: String,
}

impl Packet {
    pub fn new(net: &str, data: Vec<u8>) -> Self {
        Self {
            data,
            net: net.to_string(),
            src: String::new(),
            dest: String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packet (net {}, src {}, dest {}, len {})",
            self.net,
            self.src,
            self.dest,
            self.data.len()
        )
    }
}
