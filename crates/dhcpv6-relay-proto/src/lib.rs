//! Types, encoding, and decoding for the DHCPv6 relay-agent wire protocol.
//!
//! This crate contains the socket-free half of the relay: the message-type
//! and option-code registries from RFC 8415, a bounds-checked writer for
//! assembling the fixed-capacity relay header, and the [`relay::RelayForward`]
//! envelope that wraps a client message for transmission to an upstream
//! DHCPv6 server.

pub mod message;
pub mod option;
pub mod relay;
pub(crate) mod utils;
pub mod wire_encoding;
