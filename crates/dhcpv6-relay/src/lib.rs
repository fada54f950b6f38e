//! A DHCPv6 relay agent for point-to-point links.
//!
//! The relay listens for DHCPv6 client messages on the link's own link-local
//! address and on the All_DHCP_Relay_Agents_and_Servers multicast group,
//! applies a trust policy to each inbound message, wraps accepted messages in
//! a RELAY-FORW envelope annotated with link-identification options, and
//! transmits them to a configured upstream server.
//!
//! The embedding process supplies the pieces that are deliberately out of
//! scope here: option parsing, the notifications that the link came up or
//! went down (delivered as [`relay::LinkEvent`]s), and the identity of the
//! link itself (the [`link::Link`] trait). The server-to-client response path
//! is not handled: the upstream socket is send-only and RELAY-REPL messages
//! from the server are never read.

pub mod link;
pub mod policy;
pub mod relay;
pub mod sockets;

pub use link::Link;
pub use relay::{LinkEvent, Relay};
