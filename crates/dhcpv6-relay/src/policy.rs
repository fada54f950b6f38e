//! The trust policy applied to messages arriving on the client link.

use dhcpv6_relay_proto::message::MessageType;

/// The outcome of the trust-policy check for one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The message may be wrapped and relayed upstream.
    Forward,
    /// The message is a server-originated type and must not be accepted from
    /// the client link.
    DiscardReply,
    /// The message is already relay-wrapped and the link is not trusted to
    /// originate relay traffic.
    DiscardUntrustedRelay,
}

/// Decides whether a message received on the client link may be relayed.
///
/// Reply and Relay-Reply are discarded regardless of the trust flag, since
/// accepting them would let a client spoof a server response. Relay-Forward
/// is accepted only from a trusted link, so that an untrusted peer cannot
/// inject a forged relay chain with arbitrary hop counts or nested options.
/// Every other type, including unassigned values, is forwarded. Only the
/// outermost message type is inspected; nested relay options are not.
pub fn verdict(message_type: MessageType, trusted_link: bool) -> Verdict {
    match message_type {
        MessageType::Reply | MessageType::RelayReply => Verdict::DiscardReply,
        MessageType::RelayForward if !trusted_link => Verdict::DiscardUntrustedRelay,
        _ => Verdict::Forward,
    }
}
