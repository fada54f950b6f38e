//! DHCPv6 message types and well-known protocol constants.

use std::{fmt, net::Ipv6Addr};

use crate::utils::encoded_type;

/// The UDP port on which DHCPv6 servers and relay agents listen.
pub const SERVER_PORT: u16 = 547;

/// The UDP port on which DHCPv6 clients listen.
pub const CLIENT_PORT: u16 = 546;

/// The All_DHCP_Relay_Agents_and_Servers link-scoped multicast group.
pub const ALL_RELAY_AGENTS_AND_SERVERS: Ipv6Addr =
    Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0x0001, 0x0002);

encoded_type!(
    /// The message type carried in the first byte of every DHCPv6 message.
    ///
    /// See [RFC 8415, section 7.3] for the registry.
    ///
    /// [RFC 8415, section 7.3]: https://www.rfc-editor.org/rfc/rfc8415.html#section-7.3
    pub enum MessageType(u8) {
        #[allow(missing_docs)]
        Solicit = 1,
        #[allow(missing_docs)]
        Advertise = 2,
        #[allow(missing_docs)]
        Request = 3,
        #[allow(missing_docs)]
        Confirm = 4,
        #[allow(missing_docs)]
        Renew = 5,
        #[allow(missing_docs)]
        Rebind = 6,
        #[allow(missing_docs)]
        Reply = 7,
        #[allow(missing_docs)]
        Release = 8,
        #[allow(missing_docs)]
        Decline = 9,
        #[allow(missing_docs)]
        Reconfigure = 10,
        #[allow(missing_docs)]
        InformationRequest = 11,
        /// A client message wrapped by a relay agent towards a server.
        RelayForward = 12,
        /// A server reply wrapped by a server towards a relay agent.
        RelayReply = 13;
        /// A message type without an assigned meaning.
        Unassigned = 0 | 14..=u8::MAX,
    }
);

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Solicit => "solicit",
            Self::Advertise => "advertise",
            Self::Request => "request",
            Self::Confirm => "confirm",
            Self::Renew => "renew",
            Self::Rebind => "rebind",
            Self::Reply => "reply",
            Self::Release => "release",
            Self::Decline => "decline",
            Self::Reconfigure => "reconfigure",
            Self::InformationRequest => "information_request",
            Self::RelayForward => "relay-forw",
            Self::RelayReply => "relay-repl",
            Self::Unassigned(value) => return write!(f, "{value}"),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use test_utils::param_test;

    use super::*;

    param_test! {
        converts_to_and_from_wire_value: [
            solicit: (1, MessageType::Solicit),
            reply: (7, MessageType::Reply),
            information_request: (11, MessageType::InformationRequest),
            relay_forward: (12, MessageType::RelayForward),
            relay_reply: (13, MessageType::RelayReply),
            reserved_zero: (0, MessageType::Unassigned(0)),
            unassigned: (200, MessageType::Unassigned(200)),
        ]
    }
    fn converts_to_and_from_wire_value(value: u8, expected: MessageType) {
        assert_eq!(MessageType::from(value), expected);
        assert_eq!(u8::from(expected), value);
    }

    param_test! {
        displays_log_name: [
            solicit: (MessageType::Solicit, "solicit"),
            information_request: (MessageType::InformationRequest, "information_request"),
            relay_forward: (MessageType::RelayForward, "relay-forw"),
            relay_reply: (MessageType::RelayReply, "relay-repl"),
            unassigned: (MessageType::Unassigned(42), "42"),
        ]
    }
    fn displays_log_name(message_type: MessageType, expected: &str) {
        assert_eq!(message_type.to_string(), expected);
    }

    #[test]
    fn multicast_group_is_link_scoped() {
        assert_eq!(ALL_RELAY_AGENTS_AND_SERVERS.to_string(), "ff02::1:2");
    }
}
