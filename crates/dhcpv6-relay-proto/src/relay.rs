//! Representation, encoding, and decoding of the RELAY-FORW envelope.

use std::net::Ipv6Addr;

use bytes::{Buf, Bytes, BytesMut};

use crate::{
    message::MessageType,
    option::{OptionCode, RelayOption},
    wire_encoding::{BoundedWriter, CapacityExceeded, WireDecode, WireEncodeVec},
};

#[allow(missing_docs)]
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    #[error("relay header does not fit the bounded header buffer")]
    HeaderOverflow(#[from] CapacityExceeded),
    #[error("payload length cannot be encoded in the 16-bit option length field")]
    PayloadTooLarge,
}

#[allow(missing_docs)]
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("message is empty or was truncated")]
    MessageEmptyOrTruncated,
    #[error("message type {0} is not relay-forward")]
    WrongMessageType(u8),
    #[error("the relay message option is missing")]
    MissingRelayMessage,
    #[error("options are present after the relay message option")]
    OptionAfterRelayMessage,
}

/// A RELAY-FORW envelope wrapping one client message towards a DHCPv6 server.
///
/// The wire format is the 34-byte relay header (message type, hop count,
/// link-address, peer-address) followed by the annotation options and,
/// always last, the Relay Message option carrying the wrapped message
/// verbatim. Everything up to the wrapped message must fit the bounded
/// header buffer of [`Self::HEADER_CAPACITY`] bytes; encoding is
/// all-or-nothing and fails with [`EncodeError::HeaderOverflow`] otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayForward {
    /// The number of relay agents that had already wrapped the payload.
    pub hop_count: u8,
    /// The address of the client link, unspecified when the relay does not
    /// assign the link prefix itself.
    pub link_address: Ipv6Addr,
    /// The source address of the wrapped message.
    pub peer_address: Ipv6Addr,
    /// Annotation options, excluding the final Relay Message option.
    pub options: Vec<RelayOption>,
    /// The wrapped message, carried verbatim as the Relay Message option.
    pub payload: Bytes,
}

impl RelayForward {
    /// Length in bytes of the fixed relay header.
    pub const HEADER_LEN: usize = 34;
    /// Capacity in bytes of the header buffer: the fixed header plus all
    /// option bytes other than the wrapped message itself.
    pub const HEADER_CAPACITY: usize = 256;

    /// Wraps a message received from `peer_address` for relaying upstream.
    ///
    /// The hop count is 0 for a client-originated message and one more than
    /// the inner hop count when the payload is itself a relay-forward
    /// message. A payload too short to carry a hop-count byte counts as
    /// client-originated. No other byte of the payload is inspected.
    pub fn wrap(peer_address: Ipv6Addr, payload: Bytes) -> Self {
        let hop_count = match (payload.first(), payload.get(1)) {
            (Some(&message_type), Some(&hops))
                if MessageType::from(message_type) == MessageType::RelayForward =>
            {
                hops.wrapping_add(1)
            }
            _ => 0,
        };

        Self {
            hop_count,
            link_address: Ipv6Addr::UNSPECIFIED,
            peer_address,
            options: Vec::new(),
            payload,
        }
    }

    /// The length of the header-side encoding: everything except the wrapped
    /// message bytes.
    pub fn header_length(&self) -> usize {
        Self::HEADER_LEN
            + self
                .options
                .iter()
                .map(RelayOption::encoded_length)
                .sum::<usize>()
            + RelayOption::PREAMBLE_LEN
    }
}

impl WireEncodeVec<2> for RelayForward {
    type Error = EncodeError;

    fn encode_with(&self, buffer: &mut BytesMut) -> Result<[Bytes; 2], EncodeError> {
        let payload_length =
            u16::try_from(self.payload.len()).map_err(|_| EncodeError::PayloadTooLarge)?;

        let mut writer = BoundedWriter::new(buffer, Self::HEADER_CAPACITY);
        let result = (|| {
            writer.append_u8(MessageType::RelayForward.into())?;
            writer.append_u8(self.hop_count)?;
            writer.append_slice(&self.link_address.octets())?;
            writer.append_slice(&self.peer_address.octets())?;
            for option in &self.options {
                option.encode_to(&mut writer)?;
            }
            // must be last: its value is the second chunk
            writer.append_u16(OptionCode::RelayMessage.into())?;
            writer.append_u16(payload_length)
        })();

        match result {
            Ok(()) => Ok([writer.finish(), self.payload.clone()]),
            Err(err) => {
                writer.rollback();
                Err(err.into())
            }
        }
    }

    #[inline]
    fn total_length(&self) -> usize {
        self.header_length() + self.payload.len()
    }

    #[inline]
    fn required_capacity(&self) -> usize {
        Self::HEADER_CAPACITY
    }
}

impl<T: Buf> WireDecode<T> for RelayForward {
    type Error = DecodeError;

    fn decode(data: &mut T) -> Result<Self, Self::Error> {
        if data.remaining() < Self::HEADER_LEN {
            return Err(DecodeError::MessageEmptyOrTruncated);
        }

        let message_type = data.get_u8();
        if MessageType::from(message_type) != MessageType::RelayForward {
            return Err(DecodeError::WrongMessageType(message_type));
        }
        let hop_count = data.get_u8();
        let link_address = Ipv6Addr::from(data.get_u128());
        let peer_address = Ipv6Addr::from(data.get_u128());

        let mut options = Vec::new();
        let mut payload = None;
        while data.has_remaining() {
            if payload.is_some() {
                return Err(DecodeError::OptionAfterRelayMessage);
            }
            let option = RelayOption::decode(data)?;
            if option.code == OptionCode::RelayMessage {
                payload = Some(option.into_value());
            } else {
                options.push(option);
            }
        }

        let Some(payload) = payload else {
            return Err(DecodeError::MissingRelayMessage);
        };

        Ok(Self {
            hop_count,
            link_address,
            peer_address,
            options,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_utils::param_test;

    use super::*;

    const PEER: Ipv6Addr = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);

    fn relay_port_option(port: u16) -> RelayOption {
        RelayOption::new(
            OptionCode::RelayPort,
            Bytes::copy_from_slice(&port.to_be_bytes()),
        )
        .expect("two-byte value")
    }

    param_test! {
        wrap_derives_hop_count: [
            solicit: (&[1, 0xde, 0xad], 0),
            reply: (&[7, 200], 0),
            relay_forward: (&[12, 3], 4),
            relay_forward_zero_hops: (&[12, 0, 1], 1),
            relay_forward_without_hop_byte: (&[12], 0),
            relay_forward_max_hops_wraps: (&[12, 255], 0),
            empty_payload: (&[], 0),
        ]
    }
    fn wrap_derives_hop_count(payload: &'static [u8], expected_hop_count: u8) {
        let forward = RelayForward::wrap(PEER, Bytes::from_static(payload));
        assert_eq!(forward.hop_count, expected_hop_count);
        assert_eq!(forward.link_address, Ipv6Addr::UNSPECIFIED);
        assert_eq!(forward.payload.as_ref(), payload);
    }

    mod encode {
        use super::*;

        #[test]
        fn produces_header_and_verbatim_payload_chunks() {
            let payload = Bytes::from_static(&[1, 0xde, 0xad]);
            let mut forward = RelayForward::wrap(PEER, payload.clone());
            forward.options.push(relay_port_option(0x1234));

            let [header, wrapped] = forward.encode_to_bytes_vec().expect("should fit");

            #[rustfmt::skip]
            let expected_header = [
                12, 0,
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
                0xfe, 0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
                0, 135, 0, 2, 0x12, 0x34,
                0, 9, 0, 3,
            ];
            assert_eq!(header.as_ref(), expected_header);
            assert_eq!(wrapped, payload);
            assert_eq!(forward.total_length(), expected_header.len() + 3);
        }

        #[test]
        fn header_may_exactly_fill_the_bounded_buffer() {
            let mut forward = RelayForward::wrap(PEER, Bytes::new());
            let filler = RelayForward::HEADER_CAPACITY
                - RelayForward::HEADER_LEN
                - 2 * RelayOption::PREAMBLE_LEN;
            forward.options.push(
                RelayOption::new(OptionCode::RemoteId, Bytes::from(vec![0xaa; filler]))
                    .expect("short value"),
            );

            let [header, _] = forward.encode_to_bytes_vec().expect("should fit exactly");
            assert_eq!(header.len(), RelayForward::HEADER_CAPACITY);
        }

        #[test]
        fn overflowing_header_fails_without_output() {
            let mut forward = RelayForward::wrap(PEER, Bytes::new());
            let filler = RelayForward::HEADER_CAPACITY
                - RelayForward::HEADER_LEN
                - 2 * RelayOption::PREAMBLE_LEN
                + 1;
            forward.options.push(
                RelayOption::new(OptionCode::RemoteId, Bytes::from(vec![0xaa; filler]))
                    .expect("short value"),
            );

            let mut buffer = BytesMut::new();
            buffer.extend_from_slice(b"xy");

            assert!(matches!(
                forward.encode_with(&mut buffer),
                Err(EncodeError::HeaderOverflow(_))
            ));
            assert_eq!(buffer.as_ref(), b"xy");
        }

        #[test]
        fn oversized_payload_is_rejected() {
            let forward =
                RelayForward::wrap(PEER, Bytes::from(vec![1; usize::from(u16::MAX) + 1]));
            assert_eq!(
                forward.encode_to_bytes_vec(),
                Err(EncodeError::PayloadTooLarge)
            );
        }
    }

    mod decode {
        use super::*;

        #[test]
        fn round_trips_envelope_with_annotations() {
            let payload = Bytes::from_static(&[3, 0x00, 0x11, 0x22]);
            let mut forward = RelayForward::wrap(PEER, payload.clone());
            forward.options = vec![
                relay_port_option(54321),
                RelayOption::new(OptionCode::RemoteId, Bytes::from_static(b"circuit-7"))
                    .expect("short value"),
                RelayOption::new(OptionCode::SubscriberId, Bytes::from_static(b"peer@isp"))
                    .expect("short value"),
            ];

            let [header, wrapped] = forward.encode_to_bytes_vec().expect("should fit");
            let mut datagram = BytesMut::new();
            datagram.extend_from_slice(&header);
            datagram.extend_from_slice(&wrapped);

            let decoded = RelayForward::decode(&mut datagram.freeze()).expect("valid envelope");
            assert_eq!(decoded, forward);
            assert_eq!(decoded.payload, payload);
        }

        #[test]
        fn fails_on_truncated_header() {
            let mut data = Bytes::from_static(&[12, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
            assert_eq!(
                RelayForward::decode(&mut data),
                Err(DecodeError::MessageEmptyOrTruncated)
            );
        }

        #[test]
        fn fails_on_non_relay_message_type() {
            let mut data = Bytes::from(vec![1; RelayForward::HEADER_LEN]);
            assert_eq!(
                RelayForward::decode(&mut data),
                Err(DecodeError::WrongMessageType(1))
            );
        }

        #[test]
        fn fails_without_relay_message_option() {
            let mut forward = RelayForward::wrap(PEER, Bytes::new());
            forward.options.push(relay_port_option(547));

            let [header, _] = forward.encode_to_bytes_vec().expect("should fit");
            // drop the trailing relay-message option preamble
            let mut data = header.slice(..header.len() - RelayOption::PREAMBLE_LEN);

            assert_eq!(
                RelayForward::decode(&mut data),
                Err(DecodeError::MissingRelayMessage)
            );
        }

        #[test]
        fn fails_on_option_after_relay_message() {
            let forward = RelayForward::wrap(PEER, Bytes::from_static(&[1, 2]));
            let [header, wrapped] = forward.encode_to_bytes_vec().expect("should fit");

            let mut datagram = BytesMut::new();
            datagram.extend_from_slice(&header);
            datagram.extend_from_slice(&wrapped);
            // a straggler option behind the wrapped message
            datagram.extend_from_slice(&[0, 18, 0, 0]);

            assert_eq!(
                RelayForward::decode(&mut datagram.freeze()),
                Err(DecodeError::OptionAfterRelayMessage)
            );
        }
    }
}
