//! DHCPv6 option codes and the generic relay option.

use bytes::{Buf, Bytes};

use crate::{
    relay::DecodeError,
    utils::encoded_type,
    wire_encoding::{BoundedWriter, CapacityExceeded, WireDecode},
};

encoded_type!(
    /// A DHCPv6 option code.
    ///
    /// Only the base options from [RFC 8415] and the relay-annotation codes
    /// this crate emits are named; everything else is carried numerically.
    ///
    /// [RFC 8415]: https://www.rfc-editor.org/rfc/rfc8415.html#section-21
    pub enum OptionCode(u16) {
        #[allow(missing_docs)]
        ClientId = 1,
        #[allow(missing_docs)]
        ServerId = 2,
        #[allow(missing_docs)]
        IaNa = 3,
        #[allow(missing_docs)]
        IaTa = 4,
        #[allow(missing_docs)]
        IaAddr = 5,
        #[allow(missing_docs)]
        OptionRequest = 6,
        #[allow(missing_docs)]
        Preference = 7,
        #[allow(missing_docs)]
        ElapsedTime = 8,
        /// The wrapped client (or nested relay) message, always the final
        /// option of a relay message.
        RelayMessage = 9,
        #[allow(missing_docs)]
        Authentication = 11,
        #[allow(missing_docs)]
        ServerUnicast = 12,
        #[allow(missing_docs)]
        StatusCode = 13,
        #[allow(missing_docs)]
        RapidCommit = 14,
        #[allow(missing_docs)]
        UserClass = 15,
        #[allow(missing_docs)]
        VendorClass = 16,
        #[allow(missing_docs)]
        VendorOpts = 17,
        #[allow(missing_docs)]
        InterfaceId = 18,
        /// Relay-supplied identifier of the remote peer of the client link.
        RemoteId = 37,
        /// Relay-supplied name of the subscriber on the client link.
        SubscriberId = 38,
        #[allow(missing_docs)]
        RelayId = 53,
        /// The UDP port on which the relay expects the server's reply.
        RelayPort = 135;
        /// An option code without an assigned meaning in this crate.
        Unassigned = 0 | 10 | 19..=36 | 39..=52 | 54..=134 | 136..=u16::MAX,
    }
);

/// The error returned when an option value cannot be described by the 16-bit
/// option length field.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("option value of {0} bytes exceeds the 16-bit option length field")]
pub struct OptionTooLong(pub usize);

/// A single `(code, length, value)` option of a DHCPv6 relay message.
///
/// The value length is validated against the 16-bit length field at
/// construction, so encoding an existing option can only fail on buffer
/// capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOption {
    /// The option's code.
    pub code: OptionCode,
    value: Bytes,
}

impl RelayOption {
    /// Length in bytes of the code and length fields preceding every value.
    pub const PREAMBLE_LEN: usize = 4;

    /// Creates an option, verifying that the value fits the length field.
    pub fn new(code: OptionCode, value: Bytes) -> Result<Self, OptionTooLong> {
        if value.len() > usize::from(u16::MAX) {
            return Err(OptionTooLong(value.len()));
        }
        Ok(Self { code, value })
    }

    /// The option's value bytes.
    pub fn value(&self) -> &Bytes {
        &self.value
    }

    /// Consumes the option, returning its value bytes.
    pub fn into_value(self) -> Bytes {
        self.value
    }

    /// The encoded length of the option, including the code and length fields.
    pub fn encoded_length(&self) -> usize {
        Self::PREAMBLE_LEN + self.value.len()
    }

    /// Writes the option into the bounded writer.
    ///
    /// The whole option is checked against the remaining capacity before any
    /// byte is written, so a refusal leaves the writer unchanged.
    pub fn encode_to(&self, writer: &mut BoundedWriter<'_>) -> Result<(), CapacityExceeded> {
        writer.ensure(self.encoded_length())?;
        writer.append_u16(self.code.into())?;
        writer.append_u16(self.value.len() as u16)?;
        writer.append_slice(&self.value)?;
        Ok(())
    }
}

impl<T: Buf> WireDecode<T> for RelayOption {
    type Error = DecodeError;

    fn decode(data: &mut T) -> Result<Self, Self::Error> {
        if data.remaining() < Self::PREAMBLE_LEN {
            return Err(DecodeError::MessageEmptyOrTruncated);
        }

        let code = OptionCode::from(data.get_u16());
        let length = usize::from(data.get_u16());
        if length > data.remaining() {
            return Err(DecodeError::MessageEmptyOrTruncated);
        }

        Ok(Self {
            code,
            value: data.copy_to_bytes(length),
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;

    #[test]
    fn rejects_value_longer_than_length_field() {
        let value = Bytes::from(vec![0; usize::from(u16::MAX) + 1]);
        assert_eq!(
            RelayOption::new(OptionCode::RemoteId, value),
            Err(OptionTooLong(usize::from(u16::MAX) + 1))
        );
    }

    mod encode {
        use super::*;

        macro_rules! test_successful_encode {
            ($name:ident, $code:expr, $value:expr, $expected_bytes:expr) => {
                #[test]
                fn $name() {
                    let option =
                        RelayOption::new($code, Bytes::from_static($value)).expect("short value");

                    let mut buffer = BytesMut::new();
                    let mut writer = BoundedWriter::new(&mut buffer, 64);
                    option.encode_to(&mut writer).expect("should fit");

                    assert_eq!(writer.finish().as_ref(), $expected_bytes);
                }
            };
        }

        test_successful_encode!(
            relay_port,
            OptionCode::RelayPort,
            &[0x02, 0x23],
            [0, 135, 0, 2, 0x02, 0x23]
        );

        test_successful_encode!(
            remote_id,
            OptionCode::RemoteId,
            b"0123456789",
            [0, 37, 0, 10, b'0', b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9']
        );

        test_successful_encode!(empty_value, OptionCode::InterfaceId, &[], [0, 18, 0, 0]);

        #[test]
        fn refused_option_leaves_writer_unchanged() {
            let option = RelayOption::new(OptionCode::SubscriberId, Bytes::from_static(b"peer"))
                .expect("short value");

            let mut buffer = BytesMut::new();
            let mut writer = BoundedWriter::new(&mut buffer, 7);
            assert_eq!(
                option.encode_to(&mut writer),
                Err(CapacityExceeded {
                    required: 8,
                    remaining: 7
                })
            );
            assert_eq!(writer.written(), 0);
        }
    }

    mod decode {
        use super::*;

        #[test]
        fn recovers_code_and_value() {
            let mut data = Bytes::from_static(&[0, 38, 0, 3, b'a', b'b', b'c', 0xff]);

            let option = RelayOption::decode(&mut data).expect("valid option");
            assert_eq!(option.code, OptionCode::SubscriberId);
            assert_eq!(option.value().as_ref(), b"abc");
            // the trailing byte belongs to the next option
            assert_eq!(data.remaining(), 1);
        }

        #[test]
        fn fails_on_truncated_preamble() {
            let mut data = Bytes::from_static(&[0, 9, 0]);
            assert_eq!(
                RelayOption::decode(&mut data),
                Err(DecodeError::MessageEmptyOrTruncated)
            );
        }

        #[test]
        fn fails_on_truncated_value() {
            let mut data = Bytes::from_static(&[0, 9, 0, 5, 1, 2]);
            assert_eq!(
                RelayOption::decode(&mut data),
                Err(DecodeError::MessageEmptyOrTruncated)
            );
        }
    }
}
