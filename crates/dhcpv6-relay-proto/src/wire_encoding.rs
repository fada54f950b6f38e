//! Traits and helpers for encoding and decoding relay messages.

use bytes::{BufMut, Bytes, BytesMut};

/// A trait for types decodable from a wire format, without any additional information.
pub trait WireDecode<T>: Sized {
    /// The error type returned on a failed decode.
    type Error;

    /// Decodes an object from the provided data, such as a [`bytes::Buf`].
    ///
    /// The buffer is advanced by as many bytes as necessary to decode the object.
    /// Bytes are consumed regardless of whether or not decoding fails.
    fn decode(data: &mut T) -> Result<Self, Self::Error>;
}

/// A trait for types that encode as `N` chunks of bytes.
///
/// Types whose wire format is an assembled header followed by one or more
/// payloads they already hold as [`Bytes`] implement this trait to avoid
/// copying the payloads: only the header side is written into the provided
/// buffer, and the payload chunks are cheap clones of the stored handles.
pub trait WireEncodeVec<const N: usize> {
    /// The error type returned on a failed encode.
    type Error: std::fmt::Debug;

    /// Encodes the object as `N` chunks, assembling any header bytes in the
    /// provided buffer.
    ///
    /// On error, nothing is appended to the buffer.
    fn encode_with(&self, buffer: &mut BytesMut) -> Result<[Bytes; N], Self::Error>;

    /// The length of the encoded object over all chunks.
    fn total_length(&self) -> usize;

    /// The buffer capacity required for the assembled (non-payload) chunks.
    fn required_capacity(&self) -> usize;

    /// Encodes the object as `N` chunks in a freshly allocated buffer.
    fn encode_to_bytes_vec(&self) -> Result<[Bytes; N], Self::Error> {
        let mut buffer = BytesMut::with_capacity(self.required_capacity());
        self.encode_with(&mut buffer)
    }
}

/// The error returned when a write would exceed a [`BoundedWriter`]'s capacity.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("write of {required} bytes exceeds the remaining buffer capacity of {remaining}")]
pub struct CapacityExceeded {
    /// The number of bytes the refused write required.
    pub required: usize,
    /// The capacity that remained in the writer at the time of the write.
    pub remaining: usize,
}

/// A writer that appends to a [`BytesMut`] subject to a fixed byte budget.
///
/// Every append verifies the remaining budget before mutating the buffer; a
/// refused append leaves the buffer untouched and returns [`CapacityExceeded`].
/// Callers composing several appends into a larger all-or-nothing write can
/// use [`Self::rollback`] to discard everything written through the writer.
#[derive(Debug)]
pub struct BoundedWriter<'a> {
    buffer: &'a mut BytesMut,
    start: usize,
    capacity: usize,
}

impl<'a> BoundedWriter<'a> {
    /// Creates a writer that appends at most `capacity` bytes to the buffer.
    pub fn new(buffer: &'a mut BytesMut, capacity: usize) -> Self {
        let start = buffer.len();
        buffer.reserve(capacity);
        Self {
            buffer,
            start,
            capacity,
        }
    }

    /// The number of bytes written through this writer so far.
    pub fn written(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// The number of bytes that may still be written.
    pub fn remaining(&self) -> usize {
        self.capacity - self.written()
    }

    /// Verifies that `required` bytes fit within the remaining capacity.
    pub fn ensure(&self, required: usize) -> Result<(), CapacityExceeded> {
        if required > self.remaining() {
            Err(CapacityExceeded {
                required,
                remaining: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    /// Appends a single byte.
    pub fn append_u8(&mut self, value: u8) -> Result<(), CapacityExceeded> {
        self.ensure(1)?;
        self.buffer.put_u8(value);
        Ok(())
    }

    /// Appends an unsigned 16-bit value in network byte order.
    pub fn append_u16(&mut self, value: u16) -> Result<(), CapacityExceeded> {
        self.ensure(2)?;
        self.buffer.put_u16(value);
        Ok(())
    }

    /// Appends a slice of bytes.
    pub fn append_slice(&mut self, value: &[u8]) -> Result<(), CapacityExceeded> {
        self.ensure(value.len())?;
        self.buffer.put_slice(value);
        Ok(())
    }

    /// Discards everything written through this writer, restoring the buffer
    /// to its state at construction.
    pub fn rollback(self) {
        let start = self.start;
        self.buffer.truncate(start);
    }

    /// Splits the written bytes off the underlying buffer as a frozen chunk.
    pub fn finish(self) -> Bytes {
        let start = self.start;
        self.buffer.split_off(start).freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_within_capacity() {
        let mut buffer = BytesMut::new();
        let mut writer = BoundedWriter::new(&mut buffer, 5);

        writer.append_u8(0xab).unwrap();
        writer.append_u16(0x0102).unwrap();
        writer.append_slice(&[3, 4]).unwrap();
        assert_eq!(writer.written(), 5);
        assert_eq!(writer.remaining(), 0);

        assert_eq!(writer.finish().as_ref(), [0xab, 1, 2, 3, 4]);
    }

    #[test]
    fn refused_append_leaves_buffer_untouched() {
        let mut buffer = BytesMut::new();
        let mut writer = BoundedWriter::new(&mut buffer, 4);

        writer.append_u16(0xbeef).unwrap();
        assert_eq!(
            writer.append_slice(&[1, 2, 3]),
            Err(CapacityExceeded {
                required: 3,
                remaining: 2
            })
        );
        assert_eq!(writer.written(), 2);

        assert_eq!(writer.finish().as_ref(), [0xbe, 0xef]);
    }

    #[test]
    fn rollback_restores_preexisting_content() {
        let mut buffer = BytesMut::new();
        buffer.put_slice(b"keep");

        let mut writer = BoundedWriter::new(&mut buffer, 8);
        writer.append_slice(b"drop").unwrap();
        writer.rollback();

        assert_eq!(buffer.as_ref(), b"keep");
    }

    #[test]
    fn finish_excludes_preexisting_content() {
        let mut buffer = BytesMut::new();
        buffer.put_slice(b"prior");

        let mut writer = BoundedWriter::new(&mut buffer, 2);
        writer.append_u16(0x1234).unwrap();

        assert_eq!(writer.finish().as_ref(), [0x12, 0x34]);
        assert_eq!(buffer.as_ref(), b"prior");
    }
}
