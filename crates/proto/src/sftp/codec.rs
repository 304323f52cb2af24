//! SFTP packet framing and field codec.
//!
//! # Frame Format
//!
//! ```text
//! uint32    length      (counts type + payload)
//! byte      type
//! byte[n]   payload     (n = length - 1)
//! ```
//!
//! Every request payload starts with a `uint32` request id, except INIT.
//!
//! # Security
//!
//! - **Size Validation**: Frames larger than the configured maximum are
//!   rejected before any payload buffer is allocated
//! - **Bounded Reads**: Exactly the declared payload length is read, never more
//! - **Cursor Parsing**: Every field read is bounds-checked; truncation is a
//!   hard decode error
//!
//! # Example
//!
//! ```rust
//! use sftpd_proto::sftp::codec::{PacketReader, PacketWriter};
//! use sftpd_proto::sftp::SftpMessageType;
//!
//! let mut writer = PacketWriter::new(SftpMessageType::Handle);
//! writer.put_u32(7);
//! writer.put_string(b"f1.1");
//! let frame = writer.finish();
//!
//! // length (4) + type (1) + id (4) + string (4 + 4)
//! assert_eq!(frame.len(), 17);
//!
//! let mut reader = PacketReader::new(frame.slice(5..));
//! assert_eq!(reader.get_u32().unwrap(), 7);
//! assert_eq!(&reader.get_string().unwrap()[..], b"f1.1");
//! ```

use super::message::SftpMessageType;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use sftpd_platform::{SftpdError, SftpdResult};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Frame header length: `uint32` length + `byte` type.
pub const HEADER_LEN: usize = 5;

/// Minimum payload length accepted after the type byte.
pub const MIN_PAYLOAD_LEN: usize = 2;

/// Default maximum payload length (256 KB).
pub const DEFAULT_MAX_PACKET_LEN: u32 = 256 * 1024;

/// A decoded frame: the raw type byte and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type byte as received (may be unknown)
    pub msg_type: u8,
    /// Payload following the type byte
    pub payload: Bytes,
}

/// Reads length-prefixed frames from a channel.
///
/// Each frame's payload is read into a fresh allocation that the returned
/// [`Frame`] owns, so requests can keep slices of it. Each call to
/// [`FrameReader::next_frame`] consumes exactly one whole frame from the
/// stream, so bytes a handler leaves unparsed never leak into the next frame.
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    max_payload_len: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Creates a frame reader with the given payload limit.
    pub fn new(inner: R, max_payload_len: u32) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            max_payload_len: max_payload_len as usize,
        }
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` if the stream ended cleanly on a frame boundary.
    ///
    /// # Errors
    ///
    /// - [`SftpdError::Io`] if the stream fails or ends inside a frame
    /// - [`SftpdError::Protocol`] if the declared length is too short or
    ///   exceeds the payload limit
    pub async fn next_frame(&mut self) -> SftpdResult<Option<Frame>> {
        let mut header = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = self.inner.read(&mut header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(SftpdError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("channel closed inside frame header ({} of {} bytes)", filled, HEADER_LEN),
                )));
            }
            filled += n;
        }

        let mut hdr = &header[..];
        let length = hdr.get_u32() as usize;
        let msg_type = hdr.get_u8();

        // The type byte is part of the declared length.
        let payload_len = length.saturating_sub(1);
        if length == 0 || payload_len < MIN_PAYLOAD_LEN {
            return Err(SftpdError::Protocol(format!(
                "Packet too short: declared length {}",
                length
            )));
        }
        if payload_len > self.max_payload_len {
            return Err(SftpdError::Protocol(format!(
                "Packet too large: {} bytes (maximum {})",
                payload_len, self.max_payload_len
            )));
        }

        self.buf.clear();
        self.buf.resize(payload_len, 0);
        self.inner.read_exact(&mut self.buf[..]).await?;

        Ok(Some(Frame {
            msg_type,
            payload: self.buf.split().freeze(),
        }))
    }
}

/// Cursor over a frame payload.
///
/// All accessors are bounds-checked and return [`SftpdError::Protocol`] on
/// truncated input.
#[derive(Debug, Clone)]
pub struct PacketReader {
    data: Bytes,
}

impl PacketReader {
    /// Creates a cursor at the start of `data`.
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.remaining()
    }

    fn need(&self, n: usize, what: &str) -> SftpdResult<()> {
        if self.data.remaining() < n {
            return Err(SftpdError::Protocol(format!(
                "Truncated {}: need {} bytes, have {}",
                what,
                n,
                self.data.remaining()
            )));
        }
        Ok(())
    }

    /// Reads one byte.
    pub fn get_u8(&mut self) -> SftpdResult<u8> {
        self.need(1, "byte")?;
        Ok(self.data.get_u8())
    }

    /// Reads a big-endian `uint32`.
    pub fn get_u32(&mut self) -> SftpdResult<u32> {
        self.need(4, "uint32")?;
        Ok(self.data.get_u32())
    }

    /// Reads a big-endian `uint64`.
    pub fn get_u64(&mut self) -> SftpdResult<u64> {
        self.need(8, "uint64")?;
        Ok(self.data.get_u64())
    }

    /// Reads exactly `n` raw bytes without copying.
    pub fn get_bytes(&mut self, n: usize) -> SftpdResult<Bytes> {
        self.need(n, "byte run")?;
        Ok(self.data.split_to(n))
    }

    /// Reads a length-prefixed string as raw bytes.
    pub fn get_string(&mut self) -> SftpdResult<Bytes> {
        let len = self.get_u32()? as usize;
        self.need(len, "string")?;
        Ok(self.data.split_to(len))
    }

    /// Reads a length-prefixed string as text, replacing invalid UTF-8.
    pub fn get_text(&mut self) -> SftpdResult<String> {
        let raw = self.get_string()?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }
}

/// Marks a reserved `uint32` length field inside a [`PacketWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a reserved length must be patched"]
pub struct LengthMark(usize);

/// Two-pass frame builder.
///
/// The frame length is reserved up front and patched with the body's byte
/// count by [`PacketWriter::finish`]. The same mechanism is available for
/// nested length fields through [`PacketWriter::reserve_len`] and
/// [`PacketWriter::patch_len`].
#[derive(Debug)]
pub struct PacketWriter {
    buf: BytesMut,
    frame_len: LengthMark,
}

impl PacketWriter {
    /// Starts a frame of the given type.
    pub fn new(msg_type: SftpMessageType) -> Self {
        Self::with_capacity(msg_type, 64)
    }

    /// Starts a frame with room for `capacity` body bytes.
    pub fn with_capacity(msg_type: SftpMessageType, capacity: usize) -> Self {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + capacity);
        let frame_len = LengthMark(buf.len());
        buf.put_u32(0);
        buf.put_u8(msg_type as u8);
        Self { buf, frame_len }
    }

    /// Reserves a `uint32` length field to be patched later.
    pub fn reserve_len(&mut self) -> LengthMark {
        let mark = LengthMark(self.buf.len());
        self.buf.put_u32(0);
        mark
    }

    /// Patches a reserved length with the number of bytes written after it.
    pub fn patch_len(&mut self, mark: LengthMark) {
        let start = mark.0;
        let len = (self.buf.len() - start - 4) as u32;
        self.buf[start..start + 4].copy_from_slice(&len.to_be_bytes());
    }

    /// Writes one byte.
    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Writes a big-endian `uint32`.
    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    /// Writes a big-endian `uint64`.
    pub fn put_u64(&mut self, value: u64) {
        self.buf.put_u64(value);
    }

    /// Writes a length-prefixed string.
    pub fn put_string(&mut self, value: &[u8]) {
        self.buf.put_u32(value.len() as u32);
        self.buf.put_slice(value);
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn put_str(&mut self, value: &str) {
        self.put_string(value.as_bytes());
    }

    /// Patches the frame length and returns the wire bytes.
    pub fn finish(mut self) -> Bytes {
        let mark = self.frame_len;
        self.patch_len(mark);
        self.buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_patches_frame_length() {
        let mut writer = PacketWriter::new(SftpMessageType::Status);
        writer.put_u32(1);
        writer.put_u32(4);
        let frame = writer.finish();

        assert_eq!(frame.len(), 13);
        assert_eq!(&frame[..5], &[0, 0, 0, 9, 101]);
    }

    #[test]
    fn test_writer_nested_length() {
        let mut writer = PacketWriter::new(SftpMessageType::Name);
        let mark = writer.reserve_len();
        writer.put_u64(0x0102030405060708);
        writer.put_u8(9);
        writer.patch_len(mark);
        let frame = writer.finish();

        assert_eq!(&frame[5..9], &[0, 0, 0, 9]);
        assert_eq!(&frame[..4], &[0, 0, 0, 14]);
    }

    #[test]
    fn test_reader_primitives() {
        let mut writer = PacketWriter::new(SftpMessageType::Data);
        writer.put_u8(0xab);
        writer.put_u32(0xdeadbeef);
        writer.put_u64(u64::MAX - 1);
        writer.put_str("hello");
        writer.put_u32(3);
        let frame = writer.finish();

        let mut reader = PacketReader::new(frame.slice(HEADER_LEN..));
        assert_eq!(reader.get_u8().unwrap(), 0xab);
        assert_eq!(reader.get_u32().unwrap(), 0xdeadbeef);
        assert_eq!(reader.get_u64().unwrap(), u64::MAX - 1);
        assert_eq!(reader.get_text().unwrap(), "hello");
        assert_eq!(reader.remaining(), 4);
        assert_eq!(&reader.get_bytes(4).unwrap()[..], &[0, 0, 0, 3]);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_reader_truncated_fields() {
        let mut reader = PacketReader::new(Bytes::from_static(&[0, 0, 1]));
        assert!(matches!(reader.get_u32(), Err(SftpdError::Protocol(_))));

        let mut reader = PacketReader::new(Bytes::from_static(&[0, 0, 0, 0, 0, 0, 0]));
        assert!(matches!(reader.get_u64(), Err(SftpdError::Protocol(_))));

        // String claims 16 bytes but carries 2
        let mut reader = PacketReader::new(Bytes::from_static(&[0, 0, 0, 16, b'a', b'b']));
        assert!(matches!(reader.get_string(), Err(SftpdError::Protocol(_))));

        // String length near u32::MAX must not allocate or panic
        let mut reader = PacketReader::new(Bytes::from_static(&[0xff, 0xff, 0xff, 0xff, 1]));
        assert!(reader.get_string().is_err());
    }

    #[test]
    fn test_reader_lossy_text() {
        let mut reader = PacketReader::new(Bytes::from_static(&[0, 0, 0, 2, 0xff, b'a']));
        assert_eq!(reader.get_text().unwrap(), "\u{fffd}a");
    }

    #[tokio::test]
    async fn test_frame_reader_reads_frames() {
        let data: &[u8] = &[
            0, 0, 0, 5, 1, 0, 0, 0, 3, // INIT, version 3
            0, 0, 0, 3, 200, 0xaa, 0xbb, // unknown type, 2 byte payload
        ];
        let mut reader = FrameReader::new(data, DEFAULT_MAX_PACKET_LEN);

        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.msg_type, 1);
        assert_eq!(&frame.payload[..], &[0, 0, 0, 3]);

        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.msg_type, 200);
        assert_eq!(&frame.payload[..], &[0xaa, 0xbb]);

        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_frame_payloads_outlive_later_reads() {
        let data: &[u8] = &[
            0, 0, 0, 5, 3, 0, 0, 0, 7,
            0, 0, 0, 5, 4, 0xff, 0xff, 0xff, 0xff,
        ];
        let mut reader = FrameReader::new(data, DEFAULT_MAX_PACKET_LEN);

        let first = reader.next_frame().await.unwrap().unwrap();
        let second = reader.next_frame().await.unwrap().unwrap();

        assert_eq!(&first.payload[..], &[0, 0, 0, 7]);
        assert_eq!(&second.payload[..], &[0xff, 0xff, 0xff, 0xff]);
    }

    #[tokio::test]
    async fn test_frame_reader_rejects_short_frames() {
        for data in [&[0u8, 0, 0, 0, 1][..], &[0, 0, 0, 1, 1], &[0, 0, 0, 2, 1, 0]] {
            let mut reader = FrameReader::new(data, DEFAULT_MAX_PACKET_LEN);
            assert!(matches!(
                reader.next_frame().await,
                Err(SftpdError::Protocol(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_frame_reader_rejects_oversized_frames() {
        let data: &[u8] = &[0x7f, 0xff, 0xff, 0xff, 6];
        let mut reader = FrameReader::new(data, DEFAULT_MAX_PACKET_LEN);
        assert!(matches!(
            reader.next_frame().await,
            Err(SftpdError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_frame_reader_truncated_stream() {
        // Partial header
        let data: &[u8] = &[0, 0, 0];
        let mut reader = FrameReader::new(data, DEFAULT_MAX_PACKET_LEN);
        assert!(matches!(reader.next_frame().await, Err(SftpdError::Io(_))));

        // Header declares more payload than the stream holds
        let data: &[u8] = &[0, 0, 0, 9, 17, 0, 0, 0, 1];
        let mut reader = FrameReader::new(data, DEFAULT_MAX_PACKET_LEN);
        assert!(matches!(reader.next_frame().await, Err(SftpdError::Io(_))));
    }
}
