// Growable read buffer over an async transport

use byteorder::{BigEndian, ByteOrder};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::RtmpError;

const INITIAL_CAPACITY: usize = 64 * 1024;

/// Upper bound on how large the internal buffer is allowed to grow while
/// satisfying a single `ensure`. Kept above the message size ceiling so a
/// maximal reassembled message never needs a second buffer.
const MAX_CAPACITY: usize = 12 * 1024 * 1024;

/// Buffers bytes read from an async stream so the chunk demultiplexer can
/// request exactly the number of bytes it needs before decoding them.
///
/// `ensure` is the only method that touches the transport; every other
/// method assumes the caller already called `ensure` for the bytes it is
/// about to consume.
pub struct ByteReader<R> {
    stream: R,
    buf: Vec<u8>,
    pos: usize,
    len: usize,
}

impl<R: AsyncRead + Unpin + Send> ByteReader<R> {
    pub fn new(stream: R) -> Self {
        ByteReader {
            stream,
            buf: vec![0; INITIAL_CAPACITY],
            pos: 0,
            len: 0,
        }
    }

    /// Number of bytes currently buffered and not yet consumed
    pub fn available(&self) -> usize {
        self.len - self.pos
    }

    /// Reads from the transport, if necessary, until at least `n` bytes are
    /// buffered. Returns `Eof` if the transport closes first, and rejects
    /// `n` values beyond the buffer's maximum capacity as a protocol error.
    pub async fn ensure(&mut self, n: usize) -> Result<(), RtmpError> {
        if self.available() >= n {
            return Ok(());
        }

        if n > MAX_CAPACITY {
            return Err(RtmpError::Protocol(format!(
                "requested read of {n} bytes exceeds the maximum buffer size"
            )));
        }

        if self.pos > 0 {
            self.buf.copy_within(self.pos..self.len, 0);
            self.len -= self.pos;
            self.pos = 0;
        }

        if self.buf.len() < n {
            let mut new_cap = self.buf.len().max(INITIAL_CAPACITY);
            while new_cap < n {
                new_cap *= 2;
            }
            self.buf.resize(new_cap, 0);
        }

        while self.len < n {
            let read = self
                .stream
                .read(&mut self.buf[self.len..])
                .await
                .map_err(|e| RtmpError::Io(e.to_string()))?;

            if read == 0 {
                return Err(RtmpError::Eof);
            }

            self.len += read;
        }

        Ok(())
    }

    /// Returns the next `n` buffered bytes without consuming them. Caller
    /// must have already called `ensure(n)`.
    pub fn peek(&self, n: usize) -> &[u8] {
        &self.buf[self.pos..self.pos + n]
    }

    /// Copies the next `dst.len()` buffered bytes into `dst` and consumes them
    pub fn read_bytes(&mut self, dst: &mut [u8]) {
        let n = dst.len();
        dst.copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
    }

    /// Consumes and returns the next `n` buffered bytes as an owned vec
    pub fn take_bytes(&mut self, n: usize) -> Vec<u8> {
        let out = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        out
    }

    pub fn read_u8(&mut self) -> u8 {
        let b = self.buf[self.pos];
        self.pos += 1;
        b
    }

    pub fn read_u16_be(&mut self) -> u16 {
        let v = BigEndian::read_u16(&self.buf[self.pos..self.pos + 2]);
        self.pos += 2;
        v
    }

    pub fn read_u24_be(&mut self) -> u32 {
        let v = BigEndian::read_u24(&self.buf[self.pos..self.pos + 3]);
        self.pos += 3;
        v
    }

    pub fn read_u32_be(&mut self) -> u32 {
        let v = BigEndian::read_u32(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        v
    }

    pub fn read_u32_le(&mut self) -> u32 {
        let v = u32::from_le_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        v
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_ensure_reads_exactly_what_is_needed() {
        let mut reader = ByteReader::new(Cursor::new(vec![1, 2, 3, 4, 5]));
        reader.ensure(3).await.unwrap();
        assert_eq!(reader.available(), 3);
        assert_eq!(reader.read_u8(), 1);
        assert_eq!(reader.read_u16_be(), 0x0203);
    }

    #[tokio::test]
    async fn test_ensure_accumulates_across_short_reads() {
        // Cursor yields everything in one read() call regardless, but this
        // exercises the case where available() already satisfies part of a
        // later, larger request.
        let mut reader = ByteReader::new(Cursor::new(vec![0xAA; 10]));
        reader.ensure(2).await.unwrap();
        reader.ensure(10).await.unwrap();
        assert_eq!(reader.available(), 10);
    }

    #[tokio::test]
    async fn test_ensure_errors_on_eof() {
        let mut reader = ByteReader::new(Cursor::new(vec![1, 2]));
        let result = reader.ensure(10).await;
        assert!(matches!(result, Err(RtmpError::Eof)));
    }

    #[tokio::test]
    async fn test_compaction_reclaims_consumed_space() {
        let mut reader = ByteReader::new(Cursor::new(vec![0u8; 5]));
        reader.ensure(5).await.unwrap();
        reader.read_bytes(&mut [0u8; 5]);
        assert_eq!(reader.available(), 0);
        // buffer's logical window is now empty; ensure(0) must not block or error
        reader.ensure(0).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_u32_le() {
        let mut reader = ByteReader::new(Cursor::new(vec![0x01, 0x00, 0x00, 0x00]));
        reader.ensure(4).await.unwrap();
        assert_eq!(reader.read_u32_le(), 1);
    }
}
