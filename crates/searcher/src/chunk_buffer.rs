/*!
A fixed-capacity working buffer with a carry protocol.

The buffer holds the bytes currently being scanned. After a scan resolves a
prefix of the buffer, [`ChunkBuffer::consume`] discards that prefix and
rolls the unresolved tail to the front, so that a match which might still
complete can be re-presented together with the next refill. The absolute
stream offset of the buffer's first byte is tracked across rolls.
*/

use std::io;

/// The default working buffer capacity: 1 MiB.
pub(crate) const DEFAULT_BUFFER_CAPACITY: usize = 1 << 20;

/// A fixed-capacity buffer over a logical byte stream.
///
/// Unlike a line buffer, this never grows: the scanner bounds the carried
/// tail instead, so a fixed allocation suffices for inputs of unbounded
/// size.
#[derive(Clone, Debug)]
pub(crate) struct ChunkBuffer {
    /// The backing storage. Its length is the fixed capacity.
    buf: Vec<u8>,
    /// The live-fill pointer: bytes in `buf[..end]` are valid.
    end: usize,
    /// The absolute stream offset of `buf[0]`.
    absolute_offset: u64,
}

impl ChunkBuffer {
    /// Create a buffer with the given fixed capacity.
    pub(crate) fn with_capacity(capacity: usize) -> ChunkBuffer {
        assert!(capacity > 0, "buffer capacity must be non-zero");
        ChunkBuffer { buf: vec![0; capacity], end: 0, absolute_offset: 0 }
    }

    /// The valid contents of this buffer.
    pub(crate) fn buffer(&self) -> &[u8] {
        &self.buf[..self.end]
    }

    /// The absolute stream offset corresponding to the start of `buffer`.
    pub(crate) fn absolute_offset(&self) -> u64 {
        self.absolute_offset
    }

    /// Returns true when no free space is left after the live-fill pointer.
    pub(crate) fn is_full(&self) -> bool {
        self.end == self.buf.len()
    }

    /// Read once from `rdr` into the free space after the live-fill
    /// pointer. Returns the number of bytes read; `0` means the reader is
    /// (currently) exhausted.
    pub(crate) fn fill<R: io::Read>(
        &mut self,
        rdr: &mut R,
    ) -> Result<usize, io::Error> {
        debug_assert!(!self.is_full(), "no free space to fill");
        let n = rdr.read(&mut self.buf[self.end..])?;
        self.end += n;
        Ok(n)
    }

    /// Discard the first `amt` bytes and roll the remaining tail to the
    /// front of the buffer. The discarded bytes advance the absolute
    /// stream offset.
    pub(crate) fn consume(&mut self, amt: usize) {
        assert!(amt <= self.end);
        self.buf.copy_within(amt..self.end, 0);
        self.end -= amt;
        self.absolute_offset += amt as u64;
    }

    /// Discard the entire contents of the buffer.
    pub(crate) fn consume_all(&mut self) {
        let amt = self.end;
        self.consume(amt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_and_consume() {
        let mut rdr: &[u8] = b"homer lisa maggie";
        let mut buf = ChunkBuffer::with_capacity(8);

        assert_eq!(buf.fill(&mut rdr).unwrap(), 8);
        assert_eq!(buf.buffer(), b"homer li");
        assert_eq!(buf.absolute_offset(), 0);

        buf.consume(6);
        assert_eq!(buf.buffer(), b"li");
        assert_eq!(buf.absolute_offset(), 6);

        assert_eq!(buf.fill(&mut rdr).unwrap(), 6);
        assert_eq!(buf.buffer(), b"lisa mag");

        buf.consume_all();
        assert_eq!(buf.absolute_offset(), 14);
        assert_eq!(buf.fill(&mut rdr).unwrap(), 3);
        assert_eq!(buf.buffer(), b"gie");
        buf.consume_all();

        assert_eq!(buf.fill(&mut rdr).unwrap(), 0);
    }

    #[test]
    fn carry_preserves_tail() {
        let mut rdr: &[u8] = b"abcdef";
        let mut buf = ChunkBuffer::with_capacity(4);

        assert_eq!(buf.fill(&mut rdr).unwrap(), 4);
        assert_eq!(buf.buffer(), b"abcd");
        // keep the last two bytes for the next window
        buf.consume(2);
        assert_eq!(buf.buffer(), b"cd");
        assert_eq!(buf.fill(&mut rdr).unwrap(), 2);
        assert_eq!(buf.buffer(), b"cdef");
        assert_eq!(buf.absolute_offset(), 2);
    }

    #[test]
    fn full_buffer_reports_full() {
        let mut rdr: &[u8] = b"abcd";
        let mut buf = ChunkBuffer::with_capacity(4);
        assert!(!buf.is_full());
        buf.fill(&mut rdr).unwrap();
        assert!(buf.is_full());
    }
}
