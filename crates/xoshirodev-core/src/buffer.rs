//! Refill buffer: turns generator words into a seamless byte stream.
//!
//! The buffer holds `N` serialized words. A cursor walks through them; once it
//! reaches capacity the whole buffer is regenerated and the cursor goes back
//! to zero. Refills happen exactly at exhaustion and never early, so slicing
//! the stream at arbitrary byte boundaries yields the same bytes as reading
//! the generator's words back to back.

use crate::config::ByteOrder;
use crate::error::MisalignedFill;
use crate::generator::{WORD_BYTES, Xoshiro256Plus};

/// Write consecutive generator words into `dst`, starting at offset 0.
///
/// `dst.len()` must be a multiple of [`WORD_BYTES`].
pub fn fill_words(
    rng: &mut Xoshiro256Plus,
    dst: &mut [u8],
    order: ByteOrder,
) -> Result<(), MisalignedFill> {
    if dst.len() % WORD_BYTES != 0 {
        return Err(MisalignedFill {
            len: dst.len(),
            word: WORD_BYTES,
        });
    }
    write_words(rng, dst, order);
    Ok(())
}

/// Fill every whole word slot of `dst`; a trailing partial slot is left as is.
fn write_words(rng: &mut Xoshiro256Plus, dst: &mut [u8], order: ByteOrder) {
    for slot in dst.chunks_exact_mut(WORD_BYTES) {
        slot.copy_from_slice(&order.word_bytes(rng.next_u64()));
    }
}

/// Fixed-capacity byte buffer plus read cursor.
#[derive(Debug, Clone)]
pub struct RandomBuffer {
    bytes: Box<[u8]>,
    cursor: usize,
    order: ByteOrder,
    refills: u64,
}

impl RandomBuffer {
    /// Allocate a buffer of `words` generator words and pre-fill it.
    ///
    /// A zero-word buffer is rounded up to one word so the stream can always
    /// make progress.
    pub fn new(words: usize, order: ByteOrder, rng: &mut Xoshiro256Plus) -> Self {
        let mut buf = Self {
            bytes: vec![0u8; words.max(1) * WORD_BYTES].into_boxed_slice(),
            cursor: 0,
            order,
            refills: 0,
        };
        // The startup pre-fill does not count as a refill.
        buf.regenerate(rng);
        buf
    }

    /// Overwrite the whole buffer with fresh words and rewind the cursor.
    fn regenerate(&mut self, rng: &mut Xoshiro256Plus) {
        // Capacity is a whole number of words by construction.
        write_words(rng, &mut self.bytes, self.order);
        self.cursor = 0;
    }

    /// Unread bytes at the cursor, refilling first if the buffer is exhausted.
    /// The cursor does not move until [`consume`](Self::consume) is called.
    /// Asking for zero bytes never triggers a refill.
    pub fn chunk(&mut self, rng: &mut Xoshiro256Plus, max: usize) -> &[u8] {
        if max > 0 && self.cursor == self.bytes.len() {
            self.regenerate(rng);
            self.refills += 1;
            log::debug!("buffer refill #{}", self.refills);
        }
        let n = max.min(self.bytes.len() - self.cursor);
        &self.bytes[self.cursor..self.cursor + n]
    }

    /// Mark `n` bytes at the cursor as handed out.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(self.cursor + n <= self.bytes.len());
        self.cursor = (self.cursor + n).min(self.bytes.len());
    }

    /// Copy up to `out.len()` bytes (bounded by what is left in the buffer)
    /// and return how many were produced.
    pub fn read_chunk(&mut self, rng: &mut Xoshiro256Plus, out: &mut [u8]) -> usize {
        let chunk = self.chunk(rng, out.len());
        let n = chunk.len();
        out[..n].copy_from_slice(chunk);
        self.consume(n);
        n
    }

    /// Fill all of `out`, looping across as many refills as needed.
    pub fn read_exact(&mut self, rng: &mut Xoshiro256Plus, out: &mut [u8]) {
        let mut done = 0;
        while done < out.len() {
            done += self.read_chunk(rng, &mut out[done..]);
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes left before the next refill.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.cursor
    }

    /// Refills performed since construction (the startup pre-fill excluded).
    pub fn refills(&self) -> u64 {
        self.refills
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_stream(n_bytes: usize, order: ByteOrder) -> Vec<u8> {
        let mut rng = Xoshiro256Plus::new();
        let mut out = Vec::with_capacity(n_bytes + WORD_BYTES);
        while out.len() < n_bytes {
            out.extend_from_slice(&order.word_bytes(rng.next_u64()));
        }
        out.truncate(n_bytes);
        out
    }

    #[test]
    fn fill_words_rejects_misaligned() {
        let mut rng = Xoshiro256Plus::new();
        let mut dst = [0u8; 12];
        assert_eq!(
            fill_words(&mut rng, &mut dst, ByteOrder::Little),
            Err(MisalignedFill { len: 12, word: 8 })
        );
        assert_eq!(rng, Xoshiro256Plus::new(), "state must be untouched");
    }

    #[test]
    fn fill_words_writes_words_in_order() {
        let mut rng = Xoshiro256Plus::new();
        let mut dst = [0u8; 16];
        fill_words(&mut rng, &mut dst, ByteOrder::Little).unwrap();
        assert_eq!(&dst[..8], &5u64.to_le_bytes());
        assert_eq!(&dst[8..], &211_106_232_532_999u64.to_le_bytes());
    }

    #[test]
    fn refill_consumes_exactly_capacity_words() {
        let mut rng = Xoshiro256Plus::new();
        let mut buf = RandomBuffer::new(3, ByteOrder::Little, &mut rng);
        let mut reference = Xoshiro256Plus::new();
        for _ in 0..3 {
            reference.next_u64();
        }
        assert_eq!(rng, reference, "pre-fill draws one word per slot");

        let mut all = [0u8; 24];
        buf.read_chunk(&mut rng, &mut all);
        let mut one = [0u8; 1];
        buf.read_chunk(&mut rng, &mut one);
        for _ in 0..3 {
            reference.next_u64();
        }
        assert_eq!(rng, reference, "refill draws one word per slot");
        assert_eq!(one[0], reference_stream(25, ByteOrder::Little)[24]);
    }

    #[test]
    fn new_buffer_is_prefilled() {
        let mut rng = Xoshiro256Plus::new();
        let buf = RandomBuffer::new(4, ByteOrder::Native, &mut rng);
        assert_eq!(buf.capacity(), 32);
        assert_eq!(buf.cursor(), 0);
        assert_eq!(buf.refills(), 0);
        assert_eq!(buf.remaining(), 32);
    }

    #[test]
    fn zero_words_rounds_up() {
        let mut rng = Xoshiro256Plus::new();
        let buf = RandomBuffer::new(0, ByteOrder::Native, &mut rng);
        assert_eq!(buf.capacity(), WORD_BYTES);
    }

    #[test]
    fn read_chunk_stops_at_buffer_end() {
        let mut rng = Xoshiro256Plus::new();
        let mut buf = RandomBuffer::new(2, ByteOrder::Little, &mut rng);
        let mut out = [0u8; 10];
        assert_eq!(buf.read_chunk(&mut rng, &mut out), 10);
        assert_eq!(buf.read_chunk(&mut rng, &mut out), 6);
        assert_eq!(buf.cursor(), 16);
        assert_eq!(buf.refills(), 0, "no refill before exhaustion");
        assert_eq!(buf.read_chunk(&mut rng, &mut out), 10);
        assert_eq!(buf.refills(), 1);
    }

    #[test]
    fn refill_only_at_exhaustion() {
        let mut rng = Xoshiro256Plus::new();
        let mut buf = RandomBuffer::new(1, ByteOrder::Little, &mut rng);
        let mut out = [0u8; 7];
        buf.read_chunk(&mut rng, &mut out);
        let state = rng.state();
        let mut one = [0u8; 1];
        buf.read_chunk(&mut rng, &mut one);
        assert_eq!(rng.state(), state);
        assert_eq!(buf.remaining(), 0);
        buf.read_chunk(&mut rng, &mut one);
        assert_ne!(rng.state(), state);
    }

    #[test]
    fn empty_read_produces_nothing() {
        let mut rng = Xoshiro256Plus::new();
        let mut buf = RandomBuffer::new(2, ByteOrder::Little, &mut rng);
        assert_eq!(buf.read_chunk(&mut rng, &mut []), 0);
        assert_eq!(buf.cursor(), 0);

        let mut all = [0u8; 16];
        buf.read_chunk(&mut rng, &mut all);
        assert_eq!(buf.read_chunk(&mut rng, &mut []), 0);
        assert_eq!(buf.refills(), 0, "empty read on exhausted buffer");
    }

    #[test]
    fn stream_equals_raw_words_across_seams() {
        for order in [ByteOrder::Little, ByteOrder::Big, ByteOrder::Native] {
            let mut rng = Xoshiro256Plus::new();
            let mut buf = RandomBuffer::new(3, order, &mut rng);
            let mut out = vec![0u8; 200];
            buf.read_exact(&mut rng, &mut out);
            assert_eq!(out, reference_stream(200, order), "order {order}");
        }
    }

    #[test]
    fn whole_buffer_multiples_refill_exactly() {
        let mut rng = Xoshiro256Plus::new();
        let mut buf = RandomBuffer::new(4, ByteOrder::Little, &mut rng);
        // The pre-filled buffer serves the first capacity bytes.
        let mut out = vec![0u8; 32 * 5];
        buf.read_exact(&mut rng, &mut out);
        assert_eq!(buf.refills(), 4);
        assert_eq!(buf.remaining(), 0);
        assert_eq!(out, reference_stream(32 * 5, ByteOrder::Little));
    }

    #[test]
    fn chunk_does_not_advance() {
        let mut rng = Xoshiro256Plus::new();
        let mut buf = RandomBuffer::new(2, ByteOrder::Little, &mut rng);
        let first = buf.chunk(&mut rng, 4).to_vec();
        let again = buf.chunk(&mut rng, 4).to_vec();
        assert_eq!(first, again);
        buf.consume(4);
        assert_eq!(buf.cursor(), 4);
    }
}
