//! xoshiro256+ word generator.
//!
//! Fast and statistically solid, but **not** cryptographically secure: anyone
//! who observes four consecutive outputs can recover the state.
//!
//! Reference: <https://prng.di.unimi.it/xoshiro256plus.c>

/// Size in bytes of one generator word.
pub const WORD_BYTES: usize = std::mem::size_of::<u64>();

/// The fixed seed pattern: word `i` holds `i + 1`.
pub const DEFAULT_SEED: [u64; 4] = [1, 2, 3, 4];

/// xoshiro256+ state. Never all-zero: that state is a fixed point of the
/// transition and would emit zeros forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xoshiro256Plus {
    s: [u64; 4],
}

impl Xoshiro256Plus {
    /// A generator already seeded with [`DEFAULT_SEED`].
    pub const fn new() -> Self {
        Self { s: DEFAULT_SEED }
    }

    /// Build a generator from an explicit state. Returns `None` for the
    /// all-zero state.
    #[cfg(test)]
    pub(crate) fn from_state(s: [u64; 4]) -> Option<Self> {
        if s.iter().all(|&w| w == 0) {
            None
        } else {
            Some(Self { s })
        }
    }

    /// Reset to the fixed seed pattern. Doing this mid-stream restarts the
    /// sequence, which readers will notice.
    pub fn seed(&mut self) {
        for (i, word) in self.s.iter_mut().enumerate() {
            *word = i as u64 + 1;
        }
    }

    /// Advance the state and return the next word.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s = &mut self.s;
        let result = s[0].wrapping_add(s[3]);
        let t = s[1] << 17;

        // Each step reads words mutated by the previous ones.
        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];

        s[2] ^= t;
        s[3] = s[3].rotate_left(45);

        result
    }

    /// Current state words.
    pub fn state(&self) -> [u64; 4] {
        self.s
    }
}

impl Default for Xoshiro256Plus {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Xoshiro256Plus {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        Some(self.next_u64())
    }
}
