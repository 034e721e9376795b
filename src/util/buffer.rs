//! Write payload generation
//!
//! Streaming writes reuse one pre-filled block for the whole file, random IO
//! refreshes its block before every write, and churn files are zero-filled.
//! Random content keeps server-side compression and deduplication from
//! flattering the numbers.

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Size of each churn placeholder file
pub const PLACEHOLDER_SIZE: usize = 4096;

/// Fill pattern for write buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPattern {
    /// All zeros
    Zeros,
    /// Pseudo-random bytes
    Random,
}

/// Generator for write payloads
///
/// Each session task owns its own generator; nothing here is shared.
pub struct PayloadGenerator {
    rng: Xoshiro256PlusPlus,
}

impl PayloadGenerator {
    /// Generator seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Deterministic generator (tests)
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Allocate a block of `size` bytes filled with `pattern`
    pub fn block(&mut self, size: usize, pattern: FillPattern) -> Vec<u8> {
        let mut buf = vec![0u8; size];
        if pattern == FillPattern::Random {
            self.refill(&mut buf);
        }
        buf
    }

    /// Overwrite `buf` with fresh random bytes
    pub fn refill(&mut self, buf: &mut [u8]) {
        self.rng.fill_bytes(buf);
    }
}

impl Default for PayloadGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_block() {
        let mut gen = PayloadGenerator::with_seed(1);
        let block = gen.block(PLACEHOLDER_SIZE, FillPattern::Zeros);
        assert_eq!(block.len(), PLACEHOLDER_SIZE);
        assert!(block.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_random_block_not_constant() {
        let mut gen = PayloadGenerator::with_seed(7);
        let block = gen.block(4096, FillPattern::Random);
        assert!(block.iter().any(|&b| b != block[0]));
    }

    #[test]
    fn test_refill_changes_content() {
        let mut gen = PayloadGenerator::with_seed(42);
        let mut buf = gen.block(1024, FillPattern::Random);
        let before = buf.clone();
        gen.refill(&mut buf);
        assert_ne!(before, buf);
    }

    #[test]
    fn test_seeded_generators_agree() {
        let a = PayloadGenerator::with_seed(99).block(256, FillPattern::Random);
        let b = PayloadGenerator::with_seed(99).block(256, FillPattern::Random);
        assert_eq!(a, b);
    }
}
