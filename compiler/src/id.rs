use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Cap'n Proto reserves the top bit of every file id.
pub const ID_RESERVED_BIT: u64 = 1 << 63;

/// Produces Cap'n Proto file ids: bit 63 set, the other 63 bits uniform.
/// Collisions are astronomically unlikely and are not checked.
pub struct IdGenerator<R: RngCore = ChaCha20Rng> {
    rng: R,
}

impl IdGenerator<ChaCha20Rng> {
    /// Seeded from the operating system, so ids differ between runs.
    pub fn from_entropy() -> Self {
        IdGenerator::with_rng(ChaCha20Rng::from_entropy())
    }

    /// Reproducible sequence, for tests and golden files.
    pub fn seeded(seed: u64) -> Self {
        IdGenerator::with_rng(ChaCha20Rng::seed_from_u64(seed))
    }
}

impl<R: RngCore> IdGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        IdGenerator { rng }
    }

    pub fn new_id(&mut self) -> u64 {
        self.rng.next_u64() | ID_RESERVED_BIT
    }
}
