//! Seeded linear-congruential generator.
//!
//! The generator lives inside [`GameState`](crate::state::GameState) and is
//! serialized with it, so a resumed session continues the exact same stream.
//! Consumers draw through `&mut dyn RngCore` with the helpers below.

use rand::Error;
pub use rand::RngCore;
use serde::{Deserialize, Serialize};

const MULTIPLIER: u32 = 1_664_525;
const INCREMENT: u32 = 1_013_904_223;

/// Reproducible random stream: `state = (1664525 * state + 1013904223) mod 2^32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lcg {
    /// Seed fixed at game start.
    pub seed: u32,
    /// Position in the stream; advanced by every draw.
    pub rng_state: u32,
}

impl Lcg {
    /// Create a generator. A zero seed is bumped to 1.
    pub fn new(seed: u32) -> Self {
        let seed = seed.max(1);
        Self {
            seed,
            rng_state: seed,
        }
    }

    /// Reset the stream to the start of `seed`.
    pub fn reseed(&mut self, seed: u32) {
        *self = Self::new(seed);
    }

    /// Advance the recurrence and return the new state.
    pub fn next_uint32(&mut self) -> u32 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(INCREMENT);
        self.rng_state
    }

    /// `next_uint32() / 0xFFFFFFFF`.
    pub fn next_float(&mut self) -> f64 {
        unit_float(self)
    }

    /// A die face in 1..=6.
    pub fn next_die_face(&mut self) -> u8 {
        die_face(self)
    }

    /// Uniform index in `0..len`. Returns 0 for an empty range.
    pub fn next_index(&mut self, len: usize) -> usize {
        index_below(self, len)
    }
}

/// One 32-bit draw scaled into [0, 1].
pub fn unit_float(rng: &mut dyn RngCore) -> f64 {
    f64::from(rng.next_u32()) / f64::from(u32::MAX)
}

pub fn die_face(rng: &mut dyn RngCore) -> u8 {
    // unit_float can return exactly 1.0 when the draw is u32::MAX.
    ((unit_float(rng) * 6.0).floor() as u8 + 1).min(6)
}

/// Uniform index in `0..len`; 0 for an empty range.
pub fn index_below(rng: &mut dyn RngCore, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    ((unit_float(rng) * len as f64).floor() as usize).min(len - 1)
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(1)
    }
}

impl RngCore for Lcg {
    fn next_u32(&mut self) -> u32 {
        self.next_uint32()
    }

    fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.next_uint32());
        let low = u64::from(self.next_uint32());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_uint32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
