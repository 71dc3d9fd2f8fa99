//! Room code generation.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Characters room codes are drawn from.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Produces candidate room codes.
///
/// The registry checks candidates for collisions, so a generator only has
/// to produce well-formed codes, not unique ones.
pub trait CodeGenerator: Send + Sync {
    /// Returns a candidate code of `len` characters from [`CODE_ALPHABET`].
    fn generate(&self, len: usize) -> String;
}

/// Uniformly random codes from a CSPRNG.
pub struct RandomCodeGenerator {
    rng: Mutex<StdRng>,
}

impl RandomCodeGenerator {
    /// Seeds from the operating system.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// A reproducible sequence, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, len: usize) -> String {
        // RNG state stays valid across a poisoned lock.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        (0..len)
            .map(|_| {
                let index = rng.random_range(0..CODE_ALPHABET.len());
                char::from(CODE_ALPHABET[index])
            })
            .collect()
    }
}
