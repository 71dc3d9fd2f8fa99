//! Registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use stakemate_protocol::RoomCode;

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Settings for room-code allocation.
///
/// Allocation draws a random code and retries on collision. Between
/// attempts it sleeps, starting at `initial_backoff` and doubling up to
/// `max_backoff`. After `max_attempts` collisions in a row it gives up with
/// [`RoomError::AllocationExhausted`](crate::RoomError::AllocationExhausted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Length of generated room codes.
    pub code_length: usize,

    /// How many codes to try before giving up.
    pub max_attempts: u32,

    /// Sleep after the first collision.
    pub initial_backoff: Duration,

    /// Upper bound for the doubling sleep.
    pub max_backoff: Duration,
}

impl RegistryConfig {
    /// Default length of generated codes.
    pub const DEFAULT_CODE_LENGTH: usize = 6;

    /// Sets the code length, clamped to what [`RoomCode`] accepts.
    pub fn with_code_length(mut self, len: usize) -> Self {
        self.code_length = len.clamp(RoomCode::MIN_LEN, RoomCode::MAX_LEN);
        self
    }

    /// Sets the retry budget. At least one attempt is always made.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the backoff bounds.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    /// The sleep that follows the `attempt`-th collision (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            code_length: Self::DEFAULT_CODE_LENGTH,
            max_attempts: 8,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(200),
        }
    }
}
