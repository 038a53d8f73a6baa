//! Seedable pseudo-random generator driving every nondeterministic choice.
//!
//! A run is fully reproducible from its [`Seed`]: plan shuffles, group-slot
//! expansion and weighted candidate selection all draw from one [`Prng`], in
//! execution order. The stream is ChaCha20, so it is identical across
//! platforms and processes.
//!
//! # Example
//!
//! ```
//! use skirmish::{Prng, Seed};
//!
//! let mut a = Prng::new(Seed::from_u64(7));
//! let mut b = Prng::new(Seed::from_u64(7));
//! assert_eq!(a.shuffle(&[1, 2, 3, 4]), b.shuffle(&[1, 2, 3, 4]));
//! ```

use crate::result::{EngineError, EngineResult};
use rand_chacha::ChaCha20Rng;
use rand_core::{OsRng, RngCore as _, SeedableRng as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Deterministic seed for reproducible runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(u64);

impl Seed {
    /// Create a seed from a u64 value
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// Derive a seed from free-form text (first 8 bytes of its SHA-256)
    #[must_use]
    pub fn from_phrase(phrase: &str) -> Self {
        let digest = Sha256::digest(phrase.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        Self(u64::from_le_bytes(bytes))
    }

    /// Draw a fresh seed from OS entropy
    #[must_use]
    pub fn random() -> Self {
        Self(OsRng.next_u64())
    }

    /// Get the raw seed value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Seed {
    type Err = std::convert::Infallible;

    /// Integers are taken verbatim; anything else is hashed as a phrase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.trim()
            .parse::<u64>()
            .map_or_else(|_| Self::from_phrase(s), Self::from_u64))
    }
}

/// Seeded random source owned by the engine and lent to hooks
#[derive(Debug, Clone)]
pub struct Prng {
    seed: Seed,
    rng: ChaCha20Rng,
    draws: u64,
}

impl Prng {
    /// Create a generator from a seed
    #[must_use]
    pub fn new(seed: Seed) -> Self {
        Self {
            seed,
            rng: ChaCha20Rng::seed_from_u64(seed.value()),
            draws: 0,
        }
    }

    /// Create a generator, drawing a random seed when none is given.
    ///
    /// The chosen seed is always recoverable through [`Prng::seed`].
    #[must_use]
    pub fn from_optional(seed: Option<Seed>) -> Self {
        Self::new(seed.unwrap_or_else(Seed::random))
    }

    /// Seed this generator was created with
    #[must_use]
    pub const fn seed(&self) -> Seed {
        self.seed
    }

    /// Number of values drawn so far
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    /// Raw 64-bit draw
    pub fn next_u64(&mut self) -> u64 {
        self.draws += 1;
        self.rng.next_u64()
    }

    /// Uniform float in `[0, 1)` with 53 bits of precision
    pub fn random(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform float in `[low, high)`
    pub fn range(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.random().mul_add(high - low, low)
    }

    /// Uniform index in `[0, n)`; `n` must be non-zero
    pub fn below(&mut self, n: usize) -> usize {
        debug_assert!(n > 0, "below() needs a non-empty range");
        ((self.random() * n as f64) as usize).min(n.saturating_sub(1))
    }

    /// Bernoulli trial that succeeds with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.random() < p
    }

    /// Fisher-Yates shuffle in place, one draw per position after the first
    pub fn shuffle_in_place<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }

    /// Return a shuffled copy of `items`
    pub fn shuffle<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut out = items.to_vec();
        self.shuffle_in_place(&mut out);
        out
    }

    /// Pick index `i` with probability `weights[i] / sum(weights)`.
    ///
    /// A single candidate returns 0 without consuming a draw, whatever its
    /// (finite, non-negative) weight.
    pub fn weighted_index(&mut self, weights: &[f64]) -> EngineResult<usize> {
        if weights.is_empty() {
            return Err(EngineError::invalid_input(
                "weighted selection over an empty candidate list",
            ));
        }
        if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(EngineError::invalid_input(format!(
                "weights must be finite and non-negative, got {bad}"
            )));
        }
        if weights.len() == 1 {
            return Ok(0);
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(EngineError::invalid_input(format!(
                "weight sum must be positive, got {total}"
            )));
        }

        let target = self.random() * total;
        let mut cumulative = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cumulative += w;
            if target < cumulative {
                return Ok(i);
            }
        }
        // Rounding can leave `target` at the very top of the range.
        Ok(weights.iter().rposition(|w| *w > 0.0).unwrap_or(0))
    }
}
