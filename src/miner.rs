//! Proof-of-work search and validation
//!
//! A proof is valid for a given previous proof when
//! `sha256_hex(format!("{last_proof}{proof}"))` starts with `difficulty`
//! `'0'` hex characters. The search is a plain brute-force scan from zero and
//! checks its cancellation token on every iteration.

use crate::crypto::sha256_hex;
use crate::error::{ChainError, Result};
use tokio_util::sync::CancellationToken;

/// Number of leading zero hex characters required when nothing is configured.
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Upper bound on difficulty: a SHA-256 hex digest only has 64 characters.
pub const MAX_DIFFICULTY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofOfWork {
    difficulty: usize,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
        }
    }
}

impl ProofOfWork {
    /// Difficulty is clamped to `MAX_DIFFICULTY`.
    pub fn new(difficulty: usize) -> Self {
        Self {
            difficulty: difficulty.min(MAX_DIFFICULTY),
        }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Whether `proof` solves the puzzle posed by `last_proof`.
    pub fn is_valid(&self, last_proof: u64, proof: u64) -> bool {
        let guess = format!("{}{}", last_proof, proof);
        sha256_hex(guess.as_bytes())
            .bytes()
            .take(self.difficulty)
            .all(|b| b == b'0')
    }

    /// Find the smallest proof that is valid for `last_proof`.
    ///
    /// Returns `MiningCancelled` as soon as `cancel` is observed cancelled.
    pub fn find_proof(&self, last_proof: u64, cancel: &CancellationToken) -> Result<u64> {
        let mut proof: u64 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(ChainError::MiningCancelled);
            }
            if self.is_valid(last_proof, proof) {
                return Ok(proof);
            }
            proof = proof.checked_add(1).ok_or(ChainError::MiningExhausted)?;
        }
    }
}
