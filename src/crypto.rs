//! Hashing primitives for powledger
//!
//! Every node must agree on these encodings byte-for-byte, otherwise
//! `previous_hash` links produced by one node will not verify on another.

use crate::blockchain::Block;
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Hash arbitrary bytes and return the lowercase hex digest.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Feed a length-prefixed UTF-8 string (u64 BE length, then bytes) into `hasher`.
pub fn update_with_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

/// Canonical digest of a whole block.
///
/// Field order: index (u64 BE), timestamp (i64 BE), transaction count (u64 BE)
/// followed by each transaction in order, proof (u64 BE), previous hash
/// (length-prefixed).
pub fn block_digest(block: &Block) -> String {
    let mut hasher = Sha256::new();
    hasher.update(block.index.to_be_bytes());
    hasher.update(block.timestamp.to_be_bytes());
    hasher.update((block.transactions.len() as u64).to_be_bytes());
    for tx in &block.transactions {
        tx.update_hasher(&mut hasher);
    }
    hasher.update(block.proof.to_be_bytes());
    update_with_str(&mut hasher, &block.previous_hash);
    hex::encode(hasher.finalize())
}
