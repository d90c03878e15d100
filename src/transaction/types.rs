/// Transaction types for powledger
use crate::crypto::update_with_str;
use sha2::{Digest, Sha256};

/// A transfer of `amount` from `sender` to `receiver`.
///
/// Balances are never checked; a transaction is recorded exactly as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: i64,
}

impl Transaction {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: i64) -> Self {
        Transaction {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
        }
    }

    /// Feed the canonical encoding of this transaction into `hasher`.
    ///
    /// Layout: length-prefixed sender, length-prefixed receiver, amount (i64 BE).
    pub fn update_hasher(&self, hasher: &mut Sha256) {
        update_with_str(hasher, &self.sender);
        update_with_str(hasher, &self.receiver);
        hasher.update(self.amount.to_be_bytes());
    }

    /// Calculate the hash of this transaction
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        self.update_hasher(&mut hasher);
        hasher.finalize().into()
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash())
    }
}
