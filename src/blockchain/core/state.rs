use crate::error::ChainError;
use crate::transaction::Transaction;

use super::chain::Block;

/// Chain plus pending pool, owned by exactly one `Ledger`.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub chain: Vec<Block>,
    pub pending_transactions: Vec<Transaction>,
}

impl LedgerState {
    pub fn new(genesis: Block) -> Self {
        Self {
            chain: vec![genesis],
            pending_transactions: Vec::new(),
        }
    }

    pub fn tip(&self) -> Result<&Block, ChainError> {
        self.chain.last().ok_or(ChainError::EmptyChain)
    }

    pub fn push_pending(&mut self, tx: Transaction) {
        self.pending_transactions.push(tx);
    }

    /// Take the whole pool, leaving it empty.
    pub fn drain_pending(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.pending_transactions)
    }

    pub fn append(&mut self, block: Block) {
        self.chain.push(block);
    }

    /// Swap in a new chain. Empty chains are refused so the tip always exists.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> Result<(), ChainError> {
        if chain.is_empty() {
            return Err(ChainError::EmptyChain);
        }
        self.chain = chain;
        Ok(())
    }
}
