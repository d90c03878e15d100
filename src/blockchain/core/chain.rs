use crate::blockchain::core::state::LedgerState;
use crate::blockchain::core::validation::{validate_chain, verify_chain};
use crate::crypto::block_digest;
use crate::error::ChainError;
use crate::miner::ProofOfWork;
use crate::transaction::Transaction;
use tracing::{debug, info};

pub const GENESIS_INDEX: u64 = 1;
pub const GENESIS_PROOF: u64 = 100;
pub const GENESIS_PREVIOUS_HASH: &str = "1";
/// 2023-01-01T00:00:00Z in nanoseconds; fixed so every node derives the same genesis digest.
pub const GENESIS_TIMESTAMP: i64 = 1_672_531_200_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub index: u64,
    /// UTC wall-clock time in nanoseconds.
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub proof: u64,
    pub previous_hash: String,
}

impl Block {
    pub fn genesis() -> Self {
        Block {
            index: GENESIS_INDEX,
            timestamp: GENESIS_TIMESTAMP,
            transactions: Vec::new(),
            proof: GENESIS_PROOF,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    /// Hex digest over every field of the block.
    pub fn hash(&self) -> String {
        block_digest(self)
    }
}

/// Current time in nanoseconds, bumped past `after` so timestamps never go backwards.
fn next_timestamp(after: i64) -> i64 {
    let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
    now.max(after.saturating_add(1))
}

/// The local chain and pending pool.
///
/// Methods take `&mut self`; callers sharing a ledger wrap it in a lock so each
/// mutation is observed as a single step.
#[derive(Debug, Clone)]
pub struct Ledger {
    state: LedgerState,
    pow: ProofOfWork,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(ProofOfWork::default())
    }
}

impl Ledger {
    /// Create a ledger holding only the genesis block.
    pub fn new(pow: ProofOfWork) -> Self {
        Self {
            state: LedgerState::new(Block::genesis()),
            pow,
        }
    }

    pub fn proof_of_work(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn chain(&self) -> &[Block] {
        &self.state.chain
    }

    pub fn len(&self) -> usize {
        self.state.chain.len()
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.state.pending_transactions
    }

    pub fn tip(&self) -> Result<&Block, ChainError> {
        self.state.tip()
    }

    /// Index the next appended block will carry.
    fn next_index(&self) -> Result<u64, ChainError> {
        match self.state.chain.last() {
            Some(tip) => tip
                .index
                .checked_add(1)
                .ok_or(ChainError::IndexOverflow(tip.index)),
            None => Ok(GENESIS_INDEX),
        }
    }

    /// Queue a transaction; returns the index of the block expected to include it.
    ///
    /// Fails only when the tip index cannot be incremented, leaving the pool untouched.
    pub fn register_transaction(&mut self, tx: Transaction) -> Result<u64, ChainError> {
        let next_index = self.next_index()?;
        debug!(
            tx = %tx.hash_str(),
            next_index,
            "registered transaction"
        );
        self.state.push_pending(tx);
        Ok(next_index)
    }

    /// Append a block carrying the whole pending pool.
    ///
    /// `proof` is trusted as given. When `previous_hash` is `None` or empty the
    /// digest of the current tip is used; otherwise the value is used verbatim.
    pub fn mine_block(
        &mut self,
        proof: u64,
        previous_hash: Option<&str>,
    ) -> Result<Block, ChainError> {
        let previous_hash = match previous_hash {
            Some(hash) if !hash.is_empty() => hash.to_string(),
            _ => self.tip()?.hash(),
        };
        self.append_block(proof, previous_hash)
    }

    /// Like `mine_block`, but refuses a proof that does not solve the tip's puzzle.
    pub fn mine_block_checked(&mut self, proof: u64) -> Result<Block, ChainError> {
        let tip = self.tip()?;
        if !self.pow.is_valid(tip.proof, proof) {
            return Err(ChainError::InvalidProofOfWork(tip.index.saturating_add(1)));
        }
        let previous_hash = tip.hash();
        self.append_block(proof, previous_hash)
    }

    /// Commit a proof found against `expected_tip_hash`.
    ///
    /// Fails with `StaleTip` if the tip moved while the proof was being searched,
    /// in which case nothing is changed.
    pub fn commit_mined_block(
        &mut self,
        expected_tip_hash: &str,
        proof: u64,
    ) -> Result<Block, ChainError> {
        let found = self.tip()?.hash();
        if found != expected_tip_hash {
            return Err(ChainError::StaleTip {
                expected: expected_tip_hash.to_string(),
                found,
            });
        }
        self.mine_block_checked(proof)
    }

    fn append_block(&mut self, proof: u64, previous_hash: String) -> Result<Block, ChainError> {
        let index = self.next_index()?;
        let timestamp = next_timestamp(self.tip()?.timestamp);

        let block = Block {
            index,
            timestamp,
            transactions: self.state.drain_pending(),
            proof,
            previous_hash,
        };
        self.state.append(block.clone());

        info!(
            index = block.index,
            transactions = block.transactions.len(),
            proof = block.proof,
            "appended block"
        );
        Ok(block)
    }

    /// Whether `candidate` is internally linked and every proof is valid.
    pub fn verify_chain(&self, candidate: &[Block]) -> bool {
        verify_chain(candidate, &self.pow)
    }

    /// Same checks as `verify_chain`, naming the first failure.
    pub fn validate_chain(&self, candidate: &[Block]) -> Result<(), ChainError> {
        validate_chain(candidate, &self.pow)
    }

    /// Replace the chain wholesale. The pending pool is left alone.
    pub fn adopt_chain(&mut self, candidate: Vec<Block>) -> Result<(), ChainError> {
        let length = candidate.len();
        self.state.replace_chain(candidate)?;
        info!(length, "adopted chain");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn mine_next(ledger: &mut Ledger) -> Block {
        let last_proof = ledger.tip().unwrap().proof;
        let proof = ledger
            .proof_of_work()
            .find_proof(last_proof, &CancellationToken::new())
            .unwrap();
        ledger.mine_block(proof, None).unwrap()
    }

    #[test]
    fn test_new_ledger_holds_genesis() {
        let ledger = Ledger::default();
        assert_eq!(ledger.len(), 1);
        let genesis = ledger.tip().unwrap();
        assert_eq!(genesis.index, 1);
        assert_eq!(genesis.proof, 100);
        assert_eq!(genesis.previous_hash, "1");
        assert!(genesis.transactions.is_empty());
        assert!(ledger.pending_transactions().is_empty());
    }

    #[test]
    fn test_register_returns_next_index() {
        let mut ledger = Ledger::new(ProofOfWork::new(2));
        assert_eq!(ledger.register_transaction(Transaction::new("A", "B", 1)), Ok(2));
        assert_eq!(ledger.register_transaction(Transaction::new("B", "C", 1)), Ok(2));
        mine_next(&mut ledger);
        assert_eq!(ledger.register_transaction(Transaction::new("C", "D", 1)), Ok(3));
    }

    #[test]
    fn test_mine_after_genesis_scenario() {
        let mut ledger = Ledger::default();
        let genesis = ledger.tip().unwrap().clone();
        ledger.register_transaction(Transaction::new("A", "B", 10)).unwrap();
        ledger.register_transaction(Transaction::new("B", "C", 5)).unwrap();

        let proof = ledger
            .proof_of_work()
            .find_proof(genesis.proof, &CancellationToken::new())
            .unwrap();
        let block = ledger.mine_block(proof, None).unwrap();

        assert_eq!(block.index, 2);
        assert_eq!(block.previous_hash, genesis.hash());
        assert_eq!(
            block.transactions,
            vec![Transaction::new("A", "B", 10), Transaction::new("B", "C", 5)]
        );
        assert!(ledger.pending_transactions().is_empty());
        assert_eq!(ledger.tip().unwrap(), &block);
        assert!(ledger.verify_chain(ledger.chain()));
    }

    #[test]
    fn test_mine_block_uses_supplied_previous_hash_verbatim() {
        let mut ledger = Ledger::new(ProofOfWork::new(2));
        let block = ledger.mine_block(7, Some("forced")).unwrap();
        assert_eq!(block.previous_hash, "forced");
        assert!(!ledger.verify_chain(ledger.chain()));
    }

    #[test]
    fn test_mine_block_treats_empty_hash_as_absent() {
        let mut ledger = Ledger::new(ProofOfWork::new(2));
        let genesis_hash = ledger.tip().unwrap().hash();
        let block = ledger.mine_block(7, Some("")).unwrap();
        assert_eq!(block.previous_hash, genesis_hash);
    }

    #[test]
    fn test_mine_block_checked_rejects_bad_proof() {
        let mut ledger = Ledger::default();
        ledger.register_transaction(Transaction::new("A", "B", 10)).unwrap();
        let err = ledger.mine_block_checked(1).unwrap_err();
        assert_eq!(err, ChainError::InvalidProofOfWork(2));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.pending_transactions().len(), 1);

        let block = ledger.mine_block_checked(35293).unwrap();
        assert_eq!(block.index, 2);
    }

    #[test]
    fn test_commit_rejects_stale_tip() {
        let mut ledger = Ledger::new(ProofOfWork::new(2));
        let stale_hash = ledger.tip().unwrap().hash();
        let stale_proof = ledger
            .proof_of_work()
            .find_proof(ledger.tip().unwrap().proof, &CancellationToken::new())
            .unwrap();

        mine_next(&mut ledger);
        ledger.register_transaction(Transaction::new("A", "B", 3)).unwrap();

        let err = ledger.commit_mined_block(&stale_hash, stale_proof).unwrap_err();
        assert!(matches!(err, ChainError::StaleTip { .. }));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.pending_transactions().len(), 1);
    }

    #[test]
    fn test_commit_on_current_tip() {
        let mut ledger = Ledger::new(ProofOfWork::new(2));
        let tip_hash = ledger.tip().unwrap().hash();
        let block = ledger.commit_mined_block(&tip_hash, 226).unwrap();
        assert_eq!(block.previous_hash, tip_hash);
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let mut ledger = Ledger::new(ProofOfWork::new(1));
        for _ in 0..5 {
            mine_next(&mut ledger);
        }
        assert!(ledger
            .chain()
            .windows(2)
            .all(|pair| pair[1].timestamp > pair[0].timestamp));
    }

    #[test]
    fn test_index_overflow_is_an_error() {
        let tip = Block {
            index: u64::MAX,
            ..Block::genesis()
        };
        let mut ledger = Ledger::new(ProofOfWork::new(2));
        ledger.register_transaction(Transaction::new("A", "B", 1)).unwrap();
        ledger.adopt_chain(vec![tip]).unwrap();

        assert_eq!(
            ledger.register_transaction(Transaction::new("B", "C", 2)),
            Err(ChainError::IndexOverflow(u64::MAX))
        );
        assert_eq!(ledger.pending_transactions().len(), 1);

        assert_eq!(
            ledger.mine_block(226, None),
            Err(ChainError::IndexOverflow(u64::MAX))
        );
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.pending_transactions().len(), 1);
    }

    #[test]
    fn test_adopt_chain_replaces_but_keeps_pool() {
        let mut donor = Ledger::new(ProofOfWork::new(2));
        mine_next(&mut donor);
        mine_next(&mut donor);

        let mut ledger = Ledger::new(ProofOfWork::new(2));
        ledger.register_transaction(Transaction::new("A", "B", 1)).unwrap();
        ledger.adopt_chain(donor.chain().to_vec()).unwrap();

        assert_eq!(ledger.chain(), donor.chain());
        assert_eq!(ledger.pending_transactions().len(), 1);
        assert_eq!(ledger.adopt_chain(vec![]), Err(ChainError::EmptyChain));
        assert_eq!(ledger.len(), 3);
    }
}
