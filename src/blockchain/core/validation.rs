use crate::blockchain::core::chain::{Block, GENESIS_INDEX};
use crate::error::ChainError;
use crate::miner::ProofOfWork;

/// Walk `chain` from its second block, checking hash links and proofs.
///
/// A single block is accepted as-is. Index continuity (`validate_indexes`)
/// and the genesis constants are not checked here.
pub fn validate_chain(chain: &[Block], pow: &ProofOfWork) -> Result<(), ChainError> {
    let (first, rest) = chain.split_first().ok_or(ChainError::EmptyChain)?;

    let mut previous = first;
    for block in rest {
        if block.previous_hash != previous.hash() {
            return Err(ChainError::InvalidBlockLinkage(block.index));
        }
        if !pow.is_valid(previous.proof, block.proof) {
            return Err(ChainError::InvalidProofOfWork(block.index));
        }
        previous = block;
    }
    Ok(())
}

pub fn verify_chain(chain: &[Block], pow: &ProofOfWork) -> bool {
    validate_chain(chain, pow).is_ok()
}

/// Check that block `i` carries index `i + 1`, as every chain grown from genesis does.
pub fn validate_indexes(chain: &[Block]) -> Result<(), ChainError> {
    for (expected, block) in (GENESIS_INDEX..).zip(chain) {
        if block.index != expected {
            return Err(ChainError::InvalidBlockIndex(block.index));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::Ledger;
    use crate::transaction::Transaction;
    use tokio_util::sync::CancellationToken;

    fn valid_chain(blocks: usize) -> (Vec<Block>, ProofOfWork) {
        let pow = ProofOfWork::new(2);
        let mut ledger = Ledger::new(pow);
        let token = CancellationToken::new();
        for i in 0..blocks.saturating_sub(1) {
            ledger
                .register_transaction(Transaction::new("A", "B", i as i64))
                .unwrap();
            let proof = pow.find_proof(ledger.tip().unwrap().proof, &token).unwrap();
            ledger.mine_block(proof, None).unwrap();
        }
        (ledger.chain().to_vec(), pow)
    }

    #[test]
    fn test_valid_chain_verifies() {
        let (chain, pow) = valid_chain(5);
        assert!(verify_chain(&chain, &pow));
        assert_eq!(validate_chain(&chain, &pow), Ok(()));
    }

    #[test]
    fn test_empty_chain_is_invalid() {
        let pow = ProofOfWork::default();
        assert!(!verify_chain(&[], &pow));
        assert_eq!(validate_chain(&[], &pow), Err(ChainError::EmptyChain));
    }

    #[test]
    fn test_single_block_is_vacuously_valid() {
        let pow = ProofOfWork::default();
        let lone = Block {
            index: 42,
            timestamp: 0,
            transactions: vec![],
            proof: 1,
            previous_hash: "anything".to_string(),
        };
        assert!(verify_chain(&[lone], &pow));
    }

    #[test]
    fn test_tampered_previous_hash_fails() {
        let (mut chain, pow) = valid_chain(4);
        chain[2].previous_hash = "0".repeat(64);
        assert_eq!(
            validate_chain(&chain, &pow),
            Err(ChainError::InvalidBlockLinkage(3))
        );
    }

    #[test]
    fn test_tampered_contents_break_next_link() {
        let (mut chain, pow) = valid_chain(4);
        chain[1].transactions[0].amount = 1_000_000;
        assert_eq!(
            validate_chain(&chain, &pow),
            Err(ChainError::InvalidBlockLinkage(3))
        );
    }

    #[test]
    fn test_indexes_follow_position() {
        let (mut chain, _) = valid_chain(3);
        assert_eq!(validate_indexes(&chain), Ok(()));

        chain[2].index = 7;
        assert_eq!(validate_indexes(&chain), Err(ChainError::InvalidBlockIndex(7)));

        let far = Block {
            index: u64::MAX,
            ..Block::genesis()
        };
        assert_eq!(
            validate_indexes(&[far]),
            Err(ChainError::InvalidBlockIndex(u64::MAX))
        );
    }

    #[test]
    fn test_bad_proof_fails() {
        let (mut chain, pow) = valid_chain(2);
        let last_proof = chain[0].proof;
        let bad = (0..).find(|p| !pow.is_valid(last_proof, *p)).unwrap();
        chain[1].proof = bad;
        assert_eq!(
            validate_chain(&chain, &pow),
            Err(ChainError::InvalidProofOfWork(2))
        );
    }
}
