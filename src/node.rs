use crate::blockchain::{Block, Ledger};
use crate::config::Config;
use crate::error::{ChainError, Result};
use crate::miner::ProofOfWork;
use crate::peers::PeerSet;
use crate::sync::{ChainFetcher, ChainResponse, ConsensusResolver, HttpChainFetcher};
use crate::transaction::Transaction;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A single ledger node: the chain, its peers, and the mining/consensus drivers.
pub struct Node {
    pub config: Config,
    pub ledger: Arc<RwLock<Ledger>>,
    pub peers: Arc<PeerSet>,
    resolver: ConsensusResolver,
    shutdown: CancellationToken,
    // Shared by every in-flight proof search; swapped for a fresh child after each abort.
    mining: Mutex<CancellationToken>,
    blocks_mined: AtomicU64,
}

impl Node {
    /// Build a node that fetches peer chains over HTTP.
    pub fn new(config: Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.consensus.fetch_timeout_secs);
        let fetcher = Arc::new(HttpChainFetcher::new(timeout)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    pub fn with_fetcher(config: Config, fetcher: Arc<dyn ChainFetcher>) -> Self {
        let ledger = Ledger::new(ProofOfWork::new(config.mining.difficulty));
        let peers = PeerSet::new();
        for peer in &config.network.bootstrap_peers {
            peers.register(peer);
        }
        let resolver = ConsensusResolver::new(fetcher, config.consensus.max_concurrent_fetches);
        let shutdown = CancellationToken::new();
        let mining = Mutex::new(shutdown.child_token());

        Self {
            config,
            ledger: Arc::new(RwLock::new(ledger)),
            peers: Arc::new(peers),
            resolver,
            shutdown,
            mining,
            blocks_mined: AtomicU64::new(0),
        }
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined.load(Ordering::Relaxed)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub async fn register_transaction(&self, tx: Transaction) -> Result<u64> {
        self.ledger.write().await.register_transaction(tx)
    }

    pub fn register_peer(&self, address: &str) -> bool {
        self.peers.register(address)
    }

    pub async fn chain_snapshot(&self) -> ChainResponse {
        ChainResponse::from_chain(self.ledger.read().await.chain().to_vec())
    }

    /// Search for the next proof and append a block carrying the pending pool.
    ///
    /// The search runs without holding the ledger lock. If the tip changed in
    /// the meantime the result is discarded with `StaleTip`; the caller decides
    /// whether to try again.
    pub async fn mine(&self) -> Result<Block> {
        // Taken before the snapshot so an adoption landing in between still cancels this search.
        let token = self.mining.lock().clone();
        let (tip_hash, last_proof, pow) = {
            let ledger = self.ledger.read().await;
            let tip = ledger.tip()?;
            (tip.hash(), tip.proof, *ledger.proof_of_work())
        };

        debug!(last_proof, difficulty = pow.difficulty(), "searching for proof");
        let proof = tokio::task::spawn_blocking(move || pow.find_proof(last_proof, &token))
            .await
            .map_err(|e| ChainError::Internal(format!("proof search task failed: {}", e)))??;

        let mut ledger = self.ledger.write().await;
        match ledger.commit_mined_block(&tip_hash, proof) {
            Ok(block) => {
                self.blocks_mined.fetch_add(1, Ordering::SeqCst);
                info!(index = block.index, proof, "mined block");
                Ok(block)
            }
            Err(e) => {
                warn!(error = %e, "discarding mined block");
                Err(e)
            }
        }
    }

    /// Cancel every proof search currently in flight.
    pub fn abort_mining(&self) {
        let mut token = self.mining.lock();
        token.cancel();
        *token = self.shutdown.child_token();
    }

    /// Run one consensus pass. In-flight mining is aborted when a peer chain is adopted.
    pub async fn resolve_conflicts(&self) -> Result<bool> {
        let replaced = self.resolver.resolve(&self.ledger, &self.peers).await?;
        if replaced {
            self.abort_mining();
        }
        Ok(replaced)
    }

    /// Periodically resolve conflicts until shutdown. `None` when the interval is 0.
    pub fn spawn_consensus_loop(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let secs = self.config.consensus.resolve_interval_secs;
        if secs == 0 {
            return None;
        }

        let node = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(secs));
            loop {
                tokio::select! {
                    _ = node.shutdown.cancelled() => break,
                    _ = ticker.tick() => match node.resolve_conflicts().await {
                        Ok(true) => info!("local chain replaced by a longer peer chain"),
                        Ok(false) => debug!("local chain is authoritative"),
                        Err(e) => warn!(error = %e, "consensus pass failed"),
                    },
                }
            }
            debug!("consensus loop stopped");
        }))
    }

    /// Stop mining and background loops.
    pub fn shutdown(&self) {
        info!("shutting down node");
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
