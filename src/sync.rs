//! Chain reconciliation against peers
//!
//! This module provides:
//! - The `ChainFetcher` seam used to ask a peer for its chain
//! - An HTTP fetcher speaking the `GET /chain` contract
//! - `ConsensusResolver`, which adopts the longest valid chain strictly longer
//!   than the local one

use crate::blockchain::{validate_indexes, verify_chain, Block, Ledger};
use crate::error::{ChainError, Result};
use crate::peers::PeerSet;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// What a peer returns from `GET /chain`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChainResponse {
    pub length: usize,
    pub chain: Vec<Block>,
}

impl ChainResponse {
    pub fn from_chain(chain: Vec<Block>) -> Self {
        Self {
            length: chain.len(),
            chain,
        }
    }
}

/// Fetches a peer's full chain.
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse>;
}

/// `ChainFetcher` over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpChainFetcher {
    client: reqwest::Client,
}

impl HttpChainFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ChainFetcher for HttpChainFetcher {
    async fn fetch_chain(&self, peer: &str) -> Result<ChainResponse> {
        let url = format!("http://{}/chain", peer);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(ChainError::NetworkError(format!(
                "{} answered {}",
                url,
                resp.status()
            )));
        }

        Ok(resp.json().await?)
    }
}

/// Longest-valid-chain conflict resolution.
pub struct ConsensusResolver {
    fetcher: Arc<dyn ChainFetcher>,
    max_concurrent_fetches: usize,
}

impl ConsensusResolver {
    pub fn new(fetcher: Arc<dyn ChainFetcher>, max_concurrent_fetches: usize) -> Self {
        Self {
            fetcher,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
        }
    }

    /// Query every peer and adopt the longest valid chain that beats ours.
    ///
    /// Returns `true` if the local chain was replaced. Peer failures and
    /// invalid candidates are logged and skipped. Ties keep the local chain.
    pub async fn resolve(&self, ledger: &RwLock<Ledger>, peers: &PeerSet) -> Result<bool> {
        let (local_length, pow) = {
            let ledger = ledger.read().await;
            (ledger.len(), *ledger.proof_of_work())
        };

        let fetcher = &self.fetcher;
        let mut responses = stream::iter(peers.all())
            .map(|peer| async move {
                let result = fetcher.fetch_chain(&peer).await;
                (peer, result)
            })
            .buffer_unordered(self.max_concurrent_fetches);

        let mut best_length = local_length;
        let mut best_chain: Option<Vec<Block>> = None;

        while let Some((peer, result)) = responses.next().await {
            let view = match result {
                Ok(view) => view,
                Err(e) => {
                    warn!(%peer, error = %e, "peer unavailable, skipping");
                    continue;
                }
            };

            if view.length != view.chain.len() {
                warn!(
                    %peer,
                    reported = view.length,
                    actual = view.chain.len(),
                    "peer reported a length that does not match its chain"
                );
                continue;
            }

            if view.length <= best_length {
                debug!(%peer, length = view.length, best_length, "peer chain not longer");
                continue;
            }

            if let Err(e) = validate_indexes(&view.chain) {
                warn!(%peer, error = %e, "rejecting chain with out-of-sequence indexes");
                continue;
            }

            if !verify_chain(&view.chain, &pow) {
                warn!(%peer, length = view.length, "rejecting invalid chain from peer");
                continue;
            }

            debug!(%peer, length = view.length, "new best candidate");
            best_length = view.length;
            best_chain = Some(view.chain);
        }

        let Some(chain) = best_chain else {
            return Ok(false);
        };

        let mut ledger = ledger.write().await;
        if chain.len() <= ledger.len() {
            // The local chain grew while peers were being queried.
            info!(
                candidate = chain.len(),
                local = ledger.len(),
                "discarding candidate that is no longer longer than the local chain"
            );
            return Ok(false);
        }
        ledger.adopt_chain(chain)?;
        Ok(true)
    }
}
