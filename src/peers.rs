//! Registry of known peer nodes
//!
//! Peers are stored as bare `host` or `host:port` identifiers. Free-form input
//! (`http://10.0.0.5:8000/`, `10.0.0.5:8000`) is normalized first so the same
//! node is never registered twice under different spellings.

use parking_lot::RwLock;
use std::collections::HashSet;
use url::Url;

/// Reduce a user-supplied address to a canonical host identifier.
///
/// Inputs without a scheme are read as `http://`. Returns `None` when no host
/// can be extracted.
pub fn normalize_address(address: &str) -> Option<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{}", trimmed))
    }
    .ok()?;

    let host = parsed.host_str().filter(|h| !h.is_empty())?;
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Deduplicated set of peer identifiers. Only grows.
#[derive(Debug, Default)]
pub struct PeerSet {
    nodes: RwLock<HashSet<String>>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer. Returns `true` only if it was not already known.
    ///
    /// Addresses that cannot be normalized are rejected with `false`.
    pub fn register(&self, address: &str) -> bool {
        match normalize_address(address) {
            Some(node) => self.nodes.write().insert(node),
            None => {
                tracing::warn!(address, "ignoring peer address that could not be normalized");
                false
            }
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        normalize_address(address).is_some_and(|node| self.nodes.read().contains(&node))
    }

    /// Snapshot of the current members.
    pub fn all(&self) -> HashSet<String> {
        self.nodes.read().clone()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }
}
