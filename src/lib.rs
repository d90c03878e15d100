//! powledger - a hash-linked proof-of-work ledger
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the ledger, and chain validation
//! - [`transaction`] - Transaction value type
//!
//! ## Consensus & Mining
//! - [`miner`] - Proof-of-work search and validation
//! - [`sync`] - Longest-valid-chain reconciliation with peers
//!
//! ## Cryptography
//! - [`crypto`] - Canonical block hashing
//!
//! ## Networking
//! - [`peers`] - Peer registry and address normalization
//! - [`node`] - Node orchestration (mining, consensus loop, shutdown)
//! - `api` - HTTP endpoints (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;
pub mod sync;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Networking
// ============================================================================
pub mod node;
pub mod peers;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
