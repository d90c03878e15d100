//! Error types for powledger

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Chain is empty")]
    EmptyChain,
    #[error("Invalid block linkage at index {0}")]
    InvalidBlockLinkage(u64),
    #[error("Invalid proof of work at index {0}")]
    InvalidProofOfWork(u64),
    #[error("Unexpected block index {0}")]
    InvalidBlockIndex(u64),
    #[error("Block index overflow after {0}")]
    IndexOverflow(u64),
    #[error("Chain tip changed while mining (expected {expected}, found {found})")]
    StaleTip { expected: String, found: String },
    #[error("Mining cancelled")]
    MiningCancelled,
    #[error("Proof search exhausted without a valid proof")]
    MiningExhausted,
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        ChainError::NetworkError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
