// Thin re-export module: implementation is in `blockchain/core.rs`
// (block model and ledger, pool state, chain validation).

pub mod core;
pub use core::*;
