//! Transaction module; the value type lives in `types`

pub mod types;

pub use types::*;
