//! Bundle construction and submission for token launches
//!
//! Operations build instruction batches for a fixed set of worker wallets,
//! pack them into size-bounded v0 transactions compacted through the launch
//! lookup table, and submit them to a block-engine relay as one atomic bundle.

pub mod arguments;
pub mod bundle;
pub mod chunker;
pub mod config;
pub mod constants;
pub mod errors;
pub mod instructions;
pub mod logger;
pub mod lut;
pub mod operations;
pub mod pool;
pub mod relay;
pub mod rpc;
pub mod state;
pub mod utils;
pub mod wallets;

#[cfg(test)]
pub(crate) mod testing;
