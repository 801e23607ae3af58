//! Wallet Pool: the primary signer, the fee payer and the ordered workers
//!
//! Loaded once at startup and immutable afterwards. Worker index only
//! matters for deterministic grouping.

pub mod keystore;
mod pool;

pub use keystore::{create_keypairs, load_keystore, save_keystore};
pub use pool::{chunk_wallets, Wallet, WalletPool, WalletRole};
