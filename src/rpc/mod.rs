//! Ledger access port
//!
//! Everything the pipeline reads from the chain goes through `LedgerRpc`.
//! `SolanaLedger` is the network implementation; the decoding defaults on
//! the trait mean alternative implementations only supply raw accounts.

mod client;
pub mod layouts;

pub use client::SolanaLedger;

use crate::errors::{BundlerError, BundlerResult};
use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::message::AddressLookupTableAccount;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;

/// Outcome of a non-committing simulation
#[derive(Debug, Clone, Default)]
pub struct SimulationOutcome {
    pub error: Option<String>,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

impl SimulationOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[async_trait]
pub trait LedgerRpc: Send + Sync {
    async fn latest_blockhash(&self) -> BundlerResult<Hash>;

    async fn slot(&self) -> BundlerResult<u64>;

    /// Raw account data, `None` when the account does not exist
    async fn account_data(&self, address: &Pubkey) -> BundlerResult<Option<Vec<u8>>>;

    /// Lamport balance of any account (0 when absent)
    async fn balance(&self, address: &Pubkey) -> BundlerResult<u64>;

    async fn simulate(&self, tx: &VersionedTransaction) -> BundlerResult<SimulationOutcome>;

    /// Direct submission, outside of any bundle
    async fn send_and_confirm(&self, tx: &VersionedTransaction) -> BundlerResult<Signature>;

    /// Raw token amount held by an SPL token account; 0 when it does not exist
    async fn token_balance(&self, token_account: &Pubkey) -> BundlerResult<u64> {
        match self.account_data(token_account).await? {
            Some(data) => layouts::token_account_amount(&data).ok_or_else(|| {
                BundlerError::Rpc(format!("{} is not a token account", token_account))
            }),
            None => Ok(0),
        }
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> BundlerResult<u8> {
        let data = self
            .account_data(mint)
            .await?
            .ok_or_else(|| BundlerError::Rpc(format!("mint {} not found", mint)))?;
        layouts::mint_decimals(&data)
            .ok_or_else(|| BundlerError::Rpc(format!("{} is not a mint", mint)))
    }

    /// `None` when the table account does not exist
    async fn lookup_table(&self, table: &Pubkey) -> BundlerResult<Option<AddressLookupTableAccount>> {
        match self.account_data(table).await? {
            Some(data) => layouts::decode_lookup_table(table, &data).map(Some),
            None => Ok(None),
        }
    }
}
