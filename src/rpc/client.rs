use super::{LedgerRpc, SimulationOutcome};
use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;

/// `LedgerRpc` over a single JSON-RPC endpoint. No retries.
pub struct SolanaLedger {
    client: RpcClient,
    commitment: CommitmentConfig,
}

impl SolanaLedger {
    pub fn new(rpc_url: &str) -> Self {
        let commitment = CommitmentConfig::confirmed();
        Self {
            client: RpcClient::new_with_commitment(rpc_url.to_string(), commitment),
            commitment,
        }
    }
}

fn rpc_err(method: &str, e: impl std::fmt::Display) -> BundlerError {
    BundlerError::Rpc(format!("{}: {}", method, e))
}

#[async_trait]
impl LedgerRpc for SolanaLedger {
    async fn latest_blockhash(&self) -> BundlerResult<Hash> {
        let (hash, _) = self
            .client
            .get_latest_blockhash_with_commitment(CommitmentConfig::finalized())
            .await
            .map_err(|e| rpc_err("getLatestBlockhash", e))?;
        Ok(hash)
    }

    async fn slot(&self) -> BundlerResult<u64> {
        self.client
            .get_slot_with_commitment(CommitmentConfig::finalized())
            .await
            .map_err(|e| rpc_err("getSlot", e))
    }

    async fn account_data(&self, address: &Pubkey) -> BundlerResult<Option<Vec<u8>>> {
        let response = self
            .client
            .get_account_with_commitment(address, self.commitment)
            .await
            .map_err(|e| rpc_err("getAccountInfo", e))?;
        Ok(response.value.map(|account| account.data))
    }

    async fn balance(&self, address: &Pubkey) -> BundlerResult<u64> {
        self.client
            .get_balance(address)
            .await
            .map_err(|e| rpc_err("getBalance", e))
    }

    async fn simulate(&self, tx: &VersionedTransaction) -> BundlerResult<SimulationOutcome> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: true,
            commitment: Some(CommitmentConfig::processed()),
            ..RpcSimulateTransactionConfig::default()
        };
        let response = self
            .client
            .simulate_transaction_with_config(tx, config)
            .await
            .map_err(|e| rpc_err("simulateTransaction", e))?;

        let value = response.value;
        Ok(SimulationOutcome {
            error: value.err.map(|e| format!("{:?}", e)),
            logs: value.logs.unwrap_or_default(),
            units_consumed: value.units_consumed,
        })
    }

    async fn send_and_confirm(&self, tx: &VersionedTransaction) -> BundlerResult<Signature> {
        let signature = self
            .client
            .send_and_confirm_transaction(tx)
            .await
            .map_err(|e| BundlerError::ledger_submit("transaction", e))?;
        logger::debug(LogTag::Rpc, &format!("Confirmed {}", signature));
        Ok(signature)
    }
}
