//! In-memory ledger and relay doubles plus fixtures for pipeline tests

use crate::config::Configs;
use crate::errors::{BundlerError, BundlerResult};
use crate::pool::{derive_pool_keys, find_vault_signer_nonce, MarketState, PoolKeys, ProgramIds};
use crate::relay::{RelayBundleStatus, RelayClient};
use crate::rpc::layouts::{encode_mint, encode_token_account};
use crate::rpc::{LedgerRpc, SimulationOutcome};
use crate::wallets::WalletPool;
use async_trait::async_trait;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::VersionedTransaction;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub struct MockLedger {
    blockhash: Hash,
    slot: u64,
    accounts: Mutex<HashMap<Pubkey, Vec<u8>>>,
    balances: Mutex<HashMap<Pubkey, u64>>,
    reads: Mutex<HashMap<Pubkey, usize>>,
    read_errors: Mutex<HashMap<Pubkey, String>>,
    simulation_error: Mutex<Option<String>>,
    simulated: Mutex<usize>,
    send_error: Mutex<Option<String>>,
    sent: Mutex<Vec<VersionedTransaction>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            slot: 250_000_000,
            accounts: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            reads: Mutex::new(HashMap::new()),
            read_errors: Mutex::new(HashMap::new()),
            simulation_error: Mutex::new(None),
            simulated: Mutex::new(0),
            send_error: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(address, data);
    }

    pub fn set_balance(&self, address: Pubkey, lamports: u64) {
        self.balances.lock().unwrap().insert(address, lamports);
    }

    pub fn set_token_account(&self, address: Pubkey, mint: &Pubkey, owner: &Pubkey, amount: u64) {
        self.set_account(address, encode_token_account(mint, owner, amount));
    }

    pub fn account_reads(&self, address: &Pubkey) -> usize {
        self.reads.lock().unwrap().get(address).copied().unwrap_or(0)
    }

    /// Every later read of `address` fails with `error`
    pub fn fail_reads_of(&self, address: Pubkey, error: &str) {
        self.read_errors
            .lock()
            .unwrap()
            .insert(address, error.to_string());
    }

    /// Every later simulation reports `error`
    pub fn fail_simulations(&self, error: &str) {
        *self.simulation_error.lock().unwrap() = Some(error.to_string());
    }

    pub fn simulation_count(&self) -> usize {
        *self.simulated.lock().unwrap()
    }

    pub fn fail_sends(&self, error: &str) {
        *self.send_error.lock().unwrap() = Some(error.to_string());
    }

    pub fn sent(&self) -> Vec<VersionedTransaction> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerRpc for MockLedger {
    async fn latest_blockhash(&self) -> BundlerResult<Hash> {
        Ok(self.blockhash)
    }

    async fn slot(&self) -> BundlerResult<u64> {
        Ok(self.slot)
    }

    async fn account_data(&self, address: &Pubkey) -> BundlerResult<Option<Vec<u8>>> {
        *self.reads.lock().unwrap().entry(*address).or_default() += 1;
        if let Some(error) = self.read_errors.lock().unwrap().get(address) {
            return Err(BundlerError::Rpc(error.clone()));
        }
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn balance(&self, address: &Pubkey) -> BundlerResult<u64> {
        Ok(self.balances.lock().unwrap().get(address).copied().unwrap_or(0))
    }

    async fn simulate(&self, _tx: &VersionedTransaction) -> BundlerResult<SimulationOutcome> {
        *self.simulated.lock().unwrap() += 1;
        let error = self.simulation_error.lock().unwrap().clone();
        Ok(SimulationOutcome {
            logs: vec!["Program log: mock".to_string()],
            units_consumed: Some(50_000),
            error,
        })
    }

    async fn send_and_confirm(&self, tx: &VersionedTransaction) -> BundlerResult<Signature> {
        if let Some(reason) = self.send_error.lock().unwrap().clone() {
            return Err(BundlerError::ledger_submit("send", reason));
        }
        self.sent.lock().unwrap().push(tx.clone());
        Ok(tx.signatures.first().copied().unwrap_or_default())
    }
}

pub struct MockRelay {
    bundles: Mutex<Vec<Vec<String>>>,
    send_error: Mutex<Option<String>>,
    statuses: Mutex<VecDeque<Option<RelayBundleStatus>>>,
}

impl MockRelay {
    pub fn new() -> Self {
        Self {
            bundles: Mutex::new(Vec::new()),
            send_error: Mutex::new(None),
            statuses: Mutex::new(VecDeque::new()),
        }
    }

    /// Relay that reports every bundle as landed on the first poll
    pub fn landing() -> Self {
        let relay = Self::new();
        relay.push_status(Some(RelayBundleStatus::Landed { slot: Some(1) }));
        relay
    }

    pub fn fail_sends(&self, message: &str) {
        *self.send_error.lock().unwrap() = Some(message.to_string());
    }

    /// Queue the answer to one status poll; an empty queue answers `None`
    pub fn push_status(&self, status: Option<RelayBundleStatus>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn bundles(&self) -> Vec<Vec<String>> {
        self.bundles.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayClient for MockRelay {
    async fn send_bundle(&self, encoded_transactions: Vec<String>) -> BundlerResult<String> {
        if let Some(message) = self.send_error.lock().unwrap().clone() {
            return Err(crate::relay::classify_rejection(&message));
        }
        let mut bundles = self.bundles.lock().unwrap();
        bundles.push(encoded_transactions);
        Ok(format!("bundle-{}", bundles.len()))
    }

    async fn bundle_status(&self, _bundle_id: &str) -> BundlerResult<Option<RelayBundleStatus>> {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            return Ok(statuses.pop_front().flatten());
        }
        // The last queued answer repeats
        Ok(statuses.front().cloned().flatten())
    }
}

pub fn sample_programs() -> ProgramIds {
    ProgramIds::from_configs(&Configs::default()).unwrap()
}

pub fn sample_market() -> (Pubkey, MarketState) {
    let programs = sample_programs();
    let market_id = Pubkey::new_unique();
    let mut market = MarketState::sample(market_id);
    market.vault_signer_nonce = find_vault_signer_nonce(&programs.market, &market_id);
    (market_id, market)
}

/// Pool keys over a fresh market with a 6-decimal base and WSOL quote
pub fn sample_pool_keys() -> PoolKeys {
    let (market_id, market) = sample_market();
    derive_pool_keys(&market_id, &market, 6, 9, &sample_programs()).unwrap()
}

/// Registers a fresh market and its base mint on `ledger`
pub fn seed_market(ledger: &MockLedger) -> PoolKeys {
    let (market_id, market) = sample_market();
    ledger.set_account(market_id, market.encode());
    ledger.set_account(market.base_mint, encode_mint(6));
    derive_pool_keys(&market_id, &market, 6, 9, &sample_programs()).unwrap()
}

pub fn sample_wallet_pool(workers: usize) -> WalletPool {
    WalletPool::new(
        Keypair::new(),
        Keypair::new(),
        (0..workers).map(|_| Keypair::new()).collect(),
    )
}
