//! Public entry points: one per operator action
//!
//! Every operation reads the launch state, builds its instruction batch,
//! chunks and compiles it against one blockhash, and dispatches a single
//! bundle. A failure anywhere discards everything built so far.

mod buy;
mod checklist;
mod funding;
mod liquidity;
mod lut;
mod pool;
mod sell;
mod types;

pub use checklist::{LaunchReadiness, WorkerReadiness};
pub use types::{
    DistributeWsolParams, FundWorkersParams, OperationReport, PoolBundleParams,
    SellPercentageParams, TipOnly,
};

use crate::bundle::{BundleDispatcher, BundleReport};
use crate::chunker::{collect_or_abort, ChunkCompiler, TransactionChunk};
use crate::config::Configs;
use crate::errors::BundlerResult;
use crate::instructions::tip_instruction;
use crate::logger::{self, LogTag};
use crate::lut::LookupTableManager;
use crate::pool::{resolve_pool_keys, PoolKeys, ProgramIds};
use crate::relay::{JitoRelay, RelayClient};
use crate::rpc::{LedgerRpc, SolanaLedger};
use crate::state::{JsonLaunchStateStore, LaunchState, LaunchStateStore};
use crate::wallets::{Wallet, WalletPool};
use futures::future::try_join_all;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::AddressLookupTableAccount;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;

pub struct LaunchContext {
    configs: Configs,
    ledger: Arc<dyn LedgerRpc>,
    wallets: WalletPool,
    state: Arc<dyn LaunchStateStore>,
    programs: ProgramIds,
    luts: LookupTableManager,
    dispatcher: BundleDispatcher,
    tip_account: Pubkey,
}

impl LaunchContext {
    pub fn new(
        configs: Configs,
        ledger: Arc<dyn LedgerRpc>,
        relay: Arc<dyn RelayClient>,
        wallets: WalletPool,
        state: Arc<dyn LaunchStateStore>,
    ) -> BundlerResult<Self> {
        configs.validate()?;
        let programs = ProgramIds::from_configs(&configs)?;
        let tip_account = configs.tip_account()?;
        let dispatcher =
            BundleDispatcher::new(ledger.clone(), relay, configs.bundle.clone(), tip_account);
        Ok(Self {
            luts: LookupTableManager::new(ledger.clone()),
            configs,
            ledger,
            wallets,
            state,
            programs,
            dispatcher,
            tip_account,
        })
    }

    /// Network-backed context: RPC node, block-engine relay, keystore and
    /// the JSON launch-state file named in `configs`.
    pub fn connect(configs: Configs) -> BundlerResult<Self> {
        let ledger: Arc<dyn LedgerRpc> = Arc::new(SolanaLedger::new(&configs.rpc_url));
        let relay: Arc<dyn RelayClient> = Arc::new(JitoRelay::new(&configs.relay_url)?);
        let wallets = WalletPool::load(&configs)?;
        let state: Arc<dyn LaunchStateStore> =
            Arc::new(JsonLaunchStateStore::new(&configs.launch_state_path));
        Self::new(configs, ledger, relay, wallets, state)
    }

    pub fn configs(&self) -> &Configs {
        &self.configs
    }

    pub fn wallets(&self) -> &WalletPool {
        &self.wallets
    }

    pub fn launch_state(&self) -> BundlerResult<LaunchState> {
        self.state.load()
    }

    /// Decimals of the market's base mint, for converting UI amounts
    pub async fn base_decimals(&self, market_id: &Pubkey) -> BundlerResult<u8> {
        Ok(self.pool_keys(market_id).await?.base_decimals)
    }

    fn payer(&self) -> &Wallet {
        self.wallets.fee_payer()
    }

    fn tip(&self, lamports: u64) -> Instruction {
        tip_instruction(&self.payer().pubkey(), &self.tip_account, lamports)
    }

    async fn pool_keys(&self, market_id: &Pubkey) -> BundlerResult<PoolKeys> {
        resolve_pool_keys(self.ledger.as_ref(), market_id, &self.programs).await
    }

    async fn launch_keys(&self, state: &LaunchState) -> BundlerResult<PoolKeys> {
        self.pool_keys(&state.require_market()?).await
    }

    /// The launch table's contents when one is recorded, for size estimates
    async fn table_accounts(
        &self,
        state: &LaunchState,
    ) -> BundlerResult<Vec<AddressLookupTableAccount>> {
        match state.lookup_table {
            Some(table) => Ok(vec![self.luts.table(&table).await?]),
            None => Ok(Vec::new()),
        }
    }

    /// Raw balances of one token account per worker, read concurrently.
    /// The first failed read cancels the rest.
    async fn worker_token_balances(
        &self,
        account_of: impl Fn(&Pubkey) -> Pubkey,
    ) -> BundlerResult<Vec<(Wallet, u64)>> {
        let reads = self.wallets.workers().iter().map(|worker| {
            let account = account_of(&worker.pubkey());
            let ledger = self.ledger.clone();
            async move { ledger.token_balance(&account).await }
        });
        let balances = try_join_all(reads).await?;
        Ok(self
            .wallets
            .workers()
            .iter()
            .cloned()
            .zip(balances)
            .collect())
    }

    /// Compile every chunk against one fresh blockhash and dispatch them as
    /// a single bundle; a defective chunk aborts the whole bundle.
    async fn compile_and_dispatch(
        &self,
        chunks: &[TransactionChunk],
        tables: Vec<Pubkey>,
    ) -> BundlerResult<BundleReport> {
        let blockhash = self.ledger.latest_blockhash().await?;
        let compiler = ChunkCompiler::new(
            &self.luts,
            tables,
            blockhash,
            self.configs.bundle.max_transaction_size,
        );
        let compiled = collect_or_abort(compiler.compile_all(chunks).await)?;
        logger::info(
            LogTag::Bundle,
            &format!(
                "Compiled {} transactions ({} bytes total)",
                compiled.len(),
                compiled.iter().map(|t| t.size).sum::<usize>()
            ),
        );
        self.dispatcher.dispatch(compiled).await
    }
}
