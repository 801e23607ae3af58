/// Configuration sections for configs.json
use crate::config_struct;
use crate::constants::{
    DEFAULT_LUT_EXTEND_CHUNK, DEFAULT_WALLETS_PER_CHUNK, JITO_TIP_ACCOUNT, MAX_BUNDLE_TRANSACTIONS,
    MAX_TRANSACTION_SIZE,
    OPENBOOK_PROGRAM_ID, RAYDIUM_AMM_V4_PROGRAM_ID, RAYDIUM_FEE_DESTINATION,
};
use serde::{Deserialize, Serialize};

/// What a failed pre-submit simulation does to the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimulationPolicy {
    /// Any simulation error blocks submission
    Strict,
    /// Errors are logged and the bundle is still submitted
    #[default]
    Advisory,
    /// Skip simulation
    Off,
}

config_struct! {
    /// Chunking, relay and simulation limits
    pub struct BundleSettings {
        wallets_per_chunk: usize = DEFAULT_WALLETS_PER_CHUNK,
        lut_extend_chunk: usize = DEFAULT_LUT_EXTEND_CHUNK,
        max_transaction_size: usize = MAX_TRANSACTION_SIZE,
        max_bundle_transactions: usize = MAX_BUNDLE_TRANSACTIONS,
        simulation: SimulationPolicy = SimulationPolicy::Advisory,
        /// Wait for a terminal relay status after submission
        await_result: bool = true,
        relay_timeout_secs: u64 = 60,
        status_poll_ms: u64 = 2_000,
        /// Default tip when a prompt leaves it empty
        default_tip_sol: f64 = 0.01,
    }
}

config_struct! {
    /// On-chain program ids, mainnet by default
    pub struct ProgramSettings {
        amm_program: String = RAYDIUM_AMM_V4_PROGRAM_ID.to_string(),
        market_program: String = OPENBOOK_PROGRAM_ID.to_string(),
        fee_destination: String = RAYDIUM_FEE_DESTINATION.to_string(),
        /// Optional swap router wrapping the AMM swap
        swap_router: Option<String> = None,
    }
}

config_struct! {
    /// Root of configs.json
    pub struct Configs {
        rpc_url: String = "https://api.mainnet-beta.solana.com".to_string(),
        relay_url: String = "https://mainnet.block-engine.jito.wtf".to_string(),
        tip_account: String = JITO_TIP_ACCOUNT.to_string(),
        /// Pool creator / LP owner, base58 or `[1,2,...]`
        primary_wallet_private: String = String::new(),
        /// Pays fees and the relay tip, base58 or `[1,2,...]`
        fee_payer_private: String = String::new(),
        keystore_path: String = "keypairs/workers.json".to_string(),
        launch_state_path: String = "launch_state.json".to_string(),
        bundle: BundleSettings = BundleSettings::default(),
        programs: ProgramSettings = ProgramSettings::default(),
    }
}
