// Program ids (mainnet)
pub const RAYDIUM_AMM_V4_PROGRAM_ID: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
pub const OPENBOOK_PROGRAM_ID: &str = "srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX";
pub const RAYDIUM_FEE_DESTINATION: &str = "7YttLkHDoNj9wyDur5pM1ejNaAvT9X4eqaYcHQqtj2G5";
pub const JITO_TIP_ACCOUNT: &str = "Cw8CFyM9FkoMi7K7Crf6HNQqf4uEMzpKw6QNghXLvLkY";
pub const WSOL_MINT: &str = "So11111111111111111111111111111111111111112";

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
pub const WSOL_DECIMALS: u8 = 9;

// Transaction limits
pub const MAX_TRANSACTION_SIZE: usize = 1232;
pub const DEFAULT_WALLETS_PER_CHUNK: usize = 7;
pub const DEFAULT_LUT_EXTEND_CHUNK: usize = 30;

// Raydium AMM v4 instruction tags
pub const AMM_INITIALIZE2_TAG: u8 = 1;
pub const AMM_WITHDRAW_TAG: u8 = 4;
pub const AMM_SWAP_BASE_IN_TAG: u8 = 9;

// Raydium AMM v4 PDA seeds
pub const AMM_AUTHORITY_SEED: &[u8] = b"amm authority";
pub const AMM_ASSOCIATED_SEED: &[u8] = b"amm_associated_seed";
pub const OPEN_ORDERS_SEED: &[u8] = b"open_order_associated_seed";
pub const TARGET_ORDERS_SEED: &[u8] = b"target_associated_seed";
pub const COIN_VAULT_SEED: &[u8] = b"coin_vault_associated_seed";
pub const PC_VAULT_SEED: &[u8] = b"pc_vault_associated_seed";
pub const LP_MINT_SEED: &[u8] = b"lp_mint_associated_seed";
pub const WITHDRAW_QUEUE_SEED: &[u8] = b"withdraw_associated_seed";
pub const TEMP_LP_VAULT_SEED: &[u8] = b"temp_lp_token_associated_seed";
pub const AMM_CONFIG_SEED: &[u8] = b"amm_config_account_seed";

// Relay
pub const RELAY_BUNDLES_PATH: &str = "/api/v1/bundles";
pub const NO_LEADER_MARKER: &str = "Bundle Dropped, no connected leader up soon";
/// The relay accepts at most this many transactions per bundle
pub const MAX_BUNDLE_TRANSACTIONS: usize = 5;
