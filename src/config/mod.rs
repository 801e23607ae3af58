//! configs.json loading and validation
//!
//! Loaded once at startup; any problem surfaces as `BundlerError::Config`
//! before a single ledger call is made.

pub mod macros;
pub mod schemas;

pub use schemas::{BundleSettings, Configs, ProgramSettings, SimulationPolicy};

use crate::errors::{BundlerError, BundlerResult};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const CONFIG_FILE_PATH: &str = "configs.json";

impl Configs {
    pub fn load<P: AsRef<Path>>(path: P) -> BundlerResult<Configs> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|e| {
            BundlerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let configs: Configs = serde_json::from_str(&data).map_err(|e| {
            BundlerError::Config(format!("malformed {}: {}", path.display(), e))
        })?;
        configs.validate()?;
        Ok(configs)
    }

    pub fn validate(&self) -> BundlerResult<()> {
        if self.bundle.wallets_per_chunk == 0 {
            return Err(BundlerError::Config(
                "bundle.wallets_per_chunk must be greater than 0".to_string(),
            ));
        }
        if self.bundle.lut_extend_chunk == 0 {
            return Err(BundlerError::Config(
                "bundle.lut_extend_chunk must be greater than 0".to_string(),
            ));
        }
        if self.bundle.max_transaction_size == 0 {
            return Err(BundlerError::Config(
                "bundle.max_transaction_size must be greater than 0".to_string(),
            ));
        }
        if self.bundle.max_bundle_transactions == 0 {
            return Err(BundlerError::Config(
                "bundle.max_bundle_transactions must be greater than 0".to_string(),
            ));
        }
        if self.rpc_url.is_empty() || self.relay_url.is_empty() {
            return Err(BundlerError::Config(
                "rpc_url and relay_url are required".to_string(),
            ));
        }
        self.tip_account()?;
        self.amm_program()?;
        self.market_program()?;
        self.fee_destination()?;
        self.swap_router()?;
        Ok(())
    }

    pub fn tip_account(&self) -> BundlerResult<Pubkey> {
        parse_pubkey("tip_account", &self.tip_account)
    }

    pub fn amm_program(&self) -> BundlerResult<Pubkey> {
        parse_pubkey("programs.amm_program", &self.programs.amm_program)
    }

    pub fn market_program(&self) -> BundlerResult<Pubkey> {
        parse_pubkey("programs.market_program", &self.programs.market_program)
    }

    pub fn fee_destination(&self) -> BundlerResult<Pubkey> {
        parse_pubkey("programs.fee_destination", &self.programs.fee_destination)
    }

    pub fn swap_router(&self) -> BundlerResult<Option<Pubkey>> {
        self.programs
            .swap_router
            .as_deref()
            .map(|s| parse_pubkey("programs.swap_router", s))
            .transpose()
    }

    pub fn primary_keypair(&self) -> BundlerResult<Keypair> {
        parse_keypair("primary_wallet_private", &self.primary_wallet_private)
    }

    pub fn fee_payer_keypair(&self) -> BundlerResult<Keypair> {
        parse_keypair("fee_payer_private", &self.fee_payer_private)
    }
}

fn parse_pubkey(field: &str, value: &str) -> BundlerResult<Pubkey> {
    Pubkey::from_str(value.trim())
        .map_err(|e| BundlerError::Config(format!("{} is not a valid address: {}", field, e)))
}

/// Accepts base58 or a JSON-style byte array `[1,2,...]` of 64 bytes
pub fn parse_keypair(field: &str, value: &str) -> BundlerResult<Keypair> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BundlerError::Config(format!("{} is empty", field)));
    }

    let bytes: Vec<u8> = if value.starts_with('[') && value.ends_with(']') {
        value
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(',')
            .map(|s| s.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|e| BundlerError::Config(format!("{}: bad byte array: {}", field, e)))?
    } else {
        bs58::decode(value)
            .into_vec()
            .map_err(|e| BundlerError::Config(format!("{}: bad base58: {}", field, e)))?
    };

    if bytes.len() != 64 {
        return Err(BundlerError::Config(format!(
            "{}: expected 64 key bytes, got {}",
            field,
            bytes.len()
        )));
    }
    Keypair::try_from(bytes.as_slice())
        .map_err(|e| BundlerError::Config(format!("{}: {}", field, e)))
}
