//! Pool key resolution
//!
//! A launch is identified by its OpenBook market. Every AMM account the
//! instruction builders need is either read from the market account or
//! derived from the market id.

mod derive;
pub mod market;

pub use derive::{derive_pool_keys, market_authority};
pub use market::MarketState;

#[cfg(test)]
pub(crate) use derive::find_vault_signer_nonce;

use crate::config::Configs;
use crate::constants::WSOL_DECIMALS;
use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use crate::rpc::LedgerRpc;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;

/// Program ids the pipeline invokes or references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramIds {
    pub amm: Pubkey,
    pub market: Pubkey,
    pub fee_destination: Pubkey,
    /// Optional router that forwards to the AMM swap
    pub swap_router: Option<Pubkey>,
}

impl ProgramIds {
    pub fn from_configs(configs: &Configs) -> BundlerResult<Self> {
        Ok(Self {
            amm: configs.amm_program()?,
            market: configs.market_program()?,
            fee_destination: configs.fee_destination()?,
            swap_router: configs.swap_router()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolKeys {
    pub id: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub lp_mint: Pubkey,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub lp_decimals: u8,
    pub program_id: Pubkey,
    pub authority: Pubkey,
    pub nonce: u8,
    pub open_orders: Pubkey,
    pub target_orders: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub withdraw_queue: Pubkey,
    pub lp_vault: Pubkey,
    pub amm_config: Pubkey,
    pub market_program_id: Pubkey,
    pub market_id: Pubkey,
    pub market_authority: Pubkey,
    pub market_base_vault: Pubkey,
    pub market_quote_vault: Pubkey,
    pub market_bids: Pubkey,
    pub market_asks: Pubkey,
    pub market_event_queue: Pubkey,
}

impl PoolKeys {
    pub fn base_ata(&self, owner: &Pubkey) -> Pubkey {
        get_associated_token_address(owner, &self.base_mint)
    }

    pub fn quote_ata(&self, owner: &Pubkey) -> Pubkey {
        get_associated_token_address(owner, &self.quote_mint)
    }

    pub fn lp_ata(&self, owner: &Pubkey) -> Pubkey {
        get_associated_token_address(owner, &self.lp_mint)
    }

    /// Pool and market accounts touched by a swap, in swap account order
    pub fn swap_accounts(&self) -> Vec<Pubkey> {
        vec![
            self.id,
            self.authority,
            self.open_orders,
            self.target_orders,
            self.base_vault,
            self.quote_vault,
            self.market_program_id,
            self.market_id,
            self.market_bids,
            self.market_asks,
            self.market_event_queue,
            self.market_base_vault,
            self.market_quote_vault,
            self.market_authority,
        ]
    }
}

/// Reads the market account and derives the full key set.
/// Any failure is a `PoolResolution` error; callers abort the whole batch.
pub async fn resolve_pool_keys(
    ledger: &dyn LedgerRpc,
    market_id: &Pubkey,
    programs: &ProgramIds,
) -> BundlerResult<PoolKeys> {
    let data = ledger
        .account_data(market_id)
        .await
        .map_err(|e| BundlerError::pool_resolution(market_id, e.to_string()))?
        .ok_or_else(|| BundlerError::pool_resolution(market_id, "market account not found"))?;
    let market = MarketState::decode(market_id, &data)?;

    let base_decimals = ledger
        .mint_decimals(&market.base_mint)
        .await
        .map_err(|e| BundlerError::pool_resolution(market_id, e.to_string()))?;
    let quote_decimals = if market.quote_mint == spl_token::native_mint::id() {
        WSOL_DECIMALS
    } else {
        ledger
            .mint_decimals(&market.quote_mint)
            .await
            .map_err(|e| BundlerError::pool_resolution(market_id, e.to_string()))?
    };

    let keys = derive_pool_keys(market_id, &market, base_decimals, quote_decimals, programs)?;
    logger::debug(
        LogTag::Builder,
        &format!(
            "Resolved pool {} for market {} (base {} decimals {})",
            keys.id, market_id, keys.base_mint, base_decimals
        ),
    );
    Ok(keys)
}
