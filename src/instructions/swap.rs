//! Raydium AMM v4 `swap_base_in`

use crate::constants::AMM_SWAP_BASE_IN_TAG;
use crate::pool::PoolKeys;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

/// Swap direction against a base/quote pool. Both directions use the same
/// account layout; only source and destination token accounts swap places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Quote in, base out
    Buy,
    /// Base in, quote out
    Sell,
}

impl Direction {
    /// (source, destination) token accounts of `owner`
    pub fn token_accounts(&self, keys: &PoolKeys, owner: &Pubkey) -> (Pubkey, Pubkey) {
        let quote = keys.quote_ata(owner);
        let base = keys.base_ata(owner);
        match self {
            Direction::Buy => (quote, base),
            Direction::Sell => (base, quote),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Buy => write!(f, "buy"),
            Direction::Sell => write!(f, "sell"),
        }
    }
}

pub fn swap_data(amount_in: u64, minimum_out: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(17);
    data.push(AMM_SWAP_BASE_IN_TAG);
    data.extend_from_slice(&amount_in.to_le_bytes());
    data.extend_from_slice(&minimum_out.to_le_bytes());
    data
}

/// Swap for `owner`. With `router` set, the instruction targets the router
/// and the AMM program is passed as a trailing account.
pub fn swap_instruction(
    keys: &PoolKeys,
    owner: &Pubkey,
    direction: Direction,
    amount_in: u64,
    minimum_out: u64,
    router: Option<&Pubkey>,
) -> Instruction {
    let (source, destination) = direction.token_accounts(keys, owner);

    let mut accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false), // token program
        AccountMeta::new(keys.id, false),                  // amm
        AccountMeta::new_readonly(keys.authority, false),  // amm authority
        AccountMeta::new(keys.open_orders, false),         // amm open orders
        AccountMeta::new(keys.target_orders, false),       // amm target orders
        AccountMeta::new(keys.base_vault, false),          // pool coin vault
        AccountMeta::new(keys.quote_vault, false),         // pool pc vault
        AccountMeta::new_readonly(keys.market_program_id, false),
        AccountMeta::new(keys.market_id, false),
        AccountMeta::new(keys.market_bids, false),
        AccountMeta::new(keys.market_asks, false),
        AccountMeta::new(keys.market_event_queue, false),
        AccountMeta::new(keys.market_base_vault, false),
        AccountMeta::new(keys.market_quote_vault, false),
        AccountMeta::new_readonly(keys.market_authority, false), // vault signer
        AccountMeta::new(source, false),
        AccountMeta::new(destination, false),
        AccountMeta::new(*owner, true),
    ];

    let program_id = match router {
        Some(router) => {
            accounts.push(AccountMeta::new(keys.program_id, false));
            *router
        }
        None => keys.program_id,
    };

    Instruction {
        program_id,
        accounts,
        data: swap_data(amount_in, minimum_out),
    }
}
