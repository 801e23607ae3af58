//! OpenBook (Serum v3) market account layout

use crate::errors::{BundlerError, BundlerResult};
use crate::rpc::layouts::{read_pubkey, read_u64};
use solana_sdk::pubkey::Pubkey;

pub const MARKET_STATE_LEN: usize = 388;

// Byte offsets; the account starts with 5 bytes of "serum" padding
const FLAGS: usize = 5;
const OWN_ADDRESS: usize = 13;
const VAULT_SIGNER_NONCE: usize = 45;
const BASE_MINT: usize = 53;
const QUOTE_MINT: usize = 85;
const BASE_VAULT: usize = 117;
const QUOTE_VAULT: usize = 165;
const REQUEST_QUEUE: usize = 221;
const EVENT_QUEUE: usize = 253;
const BIDS: usize = 285;
const ASKS: usize = 317;
const BASE_LOT_SIZE: usize = 349;
const QUOTE_LOT_SIZE: usize = 357;

const FLAG_INITIALIZED: u64 = 1;
const FLAG_MARKET: u64 = 1 << 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketState {
    pub own_address: Pubkey,
    pub vault_signer_nonce: u64,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub request_queue: Pubkey,
    pub event_queue: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
}

impl MarketState {
    pub fn decode(market_id: &Pubkey, data: &[u8]) -> BundlerResult<MarketState> {
        if data.len() < MARKET_STATE_LEN {
            return Err(BundlerError::pool_resolution(
                market_id,
                format!("market account is {} bytes, expected {}", data.len(), MARKET_STATE_LEN),
            ));
        }

        let flags = read_u64(data, FLAGS).unwrap_or_default();
        if flags & (FLAG_INITIALIZED | FLAG_MARKET) != FLAG_INITIALIZED | FLAG_MARKET {
            return Err(BundlerError::pool_resolution(
                market_id,
                format!("account flags {:#x} do not describe a market", flags),
            ));
        }

        let key = |offset: usize| {
            read_pubkey(data, offset).ok_or_else(|| {
                BundlerError::pool_resolution(market_id, format!("truncated at {}", offset))
            })
        };
        let num = |offset: usize| {
            read_u64(data, offset).ok_or_else(|| {
                BundlerError::pool_resolution(market_id, format!("truncated at {}", offset))
            })
        };

        Ok(MarketState {
            own_address: key(OWN_ADDRESS)?,
            vault_signer_nonce: num(VAULT_SIGNER_NONCE)?,
            base_mint: key(BASE_MINT)?,
            quote_mint: key(QUOTE_MINT)?,
            base_vault: key(BASE_VAULT)?,
            quote_vault: key(QUOTE_VAULT)?,
            request_queue: key(REQUEST_QUEUE)?,
            event_queue: key(EVENT_QUEUE)?,
            bids: key(BIDS)?,
            asks: key(ASKS)?,
            base_lot_size: num(BASE_LOT_SIZE)?,
            quote_lot_size: num(QUOTE_LOT_SIZE)?,
        })
    }

    #[cfg(test)]
    pub(crate) fn sample(market_id: Pubkey) -> MarketState {
        MarketState {
            own_address: market_id,
            vault_signer_nonce: 0,
            base_mint: Pubkey::new_unique(),
            quote_mint: spl_token::native_mint::id(),
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            request_queue: Pubkey::new_unique(),
            event_queue: Pubkey::new_unique(),
            bids: Pubkey::new_unique(),
            asks: Pubkey::new_unique(),
            base_lot_size: 1_000,
            quote_lot_size: 10,
        }
    }

    #[cfg(test)]
    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; MARKET_STATE_LEN];
        data[0..5].copy_from_slice(b"serum");
        let mut put = |offset: usize, bytes: &[u8]| {
            data[offset..offset + bytes.len()].copy_from_slice(bytes);
        };
        put(FLAGS, &(FLAG_INITIALIZED | FLAG_MARKET).to_le_bytes());
        put(OWN_ADDRESS, self.own_address.as_ref());
        put(VAULT_SIGNER_NONCE, &self.vault_signer_nonce.to_le_bytes());
        put(BASE_MINT, self.base_mint.as_ref());
        put(QUOTE_MINT, self.quote_mint.as_ref());
        put(BASE_VAULT, self.base_vault.as_ref());
        put(QUOTE_VAULT, self.quote_vault.as_ref());
        put(REQUEST_QUEUE, self.request_queue.as_ref());
        put(EVENT_QUEUE, self.event_queue.as_ref());
        put(BIDS, self.bids.as_ref());
        put(ASKS, self.asks.as_ref());
        put(BASE_LOT_SIZE, &self.base_lot_size.to_le_bytes());
        put(QUOTE_LOT_SIZE, &self.quote_lot_size.to_le_bytes());
        data[MARKET_STATE_LEN - 7..].copy_from_slice(b"padding");
        data
    }
}
