//! Raydium AMM v4 associated accounts, derived from the market id

use super::market::MarketState;
use super::{PoolKeys, ProgramIds};
use crate::constants::{
    AMM_ASSOCIATED_SEED, AMM_AUTHORITY_SEED, AMM_CONFIG_SEED, COIN_VAULT_SEED, LP_MINT_SEED,
    OPEN_ORDERS_SEED, PC_VAULT_SEED, TARGET_ORDERS_SEED, TEMP_LP_VAULT_SEED, WITHDRAW_QUEUE_SEED,
};
use crate::errors::{BundlerError, BundlerResult};
use solana_sdk::pubkey::Pubkey;

/// PDA of `[amm program, market, seed]` under the AMM program
fn associated(program: &Pubkey, market: &Pubkey, seed: &[u8]) -> Pubkey {
    Pubkey::find_program_address(&[program.as_ref(), market.as_ref(), seed], program).0
}

/// Vault signer of an OpenBook market; fails when the nonce is not a valid bump
pub fn market_authority(
    market_program: &Pubkey,
    market_id: &Pubkey,
    nonce: u64,
) -> BundlerResult<Pubkey> {
    Pubkey::create_program_address(&[market_id.as_ref(), &nonce.to_le_bytes()], market_program)
        .map_err(|e| {
            BundlerError::pool_resolution(market_id, format!("vault signer nonce {}: {}", nonce, e))
        })
}

pub fn derive_pool_keys(
    market_id: &Pubkey,
    market: &MarketState,
    base_decimals: u8,
    quote_decimals: u8,
    programs: &ProgramIds,
) -> BundlerResult<PoolKeys> {
    let amm = &programs.amm;
    let (authority, nonce) = Pubkey::find_program_address(&[AMM_AUTHORITY_SEED], amm);
    let (amm_config, _) = Pubkey::find_program_address(&[AMM_CONFIG_SEED], amm);

    Ok(PoolKeys {
        id: associated(amm, market_id, AMM_ASSOCIATED_SEED),
        base_mint: market.base_mint,
        quote_mint: market.quote_mint,
        lp_mint: associated(amm, market_id, LP_MINT_SEED),
        base_decimals,
        quote_decimals,
        lp_decimals: base_decimals,
        program_id: *amm,
        authority,
        nonce,
        open_orders: associated(amm, market_id, OPEN_ORDERS_SEED),
        target_orders: associated(amm, market_id, TARGET_ORDERS_SEED),
        base_vault: associated(amm, market_id, COIN_VAULT_SEED),
        quote_vault: associated(amm, market_id, PC_VAULT_SEED),
        withdraw_queue: associated(amm, market_id, WITHDRAW_QUEUE_SEED),
        lp_vault: associated(amm, market_id, TEMP_LP_VAULT_SEED),
        amm_config,
        market_program_id: programs.market,
        market_id: *market_id,
        market_authority: market_authority(&programs.market, market_id, market.vault_signer_nonce)?,
        market_base_vault: market.base_vault,
        market_quote_vault: market.quote_vault,
        market_bids: market.bids,
        market_asks: market.asks,
        market_event_queue: market.event_queue,
    })
}

/// First nonce that yields a valid vault signer
#[cfg(test)]
pub(crate) fn find_vault_signer_nonce(market_program: &Pubkey, market_id: &Pubkey) -> u64 {
    (0..u8::MAX as u64)
        .find(|nonce| market_authority(market_program, market_id, *nonce).is_ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Configs;

    #[test]
    fn test_derivation_is_deterministic_and_distinct() {
        let programs = ProgramIds::from_configs(&Configs::default()).unwrap();
        let market_id = Pubkey::new_unique();
        let mut market = MarketState::sample(market_id);
        market.vault_signer_nonce = find_vault_signer_nonce(&programs.market, &market_id);

        let a = derive_pool_keys(&market_id, &market, 6, 9, &programs).unwrap();
        let b = derive_pool_keys(&market_id, &market, 6, 9, &programs).unwrap();
        assert_eq!(a, b);

        let derived = [
            a.id,
            a.lp_mint,
            a.open_orders,
            a.target_orders,
            a.base_vault,
            a.quote_vault,
            a.withdraw_queue,
            a.lp_vault,
        ];
        let unique: std::collections::HashSet<_> = derived.iter().collect();
        assert_eq!(unique.len(), derived.len());
        assert_eq!(a.lp_decimals, 6);
        assert_eq!(a.market_bids, market.bids);
    }

    #[test]
    fn test_authority_matches_nonce() {
        let programs = ProgramIds::from_configs(&Configs::default()).unwrap();
        let market_id = Pubkey::new_unique();
        let mut market = MarketState::sample(market_id);
        market.vault_signer_nonce = find_vault_signer_nonce(&programs.market, &market_id);
        let keys = derive_pool_keys(&market_id, &market, 6, 9, &programs).unwrap();

        let recreated =
            Pubkey::create_program_address(&[AMM_AUTHORITY_SEED, &[keys.nonce]], &programs.amm)
                .unwrap();
        assert_eq!(recreated, keys.authority);
    }
}
