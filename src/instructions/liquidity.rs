//! Raydium AMM v4 pool creation (`initialize2`) and liquidity withdrawal

use super::accounts::{close_token_account, create_ata_idempotent, wrap_sol_instructions};
use crate::constants::{AMM_INITIALIZE2_TAG, AMM_WITHDRAW_TAG};
use crate::errors::BundlerResult;
use crate::pool::PoolKeys;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::{system_program, sysvar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatePoolAmounts {
    /// Unix seconds
    pub open_time: u64,
    /// Raw base-token units
    pub base_amount: u64,
    /// Lamports
    pub quote_amount: u64,
}

pub fn initialize_pool_instruction(
    keys: &PoolKeys,
    owner: &Pubkey,
    fee_destination: &Pubkey,
    amounts: &CreatePoolAmounts,
) -> Instruction {
    let mut data = Vec::with_capacity(26);
    data.push(AMM_INITIALIZE2_TAG);
    data.push(keys.nonce);
    data.extend_from_slice(&amounts.open_time.to_le_bytes());
    data.extend_from_slice(&amounts.quote_amount.to_le_bytes()); // init pc amount
    data.extend_from_slice(&amounts.base_amount.to_le_bytes()); // init coin amount

    let accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new(keys.id, false),
        AccountMeta::new_readonly(keys.authority, false),
        AccountMeta::new(keys.open_orders, false),
        AccountMeta::new(keys.lp_mint, false),
        AccountMeta::new_readonly(keys.base_mint, false), // coin mint
        AccountMeta::new_readonly(keys.quote_mint, false), // pc mint
        AccountMeta::new(keys.base_vault, false),
        AccountMeta::new(keys.quote_vault, false),
        AccountMeta::new(keys.target_orders, false),
        AccountMeta::new_readonly(keys.amm_config, false),
        AccountMeta::new(*fee_destination, false),
        AccountMeta::new_readonly(keys.market_program_id, false),
        AccountMeta::new_readonly(keys.market_id, false),
        AccountMeta::new(*owner, true),
        AccountMeta::new(keys.base_ata(owner), false),
        AccountMeta::new(keys.quote_ata(owner), false),
        AccountMeta::new(keys.lp_ata(owner), false),
    ];

    Instruction {
        program_id: keys.program_id,
        accounts,
        data,
    }
}

/// Wrap the quote side into the owner's WSOL ATA, then initialize the pool.
pub fn create_pool_instructions(
    keys: &PoolKeys,
    owner: &Pubkey,
    fee_destination: &Pubkey,
    amounts: &CreatePoolAmounts,
) -> BundlerResult<Vec<Instruction>> {
    let mut instructions = wrap_sol_instructions(owner, owner, amounts.quote_amount)?;
    instructions.push(initialize_pool_instruction(keys, owner, fee_destination, amounts));
    Ok(instructions)
}

pub fn withdraw_instruction(keys: &PoolKeys, owner: &Pubkey, lp_amount: u64) -> Instruction {
    let mut data = Vec::with_capacity(9);
    data.push(AMM_WITHDRAW_TAG);
    data.extend_from_slice(&lp_amount.to_le_bytes());

    let accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(keys.id, false),
        AccountMeta::new_readonly(keys.authority, false),
        AccountMeta::new(keys.open_orders, false),
        AccountMeta::new(keys.target_orders, false),
        AccountMeta::new(keys.lp_mint, false),
        AccountMeta::new(keys.base_vault, false),
        AccountMeta::new(keys.quote_vault, false),
        AccountMeta::new(keys.withdraw_queue, false),
        AccountMeta::new(keys.lp_vault, false),
        AccountMeta::new_readonly(keys.market_program_id, false),
        AccountMeta::new(keys.market_id, false),
        AccountMeta::new(keys.market_base_vault, false),
        AccountMeta::new(keys.market_quote_vault, false),
        AccountMeta::new_readonly(keys.market_authority, false),
        AccountMeta::new(keys.lp_ata(owner), false),
        AccountMeta::new(keys.base_ata(owner), false),
        AccountMeta::new(keys.quote_ata(owner), false),
        AccountMeta::new_readonly(*owner, true),
        AccountMeta::new(keys.market_event_queue, false),
        AccountMeta::new(keys.market_bids, false),
        AccountMeta::new(keys.market_asks, false),
    ];

    Instruction {
        program_id: keys.program_id,
        accounts,
        data,
    }
}

/// Make sure both receiving ATAs exist, withdraw, then unwrap the WSOL.
pub fn remove_liquidity_instructions(
    keys: &PoolKeys,
    owner: &Pubkey,
    lp_amount: u64,
) -> BundlerResult<Vec<Instruction>> {
    Ok(vec![
        create_ata_idempotent(owner, owner, &keys.base_mint),
        create_ata_idempotent(owner, owner, &keys.quote_mint),
        withdraw_instruction(keys, owner, lp_amount),
        close_token_account(&keys.quote_ata(owner), owner, owner)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_pool_keys;

    #[test]
    fn test_initialize2_layout() {
        let keys = sample_pool_keys();
        let owner = Pubkey::new_unique();
        let amounts = CreatePoolAmounts {
            open_time: 1_700_000_000,
            base_amount: 800_000_000,
            quote_amount: 10_000_000_000,
        };
        let ix = initialize_pool_instruction(&keys, &owner, &Pubkey::new_unique(), &amounts);

        assert_eq!(ix.accounts.len(), 21);
        assert_eq!(ix.data.len(), 26);
        assert_eq!(ix.data[0], 1);
        assert_eq!(ix.data[1], keys.nonce);
        assert_eq!(u64::from_le_bytes(ix.data[2..10].try_into().unwrap()), 1_700_000_000);
        assert_eq!(u64::from_le_bytes(ix.data[10..18].try_into().unwrap()), 10_000_000_000);
        assert_eq!(u64::from_le_bytes(ix.data[18..26].try_into().unwrap()), 800_000_000);
        assert!(ix.accounts[17].is_signer);
        assert_eq!(ix.accounts[17].pubkey, owner);
    }

    #[test]
    fn test_create_pool_wraps_quote_first() {
        let keys = sample_pool_keys();
        let owner = Pubkey::new_unique();
        let amounts = CreatePoolAmounts {
            open_time: 0,
            base_amount: 1,
            quote_amount: 2,
        };
        let ixs = create_pool_instructions(&keys, &owner, &Pubkey::new_unique(), &amounts).unwrap();
        assert_eq!(ixs.len(), 4);
        assert_eq!(ixs[3].program_id, keys.program_id);
    }

    #[test]
    fn test_withdraw_layout_and_unwrap() {
        let keys = sample_pool_keys();
        let owner = Pubkey::new_unique();
        let ix = withdraw_instruction(&keys, &owner, 42);
        assert_eq!(ix.accounts.len(), 22);
        assert_eq!(ix.data, {
            let mut d = vec![4u8];
            d.extend_from_slice(&42u64.to_le_bytes());
            d
        });
        assert!(ix.accounts[18].is_signer);

        let ixs = remove_liquidity_instructions(&keys, &owner, 42).unwrap();
        assert_eq!(ixs.len(), 4);
        assert_eq!(ixs[3].program_id, spl_token::id());
    }
}
