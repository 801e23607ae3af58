//! Token-account lifecycle and plain transfers

use crate::errors::{BundlerError, BundlerResult};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

fn token_err(what: &str, e: impl std::fmt::Display) -> BundlerError {
    BundlerError::InvalidInput(format!("{}: {}", what, e))
}

/// Creates `owner`'s ATA for `mint` unless it already exists; `funder` pays rent
pub fn create_ata_idempotent(funder: &Pubkey, owner: &Pubkey, mint: &Pubkey) -> Instruction {
    create_associated_token_account_idempotent(funder, owner, mint, &spl_token::id())
}

pub fn sol_transfer(from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    system_instruction::transfer(from, to, lamports)
}

/// Relay tip; always the last instruction of a bundle
pub fn tip_instruction(payer: &Pubkey, tip_account: &Pubkey, lamports: u64) -> Instruction {
    system_instruction::transfer(payer, tip_account, lamports)
}

pub fn token_transfer(
    source: &Pubkey,
    destination: &Pubkey,
    owner: &Pubkey,
    amount: u64,
) -> BundlerResult<Instruction> {
    spl_token::instruction::transfer(&spl_token::id(), source, destination, owner, &[], amount)
        .map_err(|e| token_err("token transfer", e))
}

/// Closes `account`, sending its lamports (and any wrapped SOL) to `destination`
pub fn close_token_account(
    account: &Pubkey,
    destination: &Pubkey,
    owner: &Pubkey,
) -> BundlerResult<Instruction> {
    spl_token::instruction::close_account(&spl_token::id(), account, destination, owner, &[])
        .map_err(|e| token_err("close account", e))
}

/// Wraps `lamports` into `owner`'s WSOL ATA: create (idempotent), fund, sync.
pub fn wrap_sol_instructions(
    funder: &Pubkey,
    owner: &Pubkey,
    lamports: u64,
) -> BundlerResult<Vec<Instruction>> {
    let wsol = spl_token::native_mint::id();
    let ata = get_associated_token_address(owner, &wsol);
    let sync = spl_token::instruction::sync_native(&spl_token::id(), &ata)
        .map_err(|e| token_err("sync native", e))?;
    Ok(vec![
        create_ata_idempotent(funder, owner, &wsol),
        sol_transfer(funder, &ata, lamports),
        sync,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_sol_targets_wsol_ata() {
        let funder = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let ixs = wrap_sol_instructions(&funder, &owner, 5_000).unwrap();
        let ata = get_associated_token_address(&owner, &spl_token::native_mint::id());

        assert_eq!(ixs.len(), 3);
        assert_eq!(ixs[0].program_id, spl_associated_token_account::id());
        assert_eq!(ixs[1].program_id, solana_sdk::system_program::id());
        assert_eq!(ixs[1].accounts[1].pubkey, ata);
        assert_eq!(ixs[2].program_id, spl_token::id());
        assert_eq!(ixs[2].accounts[0].pubkey, ata);
    }

    #[test]
    fn test_tip_is_system_transfer() {
        let payer = Pubkey::new_unique();
        let tip = Pubkey::new_unique();
        let ix = tip_instruction(&payer, &tip, 10_000);
        assert_eq!(ix.program_id, solana_sdk::system_program::id());
        assert_eq!(ix.accounts[0].pubkey, payer);
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[1].pubkey, tip);
    }

    #[test]
    fn test_close_and_transfer_require_owner_signature() {
        let owner = Pubkey::new_unique();
        let close = close_token_account(&Pubkey::new_unique(), &Pubkey::new_unique(), &owner).unwrap();
        assert!(close.accounts.iter().any(|m| m.pubkey == owner && m.is_signer));

        let transfer =
            token_transfer(&Pubkey::new_unique(), &Pubkey::new_unique(), &owner, 1).unwrap();
        assert!(transfer.accounts.iter().any(|m| m.pubkey == owner && m.is_signer));
    }
}
