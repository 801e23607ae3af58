use crate::pool::PoolKeys;
use crate::wallets::WalletPool;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address;
use std::collections::HashSet;

pub fn dedup_preserving_order(addresses: &[Pubkey]) -> Vec<Pubkey> {
    let mut seen = HashSet::with_capacity(addresses.len());
    addresses
        .iter()
        .filter(|a| seen.insert(**a))
        .copied()
        .collect()
}

/// Every address a launch's bundles reference, in table order. The tip
/// account is left out; invoked program ids are static keys anyway, except
/// the AMM program which the router variant passes as a plain account.
pub fn launch_address_set(keys: &PoolKeys, wallets: &WalletPool, table: &Pubkey) -> Vec<Pubkey> {
    let wsol = spl_token::native_mint::id();
    let mut addresses = vec![keys.program_id, spl_token::id()];
    addresses.extend(keys.swap_accounts());
    addresses.push(keys.quote_ata(&wallets.primary().pubkey()));
    addresses.push(keys.base_ata(&wallets.primary().pubkey()));

    for worker in wallets.workers() {
        let owner = worker.pubkey();
        addresses.push(owner);
        addresses.push(get_associated_token_address(&owner, &keys.base_mint));
        addresses.push(get_associated_token_address(&owner, &wsol));
    }

    let primary = wallets.primary().pubkey();
    let payer = wallets.fee_payer().pubkey();
    addresses.extend([
        primary,
        payer,
        get_associated_token_address(&primary, &keys.base_mint),
        get_associated_token_address(&primary, &wsol),
        get_associated_token_address(&payer, &keys.base_mint),
        get_associated_token_address(&payer, &wsol),
        *table,
        wsol,
        keys.base_mint,
    ]);

    dedup_preserving_order(&addresses)
}
