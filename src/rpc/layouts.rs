//! Fixed byte layouts of the accounts the pipeline reads

use crate::errors::{BundlerError, BundlerResult};
use solana_sdk::message::AddressLookupTableAccount;
use solana_sdk::pubkey::Pubkey;

pub const TOKEN_ACCOUNT_LEN: usize = 165;
pub const MINT_LEN: usize = 82;
/// Serialized lookup-table metadata preceding the address list
pub const LOOKUP_TABLE_META_SIZE: usize = 56;
const LOOKUP_TABLE_DISCRIMINATOR: u32 = 1;

pub fn read_pubkey(data: &[u8], offset: usize) -> Option<Pubkey> {
    let bytes: [u8; 32] = data.get(offset..offset + 32)?.try_into().ok()?;
    Some(Pubkey::new_from_array(bytes))
}

pub fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    let bytes: [u8; 8] = data.get(offset..offset + 8)?.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

/// SPL token account: mint 0..32, owner 32..64, amount 64..72
pub fn token_account_amount(data: &[u8]) -> Option<u64> {
    if data.len() < TOKEN_ACCOUNT_LEN {
        return None;
    }
    read_u64(data, 64)
}

pub fn token_account_mint(data: &[u8]) -> Option<Pubkey> {
    if data.len() < TOKEN_ACCOUNT_LEN {
        return None;
    }
    read_pubkey(data, 0)
}

/// SPL mint: decimals at byte 44
pub fn mint_decimals(data: &[u8]) -> Option<u8> {
    if data.len() < MINT_LEN {
        return None;
    }
    data.get(44).copied()
}

pub fn decode_lookup_table(key: &Pubkey, data: &[u8]) -> BundlerResult<AddressLookupTableAccount> {
    let invalid = |reason: &str| {
        BundlerError::Rpc(format!("{} is not a lookup table: {}", key, reason))
    };

    if data.len() < LOOKUP_TABLE_META_SIZE {
        return Err(invalid("account too small"));
    }
    let discriminator = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    if discriminator != LOOKUP_TABLE_DISCRIMINATOR {
        return Err(invalid("wrong discriminator"));
    }
    let body = &data[LOOKUP_TABLE_META_SIZE..];
    if body.len() % 32 != 0 {
        return Err(invalid("address list misaligned"));
    }

    let addresses = body
        .chunks_exact(32)
        .filter_map(|chunk| read_pubkey(chunk, 0))
        .collect();
    Ok(AddressLookupTableAccount {
        key: *key,
        addresses,
    })
}

#[cfg(test)]
pub(crate) fn encode_lookup_table(authority: &Pubkey, addresses: &[Pubkey]) -> Vec<u8> {
    let mut data = Vec::with_capacity(LOOKUP_TABLE_META_SIZE + addresses.len() * 32);
    data.extend_from_slice(&LOOKUP_TABLE_DISCRIMINATOR.to_le_bytes());
    data.extend_from_slice(&u64::MAX.to_le_bytes()); // deactivation slot
    data.extend_from_slice(&0u64.to_le_bytes()); // last extended slot
    data.push(0); // last extended start index
    data.push(1); // authority present
    data.extend_from_slice(authority.as_ref());
    data.extend_from_slice(&[0, 0]);
    for address in addresses {
        data.extend_from_slice(address.as_ref());
    }
    data
}

#[cfg(test)]
pub(crate) fn encode_token_account(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
    data[0..32].copy_from_slice(mint.as_ref());
    data[32..64].copy_from_slice(owner.as_ref());
    data[64..72].copy_from_slice(&amount.to_le_bytes());
    data[108] = 1; // initialized
    data
}

#[cfg(test)]
pub(crate) fn encode_mint(decimals: u8) -> Vec<u8> {
    let mut data = vec![0u8; MINT_LEN];
    data[44] = decimals;
    data[45] = 1;
    data
}
