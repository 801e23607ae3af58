//! Worker keypairs on disk: a JSON array of base58 secret keys

use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::fs;
use std::path::Path;

pub fn load_keystore<P: AsRef<Path>>(path: P) -> BundlerResult<Vec<Keypair>> {
    let path = path.as_ref();
    let data = fs::read_to_string(path).map_err(|e| {
        BundlerError::Config(format!("keystore {} unreadable: {}", path.display(), e))
    })?;
    let encoded: Vec<String> = serde_json::from_str(&data).map_err(|e| {
        BundlerError::Config(format!("keystore {} malformed: {}", path.display(), e))
    })?;

    encoded
        .iter()
        .enumerate()
        .map(|(i, secret)| {
            let bytes = bs58::decode(secret.trim()).into_vec().map_err(|e| {
                BundlerError::Config(format!("keystore entry {}: bad base58: {}", i, e))
            })?;
            Keypair::try_from(bytes.as_slice())
                .map_err(|e| BundlerError::Config(format!("keystore entry {}: {}", i, e)))
        })
        .collect()
}

pub fn save_keystore<P: AsRef<Path>>(path: P, keypairs: &[Keypair]) -> BundlerResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let encoded: Vec<String> = keypairs
        .iter()
        .map(|kp| bs58::encode(kp.to_bytes()).into_string())
        .collect();
    fs::write(path, serde_json::to_string_pretty(&encoded)?)?;
    Ok(())
}

/// Generates `count` fresh worker keypairs. An existing keystore is only
/// replaced when `force` is set.
pub fn create_keypairs<P: AsRef<Path>>(
    path: P,
    count: usize,
    force: bool,
) -> BundlerResult<Vec<Pubkey>> {
    let path = path.as_ref();
    if count == 0 {
        return Err(BundlerError::InvalidInput(
            "keypair count must be greater than 0".to_string(),
        ));
    }
    if path.exists() && !force {
        return Err(BundlerError::InvalidInput(format!(
            "keystore {} already exists; pass force to overwrite",
            path.display()
        )));
    }

    let keypairs: Vec<Keypair> = (0..count).map(|_| Keypair::new()).collect();
    save_keystore(path, &keypairs)?;

    logger::info(
        LogTag::Wallet,
        &format!("Created {} worker keypairs in {}", count, path.display()),
    );
    Ok(keypairs.iter().map(|kp| kp.pubkey()).collect())
}
