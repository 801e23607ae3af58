use crate::config::Configs;
use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use crate::wallets::keystore;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletRole {
    /// Pool creator and LP owner
    PrimarySigner,
    /// Pays transaction fees and the relay tip
    FeePayer,
    /// Worker at index `i` of the keystore
    Worker(usize),
}

impl std::fmt::Display for WalletRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletRole::PrimarySigner => write!(f, "primary"),
            WalletRole::FeePayer => write!(f, "payer"),
            WalletRole::Worker(i) => write!(f, "worker[{}]", i),
        }
    }
}

/// A signing identity with its role. Cloning shares the key.
#[derive(Clone)]
pub struct Wallet {
    role: WalletRole,
    keypair: Arc<Keypair>,
}

impl Wallet {
    pub fn new(role: WalletRole, keypair: Keypair) -> Self {
        Self {
            role,
            keypair: Arc::new(keypair),
        }
    }

    pub fn role(&self) -> WalletRole {
        self.role
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("role", &self.role)
            .field("pubkey", &self.pubkey())
            .finish()
    }
}

/// Fixed set of identities for one process; never mutated after load
#[derive(Debug, Clone)]
pub struct WalletPool {
    primary: Wallet,
    fee_payer: Wallet,
    workers: Vec<Wallet>,
}

impl WalletPool {
    pub fn new(primary: Keypair, fee_payer: Keypair, workers: Vec<Keypair>) -> Self {
        Self {
            primary: Wallet::new(WalletRole::PrimarySigner, primary),
            fee_payer: Wallet::new(WalletRole::FeePayer, fee_payer),
            workers: workers
                .into_iter()
                .enumerate()
                .map(|(i, kp)| Wallet::new(WalletRole::Worker(i), kp))
                .collect(),
        }
    }

    /// Primary and payer keys from configs.json, workers from the keystore
    pub fn load(configs: &Configs) -> BundlerResult<Self> {
        let primary = configs.primary_keypair()?;
        let fee_payer = configs.fee_payer_keypair()?;
        let workers = keystore::load_keystore(&configs.keystore_path)?;

        logger::info(
            LogTag::Wallet,
            &format!(
                "Loaded wallets: primary={} payer={} workers={}",
                crate::utils::short_address(&primary.pubkey()),
                crate::utils::short_address(&fee_payer.pubkey()),
                workers.len()
            ),
        );

        Ok(Self::new(primary, fee_payer, workers))
    }

    pub fn primary(&self) -> &Wallet {
        &self.primary
    }

    pub fn fee_payer(&self) -> &Wallet {
        &self.fee_payer
    }

    pub fn workers(&self) -> &[Wallet] {
        &self.workers
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

/// Splits `wallets` into consecutive groups of `size`; the last may be shorter.
pub fn chunk_wallets(wallets: &[Wallet], size: usize) -> BundlerResult<Vec<Vec<Wallet>>> {
    if size == 0 {
        return Err(BundlerError::InvalidInput(
            "wallet group size must be greater than 0".to_string(),
        ));
    }
    Ok(wallets.chunks(size).map(|group| group.to_vec()).collect())
}
