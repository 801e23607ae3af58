//! Transaction Chunker & Compiler
//!
//! Turns per-wallet instruction lists into size-bounded chunks, attaches the
//! relay tip to the final chunk, and compiles each chunk into a signed v0
//! transaction that references the launch lookup table.

mod compile;
mod partition;

pub use compile::{
    collect_or_abort, estimate_size, lookup_candidates, ChunkCompiler, CompiledTransaction,
};
pub use partition::{attach_tip, chunk_by_wallet, pack, wallet_chunks, PackLimits};

use crate::wallets::Wallet;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

/// Instructions one wallet contributes to a batch, in execution order
#[derive(Debug, Clone)]
pub struct WalletInstructions {
    pub wallet: Wallet,
    pub instructions: Vec<Instruction>,
}

impl WalletInstructions {
    pub fn new(wallet: Wallet, instructions: Vec<Instruction>) -> Self {
        Self {
            wallet,
            instructions,
        }
    }
}

/// A slice of an instruction batch that becomes one transaction
#[derive(Debug, Clone)]
pub struct TransactionChunk {
    pub index: usize,
    /// Fee payer; also signs
    pub payer: Wallet,
    /// Contributing wallets in contribution order, then the payer; no repeats
    pub signers: Vec<Wallet>,
    pub instructions: Vec<Instruction>,
    pub has_tip: bool,
}

impl TransactionChunk {
    pub fn new(index: usize, payer: &Wallet) -> Self {
        Self {
            index,
            payer: payer.clone(),
            signers: Vec::new(),
            instructions: Vec::new(),
            has_tip: false,
        }
    }

    pub fn push(&mut self, entry: WalletInstructions) {
        self.add_signer(&entry.wallet);
        self.instructions.extend(entry.instructions);
    }

    fn add_signer(&mut self, wallet: &Wallet) {
        if !self.signers.iter().any(|s| s.pubkey() == wallet.pubkey()) {
            self.signers.push(wallet.clone());
        }
    }

    /// Ends the signer list with the payer
    pub(crate) fn seal(&mut self) {
        let payer = self.payer.clone();
        self.signers.retain(|s| s.pubkey() != payer.pubkey());
        self.signers.push(payer);
    }

    pub fn signer_keys(&self) -> Vec<Pubkey> {
        self.signers.iter().map(|s| s.pubkey()).collect()
    }
}
