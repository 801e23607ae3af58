use super::compile::estimate_size;
use super::{TransactionChunk, WalletInstructions};
use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use crate::wallets::{chunk_wallets, Wallet};
use solana_sdk::instruction::Instruction;
use solana_sdk::message::AddressLookupTableAccount;

/// Fixed groups of `per_chunk` wallets in input order; the last may be shorter.
pub fn chunk_by_wallet(
    entries: Vec<WalletInstructions>,
    payer: &Wallet,
    per_chunk: usize,
) -> BundlerResult<Vec<TransactionChunk>> {
    let wallets: Vec<Wallet> = entries.iter().map(|e| e.wallet.clone()).collect();
    let groups = chunk_wallets(&wallets, per_chunk)?;

    let mut entries = entries.into_iter();
    let mut chunks = Vec::with_capacity(groups.len());
    for (index, group) in groups.iter().enumerate() {
        let mut chunk = TransactionChunk::new(index, payer);
        for entry in entries.by_ref().take(group.len()) {
            chunk.push(entry);
        }
        chunk.seal();
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Appends the tip as the final instruction of the final chunk.
pub fn attach_tip(chunks: &mut [TransactionChunk], tip: Instruction) -> BundlerResult<()> {
    let last = chunks
        .last_mut()
        .ok_or_else(|| BundlerError::InvalidInput("no chunk to carry the tip".to_string()))?;
    last.instructions.push(tip);
    last.has_tip = true;
    Ok(())
}

/// Wallet-group chunking with the tip on the last group.
pub fn wallet_chunks(
    entries: Vec<WalletInstructions>,
    payer: &Wallet,
    per_chunk: usize,
    tip: Instruction,
) -> BundlerResult<Vec<TransactionChunk>> {
    let mut chunks = chunk_by_wallet(entries, payer, per_chunk)?;
    attach_tip(&mut chunks, tip)?;
    logger::debug(
        LogTag::Chunker,
        &format!(
            "Grouped wallets into {} chunks of at most {}",
            chunks.len(),
            per_chunk
        ),
    );
    Ok(chunks)
}

#[derive(Debug, Clone, Copy)]
pub struct PackLimits {
    pub max_size: usize,
    /// Contributing entries per chunk
    pub max_entries: usize,
}

/// Greedy packing by estimated size. An entry is never split across
/// chunks; the tip goes last, in a chunk of its own if it does not fit.
pub fn pack(
    entries: Vec<WalletInstructions>,
    payer: &Wallet,
    tables: &[AddressLookupTableAccount],
    limits: PackLimits,
    tip: Option<Instruction>,
) -> BundlerResult<Vec<TransactionChunk>> {
    if limits.max_entries == 0 {
        return Err(BundlerError::InvalidInput(
            "entries per chunk must be greater than 0".to_string(),
        ));
    }

    let fits = |chunk: &TransactionChunk, extra: &[Instruction], signer: Option<&Wallet>| {
        let mut candidate = chunk.clone();
        candidate.instructions.extend_from_slice(extra);
        if let Some(wallet) = signer {
            candidate.add_signer(wallet);
        }
        candidate.seal();
        estimate_size(&candidate, tables).map(|size| size <= limits.max_size)
    };

    let mut chunks: Vec<TransactionChunk> = Vec::new();
    let mut current = TransactionChunk::new(0, payer);
    let mut entries_in_current = 0usize;

    for entry in entries {
        if entries_in_current > 0
            && (entries_in_current >= limits.max_entries
                || !fits(&current, &entry.instructions, Some(&entry.wallet))?)
        {
            let next = TransactionChunk::new(chunks.len() + 1, payer);
            chunks.push(std::mem::replace(&mut current, next));
            entries_in_current = 0;
        }
        current.push(entry);
        entries_in_current += 1;
    }

    if let Some(tip) = tip {
        if entries_in_current > 0 && !fits(&current, std::slice::from_ref(&tip), None)? {
            let next = TransactionChunk::new(chunks.len() + 1, payer);
            chunks.push(std::mem::replace(&mut current, next));
        }
        current.instructions.push(tip);
        current.has_tip = true;
    }
    if !current.instructions.is_empty() {
        chunks.push(current);
    }
    for chunk in &mut chunks {
        chunk.seal();
    }

    logger::debug(
        LogTag::Chunker,
        &format!("Packed batch into {} chunks", chunks.len()),
    );
    Ok(chunks)
}
