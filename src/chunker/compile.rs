use super::TransactionChunk;
use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use crate::lut::{dedup_preserving_order, LookupTableManager};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{v0, AddressLookupTableAccount, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::VersionedTransaction;

/// A signed chunk, ready for bundling
#[derive(Debug, Clone)]
pub struct CompiledTransaction {
    pub index: usize,
    pub transaction: VersionedTransaction,
    /// Serialized size in bytes
    pub size: usize,
    /// Signers in signing order
    pub signers: Vec<Pubkey>,
    pub blockhash: Hash,
    pub has_tip: bool,
}

/// Accounts a lookup table could stand in for: everything except signers,
/// invoked programs and the payer.
pub fn lookup_candidates(instructions: &[Instruction], payer: &Pubkey) -> Vec<Pubkey> {
    let programs: Vec<Pubkey> = instructions.iter().map(|ix| ix.program_id).collect();
    let signers: Vec<Pubkey> = instructions
        .iter()
        .flat_map(|ix| ix.accounts.iter())
        .filter(|meta| meta.is_signer)
        .map(|meta| meta.pubkey)
        .collect();

    let candidates: Vec<Pubkey> = instructions
        .iter()
        .flat_map(|ix| ix.accounts.iter())
        .map(|meta| meta.pubkey)
        .filter(|key| key != payer && !programs.contains(key) && !signers.contains(key))
        .collect();
    dedup_preserving_order(&candidates)
}

fn compile_message(
    chunk: &TransactionChunk,
    tables: &[AddressLookupTableAccount],
    blockhash: Hash,
) -> BundlerResult<v0::Message> {
    v0::Message::try_compile(&chunk.payer.pubkey(), &chunk.instructions, tables, blockhash)
        .map_err(|e| BundlerError::Compile(format!("chunk {}: {}", chunk.index, e)))
}

/// Serialized size the chunk would have once signed, without signing it
pub fn estimate_size(
    chunk: &TransactionChunk,
    tables: &[AddressLookupTableAccount],
) -> BundlerResult<usize> {
    let message = compile_message(chunk, tables, Hash::default())?;
    let signatures = message.header.num_required_signatures as usize;
    let body = VersionedMessage::V0(message).serialize().len();
    // One-byte compact length prefix while there are fewer than 128 signatures
    Ok(1 + 64 * signatures + body)
}

/// Compiles chunks against one blockhash and one set of lookup tables
pub struct ChunkCompiler<'a> {
    luts: &'a LookupTableManager,
    tables: Vec<Pubkey>,
    blockhash: Hash,
    max_size: usize,
}

impl<'a> ChunkCompiler<'a> {
    pub fn new(
        luts: &'a LookupTableManager,
        tables: Vec<Pubkey>,
        blockhash: Hash,
        max_size: usize,
    ) -> Self {
        Self {
            luts,
            tables,
            blockhash,
            max_size,
        }
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub async fn compile(&self, chunk: &TransactionChunk) -> BundlerResult<CompiledTransaction> {
        let tables = if self.tables.is_empty() {
            Vec::new()
        } else {
            let candidates = lookup_candidates(&chunk.instructions, &chunk.payer.pubkey());
            self.luts.plan_compaction(&candidates, &self.tables).await?.tables
        };

        let message = compile_message(chunk, &tables, self.blockhash)?;
        let required = &message.account_keys[..message.header.num_required_signatures as usize];

        let signers: Vec<_> = chunk
            .signers
            .iter()
            .filter(|w| required.contains(&w.pubkey()))
            .collect();
        if let Some(missing) = required
            .iter()
            .find(|key| !signers.iter().any(|w| w.pubkey() == **key))
        {
            return Err(BundlerError::Signing(format!(
                "chunk {} needs a signature from {}",
                chunk.index, missing
            )));
        }

        let signer_keys: Vec<Pubkey> = signers.iter().map(|w| w.pubkey()).collect();
        let keypairs: Vec<&dyn Signer> = signers.iter().map(|w| w.keypair() as &dyn Signer).collect();
        let transaction = VersionedTransaction::try_new(VersionedMessage::V0(message), &keypairs)
            .map_err(|e| BundlerError::Signing(format!("chunk {}: {}", chunk.index, e)))?;

        let size = bincode::serialize(&transaction)
            .map_err(|e| BundlerError::Compile(e.to_string()))?
            .len();
        if size > self.max_size {
            logger::warning(
                LogTag::Chunker,
                &format!(
                    "Chunk {} is {} bytes, over the {} byte limit",
                    chunk.index, size, self.max_size
                ),
            );
            return Err(BundlerError::OversizeTransaction {
                chunk_index: chunk.index,
                size,
                limit: self.max_size,
            });
        }

        if crate::arguments::is_debug_chunker_enabled() {
            logger::debug(
                LogTag::Chunker,
                &format!(
                    "Chunk {}: {} instructions, {} signers, {} tables, {} bytes",
                    chunk.index,
                    chunk.instructions.len(),
                    signer_keys.len(),
                    tables.len(),
                    size
                ),
            );
        }

        Ok(CompiledTransaction {
            index: chunk.index,
            transaction,
            size,
            signers: signer_keys,
            blockhash: self.blockhash,
            has_tip: chunk.has_tip,
        })
    }

    /// One result per chunk; a defective chunk does not stop the others
    /// from compiling so every problem is reported at once.
    pub async fn compile_all(
        &self,
        chunks: &[TransactionChunk],
    ) -> Vec<BundlerResult<CompiledTransaction>> {
        let mut results = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            results.push(self.compile(chunk).await);
        }
        results
    }
}

/// Every chunk or nothing: logs each failure and returns the first.
pub fn collect_or_abort(
    results: Vec<BundlerResult<CompiledTransaction>>,
) -> BundlerResult<Vec<CompiledTransaction>> {
    let total = results.len();
    let mut compiled = Vec::with_capacity(total);
    let mut first_error = None;

    for result in results {
        match result {
            Ok(tx) => compiled.push(tx),
            Err(e) => {
                logger::error(LogTag::Chunker, &format!("Defective chunk: {}", e));
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => {
            logger::error(
                LogTag::Chunker,
                &format!(
                    "Discarding {} of {} compiled transactions",
                    compiled.len(),
                    total
                ),
            );
            Err(e)
        }
        None => Ok(compiled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{wallet_chunks, WalletInstructions};
    use crate::instructions::{swap_instruction, tip_instruction, Direction};
    use crate::lut::launch_address_set;
    use crate::pool::PoolKeys;
    use crate::rpc::layouts::encode_lookup_table;
    use crate::testing::{sample_pool_keys, sample_wallet_pool, MockLedger};
    use crate::wallets::WalletPool;
    use std::sync::Arc;

    fn buy_chunks(keys: &PoolKeys, pool: &WalletPool) -> Vec<TransactionChunk> {
        let entries = pool
            .workers()
            .iter()
            .map(|w| {
                let ix = swap_instruction(keys, &w.pubkey(), Direction::Buy, 1_000_000, 0, None);
                WalletInstructions::new(w.clone(), vec![ix])
            })
            .collect();
        let payer = pool.fee_payer();
        let tip = tip_instruction(
            &payer.pubkey(),
            &crate::constants::JITO_TIP_ACCOUNT.parse().unwrap(),
            10_000_000,
        );
        wallet_chunks(entries, payer, 7, tip).unwrap()
    }

    #[test]
    fn test_lookup_candidates_skip_signers_programs_and_payer() {
        let keys = sample_pool_keys();
        let owner = Pubkey::new_unique();
        let payer = Pubkey::new_unique();
        let ix = swap_instruction(&keys, &owner, Direction::Buy, 1, 0, None);
        let candidates = lookup_candidates(&[ix.clone(), ix], &payer);

        assert!(!candidates.contains(&owner));
        assert!(!candidates.contains(&payer));
        assert!(!candidates.contains(&keys.program_id));
        assert!(candidates.contains(&keys.id));
        assert!(candidates.contains(&keys.base_ata(&owner)));
        let unique: std::collections::HashSet<_> = candidates.iter().collect();
        assert_eq!(unique.len(), candidates.len());
    }

    #[tokio::test]
    async fn test_compiled_chunks_fit_and_share_blockhash() {
        let keys = sample_pool_keys();
        let pool = sample_wallet_pool(27);
        let table = Pubkey::new_unique();
        let ledger = Arc::new(MockLedger::new());
        ledger.set_account(
            table,
            encode_lookup_table(
                &pool.primary().pubkey(),
                &launch_address_set(&keys, &pool, &table),
            ),
        );
        let luts = LookupTableManager::new(ledger.clone());
        let compiler = ChunkCompiler::new(&luts, vec![table], ledger.blockhash(), 1232);

        let chunks = buy_chunks(&keys, &pool);
        let compiled = collect_or_abort(compiler.compile_all(&chunks).await).unwrap();

        assert_eq!(compiled.len(), 4);
        for (tx, chunk) in compiled.iter().zip(&chunks) {
            assert!(tx.size <= 1232, "chunk {} is {} bytes", tx.index, tx.size);
            assert_eq!(tx.blockhash, ledger.blockhash());
            assert_eq!(*tx.transaction.message.recent_blockhash(), ledger.blockhash());
            assert_eq!(tx.signers, chunk.signer_keys());
            assert_eq!(tx.transaction.signatures.len(), chunk.signers.len());
            assert!(tx.transaction.message.address_table_lookups().is_some());
            assert_eq!(
                tx.size,
                estimate_size(chunk, &[luts.table(&table).await.unwrap()]).unwrap()
            );
        }
        assert!(compiled[3].has_tip);
        assert!(tx_verifies(&compiled[0].transaction));
    }

    fn tx_verifies(tx: &VersionedTransaction) -> bool {
        tx.verify_with_results().into_iter().all(|ok| ok)
    }

    #[tokio::test]
    async fn test_uncompacted_group_is_oversize_and_aborts() {
        let keys = sample_pool_keys();
        let pool = sample_wallet_pool(27);
        let luts = LookupTableManager::new(Arc::new(MockLedger::new()));
        let compiler = ChunkCompiler::new(&luts, Vec::new(), Hash::new_unique(), 1232);

        let results = compiler.compile_all(&buy_chunks(&keys, &pool)).await;
        assert_eq!(results.len(), 4);
        assert!(matches!(
            results[0],
            Err(BundlerError::OversizeTransaction { chunk_index: 0, limit: 1232, .. })
        ));

        let err = collect_or_abort(results).unwrap_err();
        assert!(matches!(err, BundlerError::OversizeTransaction { chunk_index: 0, .. }));
    }

    #[tokio::test]
    async fn test_missing_signer_is_reported() {
        let keys = sample_pool_keys();
        let pool = sample_wallet_pool(1);
        let luts = LookupTableManager::new(Arc::new(MockLedger::new()));
        let compiler = ChunkCompiler::new(&luts, Vec::new(), Hash::new_unique(), 1232);

        // Instruction owned by a wallet that is not in the signer list
        let stranger = Pubkey::new_unique();
        let mut chunk = TransactionChunk::new(0, pool.fee_payer());
        chunk
            .instructions
            .push(swap_instruction(&keys, &stranger, Direction::Sell, 1, 0, None));
        chunk.seal();

        let err = compiler.compile(&chunk).await.unwrap_err();
        assert!(matches!(err, BundlerError::Signing(_)));
    }
}
