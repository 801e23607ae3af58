//! Lookup Table Manager
//!
//! Owns the launch's address lookup table: creation, extension in bounded
//! chunks, and a local index of which addresses are already compacted.

mod addresses;

pub use addresses::{dedup_preserving_order, launch_address_set};

use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use crate::rpc::LedgerRpc;
use crate::utils::short_address;
use crate::wallets::Wallet;
use solana_sdk::address_lookup_table::instruction::{create_lookup_table, extend_lookup_table};
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{v0, AddressLookupTableAccount, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::VersionedTransaction;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Which tables cover which addresses of one instruction batch
#[derive(Debug, Clone, Default)]
pub struct CompactionPlan {
    /// Tables covering at least one address, in request order
    pub tables: Vec<AddressLookupTableAccount>,
    pub covered: Vec<Pubkey>,
    /// Addresses that will be embedded in full
    pub uncovered: Vec<Pubkey>,
}

struct CachedTable {
    account: AddressLookupTableAccount,
    index: HashSet<Pubkey>,
    /// Addresses confirmed absent at the last fetch
    missed: HashSet<Pubkey>,
}

impl CachedTable {
    fn new(account: AddressLookupTableAccount) -> Self {
        let index = account.addresses.iter().copied().collect();
        Self {
            account,
            index,
            missed: HashSet::new(),
        }
    }
}

pub struct LookupTableManager {
    ledger: Arc<dyn LedgerRpc>,
    cache: Mutex<HashMap<Pubkey, CachedTable>>,
}

impl LookupTableManager {
    pub fn new(ledger: Arc<dyn LedgerRpc>) -> Self {
        Self {
            ledger,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Create-table instruction and the derived table address
    pub async fn create_table_instruction(
        &self,
        authority: &Pubkey,
        payer: &Pubkey,
    ) -> BundlerResult<(Instruction, Pubkey)> {
        let recent_slot = self.ledger.slot().await?;
        Ok(create_lookup_table(*authority, *payer, recent_slot))
    }

    /// Creates a new table on the ledger and waits for confirmation.
    pub async fn create_table(&self, authority: &Wallet, payer: &Wallet) -> BundlerResult<Pubkey> {
        let (instruction, table) = self
            .create_table_instruction(&authority.pubkey(), &payer.pubkey())
            .await?;
        let blockhash = self.ledger.latest_blockhash().await?;

        let message = v0::Message::try_compile(&payer.pubkey(), &[instruction], &[], blockhash)
            .map_err(|e| BundlerError::Compile(e.to_string()))?;
        let mut signers: Vec<&dyn Signer> = vec![payer.keypair()];
        if authority.pubkey() != payer.pubkey() {
            signers.push(authority.keypair());
        }
        let tx = VersionedTransaction::try_new(VersionedMessage::V0(message), &signers)
            .map_err(|e| BundlerError::Signing(e.to_string()))?;

        let signature = self
            .ledger
            .send_and_confirm(&tx)
            .await
            .map_err(|e| match e {
                BundlerError::LedgerSubmit { reason, .. } => {
                    BundlerError::ledger_submit("lookup table creation", reason)
                }
                other => BundlerError::ledger_submit("lookup table creation", other),
            })?;

        logger::info(
            LogTag::Lut,
            &format!("Created lookup table {} ({})", table, signature),
        );
        Ok(table)
    }

    /// One extend instruction per chunk of at most `chunk_size` addresses.
    /// Duplicates and addresses already in `existing` are dropped first. The
    /// caller appends the tip to whichever transaction carries the last one.
    pub fn extend_instructions(
        &self,
        table: &Pubkey,
        authority: &Pubkey,
        payer: &Pubkey,
        addresses: &[Pubkey],
        existing: &HashSet<Pubkey>,
        chunk_size: usize,
    ) -> BundlerResult<Vec<Instruction>> {
        Ok(plan_extend(addresses, existing, chunk_size)?
            .into_iter()
            .map(|chunk| extend_lookup_table(*table, *authority, Some(*payer), chunk))
            .collect())
    }

    /// Fetches a table through the cache; a missing table is fatal.
    pub async fn table(&self, table: &Pubkey) -> BundlerResult<AddressLookupTableAccount> {
        if let Some(cached) = self.cached(table) {
            return Ok(cached);
        }
        self.refresh(table).await
    }

    /// Forget a table so the next lookup reads it from the ledger
    pub fn invalidate(&self, table: &Pubkey) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(table);
        }
    }

    /// Which of `tables` cover `addresses`. Read-only against the ledger;
    /// a table is re-read at most once per newly missed address.
    pub async fn plan_compaction(
        &self,
        addresses: &[Pubkey],
        tables: &[Pubkey],
    ) -> BundlerResult<CompactionPlan> {
        for table in tables {
            let needs_fetch = match self.cache.lock() {
                Ok(cache) => match cache.get(table) {
                    None => true,
                    Some(entry) => addresses
                        .iter()
                        .any(|a| !entry.index.contains(a) && !entry.missed.contains(a)),
                },
                Err(_) => true,
            };
            if needs_fetch {
                self.refresh(table).await?;
                if let Ok(mut cache) = self.cache.lock() {
                    if let Some(entry) = cache.get_mut(table) {
                        let absent: Vec<Pubkey> = addresses
                            .iter()
                            .filter(|a| !entry.index.contains(*a))
                            .copied()
                            .collect();
                        entry.missed.extend(absent);
                    }
                }
            }
        }

        let cache = self
            .cache
            .lock()
            .map_err(|_| BundlerError::Rpc("lookup table cache poisoned".to_string()))?;
        let mut plan = CompactionPlan::default();
        let mut used = HashSet::new();

        for address in dedup_preserving_order(addresses) {
            let covering = tables
                .iter()
                .find(|t| cache.get(*t).map(|e| e.index.contains(&address)).unwrap_or(false));
            match covering {
                Some(table) => {
                    plan.covered.push(address);
                    used.insert(*table);
                }
                None => plan.uncovered.push(address),
            }
        }
        for table in tables {
            if used.contains(table) {
                if let Some(entry) = cache.get(table) {
                    plan.tables.push(entry.account.clone());
                }
            }
        }

        if !plan.uncovered.is_empty() {
            logger::debug(
                LogTag::Lut,
                &format!(
                    "{} of {} addresses not in lookup tables",
                    plan.uncovered.len(),
                    plan.covered.len() + plan.uncovered.len()
                ),
            );
        }
        Ok(plan)
    }

    fn cached(&self, table: &Pubkey) -> Option<AddressLookupTableAccount> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(table).map(|e| e.account.clone()))
    }

    async fn refresh(&self, table: &Pubkey) -> BundlerResult<AddressLookupTableAccount> {
        let account = self
            .ledger
            .lookup_table(table)
            .await?
            .ok_or(BundlerError::MissingLookupTable(*table))?;
        logger::debug(
            LogTag::Lut,
            &format!(
                "Loaded lookup table {} with {} addresses",
                short_address(table),
                account.addresses.len()
            ),
        );
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(*table, CachedTable::new(account.clone()));
        }
        Ok(account)
    }
}

/// Dedups `addresses` (first occurrence wins), drops `existing`, and splits
/// the rest into chunks of `chunk_size`.
pub fn plan_extend(
    addresses: &[Pubkey],
    existing: &HashSet<Pubkey>,
    chunk_size: usize,
) -> BundlerResult<Vec<Vec<Pubkey>>> {
    if chunk_size == 0 {
        return Err(BundlerError::InvalidInput(
            "extend chunk size must be greater than 0".to_string(),
        ));
    }
    let fresh: Vec<Pubkey> = dedup_preserving_order(addresses)
        .into_iter()
        .filter(|a| !existing.contains(a))
        .collect();
    Ok(fresh.chunks(chunk_size).map(|c| c.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::layouts::encode_lookup_table;
    use crate::testing::MockLedger;

    fn keys(n: usize) -> Vec<Pubkey> {
        (0..n).map(|_| Pubkey::new_unique()).collect()
    }

    #[test]
    fn test_plan_extend_65_addresses() {
        let addresses = keys(65);
        let chunks = plan_extend(&addresses, &HashSet::new(), 30).unwrap();
        let sizes: Vec<_> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![30, 30, 5]);

        let flat: Vec<_> = chunks.concat();
        assert_eq!(flat, addresses);
    }

    #[test]
    fn test_plan_extend_dedups_and_skips_existing() {
        let addresses = keys(10);
        let mut input = addresses.clone();
        input.extend_from_slice(&addresses[..4]);
        let existing: HashSet<_> = addresses[..2].iter().copied().collect();

        let chunks = plan_extend(&input, &existing, 30).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], addresses[2..].to_vec());
        assert!(plan_extend(&input, &existing, 0).is_err());
    }

    #[test]
    fn test_extend_instructions_one_per_chunk() {
        let ledger = Arc::new(MockLedger::new());
        let manager = LookupTableManager::new(ledger);
        let table = Pubkey::new_unique();
        let authority = Pubkey::new_unique();

        let ixs = manager
            .extend_instructions(&table, &authority, &authority, &keys(65), &HashSet::new(), 30)
            .unwrap();
        assert_eq!(ixs.len(), 3);
        for ix in &ixs {
            assert_eq!(ix.program_id, solana_sdk::address_lookup_table::program::id());
            assert_eq!(ix.accounts[0].pubkey, table);
        }
    }

    #[tokio::test]
    async fn test_missing_table_is_fatal() {
        let manager = LookupTableManager::new(Arc::new(MockLedger::new()));
        let table = Pubkey::new_unique();
        let err = manager.plan_compaction(&keys(3), &[table]).await.unwrap_err();
        assert!(matches!(err, BundlerError::MissingLookupTable(t) if t == table));
    }

    #[tokio::test]
    async fn test_plan_compaction_splits_covered() {
        let ledger = Arc::new(MockLedger::new());
        let table = Pubkey::new_unique();
        let in_table = keys(4);
        ledger.set_account(table, encode_lookup_table(&Pubkey::new_unique(), &in_table));
        let manager = LookupTableManager::new(ledger.clone());

        let outside = Pubkey::new_unique();
        let mut request = in_table[..2].to_vec();
        request.push(outside);

        let plan = manager.plan_compaction(&request, &[table]).await.unwrap();
        assert_eq!(plan.covered, in_table[..2].to_vec());
        assert_eq!(plan.uncovered, vec![outside]);
        assert_eq!(plan.tables.len(), 1);
        assert_eq!(plan.tables[0].key, table);

        // Idempotent, and the known miss does not trigger another read
        let reads = ledger.account_reads(&table);
        let again = manager.plan_compaction(&request, &[table]).await.unwrap();
        assert_eq!(again.covered, plan.covered);
        assert_eq!(ledger.account_reads(&table), reads);
    }

    #[tokio::test]
    async fn test_new_miss_refreshes_from_ledger() {
        let ledger = Arc::new(MockLedger::new());
        let table = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let first = keys(2);
        ledger.set_account(table, encode_lookup_table(&authority, &first));
        let manager = LookupTableManager::new(ledger.clone());
        manager.plan_compaction(&first, &[table]).await.unwrap();

        // Table extended out of band
        let added = Pubkey::new_unique();
        let mut extended = first.clone();
        extended.push(added);
        ledger.set_account(table, encode_lookup_table(&authority, &extended));

        let plan = manager.plan_compaction(&[added], &[table]).await.unwrap();
        assert_eq!(plan.covered, vec![added]);
        assert!(plan.uncovered.is_empty());
    }
}
