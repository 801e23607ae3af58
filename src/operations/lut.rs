use super::{LaunchContext, OperationReport, TipOnly};
use crate::chunker::{pack, PackLimits, WalletInstructions};
use crate::errors::BundlerResult;
use crate::instructions::create_ata_idempotent;
use crate::logger::{self, LogTag};
use crate::lut::launch_address_set;
use crate::state::LaunchState;
use std::collections::HashSet;

impl LaunchContext {
    /// Creates the launch lookup table (confirmed directly, outside any
    /// bundle), records it, then bundles WSOL account creation for the
    /// fee payer and every worker.
    pub async fn create_lookup_table(&self, params: TipOnly) -> BundlerResult<OperationReport> {
        let payer = self.payer();
        if let Some(previous) = self.state.load()?.lookup_table {
            logger::warning(
                LogTag::Lut,
                &format!("Replacing lookup table {} in launch state", previous),
            );
        }

        let table = self.luts.create_table(payer, payer).await?;
        let state = self.state.merge(&LaunchState {
            lookup_table: Some(table),
            ..LaunchState::default()
        })?;

        let wsol = spl_token::native_mint::id();
        let mut entries = vec![WalletInstructions::new(
            payer.clone(),
            vec![create_ata_idempotent(&payer.pubkey(), &payer.pubkey(), &wsol)],
        )];
        entries.extend(self.wallets.workers().iter().map(|worker| {
            WalletInstructions::new(
                payer.clone(),
                vec![create_ata_idempotent(&payer.pubkey(), &worker.pubkey(), &wsol)],
            )
        }));

        let limits = PackLimits {
            max_size: self.configs.bundle.max_transaction_size,
            max_entries: usize::MAX,
        };
        let chunks = pack(entries, payer, &[], limits, Some(self.tip(params.tip_lamports)))?;
        let report = self.compile_and_dispatch(&chunks, Vec::new()).await?;

        Ok(OperationReport {
            bundles: vec![report],
            state: Some(state),
        })
    }

    /// Registers every launch address the table does not hold yet, one
    /// extend instruction per transaction, tip after the last one.
    pub async fn extend_lookup_table(&self, params: TipOnly) -> BundlerResult<OperationReport> {
        let state = self.state.load()?;
        let table = state.require_lookup_table()?;
        let keys = self.launch_keys(&state).await?;
        let payer = self.payer();

        self.luts.invalidate(&table);
        let existing: HashSet<_> = self.luts.table(&table).await?.addresses.into_iter().collect();
        let addresses = launch_address_set(&keys, &self.wallets, &table);
        let instructions = self.luts.extend_instructions(
            &table,
            &payer.pubkey(),
            &payer.pubkey(),
            &addresses,
            &existing,
            self.configs.bundle.lut_extend_chunk,
        )?;

        if instructions.is_empty() {
            logger::info(
                LogTag::Lut,
                &format!(
                    "Lookup table {} already holds all {} launch addresses",
                    table,
                    addresses.len()
                ),
            );
            return Ok(OperationReport {
                bundles: Vec::new(),
                state: Some(state),
            });
        }
        logger::info(
            LogTag::Lut,
            &format!(
                "Extending {} with {} addresses in {} transactions",
                table,
                addresses.iter().filter(|a| !existing.contains(a)).count(),
                instructions.len()
            ),
        );

        let entries: Vec<_> = instructions
            .into_iter()
            .map(|ix| WalletInstructions::new(payer.clone(), vec![ix]))
            .collect();
        let limits = PackLimits {
            max_size: self.configs.bundle.max_transaction_size,
            max_entries: 1,
        };
        let chunks = pack(entries, payer, &[], limits, Some(self.tip(params.tip_lamports)))?;
        let report = self.compile_and_dispatch(&chunks, Vec::new()).await;
        self.luts.invalidate(&table);

        Ok(OperationReport {
            bundles: vec![report?],
            state: Some(state),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::Harness;
    use super::*;
    use crate::errors::BundlerError;
    use crate::rpc::layouts::encode_lookup_table;
    use solana_sdk::address_lookup_table;

    #[tokio::test]
    async fn test_create_table_confirms_directly_then_bundles_atas() {
        let h = Harness::new();
        let report = h
            .ctx
            .create_lookup_table(TipOnly { tip_lamports: 1_000 })
            .await
            .unwrap();

        let sent = h.ledger.sent();
        assert_eq!(sent.len(), 1);
        let create = &sent[0].message;
        assert_eq!(
            create.static_account_keys()[create.instructions()[0].program_id_index as usize],
            address_lookup_table::program::id()
        );

        let state = report.state.unwrap();
        assert_ne!(state.lookup_table, Some(h.table));
        assert_eq!(h.ctx.launch_state().unwrap().lookup_table, state.lookup_table);

        // 28 idempotent WSOL account creations plus the tip
        let txs = h.bundle(0);
        let total: usize = txs.iter().map(|t| t.message.instructions().len()).sum();
        assert_eq!(total, 29);
        assert!(report.bundles[0].is_accepted());
    }

    #[tokio::test]
    async fn test_rejected_table_creation_sends_no_bundle() {
        let h = Harness::new();
        h.ledger.fail_sends("insufficient funds");
        let err = h
            .ctx
            .create_lookup_table(TipOnly { tip_lamports: 1_000 })
            .await
            .unwrap_err();
        assert!(matches!(err, BundlerError::LedgerSubmit { .. }));
        assert!(h.relay.bundles().is_empty());
        assert_eq!(h.ctx.launch_state().unwrap().lookup_table, Some(h.table));
    }

    #[tokio::test]
    async fn test_extend_fills_empty_table() {
        let h = Harness::new();
        h.ledger.set_account(
            h.table,
            encode_lookup_table(&h.ctx.wallets().fee_payer().pubkey(), &[]),
        );

        let report = h.ctx.extend_lookup_table(TipOnly { tip_lamports: 1_000 }).await.unwrap();
        assert_eq!(report.bundles.len(), 1);

        // 106 addresses in chunks of 30: four extend transactions
        let txs = h.bundle(0);
        assert_eq!(txs.len(), 4);
        let extends: usize = txs
            .iter()
            .flat_map(|t| {
                let keys = t.message.static_account_keys().to_vec();
                t.message
                    .instructions()
                    .iter()
                    .map(move |ix| keys[ix.program_id_index as usize])
                    .collect::<Vec<_>>()
            })
            .filter(|p| *p == address_lookup_table::program::id())
            .count();
        assert_eq!(extends, 4);
    }

    #[tokio::test]
    async fn test_extend_complete_table_is_a_no_op() {
        let h = Harness::new();
        let report = h.ctx.extend_lookup_table(TipOnly { tip_lamports: 1_000 }).await.unwrap();
        assert!(report.bundles.is_empty());
        assert!(h.relay.bundles().is_empty());
    }

    #[tokio::test]
    async fn test_extend_without_table_on_ledger_is_fatal() {
        let h = Harness::new();
        h.ctx
            .state
            .merge(&LaunchState {
                lookup_table: Some(solana_sdk::pubkey::Pubkey::new_unique()),
                ..LaunchState::default()
            })
            .unwrap();
        let err = h
            .ctx
            .extend_lookup_table(TipOnly { tip_lamports: 1_000 })
            .await
            .unwrap_err();
        assert!(matches!(err, BundlerError::MissingLookupTable(_)));
    }
}
