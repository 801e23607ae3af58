//! Pre-launch funding: SOL and token accounts for the workers, wrapped SOL
//! for buying, and reclaiming WSOL account rent afterwards.

use super::{DistributeWsolParams, FundWorkersParams, LaunchContext, OperationReport, TipOnly};
use crate::chunker::{pack, wallet_chunks, PackLimits, WalletInstructions};
use crate::errors::{BundlerError, BundlerResult};
use crate::instructions::{
    close_token_account, create_ata_idempotent, sol_transfer, wrap_sol_instructions,
};
use crate::logger::{self, LogTag};
use crate::utils::lamports_to_sol;
use futures::future::try_join_all;
use spl_associated_token_account::get_associated_token_address;

impl LaunchContext {
    fn payer_pack_limits(&self) -> PackLimits {
        PackLimits {
            max_size: self.configs.bundle.max_transaction_size,
            max_entries: usize::MAX,
        }
    }

    async fn ensure_payer_balance(&self, needed: u64) -> BundlerResult<()> {
        let available = self.ledger.balance(&self.payer().pubkey()).await?;
        if available < needed {
            return Err(BundlerError::InvalidInput(format!(
                "fee payer holds {:.4} SOL, operation needs {:.4} SOL",
                lamports_to_sol(available),
                lamports_to_sol(needed)
            )));
        }
        Ok(())
    }

    /// SOL for every worker plus a base-token account for each worker and
    /// the fee payer, all paid by the fee payer.
    pub async fn fund_workers(&self, params: FundWorkersParams) -> BundlerResult<OperationReport> {
        let state = self.state.load()?;
        let keys = self.launch_keys(&state).await?;
        let payer = self.payer();
        let workers = self.wallets.workers();

        let total = params
            .lamports_per_worker
            .saturating_mul(workers.len() as u64)
            .saturating_add(params.tip_lamports);
        self.ensure_payer_balance(total).await?;

        let mut entries = vec![WalletInstructions::new(
            payer.clone(),
            vec![create_ata_idempotent(&payer.pubkey(), &payer.pubkey(), &keys.base_mint)],
        )];
        for worker in workers {
            entries.push(WalletInstructions::new(
                payer.clone(),
                vec![
                    sol_transfer(&payer.pubkey(), &worker.pubkey(), params.lamports_per_worker),
                    create_ata_idempotent(&payer.pubkey(), &worker.pubkey(), &keys.base_mint),
                ],
            ));
        }

        let tables = self.table_accounts(&state).await?;
        let chunks = pack(
            entries,
            payer,
            &tables,
            self.payer_pack_limits(),
            Some(self.tip(params.tip_lamports)),
        )?;
        logger::info(
            LogTag::Wallet,
            &format!(
                "Funding {} workers with {:.4} SOL each",
                workers.len(),
                lamports_to_sol(params.lamports_per_worker)
            ),
        );
        let report = self
            .compile_and_dispatch(&chunks, state.lookup_table.into_iter().collect())
            .await?;
        Ok(OperationReport {
            bundles: vec![report],
            state: Some(state),
        })
    }

    /// Wraps `step * (i + 1)` lamports into worker `i`'s WSOL account.
    pub async fn distribute_wsol(
        &self,
        params: DistributeWsolParams,
    ) -> BundlerResult<OperationReport> {
        if params.step_lamports == 0 {
            return Err(BundlerError::InvalidInput(
                "WSOL step must be greater than 0".to_string(),
            ));
        }
        let state = self.state.load()?;
        let payer = self.payer();
        let workers = self.wallets.workers();

        let amounts: Vec<u64> = (1..=workers.len() as u64)
            .map(|i| params.step_lamports.saturating_mul(i))
            .collect();
        let total = amounts
            .iter()
            .fold(params.tip_lamports, |acc, a| acc.saturating_add(*a));
        self.ensure_payer_balance(total).await?;

        let mut entries = Vec::with_capacity(workers.len());
        for (worker, amount) in workers.iter().zip(&amounts) {
            entries.push(WalletInstructions::new(
                payer.clone(),
                wrap_sol_instructions(&payer.pubkey(), &worker.pubkey(), *amount)?,
            ));
        }

        let tables = self.table_accounts(&state).await?;
        let chunks = pack(
            entries,
            payer,
            &tables,
            self.payer_pack_limits(),
            Some(self.tip(params.tip_lamports)),
        )?;
        logger::info(
            LogTag::Wallet,
            &format!(
                "Distributing {:.4} SOL as WSOL across {} workers",
                lamports_to_sol(total - params.tip_lamports),
                workers.len()
            ),
        );
        let report = self
            .compile_and_dispatch(&chunks, state.lookup_table.into_iter().collect())
            .await?;
        Ok(OperationReport {
            bundles: vec![report],
            state: Some(state),
        })
    }

    /// Closes every existing worker WSOL account, rent to the fee payer.
    pub async fn close_wsol_accounts(&self, params: TipOnly) -> BundlerResult<OperationReport> {
        let state = self.state.load()?;
        let payer = self.payer();
        let wsol = spl_token::native_mint::id();

        let accounts: Vec<_> = self
            .wallets
            .workers()
            .iter()
            .map(|w| get_associated_token_address(&w.pubkey(), &wsol))
            .collect();
        let existing = try_join_all(accounts.iter().map(|a| self.ledger.account_data(a))).await?;

        let mut entries = Vec::new();
        for ((worker, account), data) in self.wallets.workers().iter().zip(&accounts).zip(existing) {
            if data.is_none() {
                logger::debug(
                    LogTag::Wallet,
                    &format!("{} has no WSOL account", worker.role()),
                );
                continue;
            }
            entries.push(WalletInstructions::new(
                worker.clone(),
                vec![close_token_account(account, &payer.pubkey(), &worker.pubkey())?],
            ));
        }
        if entries.is_empty() {
            return Err(BundlerError::InvalidInput(
                "no worker has a WSOL account to close".to_string(),
            ));
        }

        let chunks = wallet_chunks(
            entries,
            payer,
            self.configs.bundle.wallets_per_chunk,
            self.tip(params.tip_lamports),
        )?;
        let report = self
            .compile_and_dispatch(&chunks, state.lookup_table.into_iter().collect())
            .await?;
        Ok(OperationReport {
            bundles: vec![report],
            state: Some(state),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::Harness;
    use super::*;

    #[tokio::test]
    async fn test_fund_workers_needs_payer_balance() {
        let h = Harness::new();
        let params = FundWorkersParams {
            lamports_per_worker: 10_000_000,
            tip_lamports: 1_000,
        };
        let err = h.ctx.fund_workers(params).await.unwrap_err();
        assert!(matches!(err, BundlerError::InvalidInput(_)));
        assert!(h.relay.bundles().is_empty());

        h.ledger
            .set_balance(h.ctx.wallets().fee_payer().pubkey(), 1_000_000_000);
        let report = h.ctx.fund_workers(params).await.unwrap();
        assert!(report.accepted());

        // Payer ATA, then a transfer and an ATA per worker, then the tip
        let total: usize = h.bundle(0).iter().map(|t| t.message.instructions().len()).sum();
        assert_eq!(total, 1 + 27 * 2 + 1);
        for tx in h.bundle(0) {
            assert_eq!(tx.signatures.len(), 1);
        }
    }

    #[tokio::test]
    async fn test_distribute_wsol_arithmetic_series() {
        let h = Harness::new();
        // 27 * 28 / 2 steps of 1_000 plus the tip
        let needed = 378_000 + 5_000;
        h.ledger
            .set_balance(h.ctx.wallets().fee_payer().pubkey(), needed);
        let report = h
            .ctx
            .distribute_wsol(DistributeWsolParams {
                step_lamports: 1_000,
                tip_lamports: 5_000,
            })
            .await
            .unwrap();
        assert!(report.accepted());
        let total: usize = h.bundle(0).iter().map(|t| t.message.instructions().len()).sum();
        assert_eq!(total, 27 * 3 + 1);

        h.ledger
            .set_balance(h.ctx.wallets().fee_payer().pubkey(), needed - 1);
        assert!(h
            .ctx
            .distribute_wsol(DistributeWsolParams {
                step_lamports: 1_000,
                tip_lamports: 5_000,
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_close_wsol_skips_missing_accounts() {
        let h = Harness::new();
        let wsol = spl_token::native_mint::id();
        h.fund_tokens(&wsol, 9, 0);

        let report = h.ctx.close_wsol_accounts(TipOnly { tip_lamports: 1_000 }).await.unwrap();
        assert!(report.accepted());
        let txs = h.bundle(0);
        // 9 workers in groups of 7
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].message.instructions().len(), 7);
        assert_eq!(txs[1].message.instructions().len(), 3);
        assert_eq!(txs[0].signatures.len(), 8);
    }

    #[tokio::test]
    async fn test_close_wsol_with_nothing_to_close() {
        let h = Harness::new();
        assert!(h.ctx.close_wsol_accounts(TipOnly { tip_lamports: 1 }).await.is_err());
        assert!(h.relay.bundles().is_empty());
    }
}
