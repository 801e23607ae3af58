use super::{LaunchContext, OperationReport, SellPercentageParams, TipOnly};
use crate::chunker::{chunk_by_wallet, wallet_chunks, TransactionChunk, WalletInstructions};
use crate::errors::{BundlerError, BundlerResult};
use crate::instructions::{
    create_ata_idempotent, operation_sequence, round_trip_steps, swap_instruction, token_transfer,
    wrap_sol_instructions, Direction,
};
use crate::logger::{self, LogTag};
use crate::utils::percent_of;

impl LaunchContext {
    /// Every worker sells its whole base-token balance.
    pub async fn build_and_submit_sell_bundle(
        &self,
        params: TipOnly,
    ) -> BundlerResult<OperationReport> {
        let state = self.state.load()?;
        let table = state.require_lookup_table()?;
        let keys = self.launch_keys(&state).await?;
        let router = self.programs.swap_router.as_ref();

        let balances = self
            .worker_token_balances(|owner| keys.base_ata(owner))
            .await?;
        let entries: Vec<_> = balances
            .into_iter()
            .filter(|(_, balance)| *balance > 0)
            .map(|(worker, balance)| {
                let ix =
                    swap_instruction(&keys, &worker.pubkey(), Direction::Sell, balance, 0, router);
                WalletInstructions::new(worker, vec![ix])
            })
            .collect();
        if entries.is_empty() {
            return Err(BundlerError::InvalidInput(
                "no worker holds base tokens".to_string(),
            ));
        }
        logger::info(
            LogTag::Builder,
            &format!("Selling from {} workers", entries.len()),
        );

        let chunks = wallet_chunks(
            entries,
            self.payer(),
            self.configs.bundle.wallets_per_chunk,
            self.tip(params.tip_lamports),
        )?;
        let report = self.compile_and_dispatch(&chunks, vec![table]).await?;
        Ok(OperationReport {
            bundles: vec![report],
            state: Some(state),
        })
    }

    /// Workers move `percent` of their base balance to the fee payer, which
    /// then runs `operation_sequence` over the consolidated amount in the
    /// final transaction.
    pub async fn build_and_submit_sell_percentage(
        &self,
        params: SellPercentageParams,
    ) -> BundlerResult<OperationReport> {
        if !(params.percent > 0.0 && params.percent <= 100.0) {
            return Err(BundlerError::InvalidInput(format!(
                "percentage must be in (0, 100], got {}",
                params.percent
            )));
        }
        if params.operation_sequence.is_empty() {
            return Err(BundlerError::InvalidInput(
                "operation sequence is empty".to_string(),
            ));
        }

        let state = self.state.load()?;
        let table = state.require_lookup_table()?;
        let keys = self.launch_keys(&state).await?;
        let payer = self.payer();
        let payer_ata = keys.base_ata(&payer.pubkey());

        let balances = self
            .worker_token_balances(|owner| keys.base_ata(owner))
            .await?;
        let mut consolidated = 0u64;
        let mut entries = Vec::new();
        for (worker, balance) in balances {
            let amount = percent_of(balance, params.percent);
            if amount == 0 {
                continue;
            }
            consolidated = consolidated.saturating_add(amount);
            let ix = token_transfer(&keys.base_ata(&worker.pubkey()), &payer_ata, &worker.pubkey(), amount)?;
            entries.push(WalletInstructions::new(worker, vec![ix]));
        }
        if entries.is_empty() {
            return Err(BundlerError::InvalidInput(format!(
                "{}% of worker balances is zero",
                params.percent
            )));
        }

        let mut chunks = chunk_by_wallet(entries, payer, self.configs.bundle.wallets_per_chunk)?;
        if let Some(first) = chunks.first_mut() {
            first.instructions.insert(
                0,
                create_ata_idempotent(&payer.pubkey(), &payer.pubkey(), &keys.base_mint),
            );
        }

        let buys = params
            .operation_sequence
            .iter()
            .filter(|d| **d == Direction::Buy)
            .count() as u64;
        let mut final_ixs = Vec::new();
        if buys > 0 {
            final_ixs.extend(wrap_sol_instructions(
                &payer.pubkey(),
                &payer.pubkey(),
                params.buy_lamports.saturating_mul(buys),
            )?);
        }
        let steps = round_trip_steps(&params.operation_sequence, consolidated, params.buy_lamports);
        final_ixs.extend(operation_sequence(
            &keys,
            &payer.pubkey(),
            &steps,
            self.programs.swap_router.as_ref(),
        ));
        final_ixs.push(self.tip(params.tip_lamports));

        let mut last = TransactionChunk::new(chunks.len(), payer);
        last.push(WalletInstructions::new(payer.clone(), final_ixs));
        last.has_tip = true;
        last.seal();
        chunks.push(last);

        logger::info(
            LogTag::Builder,
            &format!(
                "Consolidating {} base units from {} workers, then {:?}",
                consolidated,
                chunks.len() - 1,
                params.operation_sequence
            ),
        );
        let report = self.compile_and_dispatch(&chunks, vec![table]).await?;
        Ok(OperationReport {
            bundles: vec![report],
            state: Some(state),
        })
    }
}
