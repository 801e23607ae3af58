use super::{LaunchContext, OperationReport, PoolBundleParams};
use crate::chunker::{attach_tip, wallet_chunks, TransactionChunk, WalletInstructions};
use crate::errors::{BundlerError, BundlerResult};
use crate::instructions::{create_pool_instructions, swap_instruction, CreatePoolAmounts, Direction};
use crate::logger::{self, LogTag};
use crate::pool::PoolKeys;
use crate::state::LaunchState;
use chrono::Utc;

impl LaunchContext {
    /// Pool creation followed by a buy from every worker holding WSOL, as
    /// one bundle. Runs up to `iterations` cycles, each rebuilt with a fresh
    /// blockhash, and stops at the first accepted bundle.
    pub async fn build_and_submit_pool_bundle(
        &self,
        params: PoolBundleParams,
    ) -> BundlerResult<OperationReport> {
        if params.iterations == 0 {
            return Err(BundlerError::InvalidInput(
                "iterations must be at least 1".to_string(),
            ));
        }
        let table = self.state.load()?.require_lookup_table()?;
        let keys = self.pool_keys(&params.market_id).await?;

        let mut report = OperationReport::default();
        for cycle in 1..=params.iterations {
            logger::info(
                LogTag::Bundle,
                &format!("Pool bundle cycle {}/{}", cycle, params.iterations),
            );
            let open_time = params.open_time.unwrap_or_else(Utc::now);
            let chunks = self.pool_bundle_chunks(&keys, &params, open_time.timestamp())?;
            let chunks = self.with_worker_buys(&keys, chunks, params.tip_lamports).await?;

            let bundle = self.compile_and_dispatch(&chunks, vec![table]).await?;
            let accepted = bundle.is_accepted();
            report.bundles.push(bundle);

            report.state = Some(self.state.merge(&LaunchState {
                market_id: Some(keys.market_id),
                pool_id: Some(keys.id),
                lp_mint: Some(keys.lp_mint),
                base_mint: Some(keys.base_mint),
                quote_mint: Some(keys.quote_mint),
                open_time: Some(open_time),
                ..LaunchState::default()
            })?);

            if accepted {
                logger::info(LogTag::Bundle, &format!("Pool {} launched", keys.id));
                break;
            }
            if cycle < params.iterations {
                tokio::time::sleep(params.delay).await;
            }
        }
        Ok(report)
    }

    /// The pool-creation transaction: signed by the primary wallet, fees
    /// from the fee payer.
    fn pool_bundle_chunks(
        &self,
        keys: &PoolKeys,
        params: &PoolBundleParams,
        open_time: i64,
    ) -> BundlerResult<Vec<TransactionChunk>> {
        let primary = self.wallets.primary();
        let amounts = CreatePoolAmounts {
            open_time: open_time.max(0) as u64,
            base_amount: params.base_amount,
            quote_amount: params.quote_lamports,
        };
        let mut chunk = TransactionChunk::new(0, self.payer());
        chunk.push(WalletInstructions::new(
            primary.clone(),
            create_pool_instructions(
                keys,
                &primary.pubkey(),
                &self.programs.fee_destination,
                &amounts,
            )?,
        ));
        chunk.seal();
        Ok(vec![chunk])
    }

    /// Appends worker buy chunks after `leading`, spending each worker's
    /// whole WSOL balance; the tip lands on whatever chunk ends up last.
    pub(super) async fn with_worker_buys(
        &self,
        keys: &PoolKeys,
        mut leading: Vec<TransactionChunk>,
        tip_lamports: u64,
    ) -> BundlerResult<Vec<TransactionChunk>> {
        let router = self.programs.swap_router.as_ref();
        let balances = self
            .worker_token_balances(|owner| keys.quote_ata(owner))
            .await?;

        let mut entries = Vec::new();
        for (worker, balance) in balances {
            if balance == 0 {
                logger::warning(
                    LogTag::Builder,
                    &format!("{} holds no WSOL, skipping its buy", worker.role()),
                );
                continue;
            }
            let ix = swap_instruction(keys, &worker.pubkey(), Direction::Buy, balance, 0, router);
            entries.push(WalletInstructions::new(worker, vec![ix]));
        }

        if entries.is_empty() {
            if leading.is_empty() {
                return Err(BundlerError::InvalidInput(
                    "no worker holds WSOL to buy with".to_string(),
                ));
            }
            attach_tip(&mut leading, self.tip(tip_lamports))?;
            return Ok(leading);
        }
        let offset = leading.len();
        let buys = wallet_chunks(
            entries,
            self.payer(),
            self.configs.bundle.wallets_per_chunk,
            self.tip(tip_lamports),
        )?;
        leading.extend(buys.into_iter().map(|mut chunk| {
            chunk.index += offset;
            chunk
        }));
        Ok(leading)
    }
}
