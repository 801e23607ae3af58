use super::{LaunchContext, OperationReport, TipOnly};
use crate::errors::BundlerResult;
use crate::logger::{self, LogTag};

impl LaunchContext {
    /// Every worker holding WSOL buys with its whole balance, in groups of
    /// `wallets_per_chunk`, tip on the last group.
    pub async fn build_and_submit_buy_bundle(
        &self,
        params: TipOnly,
    ) -> BundlerResult<OperationReport> {
        let state = self.state.load()?;
        let table = state.require_lookup_table()?;
        let keys = self.launch_keys(&state).await?;

        let chunks = self
            .with_worker_buys(&keys, Vec::new(), params.tip_lamports)
            .await?;
        logger::info(
            LogTag::Builder,
            &format!("Buying from workers across {} transactions", chunks.len()),
        );
        let report = self.compile_and_dispatch(&chunks, vec![table]).await?;
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
    use crate::errors::BundlerError;

    #[tokio::test]
    async fn test_buys_from_every_funded_worker_with_tip_last() {
        let h = Harness::new();
        h.fund_tokens(&spl_token::native_mint::id(), 27, 20_000_000);

        let report = h
            .ctx
            .build_and_submit_buy_bundle(TipOnly { tip_lamports: 1_000_000 })
            .await
            .unwrap();
        assert!(report.accepted());

        let txs = h.bundle(0);
        assert_eq!(txs.len(), 4);
        // Seven workers plus the fee payer, six in the last group
        let signers: Vec<_> = txs.iter().map(|t| t.signatures.len()).collect();
        assert_eq!(signers, vec![8, 8, 8, 7]);

        let swaps: usize = txs
            .iter()
            .map(|t| {
                let keys = t.message.static_account_keys();
                t.message
                    .instructions()
                    .iter()
                    .filter(|ix| keys[ix.program_id_index as usize] == h.keys.program_id)
                    .count()
            })
            .sum();
        assert_eq!(swaps, 27);

        let last = &txs[3].message;
        let tip = last.instructions().last().unwrap();
        assert_eq!(
            last.static_account_keys()[tip.program_id_index as usize],
            solana_sdk::system_program::id()
        );
    }

    #[tokio::test]
    async fn test_skips_workers_without_wsol() {
        let h = Harness::new();
        h.fund_tokens(&spl_token::native_mint::id(), 9, 20_000_000);

        h.ctx
            .build_and_submit_buy_bundle(TipOnly { tip_lamports: 1_000_000 })
            .await
            .unwrap();
        let signers: Vec<_> = h.bundle(0).iter().map(|t| t.signatures.len()).collect();
        assert_eq!(signers, vec![8, 3]);
    }

    #[tokio::test]
    async fn test_no_wsol_anywhere_sends_nothing() {
        let h = Harness::new();
        let err = h
            .ctx
            .build_and_submit_buy_bundle(TipOnly { tip_lamports: 1_000_000 })
            .await
            .unwrap_err();
        assert!(matches!(err, BundlerError::InvalidInput(_)));
        assert!(h.relay.bundles().is_empty());
    }
}
