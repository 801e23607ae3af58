use super::{LaunchContext, OperationReport, TipOnly};
use crate::chunker::{attach_tip, TransactionChunk, WalletInstructions};
use crate::errors::{BundlerError, BundlerResult};
use crate::instructions::remove_liquidity_instructions;
use crate::logger::{self, LogTag};

impl LaunchContext {
    /// Withdraws the primary wallet's entire LP position and unwraps the
    /// WSOL it receives.
    pub async fn build_and_submit_remove_liquidity(
        &self,
        params: TipOnly,
    ) -> BundlerResult<OperationReport> {
        let state = self.state.load()?;
        let table = state.require_lookup_table()?;
        let keys = self.launch_keys(&state).await?;
        let primary = self.wallets.primary();

        let lp_amount = self.ledger.token_balance(&keys.lp_ata(&primary.pubkey())).await?;
        if lp_amount == 0 {
            return Err(BundlerError::InvalidInput(format!(
                "{} holds no LP tokens for pool {}",
                primary.role(),
                keys.id
            )));
        }
        logger::info(
            LogTag::Builder,
            &format!("Removing {} LP units from pool {}", lp_amount, keys.id),
        );

        let mut chunk = TransactionChunk::new(0, self.payer());
        chunk.push(WalletInstructions::new(
            primary.clone(),
            remove_liquidity_instructions(&keys, &primary.pubkey(), lp_amount)?,
        ));
        chunk.seal();
        let mut chunks = vec![chunk];
        attach_tip(&mut chunks, self.tip(params.tip_lamports))?;

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

    #[tokio::test]
    async fn test_withdraws_full_lp_balance() {
        let h = Harness::new();
        let primary = h.ctx.wallets().primary().pubkey();
        h.ledger
            .set_token_account(h.keys.lp_ata(&primary), &h.keys.lp_mint, &primary, 123_456);

        let report = h
            .ctx
            .build_and_submit_remove_liquidity(TipOnly { tip_lamports: 1_000 })
            .await
            .unwrap();
        assert!(report.accepted());

        let txs = h.bundle(0);
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].signatures.len(), 2);
        let ixs = txs[0].message.instructions();
        assert_eq!(ixs.len(), 5);
        assert_eq!(ixs[2].data[0], 4);
        assert_eq!(u64::from_le_bytes(ixs[2].data[1..9].try_into().unwrap()), 123_456);
    }

    #[tokio::test]
    async fn test_no_lp_position() {
        let h = Harness::new();
        let err = h
            .ctx
            .build_and_submit_remove_liquidity(TipOnly { tip_lamports: 1_000 })
            .await
            .unwrap_err();
        assert!(matches!(err, BundlerError::InvalidInput(_)));
    }
}
