//! Read-only launch readiness report for the pre-launch checklist

use super::LaunchContext;
use crate::errors::BundlerResult;
use crate::logger::{self, LogTag};
use crate::lut::launch_address_set;
use crate::utils::{lamports_to_sol, short_address};
use futures::future::try_join_all;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReadiness {
    pub pubkey: Pubkey,
    pub lamports: u64,
    pub wsol: u64,
    /// `None` until the market is known
    pub base: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct LaunchReadiness {
    pub lookup_table: Option<Pubkey>,
    /// Launch addresses not yet registered in the table; `None` when either
    /// the table or the market is missing
    pub unregistered: Option<usize>,
    pub payer_lamports: u64,
    pub primary_lamports: u64,
    pub workers: Vec<WorkerReadiness>,
}

impl LaunchReadiness {
    pub fn workers_without_wsol(&self) -> usize {
        self.workers.iter().filter(|w| w.wsol == 0).count()
    }
}

impl LaunchContext {
    pub async fn launch_readiness(&self) -> BundlerResult<LaunchReadiness> {
        let state = self.state.load()?;
        let keys = match state.market_id {
            Some(market) => Some(self.pool_keys(&market).await?),
            None => None,
        };
        let wsol = spl_token::native_mint::id();

        let unregistered = match (state.lookup_table, &keys) {
            (Some(table), Some(keys)) => {
                self.luts.invalidate(&table);
                let present: HashSet<_> =
                    self.luts.table(&table).await?.addresses.into_iter().collect();
                Some(
                    launch_address_set(keys, &self.wallets, &table)
                        .iter()
                        .filter(|a| !present.contains(a))
                        .count(),
                )
            }
            _ => None,
        };

        let reads = self.wallets.workers().iter().map(|worker| {
            let owner = worker.pubkey();
            let ledger = self.ledger.clone();
            let wsol_ata = spl_associated_token_account::get_associated_token_address(&owner, &wsol);
            let base_ata = keys.as_ref().map(|k| k.base_ata(&owner));
            async move {
                let lamports = ledger.balance(&owner).await?;
                let wsol = ledger.token_balance(&wsol_ata).await?;
                let base = match base_ata {
                    Some(ata) => Some(ledger.token_balance(&ata).await?),
                    None => None,
                };
                BundlerResult::Ok(WorkerReadiness {
                    pubkey: owner,
                    lamports,
                    wsol,
                    base,
                })
            }
        });
        let workers = try_join_all(reads).await?;

        let readiness = LaunchReadiness {
            lookup_table: state.lookup_table,
            unregistered,
            payer_lamports: self.ledger.balance(&self.payer().pubkey()).await?,
            primary_lamports: self.ledger.balance(&self.wallets.primary().pubkey()).await?,
            workers,
        };
        logger::info(
            LogTag::System,
            &format!(
                "Readiness: table={} unregistered={} payer={:.4} SOL, {} of {} workers without WSOL",
                readiness
                    .lookup_table
                    .as_ref()
                    .map(short_address)
                    .unwrap_or_else(|| "none".to_string()),
                readiness
                    .unregistered
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                lamports_to_sol(readiness.payer_lamports),
                readiness.workers_without_wsol(),
                readiness.workers.len()
            ),
        );
        Ok(readiness)
    }
}
