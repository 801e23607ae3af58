//! Bundle Assembler & Submitter
//!
//! A bundle is an ordered list of compiled transactions sharing one
//! blockhash, executed by the relay all-or-nothing. Lifecycle:
//! `Built -> Simulated (optional) -> Submitted -> Accepted | Rejected | Dropped`.
//! Nothing here retries; a dropped bundle is rebuilt by the caller.

mod simulate;
mod submit;

pub use simulate::{enforce_policy, simulate_bundle, SimulationReport};
pub use submit::{await_result, encode_transactions, submit_bundle, BundleOutcome, BundleReceipt};

use crate::chunker::CompiledTransaction;
use crate::config::{BundleSettings, SimulationPolicy};
use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use crate::relay::RelayClient;
use crate::rpc::LedgerRpc;
use solana_sdk::hash::Hash;
use solana_sdk::message::VersionedMessage;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_program;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleState {
    Built,
    Simulated,
    Submitted {
        bundle_id: String,
    },
    Accepted {
        bundle_id: String,
        slot: Option<u64>,
    },
    /// Refused at submission (no id) or failed on the ledger
    Rejected {
        bundle_id: Option<String>,
        reason: String,
    },
    Dropped {
        bundle_id: String,
    },
}

impl BundleState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BundleState::Accepted { .. } | BundleState::Rejected { .. } | BundleState::Dropped { .. }
        )
    }

    fn name(&self) -> &'static str {
        match self {
            BundleState::Built => "built",
            BundleState::Simulated => "simulated",
            BundleState::Submitted { .. } => "submitted",
            BundleState::Accepted { .. } => "accepted",
            BundleState::Rejected { .. } => "rejected",
            BundleState::Dropped { .. } => "dropped",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Bundle {
    transactions: Vec<CompiledTransaction>,
    blockhash: Hash,
    state: BundleState,
}

impl Bundle {
    pub fn transactions(&self) -> &[CompiledTransaction] {
        &self.transactions
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub fn state(&self) -> &BundleState {
        &self.state
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub(crate) fn transition(&mut self, next: BundleState) -> BundlerResult<()> {
        let allowed = match (&self.state, &next) {
            (BundleState::Built, BundleState::Simulated) => true,
            (BundleState::Built | BundleState::Simulated, BundleState::Submitted { .. }) => true,
            (BundleState::Built | BundleState::Simulated, BundleState::Rejected { .. }) => true,
            (BundleState::Submitted { .. }, next) => next.is_terminal(),
            _ => false,
        };
        if !allowed {
            return Err(BundlerError::InvalidInput(format!(
                "bundle cannot go from {} to {}",
                self.state.name(),
                next.name()
            )));
        }
        if crate::arguments::is_debug_bundle_enabled() {
            logger::debug(
                LogTag::Bundle,
                &format!("Bundle {} -> {}", self.state.name(), next.name()),
            );
        }
        self.state = next;
        Ok(())
    }
}

/// True for a system transfer whose destination is `tip_account`
fn is_tip_transfer(
    message: &VersionedMessage,
    instruction: &solana_sdk::instruction::CompiledInstruction,
    tip_account: &Pubkey,
) -> bool {
    let keys = message.static_account_keys();
    let program = keys.get(instruction.program_id_index as usize);
    let destination = instruction
        .accounts
        .get(1)
        .and_then(|i| keys.get(*i as usize));
    program == Some(&system_program::id())
        && instruction.data.get(..4) == Some(&2u32.to_le_bytes()[..])
        && destination == Some(tip_account)
}

/// Orders `transactions` as given into a bundle, after checking everything
/// the relay would otherwise reject the whole bundle for.
pub fn assemble(
    transactions: Vec<CompiledTransaction>,
    tip_account: &Pubkey,
    settings: &BundleSettings,
) -> BundlerResult<Bundle> {
    let first = transactions
        .first()
        .ok_or_else(|| BundlerError::InvalidInput("bundle has no transactions".to_string()))?;
    let blockhash = first.blockhash;

    if transactions.len() > settings.max_bundle_transactions {
        return Err(BundlerError::InvalidInput(format!(
            "bundle has {} transactions, relay accepts at most {}",
            transactions.len(),
            settings.max_bundle_transactions
        )));
    }

    for tx in &transactions {
        if tx.blockhash != blockhash || *tx.transaction.message.recent_blockhash() != blockhash {
            return Err(BundlerError::InvalidInput(format!(
                "transaction {} does not share the bundle blockhash",
                tx.index
            )));
        }
        if tx.size > settings.max_transaction_size {
            return Err(BundlerError::OversizeTransaction {
                chunk_index: tx.index,
                size: tx.size,
                limit: settings.max_transaction_size,
            });
        }
    }

    let mut tips = Vec::new();
    for (position, tx) in transactions.iter().enumerate() {
        let message = &tx.transaction.message;
        for (ix_position, ix) in message.instructions().iter().enumerate() {
            if is_tip_transfer(message, ix, tip_account) {
                tips.push((position, ix_position, message.instructions().len()));
            }
        }
    }
    match tips.as_slice() {
        [(position, ix_position, count)]
            if *position == transactions.len() - 1 && *ix_position == count - 1 => {}
        [] => {
            return Err(BundlerError::InvalidInput(
                "bundle carries no relay tip".to_string(),
            ))
        }
        [_] => {
            return Err(BundlerError::InvalidInput(
                "relay tip must be the last instruction of the last transaction".to_string(),
            ))
        }
        many => {
            return Err(BundlerError::InvalidInput(format!(
                "bundle carries {} relay tips",
                many.len()
            )))
        }
    }

    logger::debug(
        LogTag::Bundle,
        &format!(
            "Assembled bundle of {} transactions ({} bytes)",
            transactions.len(),
            transactions.iter().map(|t| t.size).sum::<usize>()
        ),
    );
    Ok(Bundle {
        transactions,
        blockhash,
        state: BundleState::Built,
    })
}

/// What happened to one dispatched bundle
#[derive(Debug, Clone)]
pub struct BundleReport {
    pub simulations: Vec<SimulationReport>,
    /// `None` on a dry run
    pub receipt: Option<BundleReceipt>,
    /// `None` when the result was not awaited
    pub outcome: Option<BundleOutcome>,
}

impl BundleReport {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, Some(BundleOutcome::Accepted { .. }))
    }
}

/// Assemble, simulate per policy, submit and optionally await one bundle.
pub struct BundleDispatcher {
    ledger: Arc<dyn LedgerRpc>,
    relay: Arc<dyn RelayClient>,
    settings: BundleSettings,
    tip_account: Pubkey,
}

impl BundleDispatcher {
    pub fn new(
        ledger: Arc<dyn LedgerRpc>,
        relay: Arc<dyn RelayClient>,
        settings: BundleSettings,
        tip_account: Pubkey,
    ) -> Self {
        Self {
            ledger,
            relay,
            settings,
            tip_account,
        }
    }

    pub fn settings(&self) -> &BundleSettings {
        &self.settings
    }

    pub async fn dispatch(
        &self,
        transactions: Vec<CompiledTransaction>,
    ) -> BundlerResult<BundleReport> {
        let mut bundle = assemble(transactions, &self.tip_account, &self.settings)?;

        let simulations = if self.settings.simulation == SimulationPolicy::Off {
            Vec::new()
        } else {
            let reports = simulate_bundle(self.ledger.as_ref(), &mut bundle).await?;
            enforce_policy(self.settings.simulation, &reports)?;
            reports
        };

        if crate::arguments::is_dry_run_enabled() {
            logger::warning(
                LogTag::Bundle,
                &format!("Dry run: bundle of {} transactions not submitted", bundle.len()),
            );
            return Ok(BundleReport {
                simulations,
                receipt: None,
                outcome: None,
            });
        }

        let receipt = submit_bundle(self.relay.as_ref(), &mut bundle).await?;
        let outcome = if self.settings.await_result {
            Some(
                await_result(
                    self.relay.as_ref(),
                    &mut bundle,
                    Duration::from_millis(self.settings.status_poll_ms),
                    Duration::from_secs(self.settings.relay_timeout_secs),
                )
                .await?,
            )
        } else {
            None
        };

        Ok(BundleReport {
            simulations,
            receipt: Some(receipt),
            outcome,
        })
    }
}
