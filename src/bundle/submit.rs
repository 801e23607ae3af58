use super::{Bundle, BundleState};
use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use crate::relay::{RelayBundleStatus, RelayClient};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use solana_sdk::signature::Signature;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct BundleReceipt {
    pub bundle_id: String,
    /// First signature of every transaction, in bundle order
    pub signatures: Vec<Signature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    Accepted { slot: Option<u64> },
    Rejected,
    Dropped,
}

pub fn encode_transactions(bundle: &Bundle) -> BundlerResult<Vec<String>> {
    bundle
        .transactions()
        .iter()
        .map(|tx| {
            bincode::serialize(&tx.transaction)
                .map(|bytes| STANDARD.encode(bytes))
                .map_err(|e| BundlerError::Compile(format!("transaction {}: {}", tx.index, e)))
        })
        .collect()
}

pub async fn submit_bundle(
    relay: &dyn RelayClient,
    bundle: &mut Bundle,
) -> BundlerResult<BundleReceipt> {
    let encoded = encode_transactions(bundle)?;
    let signatures = bundle
        .transactions()
        .iter()
        .map(|tx| tx.transaction.signatures.first().copied().unwrap_or_default())
        .collect();

    let bundle_id = match relay.send_bundle(encoded).await {
        Ok(id) => id,
        Err(e) => {
            if let BundlerError::RelayRejected { message, .. } = &e {
                bundle.transition(BundleState::Rejected {
                    bundle_id: None,
                    reason: message.clone(),
                })?;
            }
            logger::error(LogTag::Relay, &format!("Bundle submission failed: {}", e));
            return Err(e);
        }
    };

    bundle.transition(BundleState::Submitted {
        bundle_id: bundle_id.clone(),
    })?;
    logger::info(
        LogTag::Relay,
        &format!("Submitted bundle {} ({} transactions)", bundle_id, bundle.len()),
    );
    Ok(BundleReceipt {
        bundle_id,
        signatures,
    })
}

/// Polls the relay until the bundle reaches a terminal status or `timeout`
/// passes. A timeout leaves the bundle `Submitted`: its fate is unknown.
pub async fn await_result(
    relay: &dyn RelayClient,
    bundle: &mut Bundle,
    poll_interval: Duration,
    timeout: Duration,
) -> BundlerResult<BundleOutcome> {
    let bundle_id = match bundle.state() {
        BundleState::Submitted { bundle_id } => bundle_id.clone(),
        other => {
            return Err(BundlerError::InvalidInput(format!(
                "cannot await a bundle that is {:?}",
                other
            )))
        }
    };
    let started = Instant::now();

    loop {
        let status = relay.bundle_status(&bundle_id).await?;
        let outcome = match status {
            Some(RelayBundleStatus::Landed { slot }) => Some((
                BundleOutcome::Accepted { slot },
                BundleState::Accepted {
                    bundle_id: bundle_id.clone(),
                    slot,
                },
            )),
            Some(RelayBundleStatus::Failed) => Some((
                BundleOutcome::Rejected,
                BundleState::Rejected {
                    bundle_id: Some(bundle_id.clone()),
                    reason: "failed on ledger".to_string(),
                },
            )),
            Some(RelayBundleStatus::Invalid) => Some((
                BundleOutcome::Dropped,
                BundleState::Dropped {
                    bundle_id: bundle_id.clone(),
                },
            )),
            Some(RelayBundleStatus::Pending) | None => None,
        };

        if let Some((outcome, state)) = outcome {
            bundle.transition(state)?;
            match &outcome {
                BundleOutcome::Accepted { slot } => logger::info(
                    LogTag::Relay,
                    &format!(
                        "Bundle {} landed{}",
                        bundle_id,
                        slot.map(|s| format!(" in slot {}", s)).unwrap_or_default()
                    ),
                ),
                BundleOutcome::Rejected => logger::error(
                    LogTag::Relay,
                    &format!("Bundle {} failed on the ledger", bundle_id),
                ),
                BundleOutcome::Dropped => logger::warning(
                    LogTag::Relay,
                    &format!(
                        "Bundle {} was dropped; rebuild with a fresh blockhash to retry",
                        bundle_id
                    ),
                ),
            }
            return Ok(outcome);
        }

        if started.elapsed() >= timeout {
            logger::error(
                LogTag::Relay,
                &format!(
                    "No result for bundle {} after {}s",
                    bundle_id,
                    timeout.as_secs()
                ),
            );
            return Err(BundlerError::RelayTimeout {
                bundle_id,
                seconds: timeout.as_secs(),
            });
        }
        tokio::time::sleep(poll_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::assemble;
    use crate::bundle::tests::small_bundle;
    use crate::config::BundleSettings;
    use crate::errors::RejectionKind;
    use crate::testing::{sample_wallet_pool, MockLedger, MockRelay};
    use solana_sdk::pubkey::Pubkey;
    use std::sync::Arc;

    async fn built_bundle() -> Bundle {
        let pool = sample_wallet_pool(0);
        let tip = Pubkey::new_unique();
        let txs = small_bundle(Arc::new(MockLedger::new()), pool.fee_payer(), &tip, 2).await;
        assemble(txs, &tip, &BundleSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_encoded_transactions_decode_back() {
        let bundle = built_bundle().await;
        let encoded = encode_transactions(&bundle).unwrap();
        assert_eq!(encoded.len(), 2);
        let bytes = STANDARD.decode(&encoded[1]).unwrap();
        assert_eq!(bytes.len(), bundle.transactions()[1].size);
    }

    #[tokio::test]
    async fn test_no_leader_rejection() {
        let relay = MockRelay::new();
        relay.fail_sends("Bundle Dropped, no connected leader up soon");
        let mut bundle = built_bundle().await;

        let err = submit_bundle(&relay, &mut bundle).await.unwrap_err();
        assert!(matches!(
            err,
            BundlerError::RelayRejected {
                kind: RejectionKind::NoLeader,
                ..
            }
        ));
        assert!(err.is_operator_retryable());
        assert!(matches!(bundle.state(), BundleState::Rejected { bundle_id: None, .. }));
    }

    #[tokio::test]
    async fn test_pending_then_landed() {
        let relay = MockRelay::new();
        relay.push_status(None);
        relay.push_status(Some(RelayBundleStatus::Pending));
        relay.push_status(Some(RelayBundleStatus::Landed { slot: Some(42) }));
        let mut bundle = built_bundle().await;

        let receipt = submit_bundle(&relay, &mut bundle).await.unwrap();
        assert_eq!(receipt.signatures.len(), 2);
        let outcome = await_result(
            &relay,
            &mut bundle,
            Duration::from_millis(1),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(outcome, BundleOutcome::Accepted { slot: Some(42) });
        assert!(bundle.state().is_terminal());
    }

    #[tokio::test]
    async fn test_invalid_status_is_dropped() {
        let relay = MockRelay::new();
        relay.push_status(Some(RelayBundleStatus::Invalid));
        let mut bundle = built_bundle().await;
        submit_bundle(&relay, &mut bundle).await.unwrap();

        let outcome = await_result(&relay, &mut bundle, Duration::from_millis(1), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(outcome, BundleOutcome::Dropped);
        assert!(matches!(bundle.state(), BundleState::Dropped { .. }));
    }

    #[tokio::test]
    async fn test_timeout_leaves_bundle_submitted() {
        let relay = MockRelay::new();
        let mut bundle = built_bundle().await;
        submit_bundle(&relay, &mut bundle).await.unwrap();

        let err = await_result(&relay, &mut bundle, Duration::from_millis(1), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, BundlerError::RelayTimeout { seconds: 0, .. }));
        assert!(!err.is_fatal());
        assert!(matches!(bundle.state(), BundleState::Submitted { .. }));
    }
}
