use super::{Bundle, BundleState};
use crate::config::SimulationPolicy;
use crate::errors::{BundlerError, BundlerResult};
use crate::logger::{self, LogTag};
use crate::rpc::{LedgerRpc, SimulationOutcome};

#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// Position in the bundle
    pub index: usize,
    pub outcome: SimulationOutcome,
}

/// Simulates every transaction on its own against current ledger state.
/// Later transactions do not see the effects of earlier ones.
pub async fn simulate_bundle(
    ledger: &dyn LedgerRpc,
    bundle: &mut Bundle,
) -> BundlerResult<Vec<SimulationReport>> {
    let mut reports = Vec::with_capacity(bundle.len());
    for (index, tx) in bundle.transactions().iter().enumerate() {
        let outcome = ledger.simulate(&tx.transaction).await?;
        match &outcome.error {
            None => logger::debug(
                LogTag::Bundle,
                &format!(
                    "Simulation {} ok ({} units)",
                    index,
                    outcome.units_consumed.unwrap_or_default()
                ),
            ),
            Some(error) => {
                logger::warning(
                    LogTag::Bundle,
                    &format!("Simulation {} failed: {}", index, error),
                );
                for line in outcome.logs.iter().rev().take(5).rev() {
                    logger::verbose(LogTag::Bundle, line);
                }
            }
        }
        reports.push(SimulationReport { index, outcome });
    }
    bundle.transition(BundleState::Simulated)?;
    Ok(reports)
}

pub fn enforce_policy(policy: SimulationPolicy, reports: &[SimulationReport]) -> BundlerResult<()> {
    let failed: Vec<&SimulationReport> = reports.iter().filter(|r| !r.outcome.is_ok()).collect();
    if failed.is_empty() {
        return Ok(());
    }
    let summary = failed
        .iter()
        .map(|r| {
            format!(
                "#{}: {}",
                r.index,
                r.outcome.error.as_deref().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    match policy {
        SimulationPolicy::Strict => Err(BundlerError::Simulation(summary)),
        SimulationPolicy::Advisory | SimulationPolicy::Off => {
            logger::warning(
                LogTag::Bundle,
                &format!(
                    "{} of {} simulations failed, submitting anyway: {}",
                    failed.len(),
                    reports.len(),
                    summary
                ),
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(index: usize, error: Option<&str>) -> SimulationReport {
        SimulationReport {
            index,
            outcome: SimulationOutcome {
                error: error.map(|e| e.to_string()),
                ..SimulationOutcome::default()
            },
        }
    }

    #[test]
    fn test_policy_outcomes() {
        let clean = vec![report(0, None), report(1, None)];
        let dirty = vec![report(0, None), report(1, Some("InstructionError"))];

        assert!(enforce_policy(SimulationPolicy::Strict, &clean).is_ok());
        assert!(enforce_policy(SimulationPolicy::Advisory, &dirty).is_ok());
        match enforce_policy(SimulationPolicy::Strict, &dirty) {
            Err(BundlerError::Simulation(msg)) => assert!(msg.contains("#1")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
