//! Parameter structs for the public entry points. Prompting fills these in;
//! the operations never ask for input themselves.

use crate::bundle::BundleReport;
use crate::instructions::Direction;
use crate::state::LaunchState;
use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct TipOnly {
    pub tip_lamports: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct FundWorkersParams {
    pub lamports_per_worker: u64,
    pub tip_lamports: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct DistributeWsolParams {
    /// Worker `i` receives `step_lamports * (i + 1)`
    pub step_lamports: u64,
    pub tip_lamports: u64,
}

#[derive(Debug, Clone)]
pub struct PoolBundleParams {
    pub market_id: Pubkey,
    /// Raw base-token units deposited into the pool
    pub base_amount: u64,
    /// Lamports deposited on the quote side
    pub quote_lamports: u64,
    /// Defaults to the time the bundle is built
    pub open_time: Option<DateTime<Utc>>,
    pub tip_lamports: u64,
    /// Build-and-submit cycles; stops at the first accepted bundle
    pub iterations: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone)]
pub struct SellPercentageParams {
    /// Share of each worker's base balance, 0 < percent <= 100
    pub percent: f64,
    pub tip_lamports: u64,
    /// Swaps the fee payer runs over the consolidated amount, in order
    pub operation_sequence: Vec<Direction>,
    /// Spent by each `Buy` in the sequence
    pub buy_lamports: u64,
}

impl SellPercentageParams {
    pub fn sell(percent: f64, tip_lamports: u64) -> Self {
        Self {
            percent,
            tip_lamports,
            operation_sequence: vec![Direction::Sell],
            buy_lamports: 0,
        }
    }
}

/// Bundles an operation dispatched and the launch state it left behind
#[derive(Debug, Clone, Default)]
pub struct OperationReport {
    pub bundles: Vec<BundleReport>,
    pub state: Option<LaunchState>,
}

impl OperationReport {
    pub fn accepted(&self) -> bool {
        self.bundles.last().map(|b| b.is_accepted()).unwrap_or(false)
    }
}
