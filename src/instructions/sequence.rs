//! Several swaps for one wallet in a fixed order, inside one transaction

use super::swap::{swap_instruction, Direction};
use crate::pool::PoolKeys;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapStep {
    pub direction: Direction,
    pub amount_in: u64,
    pub minimum_out: u64,
}

/// Swap instructions for `owner`, one per step, in step order
pub fn operation_sequence(
    keys: &PoolKeys,
    owner: &Pubkey,
    steps: &[SwapStep],
    router: Option<&Pubkey>,
) -> Vec<Instruction> {
    steps
        .iter()
        .map(|step| {
            swap_instruction(
                keys,
                owner,
                step.direction,
                step.amount_in,
                step.minimum_out,
                router,
            )
        })
        .collect()
}

/// Concrete steps for a direction pattern: sells split `token_amount`
/// evenly (the last takes the remainder), each buy spends `buy_lamports`.
pub fn round_trip_steps(pattern: &[Direction], token_amount: u64, buy_lamports: u64) -> Vec<SwapStep> {
    let sells = pattern.iter().filter(|d| **d == Direction::Sell).count() as u64;
    let per_sell = if sells == 0 { 0 } else { token_amount / sells };
    let mut sold = 0u64;
    let mut sells_seen = 0u64;

    pattern
        .iter()
        .map(|direction| {
            let amount_in = match direction {
                Direction::Buy => buy_lamports,
                Direction::Sell => {
                    sells_seen += 1;
                    let amount = if sells_seen == sells {
                        token_amount - sold
                    } else {
                        per_sell
                    };
                    sold += amount;
                    amount
                }
            };
            SwapStep {
                direction: *direction,
                amount_in,
                minimum_out: 0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_pool_keys;

    #[test]
    fn test_sell_buy_sell_in_order() {
        let keys = sample_pool_keys();
        let owner = Pubkey::new_unique();
        let steps = round_trip_steps(&[Direction::Sell, Direction::Buy, Direction::Sell], 1_001, 500);
        let amounts: Vec<_> = steps.iter().map(|s| s.amount_in).collect();
        assert_eq!(amounts, vec![500, 500, 501]);

        let ixs = operation_sequence(&keys, &owner, &steps, None);
        assert_eq!(ixs.len(), 3);
        assert_eq!(ixs[0].accounts[15].pubkey, keys.base_ata(&owner));
        assert_eq!(ixs[1].accounts[15].pubkey, keys.quote_ata(&owner));
        assert_eq!(ixs[2].accounts[15].pubkey, keys.base_ata(&owner));
    }

    #[test]
    fn test_single_sell_takes_everything() {
        let steps = round_trip_steps(&[Direction::Sell], 777, 0);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].amount_in, 777);
        assert!(round_trip_steps(&[], 777, 0).is_empty());
    }
}
