//! Instruction Batch Builder
//!
//! Pure functions of (pool keys, wallet, parameters). Nothing here touches
//! the ledger or shared state; amounts are read by the caller beforehand.

pub mod accounts;
pub mod liquidity;
pub mod sequence;
pub mod swap;

pub use accounts::{
    close_token_account, create_ata_idempotent, sol_transfer, tip_instruction, token_transfer,
    wrap_sol_instructions,
};
pub use liquidity::{
    create_pool_instructions, initialize_pool_instruction, remove_liquidity_instructions,
    withdraw_instruction, CreatePoolAmounts,
};
pub use sequence::{operation_sequence, round_trip_steps, SwapStep};
pub use swap::{swap_instruction, Direction};
