use crate::constants::LAMPORTS_PER_SOL;
use solana_sdk::pubkey::Pubkey;

pub fn lamports_to_sol(lamports: u64) -> f64 {
    (lamports as f64) / (LAMPORTS_PER_SOL as f64)
}

/// Truncates toward zero; negative or NaN input yields 0
pub fn sol_to_lamports(sol_amount: f64) -> u64 {
    if !sol_amount.is_finite() || sol_amount <= 0.0 {
        return 0;
    }
    (sol_amount * LAMPORTS_PER_SOL as f64) as u64
}

/// UI amount to raw token units for a mint with `decimals`
pub fn ui_to_raw_amount(amount: f64, decimals: u8) -> u64 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    (amount * 10f64.powi(decimals as i32)).floor() as u64
}

/// `percent` of `amount`, percent in 0..=100, rounded down
pub fn percent_of(amount: u64, percent: f64) -> u64 {
    if !percent.is_finite() || percent <= 0.0 {
        return 0;
    }
    let percent = percent.min(100.0);
    ((amount as u128 * (percent * 100.0).round() as u128) / 10_000) as u64
}

/// First 8 characters of an address for log lines
pub fn short_address(address: &Pubkey) -> String {
    let s = address.to_string();
    s[..8.min(s.len())].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sol_conversions() {
        assert_eq!(sol_to_lamports(0.01), 10_000_000);
        assert_eq!(sol_to_lamports(-1.0), 0);
        assert_eq!(lamports_to_sol(1_500_000_000), 1.5);
    }

    #[test]
    fn test_ui_to_raw_amount() {
        assert_eq!(ui_to_raw_amount(1.5, 6), 1_500_000);
        assert_eq!(ui_to_raw_amount(f64::NAN, 6), 0);
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(1_000, 25.0), 250);
        assert_eq!(percent_of(999, 50.0), 499);
        assert_eq!(percent_of(1_000, 150.0), 1_000);
        assert_eq!(percent_of(1_000, 0.0), 0);
        assert_eq!(percent_of(u64::MAX, 100.0), u64::MAX);
    }

    #[test]
    fn test_short_address() {
        let key = Pubkey::new_unique();
        assert_eq!(short_address(&key).len(), 8);
    }
}
