use alloy::primitives::utils::{format_units, UnitsError};
use alloy::primitives::U256;

/// Converts a base-unit amount into a human-readable decimal string with
/// trailing zeros removed, so `1500000000000000000` at 18 decimals becomes
/// `"1.5"` and whole amounts come out without a fractional part.
pub fn format_base_units(amount: U256, decimals: u8) -> Result<String, UnitsError> {
    let formatted = format_units(amount, decimals)?;
    Ok(trim_trailing_zeros(&formatted))
}

fn trim_trailing_zeros(formatted: &str) -> String {
    if !formatted.contains('.') {
        return formatted.to_owned();
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_eighteen_decimals() {
        let amount = U256::from(1_500_000_000_000_000_000u64);
        assert_eq!(format_base_units(amount, 18).unwrap(), "1.5");
    }

    #[test]
    fn formats_whole_amounts_without_fraction() {
        let amount = U256::from(2_000_000u64);
        assert_eq!(format_base_units(amount, 6).unwrap(), "2");
    }

    #[test]
    fn formats_zero() {
        assert_eq!(format_base_units(U256::ZERO, 18).unwrap(), "0");
    }

    #[test]
    fn keeps_small_fractions() {
        // 0.00000001 WBTC at 8 decimals
        assert_eq!(format_base_units(U256::from(1u64), 8).unwrap(), "0.00000001");
    }

    #[test]
    fn formats_sub_unit_amounts() {
        let amount = U256::from(5_000_000_000_000_000u64);
        assert_eq!(format_base_units(amount, 18).unwrap(), "0.005");
    }
}
