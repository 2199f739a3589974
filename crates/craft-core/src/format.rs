//! Display helpers for token quantities.

use alloy_primitives::U256;

use crate::constants::BALANCE_DISPLAY_FRACTION_DIGITS;

/// Render `value / 10^decimals` exactly, without trailing fractional zeros.
///
/// `format_units(1_500_000, 6) == "1.5"`, `format_units(2_000_000, 6) == "2"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Balance as shown to the user: thousands grouped with commas and at most
/// three fraction digits (truncated, never rounded up past what is held).
pub fn format_balance(value: U256, decimals: u8) -> String {
    let exact = format_units(value, decimals);
    let (int_part, frac_part) = match exact.split_once('.') {
        Some((i, f)) => (i, f),
        None => (exact.as_str(), ""),
    };
    let frac: String = frac_part.chars().take(BALANCE_DISPLAY_FRACTION_DIGITS).collect();
    let frac = frac.trim_end_matches('0');
    let grouped = group_thousands(int_part);
    if frac.is_empty() {
        grouped
    } else {
        format!("{grouped}.{frac}")
    }
}

fn group_thousands(int_part: &str) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Three significant digits with a `k`/`M`/`B`/`T` suffix: `1234567.0 -> "1.23M"`.
///
/// Used for the approximate stream rate, never for amounts a decision depends on.
pub fn format_by_thousands(num: f64) -> String {
    const MAGNITUDES: [&str; 4] = ["", "k", "M", "B"];
    let mut num = num;
    for suffix in MAGNITUDES {
        // 999.5 would print as "1000" at three significant digits; promote it.
        if num < 999.5 {
            return format!("{}{suffix}", to_precision_3(num));
        }
        num /= 1000.0;
    }
    format!("{}T", to_precision_3(num))
}

fn to_precision_3(num: f64) -> String {
    if num == 0.0 {
        return "0.00".to_string();
    }
    let mut exponent = num.abs().log10().floor() as i32;
    let scale = 10f64.powi(2 - exponent);
    if (num.abs() * scale).round() >= 1000.0 {
        exponent += 1;
    }
    let decimals = (2 - exponent).max(0) as usize;
    format!("{num:.decimals$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn u(v: u128) -> U256 {
        U256::from(v)
    }

    #[test]
    fn units_whole_and_fraction() {
        assert_eq!(format_units(u(1_500_000), 6), "1.5");
        assert_eq!(format_units(u(2_000_000), 6), "2");
        assert_eq!(format_units(u(5), 6), "0.000005");
        assert_eq!(format_units(u(0), 18), "0");
        assert_eq!(format_units(u(123), 0), "123");
    }

    #[test]
    fn units_eighteen_decimals() {
        let v = u(250_000) * U256::from(10u64).pow(U256::from(18));
        assert_eq!(format_units(v, 18), "250000");
    }

    #[test]
    fn balance_grouping() {
        assert_eq!(format_balance(u(1_234_567_000_000), 6), "1,234,567");
        assert_eq!(format_balance(u(999_000_000), 6), "999");
        assert_eq!(format_balance(u(1_000_000_000), 6), "1,000");
    }

    #[test]
    fn balance_truncates_fraction() {
        assert_eq!(format_balance(u(1_234_567_899), 6), "1,234.567");
        assert_eq!(format_balance(u(1_000_500_000), 6), "1,000.5");
        assert_eq!(format_balance(u(1_000_000_999), 6), "1,000");
    }

    #[test]
    fn thousands_suffixes() {
        assert_eq!(format_by_thousands(0.0), "0.00");
        assert_eq!(format_by_thousands(12.345), "12.3");
        assert_eq!(format_by_thousands(123.0), "123");
        assert_eq!(format_by_thousands(1_234.0), "1.23k");
        assert_eq!(format_by_thousands(45_600_000.0), "45.6M");
        assert_eq!(format_by_thousands(7_890_000_000.0), "7.89B");
        assert_eq!(format_by_thousands(2.5e12), "2.50T");
    }

    #[test]
    fn thousands_rounding_promotes_magnitude() {
        assert_eq!(format_by_thousands(999.7), "1.00k");
    }

    #[test]
    fn small_values_keep_three_significant_digits() {
        assert_eq!(format_by_thousands(0.5), "0.500");
        assert_eq!(format_by_thousands(1.0), "1.00");
    }

    proptest! {
        #[test]
        fn units_parse_back_to_the_same_value(raw in any::<u128>(), decimals in 0u8..=30) {
            let text = format_units(U256::from(raw), decimals);
            let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), ""));
            prop_assert!(frac_part.len() <= decimals as usize);
            prop_assert!(!frac_part.ends_with('0'));
            let scaled = format!("{int_part}{frac_part:0<width$}", width = decimals as usize);
            prop_assert_eq!(scaled.parse::<U256>().unwrap(), U256::from(raw));
        }

        #[test]
        fn balance_never_shows_more_than_is_held(raw in any::<u128>(), decimals in 0u8..=30) {
            let shown = format_balance(U256::from(raw), decimals).replace(',', "");
            let exact = format_units(U256::from(raw), decimals);
            prop_assert!(exact.starts_with(&shown));
        }
    }
}
