//! Money rounding and decimal-comma text.
//!
//! Amounts are exact decimals. Rounding to cents is commercial rounding
//! (midpoint away from zero) and happens once per derived value.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to two fractional digits.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format with exactly two fractional digits and a decimal comma.
/// Example: 1234.5 -> "1234,50", -0.004 -> "0,00"
pub fn format_decimal_comma(value: Decimal) -> String {
    let mut rounded = round_money(value);
    if rounded.is_zero() {
        // drop the sign of a negative zero
        rounded = Decimal::ZERO;
    }
    rounded.rescale(2);
    rounded.to_string().replace('.', ",")
}

/// Exact value with a decimal comma and no trailing zeros, for editing.
/// Example: 0.330 -> "0,33", 10.00 -> "10"
pub fn format_decimal_input(value: Decimal) -> String {
    value.normalize().to_string().replace('.', ",")
}

/// Parse user input that may use either a decimal comma or a decimal point.
///
/// When both separators are present the dot is taken as a thousands
/// separator ("1.234,56"). Returns `None` for blank or malformed input.
pub fn parse_decimal(input: &str) -> Option<Decimal> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let normalized = if input.contains(',') {
        input.replace('.', "").replace(',', ".")
    } else {
        input.to_string()
    };

    Decimal::from_str(&normalized).ok()
}
