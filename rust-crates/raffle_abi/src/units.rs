/// Decimals of the native currency (wei per ether).
pub const ETHER_DECIMALS: u32 = 18;

/// Formats a base-unit amount as a decimal string in the display unit.
///
/// Trailing fractional zeros are removed but at least one fractional digit is
/// kept, so whole amounts read `1.0` and zero reads `0.0`.
pub fn format_units(value: u128, decimals: u32) -> String {
    let decimals = decimals as usize;
    let digits = value.to_string();
    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals + 1 - digits.len()), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

pub fn format_ether(wei: u128) -> String {
    format_units(wei, ETHER_DECIMALS)
}
