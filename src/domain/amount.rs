//! Fixed-point amount handling for fungible-asset balances.
//!
//! Every on-chain amount is an integer count of octas; one display unit is
//! `OCTAS_PER_UNIT` octas.

/// Number of octas in one display unit (10^8).
pub const OCTAS_PER_UNIT: u64 = 100_000_000;

/// Converts a raw octa count into a display amount.
#[must_use]
pub fn raw_to_amount(raw: u64) -> f64 {
    raw as f64 / OCTAS_PER_UNIT as f64
}

/// Formats a raw octa count with all eight decimals, using integer arithmetic
/// so large balances do not lose precision.
#[must_use]
pub fn format_amount(raw: u64) -> String {
    format!("{}.{:08}", raw / OCTAS_PER_UNIT, raw % OCTAS_PER_UNIT)
}

/// Parses the decimal integer string a view function returns for a balance.
pub fn parse_raw_amount(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}
