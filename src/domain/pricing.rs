//! Client-side storage cost estimation.

use super::types::CostEstimate;

/// Default storage price in USD per GB per month.
pub const DEFAULT_RATE_PER_GB_MONTH: f64 = 0.05;

/// Bytes in one GB for pricing purposes (binary gigabyte).
pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Estimates the cost of keeping `size_bytes` stored for `months`.
#[must_use]
pub fn estimate_storage_cost(size_bytes: u64, months: u32, rate_per_gb_month: f64) -> CostEstimate {
    let size_gb = size_bytes as f64 / BYTES_PER_GB as f64;
    CostEstimate {
        size_bytes,
        size_gb,
        months,
        rate_per_gb_month,
        total: size_gb * rate_per_gb_month * f64::from(months),
    }
}
