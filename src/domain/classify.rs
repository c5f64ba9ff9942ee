//! Transaction category inference from the invoked entry function name.

use super::types::TransactionCategory;

/// Maps an entry function name to a category.
///
/// Matching is by substring and checked in order, so a blob registration is
/// reported as an upload even if its module name also mentions a transfer.
#[must_use]
pub fn classify_function(function: Option<&str>) -> TransactionCategory {
    let Some(function) = function else {
        return TransactionCategory::Unknown;
    };

    if function.contains("register_blob") {
        TransactionCategory::Upload
    } else if function.contains("transfer") {
        TransactionCategory::Transfer
    } else if function.contains("mint") {
        TransactionCategory::Mint
    } else if function.contains("faucet") {
        TransactionCategory::Faucet
    } else {
        TransactionCategory::Other
    }
}
