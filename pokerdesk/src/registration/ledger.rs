//! Stack ledger: chip arithmetic for bonuses, rebuys and add-ons.
//!
//! These functions only add numbers. Whether an adjustment is allowed is the
//! caller's decision.

use crate::tournament::{RebuyConfig, TournamentError, TournamentResult};

/// Largest count a registration field can hold; counts are stored as `INTEGER`
pub const MAX_COUNT: u32 = i32::MAX as u32;

/// New stack after a signed chip adjustment
pub fn apply_adjustment(current_stack: i64, delta: i64) -> i64 {
    current_stack.saturating_add(delta)
}

fn rebuy_total(
    single: u32,
    single_amount: i64,
    double: u32,
    double_amount: i64,
) -> TournamentResult<i64> {
    i64::from(single)
        .checked_mul(single_amount)
        .zip(i64::from(double).checked_mul(double_amount))
        .and_then(|(s, d)| s.checked_add(d))
        .ok_or_else(|| TournamentError::InvalidInput("rebuy total is too large".to_string()))
}

/// Chips granted by the given number of single and double rebuys
///
/// # Errors
///
/// * `TournamentError::InvalidInput` - The total does not fit in an `i64`
pub fn rebuy_stack(rebuy: &RebuyConfig, single: u32, double: u32) -> TournamentResult<i64> {
    rebuy_total(single, rebuy.single.stack, double, rebuy.double.stack)
}

/// Money owed for the given number of single and double rebuys
///
/// # Errors
///
/// * `TournamentError::InvalidInput` - The total does not fit in an `i64`
pub fn rebuy_cost(rebuy: &RebuyConfig, single: u32, double: u32) -> TournamentResult<i64> {
    rebuy_total(single, rebuy.single.price, double, rebuy.double.price)
}

/// Stack delta when correcting rebuy counts from `old` to `new`
///
/// Counts are `(single, double)` pairs.
///
/// # Errors
///
/// * `TournamentError::InvalidInput` - A count exceeds [`MAX_COUNT`] or the delta overflows
pub fn rebuy_count_delta(
    rebuy: &RebuyConfig,
    old: (u32, u32),
    new: (u32, u32),
) -> TournamentResult<i64> {
    if new.0 > MAX_COUNT || new.1 > MAX_COUNT {
        return Err(TournamentError::InvalidInput(
            "rebuy count is too large".to_string(),
        ));
    }
    rebuy_stack(rebuy, new.0, new.1)?
        .checked_sub(rebuy_stack(rebuy, old.0, old.1)?)
        .ok_or_else(|| TournamentError::InvalidInput("rebuy total is too large".to_string()))
}

/// Count after one more rebuy of a tier
///
/// # Errors
///
/// * `TournamentError::InvalidInput` - The count would exceed [`MAX_COUNT`]
pub fn increment_rebuys(count: u32) -> TournamentResult<u32> {
    count
        .checked_add(1)
        .filter(|c| *c <= MAX_COUNT)
        .ok_or_else(|| TournamentError::InvalidInput("rebuy count is too large".to_string()))
}
