//! Mathematical Utilities for Glue Protocol
//!
//! Overflow-checked multiply-then-divide with an explicit rounding
//! direction. Products are taken in `u128`, so any `u64 * u64` is exact
//! before the division.

use crate::constants::fees;
use crate::errors::{GlueError, GlueResult};

/// Rounding direction of a division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero; used for anything the protocol pays out
    Down,
    /// Away from zero; used for anything the protocol collects
    Up,
}

/// Calculate `a * b / denominator` with the given rounding
///
/// # Errors
/// * `DivisionByZero` if `denominator == 0`
/// * `Overflow` if the result does not fit in `u64`
pub fn mul_div(a: u64, b: u64, denominator: u64, rounding: Rounding) -> GlueResult<u64> {
    if denominator == 0 {
        return Err(GlueError::DivisionByZero);
    }

    let product = (a as u128) * (b as u128);
    let denominator = denominator as u128;
    let mut quotient = product / denominator;

    if rounding == Rounding::Up && product % denominator != 0 {
        quotient += 1;
    }

    u64::try_from(quotient).map_err(|_| GlueError::Overflow)
}

/// Calculate the share of a reserve owed for burning `burned` out of `supply`
///
/// share = floor(reserve * burned / supply)
///
/// Never rounds up: the protocol must not pay out more than is backed.
pub fn proportional_share(reserve: u64, burned: u64, supply: u64) -> GlueResult<u64> {
    mul_div(reserve, burned, supply, Rounding::Down)
}

/// Calculate a basis-point fee, rounded up
///
/// fee = ceil(amount * fee_bps / 10000)
pub fn fee_from_bps(amount: u64, fee_bps: u64) -> GlueResult<u64> {
    mul_div(amount, fee_bps, fees::BPS_DENOMINATOR, Rounding::Up)
}

/// Safe addition with overflow check
pub fn safe_add(a: u64, b: u64) -> GlueResult<u64> {
    a.checked_add(b).ok_or(GlueError::Overflow)
}
