//! Checked fixed-point helpers.
//!
//! Amounts are `u128` but products of an amount and a decimal scale can exceed
//! it, so every `a * b / c` goes through a 256-bit intermediate. Each helper
//! names its rounding direction; results that do not fit an amount are
//! [`AuctionError::ArithmeticOverflow`].

use auction_types::{Amount, ONE_HUNDRED_PERCENT};
use ruint::aliases::U256;

use crate::error::AuctionError;

/// `a * b / c`, rounded down.
pub fn mul_div_down(a: Amount, b: Amount, c: Amount) -> Result<Amount, AuctionError> {
    let (quotient, _) = mul_div_rem(a, b, c)?;
    to_amount(quotient)
}

/// `a * b / c`, rounded up.
pub fn mul_div_up(a: Amount, b: Amount, c: Amount) -> Result<Amount, AuctionError> {
    let (quotient, remainder) = mul_div_rem(a, b, c)?;
    let quotient = if remainder.is_zero() {
        quotient
    } else {
        quotient
            .checked_add(U256::from(1u8))
            .ok_or(AuctionError::ArithmeticOverflow)?
    };
    to_amount(quotient)
}

/// Apply a percentage (see [`ONE_HUNDRED_PERCENT`]), rounded down.
pub fn percent_down(amount: Amount, percent: u32) -> Result<Amount, AuctionError> {
    mul_div_down(
        amount,
        Amount::from(percent),
        Amount::from(ONE_HUNDRED_PERCENT),
    )
}

/// Apply a percentage (see [`ONE_HUNDRED_PERCENT`]), rounded up.
pub fn percent_up(amount: Amount, percent: u32) -> Result<Amount, AuctionError> {
    mul_div_up(
        amount,
        Amount::from(percent),
        Amount::from(ONE_HUNDRED_PERCENT),
    )
}

/// `10^decimals` as an amount.
pub fn scale(decimals: u8) -> Result<Amount, AuctionError> {
    10u128
        .checked_pow(u32::from(decimals))
        .ok_or(AuctionError::ArithmeticOverflow)
}

pub fn checked_add(a: Amount, b: Amount) -> Result<Amount, AuctionError> {
    a.checked_add(b).ok_or(AuctionError::ArithmeticOverflow)
}

pub fn checked_sub(a: Amount, b: Amount) -> Result<Amount, AuctionError> {
    a.checked_sub(b).ok_or(AuctionError::ArithmeticOverflow)
}

fn mul_div_rem(a: Amount, b: Amount, c: Amount) -> Result<(U256, U256), AuctionError> {
    if c == 0 {
        return Err(AuctionError::ArithmeticOverflow);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(AuctionError::ArithmeticOverflow)?;
    Ok(product.div_rem(U256::from(c)))
}

fn to_amount(value: U256) -> Result<Amount, AuctionError> {
    Amount::try_from(value).map_err(|_| AuctionError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_directions() {
        assert_eq!(mul_div_down(10, 1, 3).unwrap(), 3);
        assert_eq!(mul_div_up(10, 1, 3).unwrap(), 4);
        assert_eq!(mul_div_down(9, 1, 3).unwrap(), 3);
        assert_eq!(mul_div_up(9, 1, 3).unwrap(), 3);
    }

    #[test]
    fn test_wide_intermediate() {
        // 2^96 * 10^18 overflows u128 but the quotient fits.
        let a = (1u128 << 96) - 1;
        let s = scale(18).unwrap();
        assert_eq!(mul_div_down(a, s, s).unwrap(), a);
        assert_eq!(mul_div_up(a, s, s).unwrap(), a);
    }

    #[test]
    fn test_overflowing_result() {
        assert_eq!(
            mul_div_down(u128::MAX, 2, 1),
            Err(AuctionError::ArithmeticOverflow)
        );
        assert_eq!(mul_div_up(1, 1, 0), Err(AuctionError::ArithmeticOverflow));
        assert_eq!(checked_sub(1, 2), Err(AuctionError::ArithmeticOverflow));
    }

    #[test]
    fn test_percentages() {
        assert_eq!(percent_down(1_000, 1_000).unwrap(), 10);
        assert_eq!(percent_down(99, 1_000).unwrap(), 0);
        assert_eq!(percent_up(99, 1_000).unwrap(), 1);
        assert_eq!(percent_down(7, ONE_HUNDRED_PERCENT).unwrap(), 7);
    }

    #[test]
    fn test_scale() {
        assert_eq!(scale(0).unwrap(), 1);
        assert_eq!(scale(6).unwrap(), 1_000_000);
        assert_eq!(scale(38).unwrap(), 10u128.pow(38));
        assert_eq!(scale(39), Err(AuctionError::ArithmeticOverflow));
    }
}
