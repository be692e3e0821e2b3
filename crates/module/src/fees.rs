//! Fee arithmetic.
//!
//! Protocol and referrer fees are computed independently on the same quote
//! amount, each rounded down. Without a referrer the referrer share goes to the
//! protocol. Seller proceeds deduct the aggregate fee computed once on the total
//! with the combined rate; because each per-bid share rounds down, the shares
//! allocated at claim time never add up to more than that aggregate.

use auction_types::{Address, Amount, FeeSchedule, ONE_HUNDRED_PERCENT};

use crate::error::AuctionError;
use crate::math;

/// Fee shares taken from a single winning bid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeSplit {
    pub protocol: Amount,
    pub referrer: Amount,
}

impl FeeSplit {
    pub fn total(&self) -> Amount {
        self.protocol + self.referrer
    }
}

/// Split the fee owed on `amount`.
pub fn split_fees(
    amount: Amount,
    schedule: &FeeSchedule,
    referrer: Option<&Address>,
) -> Result<FeeSplit, AuctionError> {
    let protocol = math::percent_down(amount, schedule.protocol_fee)?;
    let referrer_share = math::percent_down(amount, schedule.referrer_fee)?;
    Ok(match referrer {
        Some(_) => FeeSplit {
            protocol,
            referrer: referrer_share,
        },
        None => FeeSplit {
            protocol: math::checked_add(protocol, referrer_share)?,
            referrer: 0,
        },
    })
}

/// Aggregate fee on the total quote amount taken in by a lot.
pub fn total_fees(total_in: Amount, schedule: &FeeSchedule) -> Result<Amount, AuctionError> {
    math::percent_down(total_in, combined(schedule.protocol_fee, schedule.referrer_fee))
}

/// Upper bound on the fee charged on `amount`, assuming the maximum referrer fee.
pub fn max_fees(amount: Amount, schedule: &FeeSchedule) -> Result<Amount, AuctionError> {
    math::percent_up(
        amount,
        combined(schedule.protocol_fee, schedule.max_referrer_fee),
    )
}

/// Gross amount whose net after maximum fees is at least `net`.
pub fn gross_up(net: Amount, schedule: &FeeSchedule) -> Result<Amount, AuctionError> {
    let rate = combined(schedule.protocol_fee, schedule.max_referrer_fee);
    if rate >= ONE_HUNDRED_PERCENT {
        return Err(AuctionError::ArithmeticOverflow);
    }
    math::mul_div_up(
        net,
        Amount::from(ONE_HUNDRED_PERCENT),
        Amount::from(ONE_HUNDRED_PERCENT - rate),
    )
}

fn combined(a: u32, b: u32) -> u32 {
    a.saturating_add(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(protocol_fee: u32, referrer_fee: u32) -> FeeSchedule {
        FeeSchedule {
            protocol: [9u8; 32],
            protocol_fee,
            referrer_fee,
            max_referrer_fee: 2_000,
        }
    }

    #[test]
    fn test_split_with_referrer() {
        let split = split_fees(10_000, &schedule(1_000, 500), Some(&[1u8; 32])).unwrap();
        assert_eq!(split.protocol, 100);
        assert_eq!(split.referrer, 50);
        assert_eq!(split.total(), 150);
    }

    #[test]
    fn test_split_without_referrer_goes_to_protocol() {
        let split = split_fees(10_000, &schedule(1_000, 500), None).unwrap();
        assert_eq!(split.protocol, 150);
        assert_eq!(split.referrer, 0);
    }

    #[test]
    fn test_shares_round_down_independently() {
        // 1% of 150 = 1.5 and 0.5% of 150 = 0.75.
        let split = split_fees(150, &schedule(1_000, 500), Some(&[1u8; 32])).unwrap();
        assert_eq!(split.protocol, 1);
        assert_eq!(split.referrer, 0);
        // The aggregate rate on the same amount is 2.25, so the shares never exceed it.
        assert_eq!(total_fees(150, &schedule(1_000, 500)).unwrap(), 2);
    }

    #[test]
    fn test_sum_of_shares_never_exceeds_aggregate() {
        let s = schedule(1_234, 567);
        let amounts: Vec<Amount> = (1..200).map(|i| i * 37 + 11).collect();
        let mut allocated = 0;
        for amount in &amounts {
            allocated += split_fees(*amount, &s, Some(&[1u8; 32])).unwrap().total();
        }
        let total: Amount = amounts.iter().sum();
        assert!(allocated <= total_fees(total, &s).unwrap());

        let mut allocated_no_ref = 0;
        for amount in &amounts {
            allocated_no_ref += split_fees(*amount, &s, None).unwrap().total();
        }
        assert!(allocated_no_ref <= total_fees(total, &s).unwrap());
    }

    #[test]
    fn test_estimates_are_conservative() {
        let s = schedule(1_000, 0);
        // 3% of 101 rounds up to 4.
        assert_eq!(max_fees(101, &s).unwrap(), 4);

        let gross = gross_up(97, &s).unwrap();
        assert_eq!(gross, 100);
        assert!(gross - max_fees(gross, &s).unwrap() >= 97);
    }
}
