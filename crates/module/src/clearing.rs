//! Marginal price computation.
//!
//! Bids are consumed from the queue in rank order while their price is at or
//! above the lot's minimum price. After each bid the capacity that the running
//! total would buy at that bid's price is recomputed; the first bid that
//! reaches capacity sets the clearing price. If the queue runs out or drops
//! below the floor first, the last consumed price clears whatever was bid.
//!
//! One refinement keeps the partial fill well defined. When a lower price is
//! reached and the bids already consumed would fill the lot at that price on
//! their own, the incoming bid cannot win anything. The price is then set so
//! that the consumed bids buy exactly the capacity, but never below the
//! incoming bid's price, and the last consumed bid becomes the marginal bid.

use auction_types::{Amount, BidId};

use crate::error::AuctionError;
use crate::math;
use crate::queue::DecryptedBidQueue;

/// Result of a clearing scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClearingOutcome {
    /// Uniform price per whole base unit; `None` when no bid reached the floor
    pub marginal_price: Option<Amount>,
    /// Last bid consumed by the scan. Bids ranked after it lose.
    pub marginal_bid_id: Option<BidId>,
    /// Sum of quote amounts of consumed bids
    pub total_in: Amount,
    /// Base units the consumed bids buy at the marginal price, rounded up
    pub capacity_expended: Amount,
    /// Marginal bid that only partially fits in the capacity
    pub partial_fill_bid_id: Option<BidId>,
}

impl ClearingOutcome {
    /// Base units actually sold.
    pub fn sold(&self, capacity: Amount) -> Amount {
        self.capacity_expended.min(capacity)
    }

    /// Whether the lot clears: a price at or above the floor and enough filled.
    pub fn clears(&self, min_price: Amount, min_filled: Amount, capacity: Amount) -> bool {
        match self.marginal_price {
            Some(price) => price >= min_price && self.sold(capacity) >= min_filled,
            None => false,
        }
    }
}

/// Consume the queue and compute the clearing outcome.
pub fn compute_marginal_price(
    mut queue: DecryptedBidQueue,
    capacity: Amount,
    min_price: Amount,
    base_scale: Amount,
) -> Result<ClearingOutcome, AuctionError> {
    let mut outcome = ClearingOutcome::default();

    while let Some(bid) = queue.pop_max() {
        if bid.price < min_price {
            break;
        }

        if let Some(last_price) = outcome.marginal_price {
            if bid.price != last_price {
                let filled_at_price = math::mul_div_up(outcome.total_in, base_scale, bid.price)?;
                if filled_at_price >= capacity {
                    let price =
                        math::mul_div_up(outcome.total_in, base_scale, capacity)?.max(bid.price);
                    outcome.marginal_price = Some(price);
                    outcome.capacity_expended =
                        math::mul_div_up(outcome.total_in, base_scale, price)?;
                    return Ok(outcome);
                }
            }
        }

        outcome.total_in = math::checked_add(outcome.total_in, bid.amount_in)?;
        outcome.capacity_expended = math::mul_div_up(outcome.total_in, base_scale, bid.price)?;
        outcome.marginal_price = Some(bid.price);
        outcome.marginal_bid_id = Some(bid.bid_id);

        if outcome.capacity_expended >= capacity {
            if outcome.capacity_expended > capacity {
                outcome.partial_fill_bid_id = Some(bid.bid_id);
            }
            break;
        }
    }

    Ok(outcome)
}
