//! Max-priority queue of decrypted bids.
//!
//! Entries are ranked by implied unit price (quote per whole base unit, rounded
//! up), highest first. Equal prices are ranked by bid id, lowest first, so the
//! earlier commitment wins ties. The claim resolver relies on exactly this
//! ordering through [`QueueBid::ranks_at_or_before`].

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use auction_types::{Amount, BidId};

use crate::error::AuctionError;
use crate::math;

/// A decrypted bid eligible for clearing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueBid {
    pub bid_id: BidId,
    pub amount_in: Amount,
    pub amount_out: Amount,
    pub price: Amount,
}

impl QueueBid {
    /// Build an entry, computing its price under `base_scale`.
    pub fn new(
        bid_id: BidId,
        amount_in: Amount,
        amount_out: Amount,
        base_scale: Amount,
    ) -> Result<Self, AuctionError> {
        Ok(Self {
            bid_id,
            amount_in,
            amount_out,
            price: implied_price(amount_in, amount_out, base_scale)?,
        })
    }

    /// Whether a bid with `price` and `bid_id` is popped no later than the cutoff bid.
    pub fn ranks_at_or_before(
        price: Amount,
        bid_id: BidId,
        cutoff_price: Amount,
        cutoff_id: BidId,
    ) -> bool {
        price > cutoff_price || (price == cutoff_price && bid_id <= cutoff_id)
    }
}

impl Ord for QueueBid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.price
            .cmp(&other.price)
            .then_with(|| other.bid_id.cmp(&self.bid_id))
    }
}

impl PartialOrd for QueueBid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Implied unit price of a bid, rounded up.
pub fn implied_price(
    amount_in: Amount,
    amount_out: Amount,
    base_scale: Amount,
) -> Result<Amount, AuctionError> {
    math::mul_div_up(amount_in, base_scale, amount_out)
}

/// Decrypted bids of a single lot, highest price first.
#[derive(Clone, Debug, Default)]
pub struct DecryptedBidQueue {
    heap: BinaryHeap<QueueBid>,
}

impl DecryptedBidQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bid: QueueBid) {
        self.heap.push(bid);
    }

    /// Remove and return the highest ranked bid.
    pub fn pop_max(&mut self) -> Option<QueueBid> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
