//! Query handlers for the auction module.
//!
//! These functions provide read-only access to lot state.

use auction_types::{
    Address, Amount, Bid, BidId, EncryptedBid, G1Point, Lot, LotId, LotStatus,
};
use serde::{Deserialize, Serialize};

use crate::error::AuctionError;
use crate::fees;
use crate::handlers::{self, HandlerResult};
use crate::math;
use crate::state::LotBook;

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Get lot details by ID.
    GetLot { lot_id: LotId },

    /// Get all lots (paginated, by id).
    ListLots { offset: u64, limit: u64 },

    /// Get a specific bid.
    GetBid { lot_id: LotId, bid_id: BidId },

    /// Get the key and decryption progress of a lot.
    GetKeySummary { lot_id: LotId },

    /// Get the next sealed bids in decryption order.
    GetNextBidsToDecrypt { lot_id: LotId, count: u64 },

    /// Get base capacity still for sale.
    GetRemainingCapacity { lot_id: LotId },

    /// Get the smallest quote amount a bid must commit.
    GetMinimumBidAmount { lot_id: LotId },

    /// Get fees allocated to a recipient.
    GetReward { lot_id: LotId, recipient: Address },

    /// Estimate the quote amount needed to receive `payout` base units.
    GetPriceFor {
        lot_id: LotId,
        payout: Amount,
        price: Option<Amount>,
    },

    /// Estimate the base units received for `amount` of quote.
    GetPayoutFor {
        lot_id: LotId,
        amount: Amount,
        price: Option<Amount>,
    },
}

impl AuctionQuery {
    /// Lot the query is about, if it targets a single lot.
    pub fn lot_id(&self) -> Option<LotId> {
        match self {
            AuctionQuery::ListLots { .. } => None,
            AuctionQuery::GetLot { lot_id }
            | AuctionQuery::GetBid { lot_id, .. }
            | AuctionQuery::GetKeySummary { lot_id }
            | AuctionQuery::GetNextBidsToDecrypt { lot_id, .. }
            | AuctionQuery::GetRemainingCapacity { lot_id }
            | AuctionQuery::GetMinimumBidAmount { lot_id }
            | AuctionQuery::GetReward { lot_id, .. }
            | AuctionQuery::GetPriceFor { lot_id, .. }
            | AuctionQuery::GetPayoutFor { lot_id, .. } => Some(*lot_id),
        }
    }
}

/// Query response types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    /// Lot details.
    Lot(Lot),

    /// List of lots.
    LotList(Vec<Lot>),

    /// Single bid.
    Bid(Bid),

    /// Key and decryption progress.
    KeySummary(KeySummary),

    /// Sealed bids with their ids.
    EncryptedBids(Vec<(BidId, EncryptedBid)>),

    /// An amount (capacity, minimum bid, reward or estimate).
    Amount(Amount),
}

/// Public view of a lot's key state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySummary {
    pub public_key: G1Point,
    /// Whether the private key has been revealed
    pub revealed: bool,
    pub next_decrypt_index: u64,
    pub pending_decryption: u64,
    pub marginal_price: Option<Amount>,
}

/// Handle a query against a single lot.
///
/// `ListLots` spans lots and is answered by the auction house; against one
/// book it lists just that lot.
pub fn handle_query(book: &LotBook, query: AuctionQuery) -> HandlerResult<AuctionQueryResponse> {
    let response = match query {
        AuctionQuery::GetLot { .. } => AuctionQueryResponse::Lot(book.lot.clone()),

        AuctionQuery::ListLots { .. } => AuctionQueryResponse::LotList(vec![book.lot.clone()]),

        AuctionQuery::GetBid { bid_id, .. } => {
            AuctionQueryResponse::Bid(book.get_bid(bid_id)?.clone())
        }

        AuctionQuery::GetKeySummary { .. } => AuctionQueryResponse::KeySummary(key_summary(book)),

        AuctionQuery::GetNextBidsToDecrypt { count, .. } => {
            AuctionQueryResponse::EncryptedBids(next_bids_to_decrypt(book, count as usize))
        }

        AuctionQuery::GetRemainingCapacity { .. } => {
            AuctionQueryResponse::Amount(remaining_capacity(book))
        }

        AuctionQuery::GetMinimumBidAmount { .. } => {
            AuctionQueryResponse::Amount(handlers::minimum_bid_amount(&book.lot)?)
        }

        AuctionQuery::GetReward { recipient, .. } => {
            AuctionQueryResponse::Amount(book.get_reward(&recipient))
        }

        AuctionQuery::GetPriceFor { payout, price, .. } => {
            AuctionQueryResponse::Amount(price_for(book, payout, price)?)
        }

        AuctionQuery::GetPayoutFor { amount, price, .. } => {
            AuctionQueryResponse::Amount(payout_for(book, amount, price)?)
        }
    };
    Ok(response)
}

pub fn key_summary(book: &LotBook) -> KeySummary {
    KeySummary {
        public_key: book.keys.public_key,
        revealed: book.keys.private_key.is_some(),
        next_decrypt_index: book.keys.next_decrypt_index as u64,
        pending_decryption: book.keys.pending_decryption() as u64,
        marginal_price: book.keys.marginal_price,
    }
}

/// The next `count` sealed bids after the decrypt cursor.
pub fn next_bids_to_decrypt(book: &LotBook, count: usize) -> Vec<(BidId, EncryptedBid)> {
    book.keys
        .bid_ids
        .iter()
        .skip(book.keys.next_decrypt_index)
        .take(count)
        .filter_map(|bid_id| {
            book.encrypted_bids
                .get(bid_id)
                .map(|encrypted| (*bid_id, encrypted.clone()))
        })
        .collect()
}

/// Base capacity still for sale. Zero once the lot is settled or cancelled.
pub fn remaining_capacity(book: &LotBook) -> Amount {
    match book.lot.status {
        LotStatus::Created | LotStatus::Decrypted => book.lot.capacity,
        LotStatus::Settled | LotStatus::Cancelled => 0,
    }
}

fn estimate_price(book: &LotBook, price: Option<Amount>) -> Amount {
    price
        .or(book.keys.marginal_price)
        .unwrap_or(book.lot.min_price)
}

/// Quote amount a bid must commit to receive at least `payout` base units at
/// `price`, assuming the maximum referrer fee. Rounded up.
///
/// `price` defaults to the marginal price of a settled lot, else the minimum price.
pub fn price_for(book: &LotBook, payout: Amount, price: Option<Amount>) -> HandlerResult<Amount> {
    let price = estimate_price(book, price);
    let net = math::mul_div_up(payout, price, book.base_scale()?)?;
    fees::gross_up(net, &book.lot.fees)
}

/// Base units `amount` of quote buys at `price` after the maximum fees. Rounded down.
///
/// `price` defaults to the marginal price of a settled lot, else the minimum price.
pub fn payout_for(book: &LotBook, amount: Amount, price: Option<Amount>) -> HandlerResult<Amount> {
    let price = estimate_price(book, price);
    if price == 0 {
        return Err(AuctionError::ArithmeticOverflow);
    }
    let net = math::checked_sub(amount, fees::max_fees(amount, &book.lot.fees)?)?;
    math::mul_div_down(net, book.base_scale()?, price)
}
