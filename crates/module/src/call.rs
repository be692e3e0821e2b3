//! Call message types for the auction module.

use auction_types::{
    Address, Amount, BidClaim, BidId, Ciphertext, G1Point, LotId, LotParams, LotSettlement,
    Scalar,
};
use borsh::{BorshDeserialize, BorshSerialize};

use crate::handlers::DecryptReport;

/// Call messages for the auction module.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum AuctionCall {
    // === Lot Lifecycle ===
    /// Create a new lot, escrowing its capacity from the sender.
    CreateLot { params: LotParams },

    /// Cancel a lot before it starts (seller only).
    CancelLot { lot_id: LotId },

    // === Bidding ===
    /// Submit a sealed bid, escrowing `amount` of quote.
    SubmitBid {
        lot_id: LotId,
        referrer: Option<Address>,
        amount: Amount,
        ciphertext: Ciphertext,
        ephemeral_public_key: G1Point,
    },

    /// Withdraw a sealed bid while the lot is live.
    RefundBid { lot_id: LotId, bid_id: BidId },

    // === Decryption ===
    /// Reveal the lot's private key after conclusion (anyone).
    SubmitPrivateKey { lot_id: LotId, private_key: Scalar },

    /// Decrypt and rank up to `count` bids (anyone).
    DecryptAndSortBids { lot_id: LotId, count: u64 },

    // === Settlement ===
    /// Compute the marginal price and pay the seller (anyone).
    Settle { lot_id: LotId },

    /// Close a lot that was not settled within the dedicated settle period (anyone).
    Abort { lot_id: LotId },

    /// Resolve bids of a settled lot (anyone; proceeds go to the bidders).
    ClaimBids { lot_id: LotId, bid_ids: Vec<BidId> },
}

/// Result of a dispatched call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    LotCreated(LotId),
    LotCancelled,
    BidSubmitted(BidId),
    BidRefunded(Amount),
    /// Key accepted; holds the initial decrypt batch if one ran
    KeySubmitted(Option<DecryptReport>),
    BidsDecrypted(DecryptReport),
    Settled(LotSettlement),
    Claimed(Vec<BidClaim>),
}
