//! Auction module error types.

use thiserror::Error;

use auction_crypto::CryptoError;
use auction_types::{BidId, LotId, LotStatus};

use crate::custody::CustodyError;

/// Errors that can occur in the auction module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Lot not found: {0}")]
    LotNotFound(LotId),

    /// The lot is in the wrong lifecycle stage for the operation.
    #[error("Invalid lot state for lot {lot_id} ({status:?}): {reason}")]
    InvalidLotState {
        lot_id: LotId,
        status: LotStatus,
        reason: &'static str,
    },

    /// Unknown bid, wrong owner or already resolved.
    #[error("Invalid bid {bid_id} in lot {lot_id}: {reason}")]
    InvalidBid {
        lot_id: LotId,
        bid_id: BidId,
        reason: &'static str,
    },

    #[error("Private key does not match the lot public key")]
    InvalidKey,

    #[error("Invalid auction public key: {0}")]
    InvalidPublicKey(CryptoError),

    #[error("Invalid ephemeral public key")]
    InvalidEphemeralKey,

    #[error("Invalid parameters: {0}")]
    InvalidParams(&'static str),

    #[error("Bid too small: need {required}, got {got}")]
    BidTooSmall { required: u128, got: u128 },

    #[error("Decrypted amount of bid {bid_id} in lot {lot_id} is out of range")]
    MalformedCiphertext { lot_id: LotId, bid_id: BidId },

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),
}
