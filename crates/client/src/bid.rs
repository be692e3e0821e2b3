//! Sealed bid construction.

use rand::{CryptoRng, RngCore};
use thiserror::Error;

use auction_crypto::{blind_amount, encrypt, validate_auction_public_key};
use auction_types::{
    compute_bid_salt, Address, Amount, Ciphertext, G1Point, LotId, MAX_AMOUNT,
};

/// Errors that can occur during bid creation.
#[derive(Debug, Error)]
pub enum BidError {
    #[error("Invalid auction public key")]
    InvalidPublicKey,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Bid amount exceeds maximum")]
    AmountTooLarge,

    #[error("Bid amount must be positive")]
    ZeroAmount,
}

/// A prepared bid ready for submission.
#[derive(Debug, Clone)]
pub struct PreparedBid {
    pub lot_id: LotId,
    pub bidder: Address,
    /// Quote amount committed in the clear
    pub amount: Amount,
    pub referrer: Option<Address>,
    /// Encrypted minimum base amount out
    pub ciphertext: Ciphertext,
    /// Ephemeral key to publish alongside the ciphertext
    pub ephemeral_public_key: G1Point,
    /// Minimum base amount out (keep secret until the lot concludes)
    pub amount_out: Amount,
}

/// Create a sealed bid for a lot.
///
/// # Arguments
/// * `public_key` - Auction public key of the lot
/// * `lot_id` - ID of the lot to bid in
/// * `bidder` - Address submitting the bid; bound into the encryption salt
/// * `amount` - Quote amount to escrow
/// * `amount_out` - Minimum base amount wanted in return, sealed
/// * `rng` - Cryptographically secure random number generator
pub fn create_bid<R: RngCore + CryptoRng>(
    public_key: &G1Point,
    lot_id: LotId,
    bidder: Address,
    amount: Amount,
    amount_out: Amount,
    rng: &mut R,
) -> Result<PreparedBid, BidError> {
    if amount == 0 || amount_out == 0 {
        return Err(BidError::ZeroAmount);
    }
    if amount > MAX_AMOUNT || amount_out > MAX_AMOUNT {
        return Err(BidError::AmountTooLarge);
    }
    validate_auction_public_key(public_key).map_err(|_| BidError::InvalidPublicKey)?;

    // Blind the amount with a fresh seed
    let mut seed = [0u8; 16];
    rng.fill_bytes(&mut seed);
    let message = blind_amount(amount_out, u128::from_be_bytes(seed));

    // Encrypt under a salt bound to the public bid fields
    let salt = compute_bid_salt(lot_id, &bidder, amount);
    let (ciphertext, ephemeral_public_key) = encrypt(&message, public_key, &salt, rng)
        .map_err(|e| BidError::EncryptionFailed(e.to_string()))?;

    Ok(PreparedBid {
        lot_id,
        bidder,
        amount,
        referrer: None,
        ciphertext,
        ephemeral_public_key,
        amount_out,
    })
}

/// Builder for creating bids with additional options.
pub struct BidBuilder {
    public_key: G1Point,
    lot_id: LotId,
    bidder: Address,
    amount: Amount,
    amount_out: Amount,
    referrer: Option<Address>,
}

impl BidBuilder {
    /// Create a new bid builder.
    pub fn new(public_key: G1Point, lot_id: LotId, bidder: Address) -> Self {
        Self {
            public_key,
            lot_id,
            bidder,
            amount: 0,
            amount_out: 0,
            referrer: None,
        }
    }

    /// Set the quote amount to escrow.
    pub fn amount(mut self, amount: Amount) -> Self {
        self.amount = amount;
        self
    }

    /// Set the minimum base amount out.
    pub fn amount_out(mut self, amount_out: Amount) -> Self {
        self.amount_out = amount_out;
        self
    }

    pub fn referrer(mut self, referrer: Address) -> Self {
        self.referrer = Some(referrer);
        self
    }

    /// Build the prepared bid.
    pub fn build<R: RngCore + CryptoRng>(self, rng: &mut R) -> Result<PreparedBid, BidError> {
        let mut bid = create_bid(
            &self.public_key,
            self.lot_id,
            self.bidder,
            self.amount,
            self.amount_out,
            rng,
        )?;
        bid.referrer = self.referrer;
        Ok(bid)
    }
}
