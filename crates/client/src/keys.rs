//! Auction key handling for sellers and key holders.

use rand::{CryptoRng, RngCore};

use auction_crypto::{decrypt, generate_keypair, recover_amount, CryptoError};
use auction_types::{compute_bid_salt, Amount, G1Point, Scalar};

use crate::bid::PreparedBid;

/// Generate a key pair for a new lot. The public key goes into the lot
/// parameters; the private key is revealed after the lot concludes.
pub fn generate_auction_keypair<R: RngCore + CryptoRng>(rng: &mut R) -> (Scalar, G1Point) {
    generate_keypair(rng)
}

/// Decrypt the sealed amount of a prepared bid with the auction private key.
pub fn open_bid(private_key: &Scalar, bid: &PreparedBid) -> Result<Amount, CryptoError> {
    let salt = compute_bid_salt(bid.lot_id, &bid.bidder, bid.amount);
    let message = decrypt(
        &bid.ciphertext,
        &bid.ephemeral_public_key,
        private_key,
        &salt,
    )?;
    Ok(recover_amount(&message))
}
