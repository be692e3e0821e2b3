//! ECIES primitives for sealed auction bids on BLS12-381 G1.
//!
//! # Overview
//!
//! 1. **Auction key**: the key holder publishes `PK = sk·G`. The point must be
//!    neither the identity nor the generator, since either implies a known `sk`.
//!
//! 2. **Encryption**: the bidder samples an ephemeral scalar `r`, publishes
//!    `R = r·G` with the bid, and derives a symmetric key from `r·PK` salted with
//!    the bid's `(lot, bidder, amount)`. The 32-byte message is XORed with it.
//!
//! 3. **Decryption**: after the auction concludes `sk` is revealed and anyone can
//!    recompute the shared point as `sk·R`.
//!
//! The message itself carries an additively blinded amount (see [`message`]).

pub mod ecies;
pub mod error;
pub mod message;

pub use ecies::{
    decrypt, derive_shared_secret, encrypt, encrypt_with_ephemeral, generate_keypair,
    is_valid_point, public_key_from_private, validate_auction_public_key,
};
pub use error::CryptoError;
pub use message::{blind_amount, recover_amount};
