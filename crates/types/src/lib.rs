//! Core type definitions for sealed-bid batch auctions.
//!
//! This crate provides the shared data structures used across the auction system:
//! curve encodings, lot and bid records, fee schedules and settlement results.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

// =========================
// CRYPTOGRAPHIC PRIMITIVES
// =========================

/// Compressed G1 point on BLS12-381 (48 bytes)
#[serde_as]
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct G1Point(#[serde_as(as = "[_; 48]")] pub [u8; 48]);

impl Default for G1Point {
    fn default() -> Self {
        Self([0u8; 48])
    }
}

/// Scalar field element (32 bytes, little-endian)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Scalar(pub [u8; 32]);

impl Default for Scalar {
    fn default() -> Self {
        Self([0u8; 32])
    }
}

/// Width of an encrypted bid message: 16-byte seed followed by the 16-byte blinded amount.
pub const BID_MESSAGE_LEN: usize = 32;

/// Encrypted bid payload.
pub type Ciphertext = [u8; BID_MESSAGE_LEN];

// =========================
// AMOUNTS AND PERCENTAGES
// =========================

/// Token amount in the smallest unit of its asset.
pub type Amount = u128;

/// Largest amount the engine accepts for a bid or a lot (2^96 - 1).
pub const MAX_AMOUNT: Amount = (1 << 96) - 1;

/// Percentages are expressed with three decimals: 100_000 is 100%.
pub const ONE_HUNDRED_PERCENT: u32 = 100_000;

/// Largest supported decimals for either asset of a lot.
pub const MAX_DECIMALS: u8 = 18;

// =========================
// AUCTION TYPES
// =========================

/// Generic address type (32 bytes)
pub type Address = [u8; 32];

/// Lot identifier.
pub type LotId = u64;

/// Bid identifier, unique within a lot. The first bid of a lot gets id 1.
pub type BidId = u64;

/// The two assets of a lot.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum Asset {
    /// The asset being sold; capacity is denominated in it.
    Base,
    /// The asset bids are paid in.
    Quote,
}

/// Lot lifecycle status
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum LotStatus {
    /// Accepting bids, or concluded and waiting for the key / decryption
    Created,
    /// All bids decrypted and ranked, awaiting settlement
    Decrypted,
    /// Settled, cleared or not
    Settled,
    /// Cancelled by the seller before it started
    Cancelled,
}

/// Per-bid lifecycle status
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum BidStatus {
    Submitted,
    Decrypted,
    Claimed,
    Refunded,
}

/// Fee schedule snapshotted into a lot at creation.
///
/// Fees are charged on the quote amount paid by winning bids and are deducted
/// from the seller's proceeds.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct FeeSchedule {
    /// Recipient of the protocol fee, and of the referrer fee when no referrer is set
    pub protocol: Address,
    pub protocol_fee: u32,
    /// Referrer fee chosen by the seller for this lot
    pub referrer_fee: u32,
    /// Largest referrer fee any lot may use; used for conservative estimates
    pub max_referrer_fee: u32,
}

/// Curator of a lot and the fee it earns, paid in the base asset.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Curation {
    pub curator: Address,
    pub fee: u32,
}

/// Parameters supplied by the seller when creating a lot.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct LotParams {
    /// Start timestamp; zero starts the lot immediately
    pub start: u64,
    pub duration: u64,
    /// Amount of the base asset for sale
    pub capacity: Amount,
    /// Floor price: quote units per whole base unit
    pub min_price: Amount,
    /// Minimum filled fraction of capacity for the lot to clear
    pub min_fill_percent: u32,
    /// Minimum bid size as a fraction of capacity
    pub min_bid_percent: u32,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    /// Public key bids are encrypted to
    pub public_key: G1Point,
    pub referrer_fee: u32,
    pub curation: Option<Curation>,
}

/// A lot as stored by the engine.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Lot {
    pub lot_id: LotId,
    pub seller: Address,
    pub start: u64,
    pub conclusion: u64,
    pub capacity: Amount,
    pub min_price: Amount,
    pub min_filled: Amount,
    pub min_bid_size: Amount,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub status: LotStatus,
    pub fees: FeeSchedule,
    pub curation: Option<Curation>,
    /// Curator fee escrowed from the seller at creation
    pub curator_fee_escrow: Amount,
    /// Base amount sold at settlement
    pub sold: Amount,
    /// Quote amount taken in at settlement
    pub purchased: Amount,
}

impl Lot {
    /// Whether bidding has opened.
    pub fn has_started(&self, now: u64) -> bool {
        now >= self.start
    }

    /// Whether the bidding window has closed.
    pub fn has_concluded(&self, now: u64) -> bool {
        now >= self.conclusion
    }

    /// Whether bids are accepted at `now`.
    pub fn is_live(&self, now: u64) -> bool {
        self.status == LotStatus::Created && self.has_started(now) && !self.has_concluded(now)
    }
}

/// Key and decryption progress for a lot.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct AuctionKeyState {
    pub public_key: G1Point,
    /// Revealed private key; set once after conclusion
    pub private_key: Option<Scalar>,
    pub next_bid_id: BidId,
    pub next_decrypt_index: usize,
    /// Clearing price, set only when the lot clears
    pub marginal_price: Option<Amount>,
    /// Last bid consumed by the clearing scan; decides ties at the marginal price
    pub marginal_bid_id: Option<BidId>,
    /// Bids awaiting decryption, in submission order except for refund swaps
    pub bid_ids: Vec<BidId>,
}

impl AuctionKeyState {
    pub fn new(public_key: G1Point) -> Self {
        Self {
            public_key,
            private_key: None,
            next_bid_id: 1,
            next_decrypt_index: 0,
            marginal_price: None,
            marginal_bid_id: None,
            bid_ids: Vec::new(),
        }
    }

    /// Number of bids still waiting for decryption.
    pub fn pending_decryption(&self) -> usize {
        self.bid_ids.len().saturating_sub(self.next_decrypt_index)
    }
}

/// A bid record. `amount_out` stays zero until decrypted.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Bid {
    pub bidder: Address,
    /// Committed quote amount
    pub amount: Amount,
    /// Decrypted minimum base amount out
    pub amount_out: Amount,
    pub referrer: Option<Address>,
    pub status: BidStatus,
}

/// Ciphertext and ephemeral key of a sealed bid.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct EncryptedBid {
    pub ciphertext: Ciphertext,
    pub ephemeral_public_key: G1Point,
}

/// Bid resolved during settlement because it overflowed capacity.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct PartialFill {
    pub bid_id: BidId,
    /// Base amount paid out
    pub payout: Amount,
    /// Quote amount refunded
    pub refund: Amount,
}

/// Outcome of settling a lot.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct LotSettlement {
    pub lot_id: LotId,
    pub cleared: bool,
    pub marginal_price: Option<Amount>,
    /// Quote amount taken in from winning bids, net of the partial refund
    pub total_in: Amount,
    /// Base amount allocated to winning bids
    pub sold: Amount,
    pub partial_fill: Option<PartialFill>,
    /// Base amount returned to the seller
    pub unsold: Amount,
    /// Quote amount paid to the seller after fees
    pub proceeds: Amount,
    pub curator_fee: Amount,
}

/// Outcome of claiming a single bid.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct BidClaim {
    pub bid_id: BidId,
    pub bidder: Address,
    /// Quote amount spent by the bid
    pub paid: Amount,
    /// Base amount delivered
    pub payout: Amount,
    /// Quote amount refunded
    pub refund: Amount,
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Compute the salt that binds a bid's symmetric key to its lot, bidder and amount.
pub fn compute_bid_salt(lot_id: LotId, bidder: &Address, amount: Amount) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"EMPA_BID_SALT_V1:");
    hasher.update(lot_id.to_be_bytes());
    hasher.update(bidder);
    hasher.update(amount.to_be_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_bid_salt() {
        let bidder = [7u8; 32];
        let salt1 = compute_bid_salt(1, &bidder, 100);
        let salt2 = compute_bid_salt(2, &bidder, 100);
        let salt3 = compute_bid_salt(1, &[8u8; 32], 100);
        let salt4 = compute_bid_salt(1, &bidder, 101);

        assert_ne!(salt1, salt2);
        assert_ne!(salt1, salt3);
        assert_ne!(salt1, salt4);
        assert_eq!(salt1, compute_bid_salt(1, &bidder, 100));
    }

    #[test]
    fn test_g1_point_serialization() {
        let point = G1Point([42u8; 48]);
        let encoded = borsh::to_vec(&point).unwrap();
        let decoded: G1Point = borsh::from_slice(&encoded).unwrap();
        assert_eq!(point, decoded);

        let json = serde_json::to_string(&point).unwrap();
        let decoded: G1Point = serde_json::from_str(&json).unwrap();
        assert_eq!(point, decoded);
    }

    #[test]
    fn test_lot_window() {
        let lot = Lot {
            lot_id: 1,
            seller: [1u8; 32],
            start: 100,
            conclusion: 200,
            capacity: 10,
            min_price: 1,
            min_filled: 0,
            min_bid_size: 0,
            base_decimals: 0,
            quote_decimals: 0,
            status: LotStatus::Created,
            fees: FeeSchedule {
                protocol: [0u8; 32],
                protocol_fee: 0,
                referrer_fee: 0,
                max_referrer_fee: 0,
            },
            curation: None,
            curator_fee_escrow: 0,
            sold: 0,
            purchased: 0,
        };

        assert!(!lot.is_live(99));
        assert!(lot.is_live(100));
        assert!(lot.is_live(199));
        assert!(!lot.is_live(200));
        assert!(lot.has_concluded(200));
    }

    #[test]
    fn test_key_state_pending() {
        let mut keys = AuctionKeyState::new(G1Point::default());
        assert_eq!(keys.next_bid_id, 1);
        keys.bid_ids = vec![1, 2, 3];
        keys.next_decrypt_index = 1;
        assert_eq!(keys.pending_decryption(), 2);
    }

    #[test]
    fn test_max_amount_is_96_bits() {
        assert_eq!(MAX_AMOUNT + 1, 1u128 << 96);
        assert_eq!(MAX_AMOUNT.count_ones(), 96);
    }
}
