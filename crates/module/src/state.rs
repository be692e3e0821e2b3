//! Per-lot state held by the engine.

use std::collections::{BTreeMap, HashMap};

use auction_types::{Address, Amount, AuctionKeyState, Bid, BidId, EncryptedBid, Lot, LotId};

use crate::error::AuctionError;
use crate::math;
use crate::queue::DecryptedBidQueue;

/// Everything the engine knows about one lot.
///
/// All mutation of a lot goes through a single `&mut LotBook`, which the
/// auction house guards with one lock per lot.
#[derive(Debug)]
pub struct LotBook {
    pub lot: Lot,

    /// Public key, revealed key and decryption progress
    pub keys: AuctionKeyState,

    /// Bid records by id
    pub bids: BTreeMap<BidId, Bid>,

    /// Sealed payloads by bid id
    pub encrypted_bids: BTreeMap<BidId, EncryptedBid>,

    /// Decrypted bids awaiting settlement
    pub queue: DecryptedBidQueue,

    /// Quote-asset fees allocated by claims: recipient -> amount
    pub rewards: HashMap<Address, Amount>,
}

impl LotBook {
    pub fn new(lot: Lot, keys: AuctionKeyState) -> Self {
        Self {
            lot,
            keys,
            bids: BTreeMap::new(),
            encrypted_bids: BTreeMap::new(),
            queue: DecryptedBidQueue::new(),
            rewards: HashMap::new(),
        }
    }

    pub fn lot_id(&self) -> LotId {
        self.lot.lot_id
    }

    /// Get the next bid ID and increment.
    pub fn allocate_bid_id(&mut self) -> BidId {
        let id = self.keys.next_bid_id;
        self.keys.next_bid_id += 1;
        id
    }

    /// `10^base_decimals`.
    pub fn base_scale(&self) -> Result<Amount, AuctionError> {
        math::scale(self.lot.base_decimals)
    }

    /// Get bid by ID.
    pub fn get_bid(&self, bid_id: BidId) -> Result<&Bid, AuctionError> {
        self.bids.get(&bid_id).ok_or(AuctionError::InvalidBid {
            lot_id: self.lot.lot_id,
            bid_id,
            reason: "unknown bid",
        })
    }

    /// Get mutable bid by ID.
    pub fn get_bid_mut(&mut self, bid_id: BidId) -> Result<&mut Bid, AuctionError> {
        let lot_id = self.lot.lot_id;
        self.bids.get_mut(&bid_id).ok_or(AuctionError::InvalidBid {
            lot_id,
            bid_id,
            reason: "unknown bid",
        })
    }

    /// Remove a bid from the decryption list. Order is not preserved.
    pub fn remove_pending(&mut self, bid_id: BidId) -> bool {
        match self.keys.bid_ids.iter().position(|id| *id == bid_id) {
            Some(index) => {
                self.keys.bid_ids.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Credit a fee to a recipient.
    pub fn allocate_reward(
        &mut self,
        recipient: Address,
        amount: Amount,
    ) -> Result<(), AuctionError> {
        if amount == 0 {
            return Ok(());
        }
        let reward = self.rewards.entry(recipient).or_insert(0);
        *reward = math::checked_add(*reward, amount)?;
        Ok(())
    }

    /// Get fees allocated to a recipient.
    pub fn get_reward(&self, recipient: &Address) -> Amount {
        self.rewards.get(recipient).copied().unwrap_or(0)
    }

    /// Build an [`AuctionError::InvalidLotState`] for this lot.
    pub fn invalid_state(&self, reason: &'static str) -> AuctionError {
        AuctionError::InvalidLotState {
            lot_id: self.lot.lot_id,
            status: self.lot.status,
            reason,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use auction_types::{BidStatus, FeeSchedule, G1Point, LotStatus};

    pub(crate) fn test_lot(lot_id: LotId) -> Lot {
        Lot {
            lot_id,
            seller: [1u8; 32],
            start: 100,
            conclusion: 200,
            capacity: 10,
            min_price: 1,
            min_filled: 0,
            min_bid_size: 1,
            base_decimals: 0,
            quote_decimals: 0,
            status: LotStatus::Created,
            fees: FeeSchedule {
                protocol: [9u8; 32],
                protocol_fee: 0,
                referrer_fee: 0,
                max_referrer_fee: 0,
            },
            curation: None,
            curator_fee_escrow: 0,
            sold: 0,
            purchased: 0,
        }
    }

    fn test_book() -> LotBook {
        LotBook::new(test_lot(1), AuctionKeyState::new(G1Point::default()))
    }

    #[test]
    fn test_allocate_bid_id() {
        let mut book = test_book();
        assert_eq!(book.allocate_bid_id(), 1);
        assert_eq!(book.allocate_bid_id(), 2);
        assert_eq!(book.allocate_bid_id(), 3);
    }

    #[test]
    fn test_remove_pending_swaps_last() {
        let mut book = test_book();
        book.keys.bid_ids = vec![1, 2, 3, 4];

        assert!(book.remove_pending(2));
        assert_eq!(book.keys.bid_ids, vec![1, 4, 3]);
        assert!(!book.remove_pending(2));
    }

    #[test]
    fn test_unknown_bid() {
        let mut book = test_book();
        assert!(matches!(
            book.get_bid(5),
            Err(AuctionError::InvalidBid { bid_id: 5, .. })
        ));

        book.bids.insert(
            5,
            Bid {
                bidder: [2u8; 32],
                amount: 10,
                amount_out: 0,
                referrer: None,
                status: BidStatus::Submitted,
            },
        );
        book.get_bid_mut(5).unwrap().status = BidStatus::Refunded;
        assert_eq!(book.get_bid(5).unwrap().status, BidStatus::Refunded);
    }

    #[test]
    fn test_reward_accumulates() {
        let mut book = test_book();
        let addr = [4u8; 32];
        assert_eq!(book.get_reward(&addr), 0);

        book.allocate_reward(addr, 5).unwrap();
        book.allocate_reward(addr, 0).unwrap();
        book.allocate_reward(addr, 7).unwrap();
        assert_eq!(book.get_reward(&addr), 12);
    }
}
