//! The auction house: a registry of lots with one lock per lot.
//!
//! Calls on different lots never contend. The registry lock is held only to
//! look up or insert a lot. Decryption takes the lot lock twice, once to
//! snapshot a batch and once to apply it, and does the curve work in between.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use auction_types::{
    Address, Amount, BidClaim, BidId, BidStatus, Ciphertext, G1Point, Lot, LotId, LotParams,
    LotSettlement, Scalar,
};

use crate::call::{AuctionCall, CallOutcome};
use crate::config::{AuctionHouseConfig, ConfigError};
use crate::custody::Custody;
use crate::error::AuctionError;
use crate::handlers::{self, CallContext, DecryptBatch, DecryptReport, HandlerResult};
use crate::queries::{self, AuctionQuery, AuctionQueryResponse};
use crate::state::LotBook;

type SharedLot = Arc<Mutex<LotBook>>;

/// Runs any number of lots against one custody backend.
pub struct AuctionHouse<C> {
    config: AuctionHouseConfig,
    custody: Arc<C>,
    next_lot_id: AtomicU64,
    lots: RwLock<BTreeMap<LotId, SharedLot>>,
}

impl<C: Custody> AuctionHouse<C> {
    pub fn new(config: AuctionHouseConfig, custody: Arc<C>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            custody,
            next_lot_id: AtomicU64::new(1),
            lots: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn config(&self) -> &AuctionHouseConfig {
        &self.config
    }

    pub fn custody(&self) -> &Arc<C> {
        &self.custody
    }

    fn lot(&self, lot_id: LotId) -> HandlerResult<SharedLot> {
        self.lots
            .read()
            .get(&lot_id)
            .cloned()
            .ok_or(AuctionError::LotNotFound(lot_id))
    }

    /// Ids of all lots, ascending.
    pub fn lot_ids(&self) -> Vec<LotId> {
        self.lots.read().keys().copied().collect()
    }

    /// Snapshot of a lot.
    pub fn get_lot(&self, lot_id: LotId) -> HandlerResult<Lot> {
        Ok(self.lot(lot_id)?.lock().lot.clone())
    }

    /// Run `f` with the lot's book locked.
    pub fn with_lot<T>(&self, lot_id: LotId, f: impl FnOnce(&LotBook) -> T) -> HandlerResult<T> {
        let lot = self.lot(lot_id)?;
        let book = lot.lock();
        Ok(f(&book))
    }

    pub fn create_lot(&self, ctx: &CallContext, params: &LotParams) -> HandlerResult<LotId> {
        let lot_id = self.next_lot_id.fetch_add(1, Ordering::Relaxed);
        let book =
            handlers::handle_create_lot(&self.config, self.custody.as_ref(), ctx, lot_id, params)?;
        self.lots.write().insert(lot_id, Arc::new(Mutex::new(book)));
        Ok(lot_id)
    }

    pub fn cancel_lot(&self, ctx: &CallContext, lot_id: LotId) -> HandlerResult<()> {
        let lot = self.lot(lot_id)?;
        let mut book = lot.lock();
        handlers::handle_cancel_lot(&mut book, self.custody.as_ref(), ctx)
    }

    pub fn submit_bid(
        &self,
        ctx: &CallContext,
        lot_id: LotId,
        referrer: Option<Address>,
        amount: Amount,
        ciphertext: Ciphertext,
        ephemeral_public_key: G1Point,
    ) -> HandlerResult<BidId> {
        let lot = self.lot(lot_id)?;
        let mut book = lot.lock();
        handlers::handle_submit_bid(
            &mut book,
            self.custody.as_ref(),
            ctx,
            referrer,
            amount,
            ciphertext,
            ephemeral_public_key,
        )
    }

    pub fn refund_bid(
        &self,
        ctx: &CallContext,
        lot_id: LotId,
        bid_id: BidId,
    ) -> HandlerResult<Amount> {
        let lot = self.lot(lot_id)?;
        let mut book = lot.lock();
        handlers::handle_refund_bid(&mut book, self.custody.as_ref(), ctx, bid_id)
    }

    /// Reveal a lot's private key, then run the configured initial decrypt batch.
    ///
    /// The batch is prepared under the same lock that stores the key. If another
    /// caller advances decryption before it is applied, the reveal still
    /// succeeds and reports no batch.
    pub fn submit_private_key(
        &self,
        ctx: &CallContext,
        lot_id: LotId,
        private_key: Scalar,
    ) -> HandlerResult<Option<DecryptReport>> {
        let lot = self.lot(lot_id)?;
        let batch = {
            let mut book = lot.lock();
            handlers::handle_submit_private_key(&mut book, ctx, private_key, 0)?;
            let count = self.config.initial_decrypt_batch;
            if count == 0 || book.keys.pending_decryption() == 0 {
                return Ok(None);
            }
            handlers::prepare_decrypt_batch(&book, count)?
        };

        apply_initial_batch(&lot, &batch)
    }

    /// Decrypt and rank up to `count` bids without holding the lot lock during
    /// decryption.
    pub fn decrypt_and_sort_bids(
        &self,
        lot_id: LotId,
        count: usize,
    ) -> HandlerResult<DecryptReport> {
        let lot = self.lot(lot_id)?;
        let batch = handlers::prepare_decrypt_batch(&lot.lock(), count)?;
        decrypt_prepared(&lot, &batch)
    }

    pub fn settle(&self, ctx: &CallContext, lot_id: LotId) -> HandlerResult<LotSettlement> {
        let lot = self.lot(lot_id)?;
        let mut book = lot.lock();
        handlers::handle_settle(&mut book, self.custody.as_ref(), ctx)
    }

    pub fn abort(&self, ctx: &CallContext, lot_id: LotId) -> HandlerResult<LotSettlement> {
        let lot = self.lot(lot_id)?;
        let mut book = lot.lock();
        handlers::handle_abort(
            &mut book,
            self.custody.as_ref(),
            ctx,
            self.config.dedicated_settle_period,
        )
    }

    pub fn claim_bid(&self, lot_id: LotId, bid_id: BidId) -> HandlerResult<BidClaim> {
        let lot = self.lot(lot_id)?;
        let mut book = lot.lock();
        handlers::handle_claim_bid(&mut book, self.custody.as_ref(), bid_id)
    }

    /// Claim several bids of one lot. Every bid is checked before any is
    /// resolved, so one bad id fails the whole call.
    pub fn claim_bids(&self, lot_id: LotId, bid_ids: &[BidId]) -> HandlerResult<Vec<BidClaim>> {
        let lot = self.lot(lot_id)?;
        let mut book = lot.lock();

        let mut seen = HashSet::with_capacity(bid_ids.len());
        for bid_id in bid_ids {
            let bid = book.get_bid(*bid_id)?;
            let resolved = matches!(bid.status, BidStatus::Claimed | BidStatus::Refunded);
            if resolved || !seen.insert(*bid_id) {
                return Err(AuctionError::InvalidBid {
                    lot_id,
                    bid_id: *bid_id,
                    reason: "bid already resolved",
                });
            }
        }

        bid_ids
            .iter()
            .map(|bid_id| handlers::handle_claim_bid(&mut book, self.custody.as_ref(), *bid_id))
            .collect()
    }

    /// Answer a read-only query.
    pub fn query(&self, query: AuctionQuery) -> HandlerResult<AuctionQueryResponse> {
        match query.lot_id() {
            Some(lot_id) => {
                let lot = self.lot(lot_id)?;
                let book = lot.lock();
                queries::handle_query(&book, query)
            }
            None => {
                let AuctionQuery::ListLots { offset, limit } = query else {
                    return Err(AuctionError::InvalidParams("query needs a lot id"));
                };
                let lots: Vec<SharedLot> = self
                    .lots
                    .read()
                    .values()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .cloned()
                    .collect();
                Ok(AuctionQueryResponse::LotList(
                    lots.iter().map(|lot| lot.lock().lot.clone()).collect(),
                ))
            }
        }
    }

    /// Dispatch a call message.
    pub fn dispatch(&self, ctx: &CallContext, call: AuctionCall) -> HandlerResult<CallOutcome> {
        match call {
            AuctionCall::CreateLot { params } => {
                self.create_lot(ctx, &params).map(CallOutcome::LotCreated)
            }
            AuctionCall::CancelLot { lot_id } => {
                self.cancel_lot(ctx, lot_id).map(|()| CallOutcome::LotCancelled)
            }
            AuctionCall::SubmitBid {
                lot_id,
                referrer,
                amount,
                ciphertext,
                ephemeral_public_key,
            } => self
                .submit_bid(ctx, lot_id, referrer, amount, ciphertext, ephemeral_public_key)
                .map(CallOutcome::BidSubmitted),
            AuctionCall::RefundBid { lot_id, bid_id } => {
                self.refund_bid(ctx, lot_id, bid_id).map(CallOutcome::BidRefunded)
            }
            AuctionCall::SubmitPrivateKey {
                lot_id,
                private_key,
            } => self
                .submit_private_key(ctx, lot_id, private_key)
                .map(CallOutcome::KeySubmitted),
            AuctionCall::DecryptAndSortBids { lot_id, count } => self
                .decrypt_and_sort_bids(lot_id, count as usize)
                .map(CallOutcome::BidsDecrypted),
            AuctionCall::Settle { lot_id } => self.settle(ctx, lot_id).map(CallOutcome::Settled),
            AuctionCall::Abort { lot_id } => self.abort(ctx, lot_id).map(CallOutcome::Settled),
            AuctionCall::ClaimBids { lot_id, bid_ids } => {
                self.claim_bids(lot_id, &bid_ids).map(CallOutcome::Claimed)
            }
        }
    }
}

/// Decrypt the batch prepared with a key reveal. The key is already stored, so
/// a batch superseded by another caller reports nothing instead of failing.
fn apply_initial_batch(
    lot: &SharedLot,
    batch: &DecryptBatch,
) -> HandlerResult<Option<DecryptReport>> {
    match decrypt_prepared(lot, batch) {
        Ok(report) => Ok(Some(report)),
        Err(AuctionError::InvalidLotState { .. }) => {
            debug!(lot_id = batch.lot_id, "Initial decrypt batch superseded");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn decrypt_prepared(lot: &SharedLot, batch: &DecryptBatch) -> HandlerResult<DecryptReport> {
    debug!(
        lot_id = batch.lot_id,
        start = batch.start_index,
        bids = batch.items.len(),
        "Decrypting batch"
    );
    let results = handlers::decrypt_batch(batch);
    let mut book = lot.lock();
    handlers::apply_decrypt_batch(&mut book, batch, &results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::EscrowLedger;
    use auction_crypto::ecies;
    use auction_crypto::message::blind_amount;
    use auction_types::{compute_bid_salt, Asset, LotStatus};
    use rand::rngs::OsRng;

    const SELLER: Address = [1u8; 32];

    fn house() -> AuctionHouse<EscrowLedger> {
        let custody = Arc::new(EscrowLedger::new());
        custody.deposit(SELLER, Asset::Base, 1_000).unwrap();
        AuctionHouse::new(AuctionHouseConfig::default(), custody).unwrap()
    }

    fn params(public_key: G1Point) -> LotParams {
        LotParams {
            start: 0,
            duration: 3_600,
            capacity: 100,
            min_price: 1,
            min_fill_percent: 0,
            min_bid_percent: 1_000,
            base_decimals: 0,
            quote_decimals: 0,
            public_key,
            referrer_fee: 0,
            curation: None,
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = AuctionHouseConfig::default();
        config.min_auction_duration = 0;
        assert!(AuctionHouse::new(config, Arc::new(EscrowLedger::new())).is_err());
    }

    #[test]
    fn test_lot_ids_are_sequential() {
        let house = house();
        let (_, pk) = ecies::generate_keypair(&mut OsRng);
        let ctx = CallContext {
            sender: SELLER,
            timestamp: 10,
        };

        assert_eq!(house.create_lot(&ctx, &params(pk)).unwrap(), 1);
        assert_eq!(house.create_lot(&ctx, &params(pk)).unwrap(), 2);
        assert_eq!(house.lot_ids(), vec![1, 2]);
        assert_eq!(house.get_lot(2).unwrap().status, LotStatus::Created);
        assert_eq!(house.custody().held(1, Asset::Base), 100);
    }

    #[test]
    fn test_unknown_lot() {
        let house = house();
        assert_eq!(
            house.settle(
                &CallContext {
                    sender: SELLER,
                    timestamp: 0
                },
                7
            ),
            Err(AuctionError::LotNotFound(7))
        );
        assert!(matches!(
            house.query(AuctionQuery::GetLot { lot_id: 7 }),
            Err(AuctionError::LotNotFound(7))
        ));
    }

    #[test]
    fn test_list_lots_paginates() {
        let house = house();
        let (_, pk) = ecies::generate_keypair(&mut OsRng);
        let ctx = CallContext {
            sender: SELLER,
            timestamp: 10,
        };
        for _ in 0..3 {
            house.create_lot(&ctx, &params(pk)).unwrap();
        }

        match house.query(AuctionQuery::ListLots { offset: 1, limit: 5 }).unwrap() {
            AuctionQueryResponse::LotList(lots) => {
                let ids: Vec<LotId> = lots.iter().map(|lot| lot.lot_id).collect();
                assert_eq!(ids, vec![2, 3]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_key_reveal_succeeds_when_batch_is_superseded() {
        let custody = Arc::new(EscrowLedger::new());
        custody.deposit(SELLER, Asset::Base, 1_000).unwrap();
        let mut config = AuctionHouseConfig::default();
        config.initial_decrypt_batch = 2;
        let house = AuctionHouse::new(config, custody.clone()).unwrap();

        let (sk, pk) = ecies::generate_keypair(&mut OsRng);
        let open = CallContext {
            sender: SELLER,
            timestamp: 10,
        };
        let lot_id = house.create_lot(&open, &params(pk)).unwrap();
        for bidder in [[2u8; 32], [3u8; 32], [4u8; 32]] {
            custody.deposit(bidder, Asset::Quote, 50).unwrap();
            let salt = compute_bid_salt(lot_id, &bidder, 50);
            let (ciphertext, ephemeral) =
                ecies::encrypt(&blind_amount(25, 7), &pk, &salt, &mut OsRng).unwrap();
            let ctx = CallContext {
                sender: bidder,
                timestamp: 20,
            };
            house
                .submit_bid(&ctx, lot_id, None, 50, ciphertext, ephemeral)
                .unwrap();
        }

        // Key stored and initial batch prepared, then another caller finishes
        // decryption before the batch is applied.
        let lot = house.lot(lot_id).unwrap();
        let concluded = CallContext {
            sender: SELLER,
            timestamp: 3_610,
        };
        let batch = {
            let mut book = lot.lock();
            handlers::handle_submit_private_key(&mut book, &concluded, sk, 0).unwrap();
            handlers::prepare_decrypt_batch(&book, 2).unwrap()
        };
        let report = house.decrypt_and_sort_bids(lot_id, 10).unwrap();
        assert_eq!(report.remaining, 0);

        assert_eq!(apply_initial_batch(&lot, &batch), Ok(None));
        assert_eq!(house.get_lot(lot_id).unwrap().status, LotStatus::Decrypted);
        assert!(matches!(
            house.submit_private_key(&concluded, lot_id, sk),
            Err(AuctionError::InvalidLotState { .. })
        ));
    }
}
