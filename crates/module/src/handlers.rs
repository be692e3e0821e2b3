//! Call handlers for the auction module.
//!
//! These functions implement the business logic for each call type. Each one
//! operates on a single [`LotBook`]; the auction house is responsible for
//! locking and for routing calls to the right lot.

use tracing::{debug, info, warn};

use auction_crypto::ecies;
use auction_crypto::message::recover_amount;
use auction_types::{
    compute_bid_salt, Address, Amount, Asset, AuctionKeyState, Bid, BidClaim, BidId, BidStatus,
    Ciphertext, EncryptedBid, G1Point, Lot, LotId, LotParams, LotSettlement, LotStatus,
    PartialFill, Scalar, MAX_AMOUNT, MAX_DECIMALS, ONE_HUNDRED_PERCENT,
};

use crate::clearing;
use crate::config::AuctionHouseConfig;
use crate::custody::Custody;
use crate::error::AuctionError;
use crate::fees;
use crate::math;
use crate::queue::{self, QueueBid};
use crate::state::LotBook;

/// Context provided by the runtime for each call.
#[derive(Clone, Copy, Debug)]
pub struct CallContext {
    /// Sender of the call
    pub sender: Address,
    /// Current timestamp in seconds
    pub timestamp: u64,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, AuctionError>;

/// Handle CreateLot call.
///
/// Validates the parameters, escrows the capacity and any curator fee from the
/// seller, and returns the new lot's book.
pub fn handle_create_lot<C: Custody + ?Sized>(
    config: &AuctionHouseConfig,
    custody: &C,
    ctx: &CallContext,
    lot_id: LotId,
    params: &LotParams,
) -> HandlerResult<LotBook> {
    // Validate timing
    let start = if params.start == 0 {
        ctx.timestamp
    } else {
        params.start
    };
    if start < ctx.timestamp {
        return Err(AuctionError::InvalidParams("start is in the past"));
    }
    if params.duration < config.min_auction_duration {
        return Err(AuctionError::InvalidParams("duration is too short"));
    }
    let conclusion = start
        .checked_add(params.duration)
        .ok_or(AuctionError::InvalidParams("conclusion overflows"))?;

    // Validate amounts
    if params.capacity == 0 || params.capacity > MAX_AMOUNT {
        return Err(AuctionError::InvalidParams("capacity out of range"));
    }
    if params.min_price == 0 || params.min_price > MAX_AMOUNT {
        return Err(AuctionError::InvalidParams("minimum price out of range"));
    }
    if params.base_decimals > MAX_DECIMALS || params.quote_decimals > MAX_DECIMALS {
        return Err(AuctionError::InvalidParams("too many decimals"));
    }
    if params.min_fill_percent > ONE_HUNDRED_PERCENT {
        return Err(AuctionError::InvalidParams("minimum fill above 100%"));
    }
    if params.min_bid_percent == 0 || params.min_bid_percent > ONE_HUNDRED_PERCENT {
        return Err(AuctionError::InvalidParams("minimum bid percent out of range"));
    }
    let min_filled = math::percent_down(params.capacity, params.min_fill_percent)?;
    let min_bid_size = math::percent_down(params.capacity, params.min_bid_percent)?;

    // Validate fees
    if params.referrer_fee > config.fees.max_referrer_fee {
        return Err(AuctionError::InvalidParams("referrer fee above maximum"));
    }
    let curator_fee_escrow = match &params.curation {
        Some(curation) => {
            if curation.fee > config.fees.max_curator_fee {
                return Err(AuctionError::InvalidParams("curator fee above maximum"));
            }
            math::percent_down(params.capacity, curation.fee)?
        }
        None => 0,
    };

    // Validate the auction key
    ecies::validate_auction_public_key(&params.public_key)
        .map_err(AuctionError::InvalidPublicKey)?;

    // Escrow capacity and curator fee
    custody.escrow(lot_id, &ctx.sender, Asset::Base, params.capacity)?;
    if curator_fee_escrow > 0 {
        if let Err(e) = custody.escrow(lot_id, &ctx.sender, Asset::Base, curator_fee_escrow) {
            custody.release(lot_id, &ctx.sender, Asset::Base, params.capacity)?;
            return Err(e.into());
        }
    }

    let lot = Lot {
        lot_id,
        seller: ctx.sender,
        start,
        conclusion,
        capacity: params.capacity,
        min_price: params.min_price,
        min_filled,
        min_bid_size,
        base_decimals: params.base_decimals,
        quote_decimals: params.quote_decimals,
        status: LotStatus::Created,
        fees: config.fee_schedule(params.referrer_fee),
        curation: params.curation,
        curator_fee_escrow,
        sold: 0,
        purchased: 0,
    };

    info!(
        lot_id,
        seller = %hex::encode(ctx.sender),
        capacity = params.capacity,
        start,
        conclusion,
        "Lot created"
    );

    Ok(LotBook::new(lot, AuctionKeyState::new(params.public_key)))
}

/// Handle CancelLot call.
///
/// Only the seller may cancel, and only before the lot starts.
pub fn handle_cancel_lot<C: Custody + ?Sized>(
    book: &mut LotBook,
    custody: &C,
    ctx: &CallContext,
) -> HandlerResult<()> {
    if ctx.sender != book.lot.seller {
        return Err(AuctionError::NotAuthorized);
    }
    if book.lot.status != LotStatus::Created {
        return Err(book.invalid_state("lot cannot be cancelled"));
    }
    if book.lot.has_started(ctx.timestamp) {
        return Err(book.invalid_state("lot has started"));
    }

    let lot_id = book.lot_id();
    let seller = book.lot.seller;
    custody.release(lot_id, &seller, Asset::Base, book.lot.capacity)?;
    if book.lot.curator_fee_escrow > 0 {
        custody.release(lot_id, &seller, Asset::Base, book.lot.curator_fee_escrow)?;
    }
    book.lot.status = LotStatus::Cancelled;

    info!(lot_id, "Lot cancelled");
    Ok(())
}

/// Handle SubmitBid call.
///
/// Escrows `amount` of quote from the sender and records the sealed bid.
pub fn handle_submit_bid<C: Custody + ?Sized>(
    book: &mut LotBook,
    custody: &C,
    ctx: &CallContext,
    referrer: Option<Address>,
    amount: Amount,
    ciphertext: Ciphertext,
    ephemeral_public_key: G1Point,
) -> HandlerResult<BidId> {
    // Check bidding window
    if book.lot.status != LotStatus::Created {
        return Err(book.invalid_state("lot is not accepting bids"));
    }
    if !book.lot.has_started(ctx.timestamp) {
        return Err(book.invalid_state("lot has not started"));
    }
    if book.lot.has_concluded(ctx.timestamp) {
        return Err(book.invalid_state("lot has concluded"));
    }

    // Check amount
    if amount > MAX_AMOUNT {
        return Err(AuctionError::InvalidParams("bid amount above maximum"));
    }
    let required = minimum_bid_amount(&book.lot)?;
    if amount == 0 || amount < required {
        return Err(AuctionError::BidTooSmall {
            required: required.max(1),
            got: amount,
        });
    }

    if !ecies::is_valid_point(&ephemeral_public_key) {
        return Err(AuctionError::InvalidEphemeralKey);
    }

    let lot_id = book.lot_id();
    custody.escrow(lot_id, &ctx.sender, Asset::Quote, amount)?;

    // Store bid
    let bid_id = book.allocate_bid_id();
    book.bids.insert(
        bid_id,
        Bid {
            bidder: ctx.sender,
            amount,
            amount_out: 0,
            referrer,
            status: BidStatus::Submitted,
        },
    );
    book.encrypted_bids.insert(
        bid_id,
        EncryptedBid {
            ciphertext,
            ephemeral_public_key,
        },
    );
    book.keys.bid_ids.push(bid_id);

    debug!(lot_id, bid_id, bidder = %hex::encode(ctx.sender), amount, "Bid submitted");
    Ok(bid_id)
}

/// Smallest quote amount a bid must escrow: the minimum bid size at the
/// minimum price.
pub fn minimum_bid_amount(lot: &Lot) -> HandlerResult<Amount> {
    math::mul_div_up(
        lot.min_bid_size,
        lot.min_price,
        math::scale(lot.base_decimals)?,
    )
}

/// Handle RefundBid call.
///
/// The bidder withdraws a sealed bid while the lot is still live.
pub fn handle_refund_bid<C: Custody + ?Sized>(
    book: &mut LotBook,
    custody: &C,
    ctx: &CallContext,
    bid_id: BidId,
) -> HandlerResult<Amount> {
    if book.lot.status != LotStatus::Created || !book.lot.is_live(ctx.timestamp) {
        return Err(book.invalid_state("lot is not live"));
    }

    let lot_id = book.lot_id();
    let bid = book.get_bid(bid_id)?;
    if bid.bidder != ctx.sender {
        return Err(AuctionError::InvalidBid {
            lot_id,
            bid_id,
            reason: "sender is not the bidder",
        });
    }
    if bid.status != BidStatus::Submitted {
        return Err(AuctionError::InvalidBid {
            lot_id,
            bid_id,
            reason: "bid already resolved",
        });
    }
    let amount = bid.amount;

    custody.release(lot_id, &ctx.sender, Asset::Quote, amount)?;
    book.remove_pending(bid_id);
    book.get_bid_mut(bid_id)?.status = BidStatus::Refunded;

    debug!(lot_id, bid_id, amount, "Bid refunded");
    Ok(amount)
}

/// Handle SubmitPrivateKey call.
///
/// Anyone may reveal the lot key after conclusion. The key must reproduce the
/// lot's public key. If `initial_batch` is non-zero that many bids are
/// decrypted straight away.
pub fn handle_submit_private_key(
    book: &mut LotBook,
    ctx: &CallContext,
    private_key: Scalar,
    initial_batch: usize,
) -> HandlerResult<Option<DecryptReport>> {
    if book.lot.status != LotStatus::Created {
        return Err(book.invalid_state("lot is not awaiting a key"));
    }
    if !book.lot.has_concluded(ctx.timestamp) {
        return Err(book.invalid_state("lot has not concluded"));
    }
    if book.keys.private_key.is_some() {
        return Err(book.invalid_state("private key already submitted"));
    }

    let derived =
        ecies::public_key_from_private(&private_key).map_err(|_| AuctionError::InvalidKey)?;
    if derived != book.keys.public_key {
        return Err(AuctionError::InvalidKey);
    }

    book.keys.private_key = Some(private_key);
    info!(
        lot_id = book.lot_id(),
        bids = book.keys.bid_ids.len(),
        "Private key submitted"
    );
    mark_decrypted_if_complete(book);

    if initial_batch > 0 && book.lot.status == LotStatus::Created {
        return handle_decrypt_and_sort_bids(book, initial_batch).map(Some);
    }
    Ok(None)
}

/// Bids selected for decryption, with everything needed to decrypt them
/// without holding the lot.
#[derive(Clone, Debug)]
pub struct DecryptBatch {
    pub lot_id: LotId,
    /// Decrypt cursor the batch was taken at
    pub start_index: usize,
    pub private_key: Scalar,
    pub items: Vec<PendingDecrypt>,
}

/// One sealed bid in a [`DecryptBatch`].
#[derive(Clone, Debug)]
pub struct PendingDecrypt {
    pub bid_id: BidId,
    pub bidder: Address,
    pub amount: Amount,
    pub encrypted: EncryptedBid,
}

/// Result of decrypting one bid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptedAmount {
    pub bid_id: BidId,
    pub amount_out: HandlerResult<Amount>,
}

/// Summary of an applied decrypt batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecryptReport {
    /// Bids the batch advanced over
    pub processed: usize,
    /// Bids inserted into the settlement queue
    pub queued: usize,
    /// Bids whose ciphertext did not decode
    pub malformed: usize,
    /// Bids still awaiting decryption
    pub remaining: usize,
}

/// Select the next `count` sealed bids for decryption.
pub fn prepare_decrypt_batch(book: &LotBook, count: usize) -> HandlerResult<DecryptBatch> {
    if book.lot.status != LotStatus::Created {
        return Err(book.invalid_state("bids are not awaiting decryption"));
    }
    let private_key = book
        .keys
        .private_key
        .ok_or_else(|| book.invalid_state("private key not submitted"))?;
    if count == 0 {
        return Err(AuctionError::InvalidParams("batch size must be positive"));
    }

    let start_index = book.keys.next_decrypt_index;
    let end_index = start_index.saturating_add(count).min(book.keys.bid_ids.len());

    let mut items = Vec::with_capacity(end_index - start_index);
    for bid_id in &book.keys.bid_ids[start_index..end_index] {
        let bid = book.get_bid(*bid_id)?;
        let encrypted = book
            .encrypted_bids
            .get(bid_id)
            .ok_or(AuctionError::InvalidBid {
                lot_id: book.lot_id(),
                bid_id: *bid_id,
                reason: "missing ciphertext",
            })?;
        items.push(PendingDecrypt {
            bid_id: *bid_id,
            bidder: bid.bidder,
            amount: bid.amount,
            encrypted: encrypted.clone(),
        });
    }

    Ok(DecryptBatch {
        lot_id: book.lot_id(),
        start_index,
        private_key,
        items,
    })
}

/// Decrypt a batch. Pure; touches no lot state.
pub fn decrypt_batch(batch: &DecryptBatch) -> Vec<DecryptedAmount> {
    batch
        .items
        .iter()
        .map(|item| DecryptedAmount {
            bid_id: item.bid_id,
            amount_out: decrypt_bid(batch.lot_id, &batch.private_key, item),
        })
        .collect()
}

fn decrypt_bid(
    lot_id: LotId,
    private_key: &Scalar,
    item: &PendingDecrypt,
) -> HandlerResult<Amount> {
    let salt = compute_bid_salt(lot_id, &item.bidder, item.amount);
    let message = ecies::decrypt(
        &item.encrypted.ciphertext,
        &item.encrypted.ephemeral_public_key,
        private_key,
        &salt,
    )?;
    let amount_out = recover_amount(&message);
    if amount_out > MAX_AMOUNT {
        return Err(AuctionError::MalformedCiphertext {
            lot_id,
            bid_id: item.bid_id,
        });
    }
    Ok(amount_out)
}

/// Apply decrypted amounts to the lot.
///
/// Fails without changes if another batch advanced the cursor since `batch`
/// was prepared.
pub fn apply_decrypt_batch(
    book: &mut LotBook,
    batch: &DecryptBatch,
    results: &[DecryptedAmount],
) -> HandlerResult<DecryptReport> {
    if book.lot.status != LotStatus::Created
        || book.keys.next_decrypt_index != batch.start_index
    {
        return Err(book.invalid_state("decrypt cursor moved"));
    }

    let lot_id = book.lot_id();
    let base_scale = book.base_scale()?;
    let min_bid_size = book.lot.min_bid_size;
    let mut report = DecryptReport::default();

    for result in results {
        let Some(bid) = book.bids.get_mut(&result.bid_id) else {
            continue;
        };
        report.processed += 1;

        let amount_out = match &result.amount_out {
            Ok(amount_out) => *amount_out,
            Err(e) => {
                warn!(
                    lot_id,
                    bid_id = result.bid_id,
                    error = %e,
                    "Skipping undecodable bid, it will be refunded"
                );
                report.malformed += 1;
                continue;
            }
        };

        let entry = if amount_out > 0 && amount_out >= min_bid_size {
            match QueueBid::new(result.bid_id, bid.amount, amount_out, base_scale) {
                Ok(entry) => Some(entry),
                Err(_) => {
                    warn!(
                        lot_id,
                        bid_id = result.bid_id,
                        "Bid price out of range, bid will be refunded"
                    );
                    report.malformed += 1;
                    continue;
                }
            }
        } else {
            None
        };

        bid.amount_out = amount_out;
        bid.status = BidStatus::Decrypted;
        if let Some(entry) = entry {
            book.queue.insert(entry);
            report.queued += 1;
        }
    }

    book.keys.next_decrypt_index = batch.start_index + results.len();
    mark_decrypted_if_complete(book);
    report.remaining = book.keys.pending_decryption();

    debug!(
        lot_id,
        processed = report.processed,
        queued = report.queued,
        remaining = report.remaining,
        "Decrypt batch applied"
    );
    Ok(report)
}

/// Handle DecryptAndSortBids call in one step.
pub fn handle_decrypt_and_sort_bids(
    book: &mut LotBook,
    count: usize,
) -> HandlerResult<DecryptReport> {
    let batch = prepare_decrypt_batch(book, count)?;
    let results = decrypt_batch(&batch);
    apply_decrypt_batch(book, &batch, &results)
}

fn mark_decrypted_if_complete(book: &mut LotBook) {
    if book.keys.next_decrypt_index >= book.keys.bid_ids.len() {
        book.lot.status = LotStatus::Decrypted;
        info!(lot_id = book.lot_id(), queued = book.queue.len(), "All bids decrypted");
    }
}

/// Handle Settle call.
///
/// Computes the marginal price, pays out the partial fill and the seller, and
/// marks the lot settled. Bids other than the partial fill are resolved by
/// [`handle_claim_bid`].
///
/// Every winner is known here, so the base sold is the exact sum of their
/// payouts and the rest of the capacity goes back to the seller. Custody moves
/// run before any lot state changes. Each one draws only on amounts the lot
/// escrowed at creation or bid time, so a conforming custody cannot fail them.
pub fn handle_settle<C: Custody + ?Sized>(
    book: &mut LotBook,
    custody: &C,
    ctx: &CallContext,
) -> HandlerResult<LotSettlement> {
    match book.lot.status {
        LotStatus::Decrypted => {}
        LotStatus::Created if !book.lot.has_concluded(ctx.timestamp) => {
            return Err(book.invalid_state("lot has not concluded"));
        }
        LotStatus::Created => {
            return Err(book.invalid_state("bids not decrypted"));
        }
        LotStatus::Settled => {
            return Err(book.invalid_state("lot already settled"));
        }
        LotStatus::Cancelled => {
            return Err(book.invalid_state("lot was cancelled"));
        }
    }

    let lot_id = book.lot_id();
    let base_scale = book.base_scale()?;
    let capacity = book.lot.capacity;
    let seller = book.lot.seller;
    let outcome = clearing::compute_marginal_price(
        book.queue.clone(),
        capacity,
        book.lot.min_price,
        base_scale,
    )?;

    if !outcome.clears(book.lot.min_price, book.lot.min_filled, capacity) {
        release_seller_escrow(book, custody)?;
        book.queue = Default::default();
        book.lot.status = LotStatus::Settled;
        info!(lot_id, total_in = outcome.total_in, "Lot settled without clearing");
        return Ok(LotSettlement {
            lot_id,
            cleared: false,
            marginal_price: None,
            total_in: 0,
            sold: 0,
            partial_fill: None,
            unsold: capacity,
            proceeds: 0,
            curator_fee: 0,
        });
    }

    let (Some(marginal_price), Some(marginal_bid_id)) =
        (outcome.marginal_price, outcome.marginal_bid_id)
    else {
        return Err(AuctionError::ArithmeticOverflow);
    };

    // Partial fill
    let partial_fill = match outcome.partial_fill_bid_id {
        Some(bid_id) => {
            let excess = math::checked_sub(outcome.capacity_expended, capacity)?;
            Some(split_partial_fill(book, bid_id, marginal_price, excess)?)
        }
        None => None,
    };
    let refund = partial_fill.as_ref().map_or(0, |fill| fill.refund);
    let total_in = math::checked_sub(outcome.total_in, refund)?;

    let sold = total_payout(book, marginal_price, marginal_bid_id, partial_fill.as_ref())?;
    let unsold = math::checked_sub(capacity, sold)?;
    let proceeds = math::checked_sub(total_in, fees::total_fees(total_in, &book.lot.fees)?)?;
    let escrow = book.lot.curator_fee_escrow;
    let curator_fee = match book.lot.curation {
        Some(curation) => math::percent_down(sold, curation.fee)?.min(escrow),
        None => 0,
    };

    if let Some(fill) = &partial_fill {
        let bidder = book.get_bid(fill.bid_id)?.bidder;
        if fill.payout > 0 {
            custody.payout(lot_id, &bidder, Asset::Base, fill.payout)?;
        }
        if fill.refund > 0 {
            custody.release(lot_id, &bidder, Asset::Quote, fill.refund)?;
        }
        debug!(
            lot_id,
            bid_id = fill.bid_id,
            payout = fill.payout,
            refund = fill.refund,
            "Partial fill settled"
        );
    }
    if proceeds > 0 {
        custody.payout(lot_id, &seller, Asset::Quote, proceeds)?;
    }
    if unsold > 0 {
        custody.release(lot_id, &seller, Asset::Base, unsold)?;
    }
    if let Some(curation) = book.lot.curation {
        if curator_fee > 0 {
            custody.payout(lot_id, &curation.curator, Asset::Base, curator_fee)?;
        }
        if escrow > curator_fee {
            custody.release(lot_id, &seller, Asset::Base, escrow - curator_fee)?;
        }
    }

    if let Some(fill) = &partial_fill {
        let bid = book.get_bid(fill.bid_id)?;
        let (paid, referrer) = (math::checked_sub(bid.amount, fill.refund)?, bid.referrer);
        allocate_bid_fees(book, paid, referrer)?;
        book.get_bid_mut(fill.bid_id)?.status = BidStatus::Claimed;
    }
    book.queue = Default::default();
    book.keys.marginal_price = Some(marginal_price);
    book.keys.marginal_bid_id = Some(marginal_bid_id);
    book.lot.status = LotStatus::Settled;
    book.lot.sold = sold;
    book.lot.purchased = total_in;

    info!(
        lot_id,
        marginal_price,
        sold,
        total_in,
        proceeds,
        "Lot settled"
    );

    Ok(LotSettlement {
        lot_id,
        cleared: true,
        marginal_price: Some(marginal_price),
        total_in,
        sold,
        partial_fill,
        unsold,
        proceeds,
        curator_fee,
    })
}

/// Split the marginal bid into the part of the capacity that is left and a refund.
fn split_partial_fill(
    book: &LotBook,
    bid_id: BidId,
    marginal_price: Amount,
    excess: Amount,
) -> HandlerResult<PartialFill> {
    let amount = book.get_bid(bid_id)?.amount;
    let full_payout = math::mul_div_down(amount, book.base_scale()?, marginal_price)?;
    Ok(PartialFill {
        bid_id,
        payout: math::checked_sub(full_payout, excess)?,
        refund: math::mul_div_down(amount, excess, full_payout)?,
    })
}

/// Base units owed to every winner at `marginal_price`, the partial fill
/// counted at its reduced payout.
fn total_payout(
    book: &LotBook,
    marginal_price: Amount,
    marginal_bid_id: BidId,
    partial_fill: Option<&PartialFill>,
) -> HandlerResult<Amount> {
    let partial_id = partial_fill.map(|fill| fill.bid_id);
    let mut total = partial_fill.map_or(0, |fill| fill.payout);
    for (bid_id, bid) in &book.bids {
        if Some(*bid_id) == partial_id {
            continue;
        }
        if let BidOutcome::Won { payout } =
            resolve_against(book, *bid_id, bid, marginal_price, marginal_bid_id)?
        {
            total = math::checked_add(total, payout)?;
        }
    }
    Ok(total)
}

fn release_seller_escrow<C: Custody + ?Sized>(
    book: &mut LotBook,
    custody: &C,
) -> HandlerResult<()> {
    let lot_id = book.lot_id();
    let seller = book.lot.seller;
    let total = math::checked_add(book.lot.capacity, book.lot.curator_fee_escrow)?;
    custody.release(lot_id, &seller, Asset::Base, total)?;
    Ok(())
}

/// Handle Abort call.
///
/// Once the dedicated settle period after conclusion has passed, anyone may
/// close a lot that never settled. The lot is treated as not cleared: the
/// seller gets the capacity back and every bid is refunded on claim.
pub fn handle_abort<C: Custody + ?Sized>(
    book: &mut LotBook,
    custody: &C,
    ctx: &CallContext,
    dedicated_settle_period: u64,
) -> HandlerResult<LotSettlement> {
    if matches!(book.lot.status, LotStatus::Settled | LotStatus::Cancelled) {
        return Err(book.invalid_state("lot already closed"));
    }
    let deadline = book.lot.conclusion.saturating_add(dedicated_settle_period);
    if ctx.timestamp < deadline {
        return Err(book.invalid_state("dedicated settle period has not passed"));
    }

    book.lot.status = LotStatus::Settled;
    book.queue = Default::default();
    release_seller_escrow(book, custody)?;

    warn!(lot_id = book.lot_id(), "Lot aborted");
    Ok(LotSettlement {
        lot_id: book.lot_id(),
        cleared: false,
        marginal_price: None,
        total_in: 0,
        sold: 0,
        partial_fill: None,
        unsold: book.lot.capacity,
        proceeds: 0,
        curator_fee: 0,
    })
}

/// How a bid resolves once its lot has settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BidOutcome {
    /// The bid won; its quote is kept and `payout` base units are owed.
    Won { payout: Amount },
    /// The bid lost or never took part; its quote is returned.
    Refund,
}

/// Decide whether a bid won in a settled lot.
///
/// A bid wins when it was decrypted into the queue and ranks no later than the
/// marginal bid in the queue ordering. Winners receive their quote amount
/// converted at the marginal price, rounded down.
pub fn resolve_bid(book: &LotBook, bid_id: BidId) -> HandlerResult<BidOutcome> {
    let bid = book.get_bid(bid_id)?;
    match (book.keys.marginal_price, book.keys.marginal_bid_id) {
        (Some(marginal_price), Some(marginal_bid_id)) => {
            resolve_against(book, bid_id, bid, marginal_price, marginal_bid_id)
        }
        _ => Ok(BidOutcome::Refund),
    }
}

fn resolve_against(
    book: &LotBook,
    bid_id: BidId,
    bid: &Bid,
    marginal_price: Amount,
    marginal_bid_id: BidId,
) -> HandlerResult<BidOutcome> {
    if bid.status != BidStatus::Decrypted
        || bid.amount_out == 0
        || bid.amount_out < book.lot.min_bid_size
    {
        return Ok(BidOutcome::Refund);
    }

    let base_scale = book.base_scale()?;
    let marginal_bid = book.get_bid(marginal_bid_id)?;
    let cutoff_price =
        queue::implied_price(marginal_bid.amount, marginal_bid.amount_out, base_scale)?;
    let price = queue::implied_price(bid.amount, bid.amount_out, base_scale)?;

    if QueueBid::ranks_at_or_before(price, bid_id, cutoff_price, marginal_bid_id) {
        Ok(BidOutcome::Won {
            payout: math::mul_div_down(bid.amount, base_scale, marginal_price)?,
        })
    } else {
        Ok(BidOutcome::Refund)
    }
}

/// Handle ClaimBid call.
///
/// Anyone may claim on behalf of a bidder; proceeds always go to the bidder.
pub fn handle_claim_bid<C: Custody + ?Sized>(
    book: &mut LotBook,
    custody: &C,
    bid_id: BidId,
) -> HandlerResult<BidClaim> {
    if book.lot.status != LotStatus::Settled {
        return Err(book.invalid_state("lot not settled"));
    }

    let lot_id = book.lot_id();
    let bid = book.get_bid(bid_id)?;
    if matches!(bid.status, BidStatus::Claimed | BidStatus::Refunded) {
        return Err(AuctionError::InvalidBid {
            lot_id,
            bid_id,
            reason: "bid already resolved",
        });
    }
    let (bidder, amount, referrer) = (bid.bidder, bid.amount, bid.referrer);

    let claim = match resolve_bid(book, bid_id)? {
        BidOutcome::Won { payout } => {
            allocate_bid_fees(book, amount, referrer)?;
            if payout > 0 {
                custody.payout(lot_id, &bidder, Asset::Base, payout)?;
            }
            BidClaim {
                bid_id,
                bidder,
                paid: amount,
                payout,
                refund: 0,
            }
        }
        BidOutcome::Refund => {
            custody.release(lot_id, &bidder, Asset::Quote, amount)?;
            BidClaim {
                bid_id,
                bidder,
                paid: 0,
                payout: 0,
                refund: amount,
            }
        }
    };
    book.get_bid_mut(bid_id)?.status = BidStatus::Claimed;

    debug!(
        lot_id,
        bid_id,
        payout = claim.payout,
        refund = claim.refund,
        "Bid claimed"
    );
    Ok(claim)
}

/// Credit protocol and referrer fees for a winning quote amount.
fn allocate_bid_fees(
    book: &mut LotBook,
    paid: Amount,
    referrer: Option<Address>,
) -> HandlerResult<()> {
    let split = fees::split_fees(paid, &book.lot.fees, referrer.as_ref())?;
    let protocol = book.lot.fees.protocol;
    book.allocate_reward(protocol, split.protocol)?;
    if let Some(referrer) = referrer {
        book.allocate_reward(referrer, split.referrer)?;
    }
    Ok(())
}
