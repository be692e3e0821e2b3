//! Asset custody seam.
//!
//! The engine never moves assets itself. It asks a [`Custody`] implementation to
//! escrow, release or pay out amounts and treats each call as atomic.
//! [`EscrowLedger`] is an in-memory implementation that tracks both account
//! balances and what each lot holds.

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

use auction_types::{Address, Amount, Asset, LotId};

/// Errors reported by a custody implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("Lot {lot_id} holds {available} of {asset:?}, cannot move {required}")]
    InsufficientEscrow {
        lot_id: LotId,
        asset: Asset,
        required: Amount,
        available: Amount,
    },

    #[error("Balance overflow")]
    Overflow,
}

/// External asset custody.
///
/// `release` returns escrowed funds to whoever provided them (seller refunds,
/// bid refunds); `payout` delivers escrowed funds to a counterparty (bid payouts,
/// seller proceeds, curator fees). Both draw from what the lot holds.
pub trait Custody: Send + Sync {
    fn escrow(
        &self,
        lot_id: LotId,
        payer: &Address,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), CustodyError>;

    fn release(
        &self,
        lot_id: LotId,
        recipient: &Address,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), CustodyError>;

    fn payout(
        &self,
        lot_id: LotId,
        recipient: &Address,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), CustodyError>;
}

#[derive(Debug, Default)]
struct Ledger {
    balances: HashMap<(Address, Asset), Amount>,
    held: HashMap<(LotId, Asset), Amount>,
}

impl Ledger {
    fn credit(
        &mut self,
        account: Address,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        let balance = self.balances.entry((account, asset)).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }

    fn withdraw_from_lot(
        &mut self,
        lot_id: LotId,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        let held = self.held.entry((lot_id, asset)).or_insert(0);
        if *held < amount {
            return Err(CustodyError::InsufficientEscrow {
                lot_id,
                asset,
                required: amount,
                available: *held,
            });
        }
        *held -= amount;
        Ok(())
    }
}

/// In-memory custody with per-account balances and per-lot holdings.
#[derive(Debug, Default)]
pub struct EscrowLedger {
    inner: Mutex<Ledger>,
}

impl EscrowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account, e.g. to fund a seller or bidder.
    pub fn deposit(
        &self,
        account: Address,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        self.inner.lock().credit(account, asset, amount)
    }

    /// Get an account's free balance.
    pub fn balance(&self, account: &Address, asset: Asset) -> Amount {
        self.inner
            .lock()
            .balances
            .get(&(*account, asset))
            .copied()
            .unwrap_or(0)
    }

    /// Get the amount a lot currently holds in escrow.
    pub fn held(&self, lot_id: LotId, asset: Asset) -> Amount {
        self.inner
            .lock()
            .held
            .get(&(lot_id, asset))
            .copied()
            .unwrap_or(0)
    }
}

impl Custody for EscrowLedger {
    fn escrow(
        &self,
        lot_id: LotId,
        payer: &Address,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        let mut ledger = self.inner.lock();
        let balance = ledger.balances.entry((*payer, asset)).or_insert(0);
        if *balance < amount {
            return Err(CustodyError::InsufficientBalance {
                required: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        let held = ledger.held.entry((lot_id, asset)).or_insert(0);
        *held = held.checked_add(amount).ok_or(CustodyError::Overflow)?;
        Ok(())
    }

    fn release(
        &self,
        lot_id: LotId,
        recipient: &Address,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        let mut ledger = self.inner.lock();
        ledger.withdraw_from_lot(lot_id, asset, amount)?;
        ledger.credit(*recipient, asset, amount)
    }

    fn payout(
        &self,
        lot_id: LotId,
        recipient: &Address,
        asset: Asset,
        amount: Amount,
    ) -> Result<(), CustodyError> {
        self.release(lot_id, recipient, asset, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escrow_operations() {
        let ledger = EscrowLedger::new();
        let addr = [1u8; 32];

        assert_eq!(ledger.balance(&addr, Asset::Quote), 0);

        ledger.deposit(addr, Asset::Quote, 100).unwrap();
        ledger.escrow(1, &addr, Asset::Quote, 60).unwrap();
        assert_eq!(ledger.balance(&addr, Asset::Quote), 40);
        assert_eq!(ledger.held(1, Asset::Quote), 60);

        ledger.release(1, &addr, Asset::Quote, 25).unwrap();
        assert_eq!(ledger.balance(&addr, Asset::Quote), 65);
        assert_eq!(ledger.held(1, Asset::Quote), 35);
    }

    #[test]
    fn test_escrow_requires_balance() {
        let ledger = EscrowLedger::new();
        let addr = [1u8; 32];
        ledger.deposit(addr, Asset::Base, 10).unwrap();

        assert_eq!(
            ledger.escrow(1, &addr, Asset::Base, 11),
            Err(CustodyError::InsufficientBalance {
                required: 11,
                available: 10
            })
        );
        assert_eq!(ledger.balance(&addr, Asset::Base), 10);
    }

    #[test]
    fn test_lots_are_isolated() {
        let ledger = EscrowLedger::new();
        let seller = [1u8; 32];
        let buyer = [2u8; 32];
        ledger.deposit(seller, Asset::Base, 10).unwrap();
        ledger.escrow(1, &seller, Asset::Base, 10).unwrap();

        assert!(matches!(
            ledger.payout(2, &buyer, Asset::Base, 1),
            Err(CustodyError::InsufficientEscrow { lot_id: 2, .. })
        ));
        ledger.payout(1, &buyer, Asset::Base, 4).unwrap();
        assert_eq!(ledger.balance(&buyer, Asset::Base), 4);
        assert_eq!(ledger.held(1, Asset::Base), 6);
    }
}
