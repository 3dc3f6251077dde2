// Value movement capability the ledger invokes, plus the records it exchanges.
use std::collections::{BTreeMap, HashSet};
use std::error::Error as StdError;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::amount::Amount;
use crate::core::pool::PoolId;

/// Value moved into custody by a funder; the caller of `deposit`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Deposit {
    pub from: Address,
    pub amount: Amount,
}

impl Deposit {
    pub fn new(from: Address, amount: Amount) -> Self {
        Self { from, amount }
    }
}

/// Value released to a pool owner by `finish_pool`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Payout {
    pub pool: PoolId,
    pub to: Address,
    pub amount: Amount,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransferError {
    pub to: Address,
    pub amount: Amount,
    pub reason: String,
}

impl TransferError {
    pub fn new(to: Address, amount: Amount, reason: impl Into<String>) -> Self {
        Self {
            to,
            amount,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "transfer of {} to {} failed: {}",
            self.amount, self.to, self.reason
        )
    }
}

impl StdError for TransferError {}

/// Moves custody funds to an arbitrary address.
///
/// Implementations must either complete the transfer or return an error
/// without side effects.
pub trait Settlement {
    fn transfer_to(&mut self, to: Address, amount: Amount) -> Result<(), TransferError>;
}

/// In-memory settlement that can be told to refuse specific payees.
#[derive(Clone, Debug, Default)]
pub struct MemorySettlement {
    received: BTreeMap<Address, Amount>,
    refused: HashSet<Address>,
}

impl MemorySettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse(&mut self, addr: Address) {
        self.refused.insert(addr);
    }

    pub fn accept(&mut self, addr: Address) {
        self.refused.remove(&addr);
    }

    pub fn received(&self, addr: &Address) -> Amount {
        self.received.get(addr).copied().unwrap_or_default()
    }
}

impl Settlement for MemorySettlement {
    fn transfer_to(&mut self, to: Address, amount: Amount) -> Result<(), TransferError> {
        if self.refused.contains(&to) {
            return Err(TransferError::new(to, amount, "payee refused funds"));
        }
        let current = self.received(&to);
        let next = current
            .checked_add(amount)
            .ok_or_else(|| TransferError::new(to, amount, "payee balance overflow"))?;
        self.received.insert(to, next);
        Ok(())
    }
}

/// Per-address custody record persisted alongside the ledger.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CustodyAccount {
    pub deposited: Amount,
    pub paid_out: Amount,
}

/// Persisted book of value moved in by funders and out to owners.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CustodyBook {
    accounts: BTreeMap<Address, CustodyAccount>,
}

impl CustodyBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `deposit` can be recorded without overflow.
    pub fn can_record(&self, deposit: &Deposit) -> bool {
        self.account(&deposit.from)
            .deposited
            .checked_add(deposit.amount)
            .is_some()
    }

    pub fn record_deposit(&mut self, deposit: &Deposit) -> Result<(), TransferError> {
        let entry = self.accounts.entry(deposit.from).or_default();
        entry.deposited = entry.deposited.checked_add(deposit.amount).ok_or_else(|| {
            TransferError::new(deposit.from, deposit.amount, "deposit total overflow")
        })?;
        Ok(())
    }

    pub fn account(&self, addr: &Address) -> CustodyAccount {
        self.accounts.get(addr).copied().unwrap_or_default()
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &CustodyAccount)> {
        self.accounts.iter()
    }

    pub fn total_deposited(&self) -> Option<Amount> {
        self.accounts
            .values()
            .try_fold(Amount::ZERO, |acc, account| acc.checked_add(account.deposited))
    }

    pub fn total_paid_out(&self) -> Option<Amount> {
        self.accounts
            .values()
            .try_fold(Amount::ZERO, |acc, account| acc.checked_add(account.paid_out))
    }
}

impl Settlement for CustodyBook {
    fn transfer_to(&mut self, to: Address, amount: Amount) -> Result<(), TransferError> {
        let current = self.account(&to);
        let paid_out = current
            .paid_out
            .checked_add(amount)
            .ok_or_else(|| TransferError::new(to, amount, "payout total overflow"))?;
        self.accounts.insert(to, CustodyAccount { paid_out, ..current });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CustodyBook, Deposit, MemorySettlement, Settlement};
    use crate::core::address::Address;
    use crate::core::amount::Amount;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    #[test]
    fn memory_settlement_credits_and_refuses() {
        let mut settlement = MemorySettlement::new();
        settlement.transfer_to(addr(1), Amount::new(5)).expect("transfer");
        settlement.transfer_to(addr(1), Amount::new(2)).expect("transfer");
        assert_eq!(settlement.received(&addr(1)), Amount::new(7));

        settlement.refuse(addr(2));
        let err = settlement
            .transfer_to(addr(2), Amount::new(1))
            .expect_err("refused");
        assert_eq!(err.to, addr(2));
        assert_eq!(settlement.received(&addr(2)), Amount::ZERO);

        settlement.accept(addr(2));
        settlement.transfer_to(addr(2), Amount::new(1)).expect("accepted");
        assert_eq!(settlement.received(&addr(2)), Amount::new(1));
    }

    #[test]
    fn custody_book_tracks_both_directions() {
        let mut book = CustodyBook::new();
        book.record_deposit(&Deposit::new(addr(1), Amount::new(3)))
            .expect("deposit");
        book.record_deposit(&Deposit::new(addr(2), Amount::new(4)))
            .expect("deposit");
        book.transfer_to(addr(1), Amount::new(7)).expect("payout");

        assert_eq!(book.account(&addr(1)).deposited, Amount::new(3));
        assert_eq!(book.account(&addr(1)).paid_out, Amount::new(7));
        assert_eq!(book.total_deposited(), Some(Amount::new(7)));
        assert_eq!(book.total_paid_out(), Some(Amount::new(7)));
    }

    #[test]
    fn custody_book_rejects_overflow_without_change() {
        let mut book = CustodyBook::new();
        book.transfer_to(addr(1), Amount::new(u128::MAX)).expect("first");
        assert!(book.transfer_to(addr(1), Amount::new(1)).is_err());
        assert_eq!(book.account(&addr(1)).paid_out, Amount::new(u128::MAX));

        let big = Deposit::new(addr(2), Amount::new(u128::MAX));
        book.record_deposit(&big).expect("deposit");
        assert!(!book.can_record(&Deposit::new(addr(2), Amount::new(1))));
    }
}
