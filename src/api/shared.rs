//! Purpose: In-process serialization point for a ledger and its settlement.
//! Exports: `SharedLedger`.
//! Role: Lets several threads drive one ledger without a store on disk.
//! Invariants: One mutex guards the ledger and settlement together; aggregates have a single writer.

use std::sync::{Mutex, MutexGuard};

use crate::core::address::Address;
use crate::core::amount::Amount;
use crate::core::error::{Error, ErrorKind};
use crate::core::ledger::Ledger;
use crate::core::pool::{PoolId, PoolInfo};
use crate::core::settlement::{Deposit, Payout, Settlement};

struct Inner<S> {
    ledger: Ledger,
    settlement: S,
}

pub struct SharedLedger<S> {
    inner: Mutex<Inner<S>>,
}

impl<S: Settlement> SharedLedger<S> {
    pub fn new(ledger: Ledger, settlement: S) -> Self {
        Self {
            inner: Mutex::new(Inner { ledger, settlement }),
        }
    }

    pub fn create_pool(&self, owner: Address) -> Result<PoolId, Error> {
        self.lock()?.ledger.create_pool(owner)
    }

    pub fn launch_pool(&self, id: PoolId) -> Result<(), Error> {
        self.lock()?.ledger.launch_pool(id)
    }

    pub fn deposit(&self, id: PoolId, deposit: Deposit) -> Result<(), Error> {
        self.lock()?.ledger.deposit(id, deposit)
    }

    pub fn finish_pool(&self, id: PoolId) -> Result<Payout, Error> {
        let mut guard = self.lock()?;
        let Inner { ledger, settlement } = &mut *guard;
        ledger.finish_pool(id, settlement)
    }

    pub fn change_owner(&self, id: PoolId, new_owner: Address) -> Result<Address, Error> {
        self.lock()?.ledger.change_owner(id, new_owner)
    }

    pub fn pool_info(&self, id: PoolId) -> Result<PoolInfo, Error> {
        self.lock()?.ledger.pool_info(id)
    }

    /// `(total_collected, total_active)` read under one lock.
    pub fn totals(&self) -> Result<(Amount, Amount), Error> {
        let guard = self.lock()?;
        Ok((guard.ledger.total_collected(), guard.ledger.total_active()))
    }

    pub fn with_settlement<R>(&self, f: impl FnOnce(&mut S) -> R) -> Result<R, Error> {
        Ok(f(&mut self.lock()?.settlement))
    }

    pub fn snapshot(&self) -> Result<Ledger, Error> {
        Ok(self.lock()?.ledger.clone())
    }

    pub fn into_inner(self) -> Result<(Ledger, S), Error> {
        let inner = self.inner.into_inner().map_err(|_| poisoned())?;
        Ok((inner.ledger, inner.settlement))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<S>>, Error> {
        self.inner.lock().map_err(|_| poisoned())
    }
}

fn poisoned() -> Error {
    Error::new(ErrorKind::Internal).with_message("ledger lock poisoned by a panicked operation")
}

#[cfg(test)]
mod tests {
    use super::SharedLedger;
    use crate::core::address::Address;
    use crate::core::amount::Amount;
    use crate::core::error::ErrorKind;
    use crate::core::ledger::Ledger;
    use crate::core::pool::PoolState;
    use crate::core::settlement::{Deposit, MemorySettlement};
    use crate::core::validate::audit;

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn shared() -> SharedLedger<MemorySettlement> {
        SharedLedger::new(Ledger::new(addr(0xee)).expect("ledger"), MemorySettlement::new())
    }

    #[test]
    fn concurrent_deposits_are_serialized() {
        let ledger = shared();
        let first = ledger.create_pool(addr(1)).expect("create");
        let second = ledger.create_pool(addr(2)).expect("create");
        ledger.launch_pool(first).expect("launch");
        ledger.launch_pool(second).expect("launch");

        std::thread::scope(|scope| {
            for worker in 0..8u8 {
                let ledger = &ledger;
                scope.spawn(move || {
                    let pool = if worker % 2 == 0 { first } else { second };
                    for _ in 0..100 {
                        ledger
                            .deposit(pool, Deposit::new(addr(10 + worker), Amount::new(1)))
                            .expect("deposit");
                    }
                });
            }
        });

        assert_eq!(ledger.totals().expect("totals"), (Amount::new(800), Amount::new(800)));
        let info = ledger.pool_info(first).expect("info");
        assert_eq!(info.balance, Amount::new(400));
        assert_eq!(info.funders.len(), 4);
        audit(&ledger.snapshot().expect("snapshot")).expect("audit");
    }

    #[test]
    fn finish_during_deposits_keeps_other_pool_intact() {
        let ledger = shared();
        let first = ledger.create_pool(addr(1)).expect("create");
        let second = ledger.create_pool(addr(2)).expect("create");
        ledger.launch_pool(first).expect("launch");
        ledger.launch_pool(second).expect("launch");
        ledger
            .deposit(first, Deposit::new(addr(3), Amount::new(10)))
            .expect("deposit");

        std::thread::scope(|scope| {
            let ledger = &ledger;
            scope.spawn(move || {
                for _ in 0..50 {
                    ledger
                        .deposit(second, Deposit::new(addr(4), Amount::new(2)))
                        .expect("deposit");
                }
            });
            scope.spawn(move || {
                ledger.finish_pool(first).expect("finish");
            });
        });

        let second_info = ledger.pool_info(second).expect("info");
        assert_eq!(second_info.state, PoolState::Active);
        assert_eq!(second_info.balance, Amount::new(100));
        assert_eq!(ledger.totals().expect("totals"), (Amount::new(110), Amount::new(100)));
        let received = ledger
            .with_settlement(|settlement| settlement.received(&addr(1)))
            .expect("settlement");
        assert_eq!(received, Amount::new(10));
    }

    #[test]
    fn refused_payout_through_shared_ledger_is_retryable() {
        let ledger = shared();
        let id = ledger.create_pool(addr(1)).expect("create");
        ledger.launch_pool(id).expect("launch");
        ledger
            .deposit(id, Deposit::new(addr(2), Amount::new(5)))
            .expect("deposit");
        ledger
            .with_settlement(|settlement| settlement.refuse(addr(1)))
            .expect("refuse");

        let err = ledger.finish_pool(id).expect_err("refused");
        assert_eq!(err.kind(), ErrorKind::TransferFailed);
        assert_eq!(ledger.totals().expect("totals").1, Amount::new(5));

        ledger
            .with_settlement(|settlement| settlement.accept(addr(1)))
            .expect("accept");
        ledger.finish_pool(id).expect("retry");
        let (inner, settlement) = ledger.into_inner().expect("inner");
        assert_eq!(inner.total_active(), Amount::ZERO);
        assert_eq!(settlement.received(&addr(1)), Amount::new(5));
    }
}
