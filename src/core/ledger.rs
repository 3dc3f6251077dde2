// Pool ledger: lifecycle transitions and incrementally maintained aggregates.
// Every operation validates fully before its first write, so a failed call
// leaves the ledger untouched.
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::address::Address;
use crate::core::amount::Amount;
use crate::core::error::{Error, ErrorKind};
use crate::core::pool::{Pool, PoolId, PoolInfo, PoolState};
use crate::core::settlement::{Deposit, Payout, Settlement};
use crate::core::validate;

/// Which aggregate `Ledger::total` reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TotalKind {
    Collected,
    Active,
    Pool(PoolId),
}

impl FromStr for TotalKind {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim() {
            "collected" | "totalFundsCollected" => Ok(TotalKind::Collected),
            "active" | "totalActiveFunds" => Ok(TotalKind::Active),
            other => other.parse::<PoolId>().map(TotalKind::Pool).map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("invalid total type `{other}`"))
                    .with_hint("Use collected, active, or a pool id.")
                    .with_source(err)
            }),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub(crate) owner: Address,
    pub(crate) next_id: PoolId,
    pub(crate) total_collected: Amount,
    pub(crate) total_active: Amount,
    pub(crate) pools: Vec<Pool>,
}

impl Ledger {
    /// Opens an empty ledger administered by `owner`.
    pub fn new(owner: Address) -> Result<Self, Error> {
        let owner = owner.require_non_zero("ledger owner")?;
        Ok(Self {
            owner,
            next_id: 0,
            total_collected: Amount::ZERO,
            total_active: Amount::ZERO,
            pools: Vec::new(),
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn next_id(&self) -> PoolId {
        self.next_id
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Lifetime sum of all deposits; never reduced by a finish.
    pub fn total_collected(&self) -> Amount {
        self.total_collected
    }

    /// Sum of balances held by active pools.
    pub fn total_active(&self) -> Amount {
        self.total_active
    }

    pub fn create_pool(&mut self, owner: Address) -> Result<PoolId, Error> {
        let owner = owner.require_non_zero("pool owner")?;
        let id = self.next_id;
        let next_id = id.checked_add(1).ok_or_else(|| {
            Error::new(ErrorKind::Internal).with_message("pool id space exhausted")
        })?;
        self.pools.push(Pool::new(id, owner));
        self.next_id = next_id;
        debug!(pool = id, owner = %owner, "pool created");
        self.debug_check();
        Ok(id)
    }

    pub fn launch_pool(&mut self, id: PoolId) -> Result<(), Error> {
        let pool = self.pool_mut(id)?;
        if pool.state != PoolState::Inactive {
            return Err(Error::new(ErrorKind::InvalidStateTransition)
                .with_message(format!(
                    "pool must be INACTIVE to launch (currently {})",
                    pool.state
                ))
                .with_pool(id));
        }
        pool.state = PoolState::Active;
        debug!(pool = id, "pool launched");
        self.debug_check();
        Ok(())
    }

    pub fn deposit(&mut self, id: PoolId, deposit: Deposit) -> Result<(), Error> {
        let total_collected = self.total_collected;
        let total_active = self.total_active;
        let pool = self.pool_mut(id)?;
        require_active(pool)?;
        let from = deposit
            .from
            .require_non_zero("funder")
            .map_err(|err| err.with_pool(id))?;

        let overflow = || {
            Error::new(ErrorKind::AmountOverflow)
                .with_message(format!("deposit of {} overflows ledger totals", deposit.amount))
                .with_pool(id)
        };
        let balance = pool.balance.checked_add(deposit.amount).ok_or_else(overflow)?;
        let collected = total_collected.checked_add(deposit.amount).ok_or_else(overflow)?;
        let active = total_active.checked_add(deposit.amount).ok_or_else(overflow)?;

        pool.balance = balance;
        let new_funder = pool.funders.insert(from);
        self.total_collected = collected;
        self.total_active = active;
        debug!(
            pool = id,
            from = %from,
            amount = %deposit.amount,
            new_funder,
            "deposit recorded"
        );
        self.debug_check();
        Ok(())
    }

    /// Pays the pool balance to its owner and marks the pool completed.
    ///
    /// The transfer runs before any bookkeeping changes; if it fails the pool
    /// stays `Active` with its balance and the call can be retried.
    pub fn finish_pool<S>(&mut self, id: PoolId, settlement: &mut S) -> Result<Payout, Error>
    where
        S: Settlement + ?Sized,
    {
        let total_active = self.total_active;
        let pool = self.pool_mut(id)?;
        require_active(pool)?;
        let payout = Payout {
            pool: id,
            to: pool.owner,
            amount: pool.balance,
        };
        let active = total_active.checked_sub(payout.amount).ok_or_else(|| {
            Error::new(ErrorKind::Corrupt)
                .with_message("pool balance exceeds total active funds")
                .with_pool(id)
        })?;

        if let Err(err) = settlement.transfer_to(payout.to, payout.amount) {
            warn!(pool = id, to = %payout.to, amount = %payout.amount, "payout failed: {err}");
            return Err(Error::new(ErrorKind::TransferFailed)
                .with_message(format!("payout to {} could not be completed", payout.to))
                .with_hint("The pool is still ACTIVE with its balance; retry once the owner can receive funds.")
                .with_pool(id)
                .with_source(err));
        }

        pool.balance = Amount::ZERO;
        pool.state = PoolState::Completed;
        self.total_active = active;
        info!(pool = id, to = %payout.to, amount = %payout.amount, "pool finished");
        self.debug_check();
        Ok(payout)
    }

    /// Replaces the pool owner in any state; returns the previous owner.
    pub fn change_owner(&mut self, id: PoolId, new_owner: Address) -> Result<Address, Error> {
        let pool = self.pool_mut(id)?;
        let new_owner = new_owner
            .require_non_zero("pool owner")
            .map_err(|err| err.with_pool(id))?;
        let previous = std::mem::replace(&mut pool.owner, new_owner);
        debug!(pool = id, from = %previous, to = %new_owner, "pool owner changed");
        self.debug_check();
        Ok(previous)
    }

    pub fn pool_info(&self, id: PoolId) -> Result<PoolInfo, Error> {
        self.pool(id).map(Pool::info)
    }

    pub fn pools(&self) -> impl Iterator<Item = PoolInfo> + '_ {
        self.pools.iter().map(Pool::info)
    }

    pub fn total(&self, kind: TotalKind) -> Result<Amount, Error> {
        match kind {
            TotalKind::Collected => Ok(self.total_collected),
            TotalKind::Active => Ok(self.total_active),
            TotalKind::Pool(id) => self.pool(id).map(Pool::balance),
        }
    }

    fn pool(&self, id: PoolId) -> Result<&Pool, Error> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.pools.get(idx))
            .ok_or_else(|| pool_not_found(id))
    }

    fn pool_mut(&mut self, id: PoolId) -> Result<&mut Pool, Error> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.pools.get_mut(idx))
            .ok_or_else(|| pool_not_found(id))
    }

    // Full-scan audit after each operation; compiled out of release builds.
    fn debug_check(&self) {
        if cfg!(debug_assertions) {
            if let Err(err) = validate::audit(self) {
                panic!("ledger invariant violated: {err}");
            }
        }
    }
}

fn require_active(pool: &Pool) -> Result<(), Error> {
    if pool.state != PoolState::Active {
        return Err(Error::new(ErrorKind::PoolNotActive)
            .with_message(format!("pool is not active (currently {})", pool.state))
            .with_pool(pool.id));
    }
    Ok(())
}

fn pool_not_found(id: PoolId) -> Error {
    Error::new(ErrorKind::PoolNotFound)
        .with_message("pool does not exist")
        .with_pool(id)
}
