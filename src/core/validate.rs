// Full-scan ledger audit. Hot paths keep aggregates incrementally; this is
// for explicit validation (load, doctor) and debug-only assertions.
use crate::core::amount::Amount;
use crate::core::error::{Error, ErrorKind};
use crate::core::ledger::Ledger;
use crate::core::pool::{PoolId, PoolState};
use crate::core::settlement::CustodyBook;

pub fn audit(ledger: &Ledger) -> Result<(), Error> {
    if ledger.owner.is_zero() {
        return Err(corrupt("ledger owner is the zero address"));
    }
    if ledger.next_id != ledger.pools.len() as PoolId {
        return Err(corrupt(format!(
            "next id {} does not match pool count {}",
            ledger.next_id,
            ledger.pools.len()
        )));
    }

    let mut active_sum = Amount::ZERO;
    for (idx, pool) in ledger.pools.iter().enumerate() {
        if pool.id != idx as PoolId {
            return Err(corrupt(format!("pool at index {idx} has id {}", pool.id)).with_pool(pool.id));
        }
        if pool.owner.is_zero() {
            return Err(corrupt("pool owner is the zero address").with_pool(pool.id));
        }
        if pool.funders.has_duplicates() {
            return Err(corrupt("funder list contains duplicates").with_pool(pool.id));
        }
        if pool.funders.iter().any(|funder| funder.is_zero()) {
            return Err(corrupt("funder list contains the zero address").with_pool(pool.id));
        }
        match pool.state {
            PoolState::Active => {
                active_sum = active_sum
                    .checked_add(pool.balance)
                    .ok_or_else(|| corrupt("active balances overflow"))?;
            }
            PoolState::Inactive | PoolState::Completed => {
                if !pool.balance.is_zero() {
                    return Err(corrupt(format!(
                        "{} pool holds a non-zero balance",
                        pool.state
                    ))
                    .with_pool(pool.id));
                }
                if pool.state == PoolState::Inactive && !pool.funders.is_empty() {
                    return Err(corrupt("inactive pool has funders").with_pool(pool.id));
                }
            }
        }
    }

    if active_sum != ledger.total_active {
        return Err(corrupt(format!(
            "total active {} does not equal sum of active balances {}",
            ledger.total_active, active_sum
        )));
    }
    if ledger.total_collected < ledger.total_active {
        return Err(corrupt(format!(
            "total collected {} is below total active {}",
            ledger.total_collected, ledger.total_active
        )));
    }
    Ok(())
}

/// Cross-checks the custody book against the ledger aggregates: every unit
/// collected was deposited, and every unit paid out left an active pool.
pub fn audit_custody(ledger: &Ledger, book: &CustodyBook) -> Result<(), Error> {
    let deposited = book
        .total_deposited()
        .ok_or_else(|| corrupt("custody deposits overflow"))?;
    let paid_out = book
        .total_paid_out()
        .ok_or_else(|| corrupt("custody payouts overflow"))?;
    if deposited != ledger.total_collected {
        return Err(corrupt(format!(
            "custody deposits {deposited} do not match total collected {}",
            ledger.total_collected
        )));
    }
    let released = ledger
        .total_collected
        .checked_sub(ledger.total_active)
        .ok_or_else(|| corrupt("total collected is below total active"))?;
    if paid_out != released {
        return Err(corrupt(format!(
            "custody payouts {paid_out} do not match released funds {released}"
        )));
    }
    Ok(())
}

fn corrupt(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Corrupt).with_message(message)
}
