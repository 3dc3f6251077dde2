//! Purpose: Define the public API client over a ledger directory.
//! Exports: `LedgerClient`, `LedgerSummary`, `ApiResult`.
//! Role: Stable boundary for the CLI; one transaction per operation.
//! Invariants: Each mutation runs load -> operation -> audit -> save -> journal under the store lock.
//! Invariants: A failed operation saves nothing and appends no journal line.
//! Invariants: An operation whose snapshot was saved reports success even if its journal line is lost.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::validation::AuditReport;
use crate::core::address::Address;
use crate::core::amount::Amount;
use crate::core::error::{Error, ErrorKind};
use crate::core::ledger::TotalKind;
use crate::core::pool::{PoolId, PoolInfo};
use crate::core::settlement::{CustodyBook, Deposit, Payout};
use crate::core::validate::{audit, audit_custody};
use crate::journal::{JournalEntry, JournalOp};
use crate::ledger_paths::default_ledger_dir;
use crate::store::{LedgerState, LedgerStore};

pub type ApiResult<T> = Result<T, Error>;

/// Ledger-wide figures reported by `init` and `summary`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LedgerSummary {
    pub owner: Address,
    pub pool_count: usize,
    pub total_collected: Amount,
    pub total_active: Amount,
}

impl LedgerSummary {
    fn of(state: &LedgerState) -> Self {
        Self {
            owner: state.ledger.owner(),
            pool_count: state.ledger.pool_count(),
            total_collected: state.ledger.total_collected(),
            total_active: state.ledger.total_active(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LedgerClient {
    store: LedgerStore,
}

impl Default for LedgerClient {
    fn default() -> Self {
        Self::new(default_ledger_dir())
    }
}

impl LedgerClient {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            store: LedgerStore::new(dir),
        }
    }

    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    pub fn init(&self, owner: Address) -> ApiResult<LedgerSummary> {
        let state = self.store.init(owner)?;
        Ok(LedgerSummary::of(&state))
    }

    pub fn create_pool(&self, owner: Address) -> ApiResult<PoolInfo> {
        self.transact(|state| {
            let id = state.ledger.create_pool(owner)?;
            Ok((state.ledger.pool_info(id)?, JournalOp::CreatePool { pool: id, owner }))
        })
    }

    pub fn launch_pool(&self, id: PoolId) -> ApiResult<PoolInfo> {
        self.transact(|state| {
            state.ledger.launch_pool(id)?;
            Ok((state.ledger.pool_info(id)?, JournalOp::LaunchPool { pool: id }))
        })
    }

    /// Records `deposit` against the pool and the custody book together.
    pub fn deposit(&self, id: PoolId, deposit: Deposit) -> ApiResult<PoolInfo> {
        self.transact(|state| {
            if !state.custody.can_record(&deposit) {
                return Err(Error::new(ErrorKind::AmountOverflow)
                    .with_message("deposit overflows the funder's custody total")
                    .with_pool(id));
            }
            state.ledger.deposit(id, deposit)?;
            state.custody.record_deposit(&deposit).map_err(|err| {
                Error::new(ErrorKind::AmountOverflow)
                    .with_pool(id)
                    .with_source(err)
            })?;
            let op = JournalOp::Deposit {
                pool: id,
                from: deposit.from,
                amount: deposit.amount,
            };
            Ok((state.ledger.pool_info(id)?, op))
        })
    }

    pub fn finish_pool(&self, id: PoolId) -> ApiResult<Payout> {
        self.transact(|state| {
            let payout = state.ledger.finish_pool(id, &mut state.custody)?;
            let op = JournalOp::FinishPool {
                pool: id,
                to: payout.to,
                amount: payout.amount,
            };
            Ok((payout, op))
        })
    }

    /// Returns the owner that was replaced.
    pub fn change_owner(&self, id: PoolId, new_owner: Address) -> ApiResult<Address> {
        self.transact(|state| {
            let previous = state.ledger.change_owner(id, new_owner)?;
            let op = JournalOp::ChangeOwner {
                pool: id,
                from: previous,
                to: new_owner,
            };
            Ok((previous, op))
        })
    }

    pub fn pool_info(&self, id: PoolId) -> ApiResult<PoolInfo> {
        self.store.load()?.ledger.pool_info(id)
    }

    pub fn list_pools(&self) -> ApiResult<Vec<PoolInfo>> {
        Ok(self.store.load()?.ledger.pools().collect())
    }

    pub fn summary(&self) -> ApiResult<LedgerSummary> {
        Ok(LedgerSummary::of(&self.store.load()?))
    }

    pub fn total(&self, kind: TotalKind) -> ApiResult<Amount> {
        self.store.load()?.ledger.total(kind)
    }

    pub fn custody(&self) -> ApiResult<CustodyBook> {
        Ok(self.store.load()?.custody)
    }

    /// Reads the journal under the store lock so no append is in flight.
    pub fn history(&self) -> ApiResult<Vec<JournalEntry>> {
        self.store.ensure_exists()?;
        let _lock = self.store.lock()?;
        self.store.read_journal()
    }

    /// Audits the snapshot; load failures become report issues, not errors.
    pub fn doctor(&self) -> AuditReport {
        let path = self.store.state_path();
        match self.store.load() {
            Ok(state) => AuditReport::ok(path, LedgerSummary::of(&state)),
            Err(err) if err.kind() == ErrorKind::NotFound => AuditReport::missing(path, &err),
            Err(err) => AuditReport::from_error(path, &err),
        }
    }

    fn transact<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&mut LedgerState) -> Result<(T, JournalOp), Error>,
    {
        self.store.ensure_exists()?;
        let lock = self.store.lock()?;
        let mut state = self.store.load()?;
        let (out, journal_op) = op(&mut state)?;
        audit(&state.ledger)?;
        audit_custody(&state.ledger, &state.custody)?;
        let entry = self.store.commit(&lock, &mut state, journal_op)?;
        debug!(seq = entry.seq, op = entry.op.name(), "ledger operation committed");
        Ok(out)
    }
}
