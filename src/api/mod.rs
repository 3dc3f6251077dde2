//! Purpose: Define the stable public Rust API boundary for fundpool.
//! Exports: Core value types, the ledger, settlement capability, and clients.
//! Role: Public, additive-only surface used by the CLI and embedders.
//! Invariants: Mutations reach the ledger only through `Ledger`, `SharedLedger`, or `LedgerClient`.

mod client;
mod shared;
mod validation;

pub use crate::core::address::Address;
pub use crate::core::amount::Amount;
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::ledger::{Ledger, TotalKind};
pub use crate::core::pool::{PoolId, PoolInfo, PoolState};
pub use crate::core::settlement::{
    CustodyAccount, CustodyBook, Deposit, MemorySettlement, Payout, Settlement, TransferError,
};
pub use crate::journal::{JournalEntry, JournalOp};
pub use client::{ApiResult, LedgerClient, LedgerSummary};
pub use shared::SharedLedger;
pub use validation::{AuditIssue, AuditReport, AuditStatus};
