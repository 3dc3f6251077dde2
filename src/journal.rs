//! Purpose: Define the append-only journal record for committed ledger operations.
//! Exports: `JournalEntry`, `JournalOp`, `journal_time_now`.
//! Role: One JSON line per committed operation, written by the store after each save.
//! Invariants: `seq` increases by one per committed operation, starting at 1 for `init`.
//! Invariants: Field names are stable once published; new ops are additive-only.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;

use crate::core::address::Address;
use crate::core::amount::Amount;
use crate::core::pool::PoolId;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub time: String,
    #[serde(flatten)]
    pub op: JournalOp,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalOp {
    Init {
        owner: Address,
    },
    CreatePool {
        pool: PoolId,
        owner: Address,
    },
    LaunchPool {
        pool: PoolId,
    },
    Deposit {
        pool: PoolId,
        from: Address,
        amount: Amount,
    },
    FinishPool {
        pool: PoolId,
        to: Address,
        amount: Amount,
    },
    ChangeOwner {
        pool: PoolId,
        from: Address,
        to: Address,
    },
}

impl JournalOp {
    pub fn name(&self) -> &'static str {
        match self {
            JournalOp::Init { .. } => "init",
            JournalOp::CreatePool { .. } => "create_pool",
            JournalOp::LaunchPool { .. } => "launch_pool",
            JournalOp::Deposit { .. } => "deposit",
            JournalOp::FinishPool { .. } => "finish_pool",
            JournalOp::ChangeOwner { .. } => "change_owner",
        }
    }

    pub fn pool(&self) -> Option<PoolId> {
        match self {
            JournalOp::Init { .. } => None,
            JournalOp::CreatePool { pool, .. }
            | JournalOp::LaunchPool { pool }
            | JournalOp::Deposit { pool, .. }
            | JournalOp::FinishPool { pool, .. }
            | JournalOp::ChangeOwner { pool, .. } => Some(*pool),
        }
    }
}

/// RFC 3339 UTC timestamp for a journal line; falls back to the epoch when
/// the clock cannot be read.
pub fn journal_time_now() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos() as i128)
        .unwrap_or_default();
    time::OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::{JournalEntry, JournalOp, journal_time_now};
    use crate::core::address::Address;
    use crate::core::amount::Amount;
    use serde_json::Value;

    #[test]
    fn entry_flattens_op_tag() {
        let entry = JournalEntry {
            seq: 3,
            time: "2026-02-01T00:00:00Z".to_string(),
            op: JournalOp::Deposit {
                pool: 1,
                from: Address::from_bytes([2; 20]),
                amount: Amount::new(5),
            },
        };
        let value = serde_json::to_value(&entry).expect("encode");
        assert_eq!(value.get("seq").and_then(Value::as_u64), Some(3));
        assert_eq!(value.get("op").and_then(Value::as_str), Some("deposit"));
        assert_eq!(value.get("pool").and_then(Value::as_u64), Some(1));
        assert_eq!(value.get("amount").and_then(Value::as_str), Some("5"));

        let back: JournalEntry = serde_json::from_value(value).expect("decode");
        assert_eq!(back, entry);
        assert_eq!(back.op.name(), "deposit");
        assert_eq!(back.op.pool(), Some(1));
    }

    #[test]
    fn time_is_rfc3339() {
        let now = journal_time_now();
        assert!(now.contains('T'));
        assert!(now.ends_with('Z'));
    }
}
