//! Purpose: Provide a stable, serializable ledger audit report model.
//! Exports: `AuditReport`, `AuditStatus`, `AuditIssue`.
//! Role: Shared contract for `fundpool doctor` and API users.
//! Invariants: Reports are additive-only; a report never carries ledger contents.

use std::path::PathBuf;

use super::client::LedgerSummary;
use crate::core::error::{Error, ErrorKind};
use crate::core::pool::PoolId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuditStatus {
    Ok,
    Missing,
    Corrupt,
    Unreadable,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditStatus::Ok => "ok",
            AuditStatus::Missing => "missing",
            AuditStatus::Corrupt => "corrupt",
            AuditStatus::Unreadable => "unreadable",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuditIssue {
    pub kind: ErrorKind,
    pub message: String,
    pub pool: Option<PoolId>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AuditReport {
    pub path: PathBuf,
    pub status: AuditStatus,
    pub summary: Option<LedgerSummary>,
    pub issue: Option<AuditIssue>,
    pub remediation_hints: Vec<String>,
}

impl AuditReport {
    pub fn ok(path: PathBuf, summary: LedgerSummary) -> Self {
        Self {
            path,
            status: AuditStatus::Ok,
            summary: Some(summary),
            issue: None,
            remediation_hints: Vec::new(),
        }
    }

    pub fn missing(path: PathBuf, err: &Error) -> Self {
        Self {
            path,
            status: AuditStatus::Missing,
            summary: None,
            issue: Some(issue(err)),
            remediation_hints: vec!["Create a ledger with `fundpool init --owner <address>`.".to_string()],
        }
    }

    pub fn from_error(path: PathBuf, err: &Error) -> Self {
        let status = if err.kind() == ErrorKind::Corrupt {
            AuditStatus::Corrupt
        } else {
            AuditStatus::Unreadable
        };
        let mut remediation_hints = Vec::new();
        if let Some(hint) = err.hint() {
            remediation_hints.push(hint.to_string());
        }
        if status == AuditStatus::Corrupt {
            remediation_hints.push(
                "Ledger state is inconsistent. Restore ledger.json from a backup; journal.jsonl lists committed operations."
                    .to_string(),
            );
        }
        Self {
            path,
            status,
            summary: None,
            issue: Some(issue(err)),
            remediation_hints,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == AuditStatus::Ok
    }
}

fn issue(err: &Error) -> AuditIssue {
    AuditIssue {
        kind: err.kind(),
        message: err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", err.kind())),
        pool: err.pool(),
    }
}

#[cfg(test)]
mod tests {
    use super::{AuditReport, AuditStatus};
    use crate::core::error::{Error, ErrorKind};
    use std::path::PathBuf;

    #[test]
    fn corrupt_errors_carry_pool_and_hints() {
        let err = Error::new(ErrorKind::Corrupt)
            .with_message("inactive pool has funders")
            .with_pool(2);
        let report = AuditReport::from_error(PathBuf::from("/tmp/ledger.json"), &err);
        assert_eq!(report.status, AuditStatus::Corrupt);
        let issue = report.issue.expect("issue");
        assert_eq!(issue.pool, Some(2));
        assert_eq!(issue.message, "inactive pool has funders");
        assert!(!report.remediation_hints.is_empty());
    }

    #[test]
    fn other_errors_are_unreadable() {
        let err = Error::new(ErrorKind::Usage).with_hint("upgrade");
        let report = AuditReport::from_error(PathBuf::from("/tmp/ledger.json"), &err);
        assert_eq!(report.status, AuditStatus::Unreadable);
        assert_eq!(report.remediation_hints, vec!["upgrade".to_string()]);
        assert_eq!(report.issue.expect("issue").message, "Usage");
    }
}
