//! Purpose: Centralize ledger snapshot format versioning and upgrade guidance.
//! Exports: `LEDGER_FORMAT_VERSION`, `SUPPORTED_LEDGER_FORMAT_VERSIONS`, `check_version`.
//! Role: Shared policy for gating on-disk compatibility when a ledger is opened.
//! Invariants: Version list is additive; bump only for incompatible snapshot changes.

use crate::core::error::{Error, ErrorKind};

pub const LEDGER_FORMAT_VERSION: u32 = 1;
pub const SUPPORTED_LEDGER_FORMAT_VERSIONS: &[u32] = &[LEDGER_FORMAT_VERSION];

pub fn check_version(detected: u32) -> Result<(), Error> {
    if SUPPORTED_LEDGER_FORMAT_VERSIONS.contains(&detected) {
        return Ok(());
    }
    Err(ledger_version_error(detected))
}

pub fn ledger_version_error(detected: u32) -> Error {
    let supported = SUPPORTED_LEDGER_FORMAT_VERSIONS
        .iter()
        .map(|version| version.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Error::new(ErrorKind::Usage)
        .with_message(format!(
            "unsupported ledger format version {detected} (supported: {supported})"
        ))
        .with_hint("Upgrade fundpool, then run `fundpool doctor` to check the ledger.")
}

#[cfg(test)]
mod tests {
    use super::{LEDGER_FORMAT_VERSION, check_version};
    use crate::core::error::ErrorKind;

    #[test]
    fn current_version_is_accepted() {
        check_version(LEDGER_FORMAT_VERSION).expect("current");
    }

    #[test]
    fn unknown_version_names_supported_list() {
        let err = check_version(99).expect_err("future");
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(err.message().unwrap_or_default().contains("supported: 1"));
        assert!(err.hint().is_some());
    }
}
