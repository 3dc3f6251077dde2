//! Purpose: Shared ledger-directory resolution helpers.
//! Exports: `default_ledger_dir`, `STATE_FILE`, `LOCK_FILE`, `JOURNAL_FILE`.
//! Role: Keep CLI and API-client path semantics aligned from one source.
//! Invariants: Default ledger directory remains `~/.fundpool`.

use std::path::{Path, PathBuf};

pub const STATE_FILE: &str = "ledger.json";
pub const STATE_TMP_FILE: &str = "ledger.json.tmp";
pub const LOCK_FILE: &str = "ledger.lock";
pub const JOURNAL_FILE: &str = "journal.jsonl";

pub fn default_ledger_dir() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".fundpool")
}

pub fn state_path(dir: &Path) -> PathBuf {
    dir.join(STATE_FILE)
}

#[cfg(test)]
mod tests {
    use super::{STATE_FILE, state_path};
    use std::path::Path;

    #[test]
    fn state_file_lives_in_ledger_dir() {
        let path = state_path(Path::new("/tmp/ledger"));
        assert_eq!(path, Path::new("/tmp/ledger").join(STATE_FILE));
    }
}
