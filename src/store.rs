//! Purpose: Persist a ledger and its custody book in a directory on disk.
//! Exports: `LedgerStore`, `LedgerState`, `StoreLock`.
//! Role: Durable backing for the API client; serializes writers across processes.
//! Invariants: Every mutation happens while holding the exclusive `ledger.lock`.
//! Invariants: Snapshots are replaced atomically (write temp, fsync, rename).
//! Invariants: A snapshot that fails its digest or ledger audit is never returned.
//! Invariants: Once the snapshot rename succeeds the operation is committed; the journal trails it.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use libc::{EACCES, EPERM};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::core::address::Address;
use crate::core::error::{Error, ErrorKind};
use crate::core::format::{LEDGER_FORMAT_VERSION, check_version};
use crate::core::ledger::Ledger;
use crate::core::settlement::CustodyBook;
use crate::core::validate::{audit, audit_custody};
use crate::journal::{JournalEntry, JournalOp, journal_time_now};
use crate::ledger_paths::{JOURNAL_FILE, LOCK_FILE, STATE_TMP_FILE, state_path};

const DIGEST_PREFIX: &str = "sha256:";

/// Everything a snapshot holds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LedgerState {
    pub ledger: Ledger,
    pub custody: CustodyBook,
    pub journal_seq: u64,
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    digest: String,
    journal_seq: u64,
    ledger: Ledger,
    custody: CustodyBook,
}

#[derive(Serialize)]
struct DigestBody<'a> {
    journal_seq: u64,
    ledger: &'a Ledger,
    custody: &'a CustodyBook,
}

#[derive(Clone, Debug)]
pub struct LedgerStore {
    dir: PathBuf,
}

/// Held for the duration of a load-mutate-save cycle.
pub struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl LedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state_path(&self) -> PathBuf {
        state_path(&self.dir)
    }

    pub fn journal_path(&self) -> PathBuf {
        self.dir.join(JOURNAL_FILE)
    }

    pub fn exists(&self) -> bool {
        self.state_path().exists()
    }

    pub fn ensure_exists(&self) -> Result<(), Error> {
        if self.exists() {
            return Ok(());
        }
        Err(ledger_not_found(&self.state_path()))
    }

    /// Creates the directory and an empty ledger owned by `owner`.
    pub fn init(&self, owner: Address) -> Result<LedgerState, Error> {
        let ledger = Ledger::new(owner)?;
        fs::create_dir_all(&self.dir)
            .map_err(|err| Error::new(ErrorKind::Io).with_path(&self.dir).with_source(err))?;
        let lock = self.lock()?;
        if self.exists() {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message("ledger already exists")
                .with_path(self.state_path())
                .with_hint("Use a different --dir or remove the existing ledger directory."));
        }
        let mut state = LedgerState {
            ledger,
            custody: CustodyBook::new(),
            journal_seq: 0,
        };
        self.commit(&lock, &mut state, JournalOp::Init { owner })?;
        Ok(state)
    }

    pub fn lock(&self) -> Result<StoreLock, Error> {
        let path = self.dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|err| Error::new(io_error_kind(&err)).with_path(&path).with_source(err))?;
        file.lock_exclusive().map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_message("failed to lock ledger")
                .with_path(&path)
                .with_source(err)
        })?;
        debug!(path = %path.display(), "ledger lock acquired");
        Ok(StoreLock { file })
    }

    pub fn load(&self) -> Result<LedgerState, Error> {
        let path = self.state_path();
        let raw = fs::read(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                ledger_not_found(&path)
            } else {
                Error::new(io_error_kind(&err)).with_path(&path).with_source(err)
            }
        })?;
        decode_snapshot(&raw).map_err(|err| err.with_path(&path))
    }

    /// Saves `state` with the next journal sequence and appends the matching
    /// journal line.
    ///
    /// The saved snapshot is authoritative. A journal append that fails after
    /// the rename is logged and the commit still succeeds; the missing line
    /// shows up as a gap in `seq`.
    pub fn commit(
        &self,
        lock: &StoreLock,
        state: &mut LedgerState,
        op: JournalOp,
    ) -> Result<JournalEntry, Error> {
        state.journal_seq += 1;
        if let Err(err) = self.save(lock, state) {
            state.journal_seq -= 1;
            return Err(err);
        }
        let entry = JournalEntry {
            seq: state.journal_seq,
            time: journal_time_now(),
            op,
        };
        if let Err(err) = self.append_journal(lock, &entry) {
            warn!(seq = entry.seq, op = entry.op.name(), "journal append failed: {err}");
        }
        Ok(entry)
    }

    pub fn save(&self, _lock: &StoreLock, state: &LedgerState) -> Result<(), Error> {
        let bytes = encode_snapshot(state)?;
        let tmp_path = self.dir.join(STATE_TMP_FILE);
        let path = self.state_path();
        let io_err = |err: io::Error, at: &Path| {
            Error::new(io_error_kind(&err)).with_path(at).with_source(err)
        };

        let mut file = File::create(&tmp_path).map_err(|err| io_err(err, &tmp_path))?;
        file.write_all(&bytes).map_err(|err| io_err(err, &tmp_path))?;
        file.sync_all().map_err(|err| io_err(err, &tmp_path))?;
        fs::rename(&tmp_path, &path).map_err(|err| io_err(err, &path))?;
        debug!(path = %path.display(), seq = state.journal_seq, "ledger saved");
        Ok(())
    }

    fn append_journal(&self, _lock: &StoreLock, entry: &JournalEntry) -> Result<(), Error> {
        let path = self.journal_path();
        let mut line = serde_json::to_vec(entry).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode journal entry")
                .with_source(err)
        })?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| Error::new(io_error_kind(&err)).with_path(&path).with_source(err))?;
        file.write_all(&line)
            .map_err(|err| Error::new(io_error_kind(&err)).with_path(&path).with_source(err))
    }

    /// Reads every journal line. A final line without its newline is an
    /// append still in progress (or one cut short by a crash) and is skipped
    /// when it does not parse.
    pub fn read_journal(&self) -> Result<Vec<JournalEntry>, Error> {
        let path = self.journal_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(Error::new(io_error_kind(&err)).with_path(&path).with_source(err));
            }
        };
        let mut entries = Vec::new();
        for (idx, raw) in text.split_inclusive('\n').enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(err) if !raw.ends_with('\n') => {
                    warn!(line = idx + 1, "skipping incomplete journal line: {err}");
                }
                Err(err) => {
                    return Err(Error::new(ErrorKind::Corrupt)
                        .with_message(format!("invalid journal line {}", idx + 1))
                        .with_path(&path)
                        .with_source(err));
                }
            }
        }
        Ok(entries)
    }
}

fn ledger_not_found(path: &Path) -> Error {
    Error::new(ErrorKind::NotFound)
        .with_message("ledger not found")
        .with_path(path)
        .with_hint("Create one with `fundpool init --owner <address>`.")
}

fn digest_hex(state: &LedgerState) -> Result<String, Error> {
    let body = DigestBody {
        journal_seq: state.journal_seq,
        ledger: &state.ledger,
        custody: &state.custody,
    };
    let bytes = serde_json::to_vec(&body).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode ledger")
            .with_source(err)
    })?;
    let digest = Sha256::digest(&bytes);
    let mut out = String::with_capacity(DIGEST_PREFIX.len() + digest.len() * 2);
    out.push_str(DIGEST_PREFIX);
    for byte in digest.iter() {
        out.push_str(&format!("{byte:02x}"));
    }
    Ok(out)
}

fn encode_snapshot(state: &LedgerState) -> Result<Vec<u8>, Error> {
    let snapshot = SnapshotFile {
        version: LEDGER_FORMAT_VERSION,
        digest: digest_hex(state)?,
        journal_seq: state.journal_seq,
        ledger: state.ledger.clone(),
        custody: state.custody.clone(),
    };
    let mut bytes = serde_json::to_vec_pretty(&snapshot).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode ledger")
            .with_source(err)
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn decode_snapshot(raw: &[u8]) -> Result<LedgerState, Error> {
    let value: serde_json::Value = serde_json::from_slice(raw).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("ledger snapshot is not valid JSON")
            .with_source(err)
    })?;
    let version = value
        .get("version")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| {
            Error::new(ErrorKind::Corrupt).with_message("ledger snapshot has no version")
        })?;
    check_version(u32::try_from(version).unwrap_or(u32::MAX))?;

    let snapshot: SnapshotFile = serde_json::from_value(value).map_err(|err| {
        Error::new(ErrorKind::Corrupt)
            .with_message("ledger snapshot has an invalid shape")
            .with_source(err)
    })?;
    let state = LedgerState {
        ledger: snapshot.ledger,
        custody: snapshot.custody,
        journal_seq: snapshot.journal_seq,
    };
    if digest_hex(&state)? != snapshot.digest {
        return Err(Error::new(ErrorKind::Corrupt)
            .with_message("ledger snapshot digest mismatch")
            .with_hint("The file was modified outside fundpool; restore it from a backup."));
    }
    audit(&state.ledger)?;
    audit_custody(&state.ledger, &state.custody)?;
    Ok(state)
}

fn io_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

fn lock_error_kind(err: &io::Error) -> ErrorKind {
    let errno = err.raw_os_error().unwrap_or_default();
    if errno == EACCES || errno == EPERM {
        return ErrorKind::Permission;
    }
    match err.kind() {
        io::ErrorKind::WouldBlock => ErrorKind::Busy,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}
