// Ledger error model: one struct with a stable kind plus optional context.
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::pool::PoolId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    PoolNotFound,
    AlreadyExists,
    Busy,
    Permission,
    Corrupt,
    Io,
    InvalidAddress,
    InvalidStateTransition,
    PoolNotActive,
    TransferFailed,
    AmountOverflow,
    NotFound,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    pool: Option<PoolId>,
    path: Option<PathBuf>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            pool: None,
            path: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn pool(&self) -> Option<PoolId> {
        self.pool
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_pool(mut self, pool: PoolId) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(pool) = self.pool {
            write!(f, " (pool: {pool})")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::PoolNotFound => 3,
        ErrorKind::AlreadyExists => 4,
        ErrorKind::Busy => 5,
        ErrorKind::Permission => 6,
        ErrorKind::Corrupt => 7,
        ErrorKind::Io => 8,
        ErrorKind::InvalidAddress => 9,
        ErrorKind::InvalidStateTransition => 10,
        ErrorKind::PoolNotActive => 11,
        ErrorKind::TransferFailed => 12,
        ErrorKind::AmountOverflow => 13,
        ErrorKind::NotFound => 14,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, to_exit_code};
    use std::error::Error as StdError;

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (ErrorKind::Internal, 1),
            (ErrorKind::Usage, 2),
            (ErrorKind::PoolNotFound, 3),
            (ErrorKind::AlreadyExists, 4),
            (ErrorKind::Busy, 5),
            (ErrorKind::Permission, 6),
            (ErrorKind::Corrupt, 7),
            (ErrorKind::Io, 8),
            (ErrorKind::InvalidAddress, 9),
            (ErrorKind::InvalidStateTransition, 10),
            (ErrorKind::PoolNotActive, 11),
            (ErrorKind::TransferFailed, 12),
            (ErrorKind::AmountOverflow, 13),
            (ErrorKind::NotFound, 14),
        ];

        for (kind, code) in cases {
            assert_eq!(to_exit_code(kind), code);
        }
    }

    #[test]
    fn display_includes_message_and_pool() {
        let err = Error::new(ErrorKind::PoolNotActive)
            .with_message("pool is not active")
            .with_pool(4);
        assert_eq!(err.to_string(), "PoolNotActive: pool is not active (pool: 4)");
    }

    #[test]
    fn source_is_exposed() {
        let io = std::io::Error::other("disk gone");
        let err = Error::new(ErrorKind::Io).with_source(io);
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "disk gone");
    }
}
