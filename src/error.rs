// Error types for process accounting reads and signal delivery

use std::io;

use thiserror::Error;

use crate::killer::KillMode;

/// Errors raised while reading one process's accounting data.
///
/// `NotFound` and `PermissionDenied` are ordinary churn — the process exited
/// between enumeration and read, or belongs to another user — and callers
/// skip them silently. `Malformed` and `Io` are logged before the pid is
/// skipped.
#[derive(Debug, Error)]
pub enum ProcError {
    /// The process exited between enumeration and read.
    #[error("process is gone")]
    NotFound,

    /// The accounting files are not readable by this user.
    #[error("permission denied")]
    PermissionDenied,

    /// A record did not match the expected field layout.
    #[error("malformed record: {0}")]
    Malformed(String),

    /// Any other I/O failure.
    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for ProcError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(err),
        }
    }
}

impl ProcError {
    /// True for the error kinds a caller drops without logging.
    pub const fn is_silent(&self) -> bool {
        matches!(self, Self::NotFound | Self::PermissionDenied)
    }
}

/// Failure to deliver a signal to the chosen victim.
///
/// Never fatal: the victim may have exited on its own before the signal
/// (ESRCH), or may be out of reach (EPERM). The caller logs and keeps
/// looping.
#[derive(Debug, Error)]
#[error("failed to send {mode} to pid {pid}: {errno}")]
pub struct SignalError {
    pub pid: i32,
    pub mode: KillMode,
    pub errno: nix::errno::Errno,
}
