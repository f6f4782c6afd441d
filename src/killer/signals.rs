// Signal delivery to the chosen victim

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::error::SignalError;

/// Which signal a pressure level calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillMode {
    /// SIGTERM, lets the victim shut down cleanly
    Graceful,
    /// SIGKILL, for hard pressure
    Forceful,
}

impl KillMode {
    pub const fn signal(self) -> Signal {
        match self {
            Self::Graceful => Signal::SIGTERM,
            Self::Forceful => Signal::SIGKILL,
        }
    }
}

impl std::fmt::Display for KillMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.signal().as_str())
    }
}

/// Deliver the signal once.
///
/// The victim may have exited since selection (ESRCH) or be out of reach
/// (EPERM); either way the caller logs and keeps looping. Delivery is
/// never retried within a tick and never escalated here — the kill
/// threshold decides the mode before this point.
pub fn send(pid: i32, mode: KillMode) -> Result<(), SignalError> {
    signal::kill(Pid::from_raw(pid), mode.signal()).map_err(|errno| SignalError {
        pid,
        mode,
        errno,
    })
}
