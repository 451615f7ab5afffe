use core::ffi::c_int;
use core::fmt::Display;

/// Error types returned while arming the crash handler.
///
/// Only the setup path can fail. Once the handler is armed, unreadable frames and
/// unresolvable addresses are reported inline in the backtrace instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The private pipe used to probe memory could not be created.
    Pipe {
        /// A descriptive message about the failure.
        msg: &'static str,
        /// The `errno` reported by the system.
        errno: c_int,
    },

    /// A signal handler could not be installed or restored.
    Signal {
        /// A descriptive message about the failure.
        msg: &'static str,
        /// The signal whose disposition was being changed.
        signal: c_int,
        /// The `errno` reported by the system.
        errno: c_int,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Pipe { msg, errno } => write!(f, "Probe channel error: {msg} (errno {errno})"),
            Error::Signal { msg, signal, errno } => {
                write!(f, "Signal error: {msg} for signal {signal} (errno {errno})")
            }
        }
    }
}

impl core::error::Error for Error {}

/// Creates a probe channel error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn pipe_error(msg: &'static str, errno: c_int) -> Error {
    Error::Pipe { msg, errno }
}

/// Creates a signal installation error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn signal_error(msg: &'static str, signal: c_int, errno: c_int) -> Error {
    Error::Signal { msg, signal, errno }
}

pub type Result<T> = core::result::Result<T, Error>;
