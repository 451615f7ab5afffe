//! # crash_unwind
//! Print a backtrace when the process takes a fatal memory fault.
//! ## Usage
//! Call [`init`] once at startup. When `SIGSEGV` or `SIGABRT` arrives, the handler walks
//! the frame-pointer chain from the faulting context, resolves each return address to
//! the nearest exported symbol of the module it belongs to, prints the frames to
//! standard output, and aborts so the usual core dump still happens.
//! ```no_run
//! if let Err(err) = crash_unwind::init() {
//!     eprintln!("running without crash diagnostics: {err}");
//! }
//! ```
//! Nothing on the fault path allocates or takes a lock. Memory that may be corrupt is
//! probed through a pipe before it is read, and ELF metadata is read through
//! bounds-checked views of each module's image.
//!
//! Only frame-pointer unwinding is supported: build with `-C force-frame-pointers=yes`.
//! Only symbols in the dynamic symbol table can be named.
#![no_std]

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("unsupport arch");

#[cfg(not(target_os = "linux"))]
compile_error!("unsupport os");

pub mod arch;
pub mod elf;
mod error;
pub mod interceptor;
pub mod module;
mod os;
pub mod probe;
pub mod report;
pub mod walk;

pub use error::{Error, Result};
pub use interceptor::{State, init, state};
