//! Async-signal-safe system primitives used by the probe and the fault report.
//!
//! Every function here is a thin wrapper over a single system call so that it can be
//! invoked from inside the fault handler.
use core::ffi::c_int;

cfg_if::cfg_if! {
    if #[cfg(feature = "use-syscall")]{
        pub(crate) mod linux_syscall;
        pub(crate) use linux_syscall::*;
    }else {
        pub(crate) mod unix;
        pub(crate) use unix::*;
    }
}

/// Result of a raw system call, carrying `errno` on failure.
pub(crate) type SysResult<T> = core::result::Result<T, c_int>;

pub(crate) const STDOUT_FILENO: c_int = 1;

/// Returns the calling thread's `errno`.
#[inline]
pub(crate) fn errno() -> c_int {
    unsafe { *libc::__errno_location() }
}

/// Writes the whole buffer, retrying on short writes and `EINTR`.
pub(crate) fn write_all(fd: c_int, mut bytes: &[u8]) -> SysResult<()> {
    while !bytes.is_empty() {
        match unsafe { write(fd, bytes.as_ptr(), bytes.len()) } {
            Ok(0) => return Err(libc::EIO),
            Ok(n) => bytes = &bytes[n..],
            Err(libc::EINTR) => {}
            Err(errno) => return Err(errno),
        }
    }
    Ok(())
}
