use super::SysResult;
use core::ffi::c_int;
use syscalls::Sysno;

#[inline]
fn from_ret(value: usize) -> SysResult<usize> {
    if value > -4096isize as usize {
        // Truncation of the error value is guaranteed to never occur due to
        // the above check. This is the same check that musl uses:
        // https://git.musl-libc.org/cgit/musl/tree/src/internal/syscall_ret.c?h=v1.1.15
        return Err((value as isize).wrapping_neg() as c_int);
    }
    Ok(value)
}

/// Creates a non-blocking, close-on-exec pipe and returns `[read, write]`.
pub(crate) fn pipe() -> SysResult<[c_int; 2]> {
    let mut fds: [c_int; 2] = [-1; 2];
    unsafe {
        from_ret(syscalls::raw_syscall!(
            Sysno::pipe2,
            fds.as_mut_ptr(),
            libc::O_CLOEXEC | libc::O_NONBLOCK
        ))?;
    }
    Ok(fds)
}

/// # Safety
/// The kernel validates `buf`; an unreadable buffer yields `EFAULT` instead of a fault.
#[inline]
pub(crate) unsafe fn write(fd: c_int, buf: *const u8, len: usize) -> SysResult<usize> {
    unsafe { from_ret(syscalls::raw_syscall!(Sysno::write, fd, buf, len)) }
}

/// # Safety
/// `buf` must be valid for `len` bytes of writes.
#[inline]
pub(crate) unsafe fn read(fd: c_int, buf: *mut u8, len: usize) -> SysResult<usize> {
    unsafe { from_ret(syscalls::raw_syscall!(Sysno::read, fd, buf, len)) }
}

#[inline]
pub(crate) fn close(fd: c_int) {
    unsafe {
        let _ = syscalls::raw_syscall!(Sysno::close, fd);
    }
}
