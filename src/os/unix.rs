use super::{SysResult, errno};
use core::ffi::c_int;

#[inline]
fn from_ret(ret: isize) -> SysResult<usize> {
    if ret < 0 {
        return Err(errno());
    }
    Ok(ret as usize)
}

/// Creates a non-blocking, close-on-exec pipe and returns `[read, write]`.
pub(crate) fn pipe() -> SysResult<[c_int; 2]> {
    let mut fds = [-1; 2];
    let ret = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC | libc::O_NONBLOCK) };
    from_ret(ret as isize)?;
    Ok(fds)
}

/// # Safety
/// The kernel validates `buf`; an unreadable buffer yields `EFAULT` instead of a fault.
#[inline]
pub(crate) unsafe fn write(fd: c_int, buf: *const u8, len: usize) -> SysResult<usize> {
    from_ret(unsafe { libc::write(fd, buf.cast(), len) })
}

/// # Safety
/// `buf` must be valid for `len` bytes of writes.
#[inline]
pub(crate) unsafe fn read(fd: c_int, buf: *mut u8, len: usize) -> SysResult<usize> {
    from_ret(unsafe { libc::read(fd, buf.cast(), len) })
}

#[inline]
pub(crate) fn close(fd: c_int) {
    unsafe { libc::close(fd) };
}
