//! Memory validity probing from inside a fault handler.
//!
//! Dereferencing a corrupted frame pointer would fault again while the handler is
//! running. Instead, the bytes are handed to `write(2)` on a private pipe: the kernel
//! validates the source buffer and reports `EFAULT` rather than raising a signal.
use crate::{Result, error::pipe_error, os};
use core::{ffi::c_int, ops::Deref};

/// The largest region a single probe may cover. Pipe writes up to this size are atomic.
pub const MAX_PROBE_LEN: usize = 512;

/// Decides whether memory can be read without faulting.
pub trait Probe {
    /// Returns `true` if all `len` bytes starting at `addr` are readable.
    fn is_readable(&self, addr: usize, len: usize) -> bool;

    /// Returns `true` if the machine word at `addr` is readable.
    #[inline]
    fn is_valid_word(&self, addr: usize) -> bool {
        self.is_readable(addr, size_of::<usize>())
    }
}

/// A probe backed by the two ends of a pipe.
///
/// This is a plain pair of descriptors and does not close them; see [`ProbeChannel`]
/// for the owning version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeProbe {
    read_fd: c_int,
    write_fd: c_int,
}

impl PipeProbe {
    /// Creates a probe from raw pipe descriptors.
    ///
    /// # Safety
    /// `read_fd` and `write_fd` must be the two ends of the same non-blocking pipe, and
    /// must stay open for as long as the probe is used.
    #[inline]
    pub const unsafe fn from_raw_fds(read_fd: c_int, write_fd: c_int) -> Self {
        Self { read_fd, write_fd }
    }

    /// Returns `[read, write]`.
    #[inline]
    pub const fn as_raw_fds(&self) -> [c_int; 2] {
        [self.read_fd, self.write_fd]
    }

    /// Pulls back whatever a successful probe pushed into the pipe so it never fills up.
    fn drain(&self, mut len: usize) {
        let mut scratch = [0u8; MAX_PROBE_LEN];
        while len > 0 {
            match unsafe { os::read(self.read_fd, scratch.as_mut_ptr(), len.min(scratch.len())) } {
                Ok(0) => break,
                Ok(n) => len -= n.min(len),
                Err(libc::EINTR) => {}
                Err(_) => break,
            }
        }
    }
}

impl Probe for PipeProbe {
    fn is_readable(&self, addr: usize, len: usize) -> bool {
        debug_assert!(len <= MAX_PROBE_LEN);
        if addr == 0 || addr.checked_add(len).is_none() {
            return false;
        }
        match unsafe { os::write(self.write_fd, addr as *const u8, len) } {
            Ok(written) => {
                self.drain(written);
                written == len
            }
            Err(_) => false,
        }
    }
}

/// An owned probe pipe. Both descriptors are closed on drop.
#[derive(Debug)]
pub struct ProbeChannel {
    probe: PipeProbe,
}

impl ProbeChannel {
    /// Creates the private pipe.
    pub fn open() -> Result<Self> {
        let [read_fd, write_fd] =
            os::pipe().map_err(|errno| pipe_error("failed to create probe pipe", errno))?;
        #[cfg(feature = "log")]
        log::trace!("[Probe] pipe read fd: {}, write fd: {}", read_fd, write_fd);
        Ok(Self {
            probe: PipeProbe { read_fd, write_fd },
        })
    }

    /// Releases ownership of the descriptors without closing them.
    #[inline]
    pub fn into_probe(self) -> PipeProbe {
        let probe = self.probe;
        core::mem::forget(self);
        probe
    }
}

impl Deref for ProbeChannel {
    type Target = PipeProbe;

    fn deref(&self) -> &Self::Target {
        &self.probe
    }
}

impl Drop for ProbeChannel {
    fn drop(&mut self) {
        os::close(self.probe.read_fd);
        os::close(self.probe.write_fd);
    }
}
