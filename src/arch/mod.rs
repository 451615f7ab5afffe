//! Machine-context access for the architectures the unwinder supports.
//!
//! Each supported architecture keeps the frame pointer in a dedicated register and
//! stores `[saved frame pointer, return address]` at the address it points to. Porting
//! to a new architecture means adding one module here.
use core::ffi::c_void;

/// Read access to the two registers the unwinder starts from.
pub trait RegisterContext {
    /// The frame-pointer register at the moment the context was captured.
    fn frame_pointer(&self) -> usize;
    /// The instruction-pointer register at the moment the context was captured.
    fn instruction_pointer(&self) -> usize;
}

/// The `ucontext_t` the kernel hands to an `SA_SIGINFO` handler.
pub struct UContext<'a> {
    ctx: &'a libc::ucontext_t,
}

impl<'a> UContext<'a> {
    /// Wraps the third argument of an `SA_SIGINFO` handler.
    ///
    /// # Safety
    /// `ptr` must be null or point to a `ucontext_t` that outlives `'a`.
    #[inline]
    pub unsafe fn from_raw(ptr: *const c_void) -> Option<Self> {
        unsafe { ptr.cast::<libc::ucontext_t>().as_ref() }.map(|ctx| Self { ctx })
    }
}

/// A register snapshot that is not backed by a kernel context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub frame_pointer: usize,
    pub instruction_pointer: usize,
}

impl RegisterContext for Registers {
    #[inline]
    fn frame_pointer(&self) -> usize {
        self.frame_pointer
    }

    #[inline]
    fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86_64")]{
        mod x86_64;
        pub use x86_64::*;
    }else if #[cfg(target_arch = "aarch64")]{
        mod aarch64;
        pub use aarch64::*;
    }
}
