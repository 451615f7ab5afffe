//! x86-64: `%rbp` chains frames, `%rip` is the program counter.
use super::{RegisterContext, UContext};

impl RegisterContext for UContext<'_> {
    #[inline]
    fn frame_pointer(&self) -> usize {
        self.ctx.uc_mcontext.gregs[libc::REG_RBP as usize] as usize
    }

    #[inline]
    fn instruction_pointer(&self) -> usize {
        self.ctx.uc_mcontext.gregs[libc::REG_RIP as usize] as usize
    }
}

/// Returns the caller's frame pointer.
#[inline(always)]
pub fn current_frame_pointer() -> usize {
    let fp: usize;
    unsafe {
        core::arch::asm!("mov {}, rbp", out(reg) fp, options(nomem, nostack, preserves_flags));
    }
    fp
}
