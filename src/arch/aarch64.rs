//! AArch64: `x29` chains frames, `pc` is the program counter.
use super::{RegisterContext, UContext};

const FP: usize = 29;

impl RegisterContext for UContext<'_> {
    #[inline]
    fn frame_pointer(&self) -> usize {
        self.ctx.uc_mcontext.regs[FP] as usize
    }

    #[inline]
    fn instruction_pointer(&self) -> usize {
        self.ctx.uc_mcontext.pc as usize
    }
}

/// Returns the caller's frame pointer.
#[inline(always)]
pub fn current_frame_pointer() -> usize {
    let fp: usize;
    unsafe {
        core::arch::asm!("mov {}, x29", out(reg) fp, options(nomem, nostack, preserves_flags));
    }
    fp
}
