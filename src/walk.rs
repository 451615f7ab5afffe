//! Frame-pointer stack walking.
use crate::{arch::RegisterContext, probe::Probe};

/// Size of the record a frame pointer points at: saved frame pointer, then return address.
pub const FRAME_RECORD_SIZE: usize = 2 * size_of::<usize>();

/// One step of the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Address of this frame's `[saved frame pointer, return address]` record.
    pub frame_pointer: usize,
    /// The instruction this frame is executing or will return to.
    pub program_counter: usize,
}

/// A lazy iterator over the frame-pointer chain.
///
/// Each step probes the current frame record before reading it; the walk ends at the
/// first record that is unreadable or at a zero frame pointer. There is no depth limit:
/// a chain that loops back on itself never ends, so callers that need a bound should
/// use [`Iterator::take`].
pub struct StackWalker<'p, P: Probe + ?Sized> {
    probe: &'p P,
    frame_pointer: usize,
    program_counter: usize,
    done: bool,
}

impl<'p, P: Probe + ?Sized> StackWalker<'p, P> {
    /// Starts a walk at the given frame pointer and program counter.
    #[inline]
    pub fn new(probe: &'p P, frame_pointer: usize, program_counter: usize) -> Self {
        Self {
            probe,
            frame_pointer,
            program_counter,
            done: false,
        }
    }

    /// Starts a walk at the registers captured in `ctx`.
    #[inline]
    pub fn from_context(probe: &'p P, ctx: &impl RegisterContext) -> Self {
        Self::new(probe, ctx.frame_pointer(), ctx.instruction_pointer())
    }
}

impl<P: Probe + ?Sized> Iterator for StackWalker<'_, P> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        if self.done
            || self.frame_pointer == 0
            || !self.probe.is_readable(self.frame_pointer, FRAME_RECORD_SIZE)
        {
            self.done = true;
            return None;
        }
        let frame = Frame {
            frame_pointer: self.frame_pointer,
            program_counter: self.program_counter,
        };
        // The probe above validated both words of the record.
        let record = unsafe { (self.frame_pointer as *const [usize; 2]).read_unaligned() };
        self.frame_pointer = record[0];
        self.program_counter = record[1];
        Some(frame)
    }
}

impl<P: Probe + ?Sized> core::iter::FusedIterator for StackWalker<'_, P> {}
