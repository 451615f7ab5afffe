//! The crash handler: arming, and what happens when the fault arrives.
//!
//! ```text
//! Uninitialized --init()--> Armed --SIGSEGV/SIGABRT--> Handling --abort()--> Terminated
//! ```
//!
//! Only the setup path can fail. Once a signal is delivered the handler resets both
//! signals to their default disposition, prints the backtrace, and aborts, so the
//! process still dies the way it would have without the handler.
use crate::{
    Result,
    arch::UContext,
    error::signal_error,
    module::{self, ModuleSelection},
    os,
    probe::{PipeProbe, ProbeChannel},
    report::{FdSink, Report},
    walk::StackWalker,
};
use core::{
    ffi::{c_int, c_void},
    sync::atomic::{AtomicI32, AtomicU8, Ordering},
};

/// The signals the handler is installed for.
pub const HANDLED_SIGNALS: [c_int; 2] = [libc::SIGSEGV, libc::SIGABRT];

/// Lifecycle of the process-wide crash handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    /// `init` has not succeeded yet.
    Uninitialized = 0,
    /// Handlers are installed and the probe channel is open.
    Armed = 1,
    /// A handled signal was delivered and the backtrace is being printed.
    Handling = 2,
    /// The backtrace is done and the process is aborting.
    Terminated = 3,
}

impl State {
    #[inline]
    fn from_u8(value: u8) -> State {
        match value {
            1 => State::Armed,
            2 => State::Handling,
            3 => State::Terminated,
            _ => State::Uninitialized,
        }
    }
}

/// The process-wide handler context.
///
/// There is exactly one, [`INTERCEPTOR`]; the signal trampoline hands it to
/// [`Interceptor::handle`] by reference.
pub struct Interceptor {
    state: AtomicU8,
    read_fd: AtomicI32,
    write_fd: AtomicI32,
}

static INTERCEPTOR: Interceptor = Interceptor::new();

/// Arms the crash handler for `SIGSEGV` and `SIGABRT`.
///
/// Call it once at startup. Calling it again re-installs the handlers and keeps the
/// existing probe channel. On failure nothing is left installed and the caller may
/// carry on without crash diagnostics.
pub fn init() -> Result<()> {
    INTERCEPTOR.arm()
}

/// The current lifecycle state of the crash handler.
#[inline]
pub fn state() -> State {
    INTERCEPTOR.state()
}

impl Interceptor {
    const fn new() -> Self {
        Self {
            state: AtomicU8::new(State::Uninitialized as u8),
            read_fd: AtomicI32::new(-1),
            write_fd: AtomicI32::new(-1),
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    fn set_state(&self, state: State) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// The probe over the channel opened by the first successful `init`.
    pub fn probe(&self) -> Option<PipeProbe> {
        let read_fd = self.read_fd.load(Ordering::Acquire);
        let write_fd = self.write_fd.load(Ordering::Acquire);
        if read_fd < 0 || write_fd < 0 {
            return None;
        }
        Some(unsafe { PipeProbe::from_raw_fds(read_fd, write_fd) })
    }

    fn arm(&self) -> Result<()> {
        self.arm_signals(&HANDLED_SIGNALS)
    }

    fn arm_signals<const N: usize>(&self, signals: &[c_int; N]) -> Result<()> {
        // The descriptors are published before any handler can run.
        let channel = match self.probe() {
            Some(_) => None,
            None => {
                let channel = ProbeChannel::open()?;
                let [read_fd, write_fd] = channel.as_raw_fds();
                self.read_fd.store(read_fd, Ordering::Release);
                self.write_fd.store(write_fd, Ordering::Release);
                Some(channel)
            }
        };

        let mut previous: [Option<libc::sigaction>; N] = [None; N];
        for (idx, &signal) in signals.iter().enumerate() {
            match unsafe { install(signal, trampoline as usize, libc::SA_SIGINFO | libc::SA_ONSTACK) } {
                Ok(old) => previous[idx] = Some(old),
                Err(err) => {
                    // Put back whatever was replaced before the failure. Dropping
                    // `channel` closes a pipe opened by this call.
                    for (&signal, old) in signals.iter().zip(previous.iter()) {
                        if let Some(old) = old {
                            unsafe { libc::sigaction(signal, old, core::ptr::null_mut()) };
                        }
                    }
                    if channel.is_some() {
                        self.read_fd.store(-1, Ordering::Release);
                        self.write_fd.store(-1, Ordering::Release);
                    }
                    #[cfg(feature = "log")]
                    log::debug!("[Interceptor] arming failed: {}", err);
                    return Err(err);
                }
            }
        }

        if let Some(channel) = channel {
            let _ = channel.into_probe();
        }
        self.set_state(State::Armed);
        #[cfg(feature = "log")]
        log::trace!(
            "[Interceptor] armed for signals {:?}, module selection: {:?}",
            signals,
            ModuleSelection::for_handler()
        );
        Ok(())
    }

    /// Prints the backtrace for a delivered signal and aborts the process.
    ///
    /// # Safety
    /// Must only be called from the signal handler, with the handler's `siginfo_t` and
    /// `ucontext_t` arguments.
    pub unsafe fn handle(&self, signo: c_int, info: *const libc::siginfo_t, ctx: *const c_void) -> ! {
        self.set_state(State::Handling);
        // A fault inside the handler, or the abort below, must not come back here.
        for signal in HANDLED_SIGNALS {
            unsafe { reset_default(signal) };
        }

        let mut report = Report::new(FdSink::stdout());
        let fault_addr = match unsafe { info.as_ref() } {
            Some(info) if signo == libc::SIGSEGV || signo == libc::SIGBUS => {
                Some(unsafe { info.si_addr() } as usize)
            }
            _ => None,
        };
        report.signal(signo, fault_addr);

        if let (Some(probe), Some(ctx)) = (self.probe(), unsafe { UContext::from_raw(ctx) }) {
            let selection = ModuleSelection::for_handler();
            for (index, frame) in StackWalker::from_context(&probe, &ctx).enumerate() {
                report.frame(index, &frame);
                let symbol = unsafe { module::lookup(frame.program_counter, selection) };
                report.symbol(frame.program_counter, symbol.as_ref());
            }
        }

        self.set_state(State::Terminated);
        unsafe { libc::abort() }
    }
}

extern "C" fn trampoline(signo: c_int, info: *mut libc::siginfo_t, ctx: *mut c_void) {
    unsafe { INTERCEPTOR.handle(signo, info, ctx) }
}

/// Installs `action` for `signal` and returns the disposition it replaced.
unsafe fn install(signal: c_int, action: libc::sighandler_t, flags: c_int) -> Result<libc::sigaction> {
    let mut act: libc::sigaction = unsafe { core::mem::zeroed() };
    act.sa_sigaction = action;
    act.sa_flags = flags;
    let mut old: libc::sigaction = unsafe { core::mem::zeroed() };
    unsafe {
        libc::sigemptyset(&mut act.sa_mask);
        if libc::sigaction(signal, &act, &mut old) != 0 {
            return Err(signal_error("failed to install handler", signal, os::errno()));
        }
    }
    Ok(old)
}

unsafe fn reset_default(signal: c_int) {
    unsafe {
        let _ = install(signal, libc::SIG_DFL, 0);
    }
}
