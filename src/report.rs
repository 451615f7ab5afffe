//! Formatting the backtrace without allocating.
//!
//! Text is assembled in a fixed buffer on the stack and handed to the sink with a
//! single `write(2)` per line, so the report can be produced from a fault handler.
use crate::{module::ResolvedSymbol, os, walk::Frame};
use core::{
    ffi::{CStr, c_int},
    fmt::{self, Write},
};

/// Capacity of the line buffer. Longer lines are flushed in pieces.
pub const LINE_CAPACITY: usize = 512;

/// Where finished report text goes.
pub trait Sink {
    /// Writes all of `bytes`. Failures are ignored: there is nobody left to tell.
    fn write_all(&mut self, bytes: &[u8]);
}

/// A raw file descriptor.
#[derive(Debug, Clone, Copy)]
pub struct FdSink(pub c_int);

impl FdSink {
    /// Standard output.
    pub const fn stdout() -> Self {
        FdSink(os::STDOUT_FILENO)
    }
}

impl Sink for FdSink {
    #[inline]
    fn write_all(&mut self, bytes: &[u8]) {
        let _ = os::write_all(self.0, bytes);
    }
}

/// Line-buffered backtrace writer.
pub struct Report<S: Sink> {
    sink: S,
    buf: [u8; LINE_CAPACITY],
    len: usize,
}

/// Returns the conventional name of the signals the handler deals with.
pub fn signal_name(signo: c_int) -> &'static str {
    match signo {
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGABRT => "SIGABRT",
        libc::SIGBUS => "SIGBUS",
        libc::SIGILL => "SIGILL",
        libc::SIGFPE => "SIGFPE",
        _ => "unknown signal",
    }
}

impl<S: Sink> Report<S> {
    pub const fn new(sink: S) -> Self {
        Self {
            sink,
            buf: [0; LINE_CAPACITY],
            len: 0,
        }
    }

    /// Gives the sink back. Buffered text is flushed first.
    pub fn into_sink(mut self) -> S {
        self.flush();
        self.sink
    }

    /// Sends the buffered text to the sink.
    pub fn flush(&mut self) {
        if self.len > 0 {
            self.sink.write_all(&self.buf[..self.len]);
            self.len = 0;
        }
    }

    fn push(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if self.len == LINE_CAPACITY {
                self.flush();
            }
            let n = bytes.len().min(LINE_CAPACITY - self.len);
            self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
            self.len += n;
            bytes = &bytes[n..];
        }
    }

    /// `Caught signal 11 (SIGSEGV) at address 0x10`
    pub fn signal(&mut self, signo: c_int, fault_addr: Option<usize>) {
        let _ = write!(self, "Caught signal {} ({})", signo, signal_name(signo));
        if let Some(addr) = fault_addr {
            let _ = write!(self, " at address {:#x}", addr);
        }
        self.push(b"\n");
        self.flush();
    }

    /// `Frame #0 (0x00007ffd4a1c2e50): PC = 0x55d0c3a1b2f4`
    pub fn frame(&mut self, index: usize, frame: &Frame) {
        let _ = writeln!(
            self,
            "Frame #{} ({:#018x}): PC = {:#x}",
            index, frame.frame_pointer, frame.program_counter
        );
        self.flush();
    }

    /// `\tsymbol name+0x14 in /usr/lib/libfoo.so`, or `\t<unresolved>`.
    pub fn symbol(&mut self, pc: usize, symbol: Option<&ResolvedSymbol<'_>>) {
        match symbol {
            Some(symbol) => {
                self.push(b"\tsymbol ");
                self.push_cstr(symbol.name);
                let _ = write!(self, "+{:#x} in ", pc.wrapping_sub(symbol.addr));
                if symbol.module.is_empty() {
                    self.push(b"<main>");
                } else {
                    self.push_cstr(symbol.module);
                }
                self.push(b"\n");
            }
            None => self.push(b"\t<unresolved>\n"),
        }
        self.flush();
    }

    #[inline]
    fn push_cstr(&mut self, s: &CStr) {
        self.push(s.to_bytes());
    }
}

impl<S: Sink> Write for Report<S> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s.as_bytes());
        Ok(())
    }
}
