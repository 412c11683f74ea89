//! Unidirectional byte pipe
//!
//! One buffer shared between a reader-side and a writer-side handle (see
//! [`super::handle::FileHandle`]), each of which may be referenced by
//! several file descriptors via `dup2`/`fork`. The buffer grows unboundedly
//! on write; at most one process may be blocked reading at a time, tracked
//! by `readpid` rather than a condvar, since suspension in this kernel is
//! always expressed as "return the suspension sentinel and let the
//! scheduler pick someone else".

use alloc::vec::Vec;

use crate::kernel::process::ProcessId;

pub struct Pipe {
    data: Vec<u8>,
    reading: bool,
    writing: bool,
    readpid: Option<ProcessId>,
}

/// Outcome of a pipe read, for `sys_read` to turn into a `SyscallOutcome`.
pub enum PipeReadResult {
    /// `n` bytes copied into the caller's buffer.
    Bytes(usize),
    /// Writer closed and buffer drained: end of file.
    Eof,
    /// Nobody else is reading; caller should suspend as `readpid` and retry
    /// on resume.
    WouldBlock,
    /// Somebody else already holds the reader slot.
    AlreadyReading,
}

impl Pipe {
    pub fn new() -> Self {
        Pipe {
            data: Vec::new(),
            reading: true,
            writing: true,
            readpid: None,
        }
    }

    /// Append bytes and wake a blocked reader, if any.
    pub fn write(&mut self, buf: &[u8]) -> usize {
        self.data.extend_from_slice(buf);
        if let Some(pid) = self.readpid.take() {
            let mut table = crate::kernel::process::PROCESS_TABLE.lock();
            crate::kernel::process::resume_process(&mut table, pid);
        }
        buf.len()
    }

    /// Try to satisfy a read for `caller`. Never blocks itself: a
    /// `WouldBlock` result tells the syscall gate to record `readpid` and
    /// suspend the caller; on resume `read` is called again from scratch.
    pub fn read(&mut self, caller: ProcessId, buf: &mut [u8]) -> PipeReadResult {
        if let Some(pid) = self.readpid {
            if pid != caller {
                return PipeReadResult::AlreadyReading;
            }
        }

        if !self.data.is_empty() {
            let n = buf.len().min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data.drain(..n);
            self.readpid = None;
            return PipeReadResult::Bytes(n);
        }

        if !self.writing {
            return PipeReadResult::Eof;
        }

        self.readpid = Some(caller);
        PipeReadResult::WouldBlock
    }

    /// Writer side closed: wake a blocked reader so it observes EOF.
    pub fn close_writer(&mut self) {
        self.writing = false;
        if let Some(pid) = self.readpid.take() {
            let mut table = crate::kernel::process::PROCESS_TABLE.lock();
            crate::kernel::process::resume_process(&mut table, pid);
        }
    }

    /// Reader side closed. If the writer is also gone the buffer is simply
    /// dropped with this `Pipe` (no separate free step needed in Rust).
    pub fn close_reader(&mut self) {
        self.reading = false;
        self.readpid = None;
    }

    pub fn is_writing(&self) -> bool {
        self.writing
    }

    pub fn is_reading(&self) -> bool {
        self.reading
    }

    /// Clear a dangling reader slot left by a process killed while blocked,
    /// so a later writer does not try to resume a PID that no longer
    /// exists.
    pub fn clear_reader_if(&mut self, pid: ProcessId) {
        if self.readpid == Some(pid) {
            self.readpid = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_then_eof() {
        let mut pipe = Pipe::new();
        pipe.write(b"hello");
        let mut buf = [0u8; 16];
        match pipe.read(ProcessId(1), &mut buf) {
            PipeReadResult::Bytes(n) => assert_eq!(&buf[..n], b"hello"),
            _ => panic!("expected bytes"),
        }
        pipe.close_writer();
        match pipe.read(ProcessId(1), &mut buf) {
            PipeReadResult::Eof => {}
            _ => panic!("expected eof"),
        }
    }

    #[test]
    fn empty_open_pipe_would_block() {
        let mut pipe = Pipe::new();
        let mut buf = [0u8; 4];
        match pipe.read(ProcessId(1), &mut buf) {
            PipeReadResult::WouldBlock => {}
            _ => panic!("expected would-block"),
        }
    }

    #[test]
    fn second_reader_rejected() {
        let mut pipe = Pipe::new();
        let mut buf = [0u8; 4];
        let _ = pipe.read(ProcessId(1), &mut buf);
        match pipe.read(ProcessId(2), &mut buf) {
            PipeReadResult::AlreadyReading => {}
            _ => panic!("expected already-reading"),
        }
    }
}
