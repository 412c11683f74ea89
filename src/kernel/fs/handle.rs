//! Tagged file handle
//!
//! Stands in for the original kernel's function-pointer `filehandle` vtable
//! (`read`/`write`/`destroy` fields populated per-type at construction): a
//! closed, small set of tags dispatched through `match` instead, since Rust
//! has no use for the indirection an open C vtable buys when every variant
//! is already known at compile time (see the design note on polymorphic
//! file handles).

use alloc::sync::Arc;
use spin::Mutex;

use crate::errors::unified::FsError;
use crate::kernel::fs::pipe::{Pipe, PipeReadResult};
use crate::kernel::fs::readonly::DirectoryEntry;
use crate::kernel::process::ProcessId;

/// What a `read`/`write` call against a handle resolved to, one level above
/// `Errno`: a pipe read may need the caller to suspend rather than fail or
/// succeed outright.
pub enum HandleIo {
    Bytes(usize),
    WouldBlock,
    Err(FsError),
}

pub enum FileHandle {
    Screen,
    PipeReader(Arc<Mutex<Pipe>>),
    PipeWriter(Arc<Mutex<Pipe>>),
    File { entry: DirectoryEntry, pos: u32 },
    Dir { entry: DirectoryEntry, entryno: u32 },
}

impl FileHandle {
    pub fn read(&mut self, caller: ProcessId, buf: &mut [u8]) -> HandleIo {
        match self {
            FileHandle::Screen => HandleIo::Err(FsError::InvalidOperation),
            FileHandle::PipeReader(pipe) => match pipe.lock().read(caller, buf) {
                PipeReadResult::Bytes(n) => HandleIo::Bytes(n),
                PipeReadResult::Eof => HandleIo::Bytes(0),
                PipeReadResult::WouldBlock => HandleIo::WouldBlock,
                PipeReadResult::AlreadyReading => HandleIo::Err(FsError::BadFileDescriptor),
            },
            FileHandle::PipeWriter(_) => HandleIo::Err(FsError::InvalidOperation),
            FileHandle::File { entry, pos } => {
                let image = crate::kernel::fs::image();
                let n = image.read_file(entry, *pos, buf);
                *pos += n as u32;
                HandleIo::Bytes(n)
            }
            FileHandle::Dir { .. } => HandleIo::Err(FsError::IsADirectory),
        }
    }

    pub fn write(&mut self, buf: &[u8]) -> HandleIo {
        match self {
            FileHandle::Screen => {
                use crate::kernel::core::CharDevice;
                let mut vga = crate::kernel::driver::vga::vga().lock();
                for &byte in buf {
                    let _ = vga.write_byte(byte);
                }
                HandleIo::Bytes(buf.len())
            }
            FileHandle::PipeWriter(pipe) => HandleIo::Bytes(pipe.lock().write(buf)),
            FileHandle::PipeReader(_) => HandleIo::Err(FsError::InvalidOperation),
            FileHandle::File { .. } => HandleIo::Err(FsError::BadFileDescriptor),
            FileHandle::Dir { .. } => HandleIo::Err(FsError::IsADirectory),
        }
    }

    /// Next directory entry name for `getdent`, advancing `entryno`.
    /// Returns `None` once the directory is exhausted.
    pub fn next_dirent(&mut self) -> Result<Option<alloc::string::String>, FsError> {
        let FileHandle::Dir { entry, entryno } = self else {
            return Err(FsError::NotADirectory);
        };
        let image = crate::kernel::fs::image();
        let entries = image.directory_entries(entry.location)?;
        if *entryno as usize >= entries.len() {
            return Ok(None);
        }
        let name = entries[*entryno as usize].name_str();
        *entryno += 1;
        Ok(Some(alloc::string::String::from(name)))
    }

    /// The pipe this handle reads from, if it is a `PipeReader`. Used by the
    /// kill path to clear a dangling `readpid` for the dying process before
    /// its last `Arc` reference to the handle is dropped.
    pub fn reader_pipe(&self) -> Option<Arc<Mutex<Pipe>>> {
        match self {
            FileHandle::PipeReader(pipe) => Some(pipe.clone()),
            _ => None,
        }
    }
}

/// Mirrors the original kernel's `filehandle->destroy`, called when the last
/// reference to a handle goes away: Rust's `Arc` refcounting already decides
/// *when*, so only the two pipe-closing side effects need expressing here.
impl Drop for FileHandle {
    fn drop(&mut self) {
        match self {
            FileHandle::PipeReader(pipe) => pipe.lock().close_reader(),
            FileHandle::PipeWriter(pipe) => pipe.lock().close_writer(),
            _ => {}
        }
    }
}
