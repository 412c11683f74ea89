//! Unified kernel error types
//!
//! Every fallible kernel subsystem returns a `KernelResult<T>` built from a
//! subsystem-specific error enum. `Errno` is the *external* vocabulary (the
//! small integers defined by the system-call ABI); `KernelError` is the
//! *internal* vocabulary. The two meet in exactly one place: the
//! `From<KernelError> for Errno` impl at the bottom of this module, which the
//! syscall gate calls when flattening a `SyscallOutcome::Err` into the
//! negated-errno convention described by the external interface.

use core::fmt;

/// Top-level kernel error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    Memory(MemoryError),
    Process(ProcessError),
    Fs(FsError),
    Syscall(SyscallError),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::Memory(e) => write!(f, "memory error: {e}"),
            KernelError::Process(e) => write!(f, "process error: {e}"),
            KernelError::Fs(e) => write!(f, "fs error: {e}"),
            KernelError::Syscall(e) => write!(f, "syscall error: {e}"),
        }
    }
}

/// Memory subsystem errors: buddy allocator, physical page allocator, paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The buddy allocator's arena has no free block large enough.
    ArenaExhausted,
    /// The physical page free list and high-water mark are both exhausted.
    OutOfPhysicalPages,
    /// A requested address was not page-aligned where alignment is required.
    Misaligned,
    /// Looked up a virtual address with no present mapping.
    NotMapped,
    /// A caller-supplied region was smaller than the operation requires.
    RegionTooSmall,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::ArenaExhausted => write!(f, "arena exhausted"),
            MemoryError::OutOfPhysicalPages => write!(f, "out of physical pages"),
            MemoryError::Misaligned => write!(f, "address not page-aligned"),
            MemoryError::NotMapped => write!(f, "address not mapped"),
            MemoryError::RegionTooSmall => write!(f, "region too small"),
        }
    }
}

impl From<MemoryError> for KernelError {
    fn from(err: MemoryError) -> Self {
        KernelError::Memory(err)
    }
}

/// Process table / scheduler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    /// No free PID slot in the process table.
    TableFull,
    /// Referenced PID does not name a live process.
    NoSuchProcess,
    /// Referenced PID does not name a child of the caller.
    NotAChild,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::TableFull => write!(f, "process table full"),
            ProcessError::NoSuchProcess => write!(f, "no such process"),
            ProcessError::NotAChild => write!(f, "not a child of caller"),
        }
    }
}

impl From<ProcessError> for KernelError {
    fn from(err: ProcessError) -> Self {
        KernelError::Process(err)
    }
}

/// File system / file handle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    NotADirectory,
    IsADirectory,
    TooManyOpenFiles,
    BadFileDescriptor,
    InvalidOperation,
    /// A directory entry or body points outside the mapped image; treated
    /// as not-found rather than a separate errno, since a malformed offset
    /// and a genuinely missing path are indistinguishable to the caller.
    CorruptImage,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => write!(f, "not found"),
            FsError::NotADirectory => write!(f, "not a directory"),
            FsError::IsADirectory => write!(f, "is a directory"),
            FsError::TooManyOpenFiles => write!(f, "too many open files"),
            FsError::BadFileDescriptor => write!(f, "bad file descriptor"),
            FsError::InvalidOperation => write!(f, "invalid operation"),
            FsError::CorruptImage => write!(f, "corrupt file system image"),
        }
    }
}

impl From<FsError> for KernelError {
    fn from(err: FsError) -> Self {
        KernelError::Fs(err)
    }
}

/// Syscall-gate-level errors (argument validation, unknown call number, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyscallError {
    BadPointer,
    InvalidArgument,
    NotImplemented,
    WouldBlock,
    MailboxFull,
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyscallError::BadPointer => write!(f, "bad pointer"),
            SyscallError::InvalidArgument => write!(f, "invalid argument"),
            SyscallError::NotImplemented => write!(f, "not implemented"),
            SyscallError::WouldBlock => write!(f, "would block"),
            SyscallError::MailboxFull => write!(f, "mailbox full"),
        }
    }
}

impl From<SyscallError> for KernelError {
    fn from(err: SyscallError) -> Self {
        KernelError::Syscall(err)
    }
}

/// Result type alias for kernel operations.
pub type Result<T> = core::result::Result<T, KernelError>;

/// Helper trait for error context, in the teacher's `ErrorContext` style.
pub trait ErrorContext {
    fn context(&self) -> &'static str;
}

impl ErrorContext for KernelError {
    fn context(&self) -> &'static str {
        match self {
            KernelError::Memory(_) => "error occurred in the memory subsystem",
            KernelError::Process(_) => "error occurred in the process table or scheduler",
            KernelError::Fs(_) => "error occurred resolving or reading a file",
            KernelError::Syscall(_) => "error occurred at the syscall gate",
        }
    }
}

/// The external errno vocabulary, numbered exactly as the ABI requires.
///
/// `Suspend` is kernel-internal (`ESUSPEND`, value 1000) and must never be
/// returned to user space; it exists here only so [`SyscallOutcome`] and the
/// dispatcher share one enum for "what happened to this call".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Errno {
    Ebadf = 2,
    Einval = 3,
    Esrch = 4,
    Eperm = 5,
    Enoent = 6,
    Emfile = 7,
    Eisdir = 8,
    Enotdir = 9,
    Enosys = 10,
    Enomem = 11,
    Efault = 12,
    Eagain = 13,
    Echild = 14,
}

impl Errno {
    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl From<KernelError> for Errno {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::Memory(MemoryError::ArenaExhausted) => Errno::Enomem,
            KernelError::Memory(MemoryError::OutOfPhysicalPages) => Errno::Enomem,
            KernelError::Memory(MemoryError::Misaligned) => Errno::Einval,
            KernelError::Memory(MemoryError::NotMapped) => Errno::Efault,
            KernelError::Memory(MemoryError::RegionTooSmall) => Errno::Einval,
            KernelError::Process(ProcessError::TableFull) => Errno::Eagain,
            KernelError::Process(ProcessError::NoSuchProcess) => Errno::Esrch,
            KernelError::Process(ProcessError::NotAChild) => Errno::Echild,
            KernelError::Fs(FsError::NotFound) => Errno::Enoent,
            KernelError::Fs(FsError::NotADirectory) => Errno::Enotdir,
            KernelError::Fs(FsError::IsADirectory) => Errno::Eisdir,
            KernelError::Fs(FsError::TooManyOpenFiles) => Errno::Emfile,
            KernelError::Fs(FsError::BadFileDescriptor) => Errno::Ebadf,
            KernelError::Fs(FsError::InvalidOperation) => Errno::Einval,
            KernelError::Fs(FsError::CorruptImage) => Errno::Enoent,
            KernelError::Syscall(SyscallError::BadPointer) => Errno::Efault,
            KernelError::Syscall(SyscallError::InvalidArgument) => Errno::Einval,
            KernelError::Syscall(SyscallError::NotImplemented) => Errno::Enosys,
            KernelError::Syscall(SyscallError::WouldBlock) => Errno::Eagain,
            KernelError::Syscall(SyscallError::MailboxFull) => Errno::Enomem,
        }
    }
}
