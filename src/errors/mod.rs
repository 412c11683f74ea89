//! Unified error handling
//!
//! Consistent error handling across kernel subsystems: each subsystem
//! returns a `KernelResult<T>`, built from a subsystem-specific error enum,
//! and the syscall gate is the single place that bridges `KernelError` to
//! the ABI's `Errno` values.

pub mod unified;

pub use unified::{
    Errno, ErrorContext, FsError, KernelError, MemoryError, ProcessError, Result as KernelResult,
    SyscallError,
};
