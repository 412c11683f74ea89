// src/kernel/core/mod.rs
//! カーネル抽象化
//!
//! このモジュールは、カーネル全体で使用する基本的な trait、型、
//! エラーハンドリングを提供します。メモリエラーはここでは扱わず、
//! `crate::errors::unified::MemoryError` に一本化されています。

pub mod log_backend;
pub mod prelude;
pub mod result;
pub mod traits;
pub mod types;

pub use result::{DeviceError, ErrorKind, KernelError, KernelResult, TaskError};
pub use traits::{BlockDevice, CharDevice, Device, Scheduler, Task, TaskState};
pub use types::{DeviceId, Priority, ProcessId, TaskId};
