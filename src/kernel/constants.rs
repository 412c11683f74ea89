//! Kernel-wide numeric constants
//!
//! Mirrors the original kernel's `constants.h`: memory layout, process
//! table sizing, interrupt vectors and syscall numbers are all fixed,
//! small, well-known values rather than configuration, so they live here
//! as `const`s rather than in `kernel::config`.

pub const PAGE_SIZE: usize = 4096;

pub const MAX_PROCESSES: usize = 32;

pub const PROCESS_STACK_BASE: u32 = 0x4000_0000; // 1 GiB
pub const PROCESS_STACK_SIZE: u32 = 64 * 1024;

pub const KERNEL_MEM_BASE: u32 = 2 * 1024 * 1024; // 2 MiB
pub const KERNEL_MEM_SIZEPOW2: u32 = 22; // 4 MiB
pub const KERNEL_MEM_SIZE: u32 = 4 * 1024 * 1024;

pub const PAGE_START: u32 = 6 * 1024 * 1024; // first page available to the frame allocator

pub const PROCESS_DATA_BASE: u32 = 0x2000_0000; // 512 MiB
pub const PROCESS_DATA_MAX: u32 = 4 * 1024 * 1024;
pub const PROCESS_TEXT_BASE: u32 = 0x1000_0000; // 256 MiB

pub const STDIN_FILENO: i32 = 0;
pub const STDOUT_FILENO: i32 = 1;
pub const STDERR_FILENO: i32 = 2;
pub const MAX_FDS: usize = 16;

pub const PATH_MAX: usize = 1024;
pub const NAME_MAX: usize = 1024;

pub const SCREEN_WIDTH: usize = 80;
pub const SCREEN_HEIGHT: usize = 25;

pub const TICKS_PER_SECOND: u32 = 50;

pub const MAX_EXCEPTION: u8 = 31;
pub const INTERRUPT_TIMER: u8 = 0x20;
pub const INTERRUPT_KEYBOARD: u8 = 0x21;
pub const INTERRUPT_SYSCALL: u8 = 0x30;

/// Fixed-capacity mailbox message count before a second growth attempt
/// fails with `ENOMEM` (see the ipc module doc comment).
pub const MAILBOX_INITIAL_CAPACITY: usize = 8;
pub const MAILBOX_MAX_CAPACITY: usize = 8;
pub const MESSAGE_INLINE_SIZE: usize = 1024;

/// `open(..., 0xFFFF)` requests a directory handle instead of a file.
pub const OPEN_AS_DIRECTORY: u32 = 0xFFFF;
