//! Process address space layout and the raw `brk` wrapper
//!
//! Must track the kernel's `kernel::constants::PROCESS_DATA_BASE`: the two
//! sides agree on it by convention, not by sharing code, the way a libc and
//! a kernel usually agree on a layout header.

use crate::syscall;

/// Fixed base of every process's data segment; `execve` resets `data_end` to
/// exactly this address, so it is also the initial program break.
pub const PROCESS_DATA_BASE: u32 = 0x2000_0000;

/// Ask the kernel to extend (never shrink) the break to `new_end`. Returns
/// `0` on success, a negative errno on failure. The kernel always maps the
/// full range and silently rounds up to a page boundary; the exact byte the
/// caller asked for is still safe to use as the new logical break.
pub fn brk(new_end: u32) -> i32 {
    syscall::brk(new_end)
}
