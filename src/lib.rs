//! rhythmos - a small preemptive multitasking 32-bit protected-mode kernel
//!
//! Buddy allocator, two-level paging, round-robin process scheduling and a
//! unified file-handle abstraction over screen / pipe / read-only-file / dir.

#![no_std]
#![feature(abi_x86_interrupt)]
#![feature(naked_functions)]
#![cfg_attr(test, no_main)]
#![cfg_attr(test, feature(custom_test_frameworks))]
#![cfg_attr(test, test_runner(crate::test_runner))]
#![cfg_attr(test, reexport_test_harness_main = "test_main")]
#![deny(unsafe_op_in_unsafe_fn)]
#![allow(missing_docs)]

extern crate alloc;

pub mod arch;
pub mod errors;
pub mod kernel;
pub mod qemu;

use core::panic::PanicInfo;
use crate::arch::{ArchCpu, Cpu};

/// Global heap allocator backing `alloc::*` for kernel code.
///
/// Wraps the buddy allocator (see [`kernel::mm::buddy`]) the same way the
/// teacher repo wraps its linked-list allocator: a `spin::Mutex`-guarded
/// inner allocator behind `GlobalAlloc`.
#[global_allocator]
static ALLOCATOR: kernel::mm::LockedHeap = kernel::mm::LockedHeap::new();

/// Errors from heap initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// The heap has already been initialized once.
    AlreadyInitialized,
}

/// Initialize the kernel heap arena.
///
/// # Safety
///
/// `heap_start` must point at `heap_size` bytes of exclusively-owned,
/// mapped memory. Must be called exactly once, during boot.
pub unsafe fn init_heap(heap_start: usize, heap_size: usize) -> Result<(), HeapError> {
    debug_assert!(heap_start != 0, "heap start address must not be null");
    debug_assert!(heap_size > 0, "heap size must be greater than zero");

    // SAFETY: caller guarantees the range is valid and exclusively owned.
    unsafe {
        ALLOCATOR
            .init(heap_start, heap_size)
            .map_err(|_| HeapError::AlreadyInitialized)
    }
}

pub use qemu::{exit_qemu, QemuExitCode};

/// Screen output. Goes through the file-handle SCREEN writer, not directly
/// to hardware, so kernel-internal prints observe the same path user
/// processes' stdout does.
#[macro_export]
macro_rules! console_print {
    ($($arg:tt)*) => {{
        $crate::kernel::driver::write_console(format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! console_println {
    () => ($crate::console_print!("\n"));
    ($($arg:tt)*) => ($crate::console_print!("{}\n", format_args!($($arg)*)));
}

/// Serial-only debug output. This is the sink the `log` crate facade in
/// [`kernel::core`] is installed over.
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {{
        $crate::kernel::driver::write_debug(format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! debug_println {
    () => ($crate::debug_print!("\n"));
    ($($arg:tt)*) => ($crate::debug_print!("{}\n", format_args!($($arg)*)));
}

/// Halt the CPU until the next interrupt, forever. Used as the idle routine
/// when the scheduler finds no ready process.
#[inline]
pub fn hlt_loop() -> ! {
    loop {
        ArchCpu::halt();
    }
}

/// A runnable unit test for the custom `#[test_case]` harness.
pub trait Testable {
    fn run(&self);
}

impl<T> Testable for T
where
    T: Fn(),
{
    fn run(&self) {
        debug_print!("[test] {} ... ", core::any::type_name::<T>());
        self();
        debug_println!("ok");
    }
}

/// Entry point for `#[cfg(test)]` builds under `custom_test_frameworks`.
pub fn test_runner(tests: &[&dyn Testable]) {
    debug_println!("[test runner] running {} tests", tests.len());
    for test in tests {
        test.run();
    }
    exit_qemu(QemuExitCode::Success);
}

#[cfg(test)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    test_panic_handler(info)
}

#[inline(never)]
pub fn test_panic_handler(info: &PanicInfo) -> ! {
    debug_println!("[test panic] {}", info);
    exit_qemu(QemuExitCode::Failed);
}

#[cfg(test)]
#[no_mangle]
pub extern "C" fn _start() -> ! {
    test_main();
    hlt_loop();
}
