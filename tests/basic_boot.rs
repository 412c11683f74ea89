//! Integration test: boots through the real Multiboot entry stub, brings
//! up the same subsystems `rust_entry` does, then runs the harness.
//!
//! Unlike the unit tests in `src/lib.rs` (which skip straight to
//! `test_main` with no hardware brought up), this exercises the actual
//! boot path QEMU drives through `_start`.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(rhythmos::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;

use rhythmos::arch::x86::boot::{self, MultibootInfo};
use rhythmos::kernel::driver::{init_console, init_vga};
use rhythmos::kernel::mm::FRAME_ALLOCATOR;
use rhythmos::kernel::constants::{KERNEL_MEM_BASE, PAGE_START};

#[no_mangle]
pub extern "C" fn rust_entry(magic: u32, multiboot_info_addr: u32) -> ! {
    assert!(boot::magic_is_valid(magic), "loader did not hand off a valid magic");
    let info: &'static MultibootInfo = unsafe { MultibootInfo::read(multiboot_info_addr) };
    let total_memory = if info.has_mem() { info.total_memory() } else { 16 * 1024 * 1024 };

    unsafe {
        FRAME_ALLOCATOR.init(PAGE_START, total_memory);
        rhythmos::init_heap(KERNEL_MEM_BASE as usize, 1024 * 1024).unwrap();
        rhythmos::arch::x86::init(boot::boot_stack_top_addr());
    }

    init_vga().expect("VGA initialization failed");
    init_console();

    test_main();
    rhythmos::hlt_loop();
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    rhythmos::test_panic_handler(info)
}

#[test_case]
fn frame_allocator_is_initialized() {
    use rhythmos::kernel::mm::FRAME_ALLOCATOR;
    let a = FRAME_ALLOCATOR.alloc_page().expect("frame allocator not ready");
    let b = FRAME_ALLOCATOR.alloc_page().expect("frame allocator not ready");
    assert_ne!(a, b, "successive frame allocations must not alias");
}

#[test_case]
fn console_accepts_writes() {
    rhythmos::console_println!("basic_boot: console is up");
}
