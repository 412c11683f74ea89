//! 32-bit protected-mode x86 architecture backend.

pub mod boot;
pub mod cpu;
pub mod gdt;
pub mod interrupts;
pub mod keyboard;
pub mod pic;
pub mod port;
pub mod qemu;
pub mod serial;
pub mod vga;

pub use cpu::{
    critical_section, disable_paging, enable_paging, read_cr2, read_cr3, read_timestamp,
    write_cr3, X86Cpu,
};

/// Global PS/2 controller instance, read from the keyboard IRQ handler.
pub static PS2_CONTROLLER: keyboard::Ps2Controller = keyboard::Ps2Controller::new();

/// Write a single byte to the debug (serial) sink.
pub fn write_debug_byte(byte: u8) {
    serial::write_debug_byte(byte);
}

/// Bring up the architecture: GDT/TSS, IDT, PIC. Does not enable interrupts;
/// the boot sequence decides exactly when `sti` runs.
///
/// # Safety
/// Must be called once, early in boot, with a valid kernel stack already
/// established.
pub unsafe fn init(kernel_stack_top: u32) {
    unsafe {
        gdt::init(kernel_stack_top);
        interrupts::init();
    }
}
