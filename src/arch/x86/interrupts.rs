//! Interrupt Descriptor Table (IDT)
//!
//! There is no 32-bit equivalent of the `x86_64` crate's
//! `InterruptDescriptorTable` type in this dependency stack, so the table is
//! built by hand: 256 entries, each an 8-byte interrupt-gate descriptor.
//!
//! Every vector that can possibly need to suspend the current process and
//! resume a different one funnels through one shared naked-asm entry stub
//! and one Rust dispatcher, [`common_interrupt_handler`], operating on one
//! [`SavedRegs`] frame — mirroring the original kernel's single
//! `interrupt_handler(regs *r)` fed by one assembly trampoline for every
//! vector, rather than a per-vector typed ABI that can't expose the full
//! register file. Vectors that are always fatal when they fire (divide
//! error, double fault, general protection fault) still go through the
//! shared stub for uniformity, even though their handlers never return.

use super::pic::PICS;
use crate::arch::{ArchCpu, Cpu};

/// IRQ0 (timer) is remapped to this vector by [`super::pic`].
pub const TIMER_VECTOR: u8 = 0x20;
/// IRQ1 (keyboard).
pub const KEYBOARD_VECTOR: u8 = 0x21;
/// Software interrupt gate used by `libuser`'s syscall stub (`int 0x30`).
pub const SYSCALL_VECTOR: u8 = 0x30;

const DIVIDE_ERROR_VECTOR: u32 = 0;
const BREAKPOINT_VECTOR: u32 = 3;
const DOUBLE_FAULT_VECTOR: u32 = 8;
const GPF_VECTOR: u32 = 13;
const PAGE_FAULT_VECTOR: u32 = 14;

/// The full register frame built by the shared entry stub, in the order the
/// stub pushes it (and therefore the order `iretd` expects to pop it back).
/// This is the 32-bit analogue of the original kernel's `regs` struct, minus
/// the x87 FPU save area: this kernel gives user programs no floating point
/// support, so there is no FPU state to carry across a context switch.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SavedRegs {
    pub gs: u32,
    pub fs: u32,
    pub es: u32,
    pub ds: u32,
    pub edi: u32,
    pub esi: u32,
    pub ebp: u32,
    pub esp_dummy: u32,
    pub ebx: u32,
    pub edx: u32,
    pub ecx: u32,
    pub eax: u32,
    pub int_no: u32,
    pub err_code: u32,
    pub eip: u32,
    pub cs: u32,
    pub eflags: u32,
    pub useresp: u32,
    pub ss: u32,
}

impl SavedRegs {
    /// A zeroed frame, used as the scratch initial state for a brand new
    /// process before its first `eip`/`esp`/segment selectors are filled in.
    pub const fn zeroed() -> Self {
        SavedRegs {
            gs: 0, fs: 0, es: 0, ds: 0,
            edi: 0, esi: 0, ebp: 0, esp_dummy: 0,
            ebx: 0, edx: 0, ecx: 0, eax: 0,
            int_no: 0, err_code: 0,
            eip: 0, cs: 0, eflags: 0, useresp: 0, ss: 0,
        }
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct IdtEntry {
    offset_low: u16,
    selector: u16,
    zero: u8,
    type_attr: u8,
    offset_high: u16,
}

impl IdtEntry {
    const fn missing() -> Self {
        IdtEntry {
            offset_low: 0,
            selector: 0,
            zero: 0,
            type_attr: 0,
            offset_high: 0,
        }
    }

    fn new(handler: u32, selector: u16, dpl: u8) -> Self {
        // present(1) dpl(2 bits) storage(0) gate_type(1110 = 32-bit interrupt gate)
        let type_attr = 0x8Eu8 | ((dpl & 0x3) << 5);
        IdtEntry {
            offset_low: (handler & 0xFFFF) as u16,
            selector,
            zero: 0,
            type_attr,
            offset_high: ((handler >> 16) & 0xFFFF) as u16,
        }
    }
}

#[repr(C, packed)]
struct IdtPointer {
    limit: u16,
    base: u32,
}

const IDT_ENTRIES: usize = 256;

struct Idt {
    entries: [IdtEntry; IDT_ENTRIES],
}

static mut IDT: Idt = Idt {
    entries: [IdtEntry::missing(); IDT_ENTRIES],
};

/// Build the IDT and load it. Enables the PICs and unmasks the timer and
/// keyboard IRQs, but leaves `sti` to the caller (boot sequencing decides
/// exactly when interrupts should start firing).
///
/// # Safety
/// Must be called once during boot, after [`super::gdt::init`].
pub unsafe fn init() {
    unsafe {
        let idt_ptr = core::ptr::addr_of_mut!(IDT);
        let code_sel = super::gdt::KERNEL_CODE_SELECTOR;

        (*idt_ptr).entries[0] = IdtEntry::new(stub_divide_error as u32, code_sel, 0);
        (*idt_ptr).entries[3] = IdtEntry::new(stub_breakpoint as u32, code_sel, 0);
        (*idt_ptr).entries[8] = IdtEntry::new(stub_double_fault as u32, code_sel, 0);
        (*idt_ptr).entries[13] = IdtEntry::new(stub_gpf as u32, code_sel, 0);
        (*idt_ptr).entries[14] = IdtEntry::new(stub_page_fault as u32, code_sel, 0);

        (*idt_ptr).entries[TIMER_VECTOR as usize] = IdtEntry::new(stub_timer as u32, code_sel, 0);
        (*idt_ptr).entries[KEYBOARD_VECTOR as usize] =
            IdtEntry::new(stub_keyboard as u32, code_sel, 0);

        // DPL 3: user-mode code must be able to trigger this gate with `int`.
        (*idt_ptr).entries[SYSCALL_VECTOR as usize] =
            IdtEntry::new(stub_syscall as u32, code_sel, 3);

        let pointer = IdtPointer {
            limit: (core::mem::size_of::<[IdtEntry; IDT_ENTRIES]>() - 1) as u16,
            base: idt_ptr as u32,
        };
        core::arch::asm!("lidt [{0}]", in(reg) &pointer, options(nostack));

        PICS.lock().initialize();
    }
}

/// Entry stub for vectors that push no hardware error code: fake one with
/// `push 0` so every vector builds an identically shaped [`SavedRegs`].
macro_rules! stub_without_error_code {
    ($name:ident, $vector:expr) => {
        #[naked]
        extern "C" fn $name() {
            unsafe {
                core::arch::asm!(
                    "push 0",
                    concat!("push ", stringify!($vector)),
                    "pusha",
                    "push ds",
                    "push es",
                    "push fs",
                    "push gs",
                    "mov eax, esp",
                    "push eax",
                    "call {handler}",
                    "add esp, 4",
                    "pop gs",
                    "pop fs",
                    "pop es",
                    "pop ds",
                    "popa",
                    "add esp, 8",
                    "iretd",
                    handler = sym common_interrupt_handler,
                    options(noreturn)
                );
            }
        }
    };
}

/// Entry stub for vectors where the CPU itself pushes an error code (double
/// fault, GPF, page fault).
macro_rules! stub_with_error_code {
    ($name:ident, $vector:expr) => {
        #[naked]
        extern "C" fn $name() {
            unsafe {
                core::arch::asm!(
                    concat!("push ", stringify!($vector)),
                    "pusha",
                    "push ds",
                    "push es",
                    "push fs",
                    "push gs",
                    "mov eax, esp",
                    "push eax",
                    "call {handler}",
                    "add esp, 4",
                    "pop gs",
                    "pop fs",
                    "pop es",
                    "pop ds",
                    "popa",
                    "add esp, 8",
                    "iretd",
                    handler = sym common_interrupt_handler,
                    options(noreturn)
                );
            }
        }
    };
}

stub_without_error_code!(stub_divide_error, DIVIDE_ERROR_VECTOR);
stub_without_error_code!(stub_breakpoint, BREAKPOINT_VECTOR);
stub_with_error_code!(stub_double_fault, DOUBLE_FAULT_VECTOR);
stub_with_error_code!(stub_gpf, GPF_VECTOR);
stub_with_error_code!(stub_page_fault, PAGE_FAULT_VECTOR);
stub_without_error_code!(stub_timer, 0x20);
stub_without_error_code!(stub_keyboard, 0x21);
stub_without_error_code!(stub_syscall, 0x30);

/// The single dispatcher every interrupt and exception funnels through,
/// analogous to the original kernel's `interrupt_handler(regs *r)`. `frame`
/// points at the on-stack [`SavedRegs`]; the handler may overwrite it in
/// place (a context switch does exactly that) before the stub's epilogue
/// pops it back off and `iretd`s into whichever process it now describes.
extern "C" fn common_interrupt_handler(frame: *mut SavedRegs) {
    let regs = unsafe { &mut *frame };

    match regs.int_no {
        n if n == TIMER_VECTOR as u32 => {
            crate::kernel::scheduler::tick(regs);
            unsafe {
                PICS.lock().notify_end_of_interrupt(TIMER_VECTOR);
            }
        }
        n if n == KEYBOARD_VECTOR as u32 => {
            if let Some(code) = super::PS2_CONTROLLER.read_scancode() {
                crate::kernel::driver::keyboard::on_scancode(code);
            }
            unsafe {
                PICS.lock().notify_end_of_interrupt(KEYBOARD_VECTOR);
            }
        }
        n if n == SYSCALL_VECTOR as u32 => {
            crate::kernel::syscall::dispatch_from_frame(regs);
        }
        n if n == BREAKPOINT_VECTOR => {
            crate::debug_println!("[exception] breakpoint");
        }
        n if n == PAGE_FAULT_VECTOR => {
            handle_page_fault_vector(regs);
        }
        _ => {
            crate::debug_println!(
                "[exception] unhandled vector {} (err={:#x} eip={:#x})",
                regs.int_no, regs.err_code, regs.eip
            );
            ArchCpu::disable_interrupts();
            loop {
                ArchCpu::halt();
            }
        }
    }
}

fn handle_page_fault_vector(regs: &mut SavedRegs) {
    use crate::kernel::mm::page_fault::{handle_page_fault, PageFaultOutcome};

    match handle_page_fault(regs.err_code, regs.cs) {
        PageFaultOutcome::ProcessKilled => {
            crate::kernel::scheduler::reschedule(regs);
        }
        PageFaultOutcome::Fatal => {
            ArchCpu::disable_interrupts();
            loop {
                ArchCpu::halt();
            }
        }
    }
}
