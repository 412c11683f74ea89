//! Global Descriptor Table (GDT) and Task State Segment (TSS)
//!
//! Sets up flat (base=0, limit=4 GiB) code/data segments for ring 0 and
//! ring 3, plus a TSS used only to hold the ring-0 stack pointer (`esp0`)
//! that the CPU loads automatically on a ring-3 -> ring-0 privilege
//! transition (interrupt, syscall gate).
//!
//! There is no 32-bit equivalent of the `x86_64` crate's
//! `GlobalDescriptorTable` builder in this stack, so the eight-byte
//! descriptor encoding is done by hand.

use lazy_static::lazy_static;
use spin::Mutex;

/// Segment selectors, index * 8 | privilege level.
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;
pub const USER_CODE_SELECTOR: u16 = 0x1B; // index 3, RPL 3
pub const USER_DATA_SELECTOR: u16 = 0x23; // index 4, RPL 3
const TSS_SELECTOR: u16 = 0x28;

#[repr(C, packed)]
#[derive(Clone, Copy)]
struct GdtEntry {
    limit_low: u16,
    base_low: u16,
    base_mid: u8,
    access: u8,
    granularity: u8,
    base_high: u8,
}

impl GdtEntry {
    const fn null() -> Self {
        GdtEntry {
            limit_low: 0,
            base_low: 0,
            base_mid: 0,
            access: 0,
            granularity: 0,
            base_high: 0,
        }
    }

    const fn flat(access: u8, granularity_flags: u8) -> Self {
        GdtEntry {
            limit_low: 0xFFFF,
            base_low: 0,
            base_mid: 0,
            access,
            granularity: 0xF | (granularity_flags << 4),
            base_high: 0,
        }
    }

    const fn tss(base: u32, limit: u32) -> Self {
        GdtEntry {
            limit_low: (limit & 0xFFFF) as u16,
            base_low: (base & 0xFFFF) as u16,
            base_mid: ((base >> 16) & 0xFF) as u8,
            access: 0x89, // present, ring0, 32-bit TSS (available)
            granularity: (((limit >> 16) & 0xF) as u8) | (0 << 4),
            base_high: ((base >> 24) & 0xFF) as u8,
        }
    }
}

#[repr(C, packed)]
struct GdtPointer {
    limit: u16,
    base: u32,
}

/// Task State Segment. Only `esp0`/`ss0` are meaningful here: we never use
/// hardware task-switching, only the ring-3 -> ring-0 stack-pointer load.
#[repr(C, packed)]
pub struct Tss {
    link: u32,
    pub esp0: u32,
    pub ss0: u32,
    _rest: [u32; 23],
    iomap_base: u16,
}

impl Tss {
    const fn new() -> Self {
        Tss {
            link: 0,
            esp0: 0,
            ss0: KERNEL_DATA_SELECTOR as u32,
            _rest: [0; 23],
            iomap_base: core::mem::size_of::<Tss>() as u16,
        }
    }
}

const ENTRY_COUNT: usize = 6;

struct GdtTable {
    entries: [GdtEntry; ENTRY_COUNT],
}

static mut TSS: Tss = Tss::new();
static mut GDT: GdtTable = GdtTable {
    entries: [GdtEntry::null(); ENTRY_COUNT],
};

lazy_static! {
    /// The ring-0 stack used while servicing a syscall or interrupt that
    /// trapped from user mode; loaded into `TSS.esp0` by [`init`], and
    /// updated per-process by the scheduler on every context switch.
    pub static ref KERNEL_STACK_TOP: Mutex<u32> = Mutex::new(0);
}

/// Build the GDT and TSS and load them into the CPU.
///
/// # Safety
/// Must be called exactly once, early in boot, before any ring-3 transition
/// and before interrupts are enabled.
pub unsafe fn init(kernel_stack_top: u32) {
    unsafe {
        *KERNEL_STACK_TOP.lock() = kernel_stack_top;

        let tss_ptr = core::ptr::addr_of_mut!(TSS);
        (*tss_ptr).esp0 = kernel_stack_top;

        let gdt_ptr = core::ptr::addr_of_mut!(GDT);
        (*gdt_ptr).entries[0] = GdtEntry::null();
        (*gdt_ptr).entries[1] = GdtEntry::flat(0x9A, 0xC); // kernel code: present,ring0,exec/read
        (*gdt_ptr).entries[2] = GdtEntry::flat(0x92, 0xC); // kernel data: present,ring0,read/write
        (*gdt_ptr).entries[3] = GdtEntry::flat(0xFA, 0xC); // user code: present,ring3,exec/read
        (*gdt_ptr).entries[4] = GdtEntry::flat(0xF2, 0xC); // user data: present,ring3,read/write
        (*gdt_ptr).entries[5] = GdtEntry::tss(
            tss_ptr as u32,
            (core::mem::size_of::<Tss>() - 1) as u32,
        );

        let pointer = GdtPointer {
            limit: (core::mem::size_of::<[GdtEntry; ENTRY_COUNT]>() - 1) as u16,
            base: gdt_ptr as u32,
        };

        core::arch::asm!(
            "lgdt [{0}]",
            "mov ax, {1:x}",
            "mov ds, ax",
            "mov es, ax",
            "mov fs, ax",
            "mov gs, ax",
            "mov ss, ax",
            "push {2:e}",
            "lea eax, [2f]",
            "push eax",
            "retf",
            "2:",
            "ltr {3:x}",
            in(reg) &pointer,
            in(reg) KERNEL_DATA_SELECTOR,
            in(reg) KERNEL_CODE_SELECTOR as u32,
            in(reg) TSS_SELECTOR,
            out("eax") _,
            options(nostack)
        );
    }
}

/// Update the ring-0 stack pointer loaded on the next privilege transition.
/// Called by the scheduler when switching to a process with a different
/// kernel stack.
pub fn set_kernel_stack(top: u32) {
    unsafe {
        let tss_ptr = core::ptr::addr_of_mut!(TSS);
        (*tss_ptr).esp0 = top;
    }
    *KERNEL_STACK_TOP.lock() = top;
}
