//! Page fault dispatch
//!
//! A page fault raised by user-mode code kills the faulting process and
//! requests a context switch; it is never fatal to the kernel. A page fault
//! raised by kernel code (a bad pointer dereferenced during a syscall, or a
//! kernel bug) is an unhandled exception and halts the machine after a
//! diagnostic, the same as any other unexpected trap.

use crate::arch::x86::cpu::read_cr2;
use crate::debug_println;

/// CPU-reported page-fault error code bits (Intel SDM Vol. 3A, figure
/// "Page-Fault Error Code").
const ERR_PRESENT: u32 = 1 << 0;
const ERR_WRITE: u32 = 1 << 1;
const ERR_USER: u32 = 1 << 2;

/// What the page-fault handler decided to do, for the interrupt stub to act
/// on (resume the excepting process, or halt).
pub enum PageFaultOutcome {
    /// The faulting process was killed; the scheduler should pick another.
    ProcessKilled,
    /// Unrecoverable: the kernel itself faulted.
    Fatal,
}

/// Handle `int 0x0E`. `cs` is the saved code selector, used only for the
/// diagnostic; the fatal/recoverable decision follows the current process's
/// `in_syscall` flag, not the privilege level the fault was taken at: a
/// fault while the kernel is servicing a syscall on the process's behalf
/// (a bad pointer argument slipping past validation, or a kernel bug) is
/// just as fatal as one taken in pure kernel code, even though `cs` still
/// reads ring 0 in both cases.
pub fn handle_page_fault(error_code: u32, cs: u32) -> PageFaultOutcome {
    let fault_addr = read_cr2();
    let present = error_code & ERR_PRESENT != 0;
    let write = error_code & ERR_WRITE != 0;
    let user = error_code & ERR_USER != 0;
    let ring = cs & 0x3;

    debug_println!(
        "[page fault] addr={:#x} present={} write={} user={} cs_ring={}",
        fault_addr,
        present,
        write,
        user,
        ring
    );

    let current = crate::kernel::process::current_pid()
        .and_then(|pid| crate::kernel::process::PROCESS_TABLE.lock().get(pid).map(|p| p.in_syscall));

    match current {
        Some(0) if ring == 3 => {
            crate::kernel::process::kill_faulting_current(fault_addr);
            PageFaultOutcome::ProcessKilled
        }
        _ => {
            debug_println!("[page fault] fault in kernel context or mid-syscall, halting");
            PageFaultOutcome::Fatal
        }
    }
}
