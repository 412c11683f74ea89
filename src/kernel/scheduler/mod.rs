//! Process scheduler
//!
//! Round-robin over the ready list maintained by [`crate::kernel::process`].
//! There is no separate `Scheduler` struct holding its own notion of
//! "current" the way the original teacher demo did: the process table's
//! `current` field and each process's intrusive `next` pointer are the only
//! state a context switch needs, so the table stays the single source of
//! truth instead of two structures that can drift apart.

use crate::arch::x86::interrupts::SavedRegs;
use crate::arch::x86::cpu::write_cr3;
use crate::kernel::process::PROCESS_TABLE;

/// Timer tick: save the excepting process's registers, advance round-robin,
/// and resume whatever is next. Called once per `TIMER_VECTOR` interrupt.
pub fn tick(regs: &mut SavedRegs) {
    context_switch(regs);
}

/// A process was just killed or blocked outside of a timer tick (a page
/// fault, `sys_exit`, a blocking `receive` with nothing queued). The current
/// interrupt frame no longer describes anything runnable; pick a new one.
pub fn reschedule(regs: &mut SavedRegs) {
    context_switch(regs);
}

/// Core of both entry points above. If the process the frame currently
/// describes is still ready, its registers are written back into its slot
/// first so it can resume later exactly where it left off; then the next
/// ready process (round robin from the current one, or the head of the
/// ready list if nothing was running) is copied into `regs` and its page
/// directory loaded. If the ready list is empty, `regs` is left untouched:
/// whatever ring-0 code was interrupted (the boot idle loop) simply resumes,
/// since `iretd` on a same-privilege return doesn't pop `useresp`/`ss` and a
/// synthesized "dedicated idle stack" frame would have nowhere safe to
/// point them.
fn context_switch(regs: &mut SavedRegs) {
    let mut table = PROCESS_TABLE.lock();

    let current = table.current;

    // Unconditionally save the outgoing frame, whether the process is still
    // ready or was just suspended: a blocked process must resume exactly
    // where it left off once something wakes it, and that frame is only
    // ever captured here. A killed process already cleared `table.current`
    // to `None` in `kill_process`, so this branch never fires for it.
    if let Some(pid) = current {
        if let Some(proc) = table.get_mut(pid) {
            proc.saved_regs = *regs;
        }
    }

    let next = match current {
        Some(pid) if table.get(pid).map(|p| p.ready).unwrap_or(false) => {
            table.next_ready_after(pid)
        }
        _ => table.ready_head(),
    };

    let Some(next_pid) = next else {
        table.current = None;
        return;
    };

    let pdir = match table.get(next_pid) {
        Some(proc) => proc.pdir,
        None => return,
    };

    *regs = table.get(next_pid).expect("next_pid is live").saved_regs;
    table.current = Some(next_pid);
    let resume_in_syscall = table.get(next_pid).map(|p| p.in_syscall).unwrap_or(0);
    drop(table);

    unsafe {
        write_cr3(pdir.physical());
    }

    // The process we just switched to was suspended mid-syscall: its frame
    // still has the original call number in `eax` and the original
    // arguments on its stack, untouched since the handler never got to
    // write a result. Re-enter the gate so the call is retried now that
    // whatever it was waiting on may have happened.
    if resume_in_syscall != 0 {
        crate::kernel::syscall::dispatch_from_frame(regs);
    }
}
