// src/kernel/process/mod.rs
//! Process table and lifecycle
//!
//! A fixed-size process table (`[Option<Process>; MAX_PROCESSES]`) behind one
//! `lazy_static! { static ref PROCESS_TABLE: Mutex<ProcessTable> }`, following
//! the teacher's `PROCESS_TABLE`/`SCHEDULER` global-singleton pattern. Ready
//! and suspended membership is tracked with PID-indexed `prev`/`next`
//! pointers stored inside each slot rather than an external queue, matching
//! the original kernel's intrusive process lists without introducing raw
//! pointers.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use spin::Mutex;

use crate::arch::x86::gdt::{USER_CODE_SELECTOR, USER_DATA_SELECTOR};
use crate::arch::x86::interrupts::SavedRegs;
use crate::errors::unified::ProcessError;
use crate::kernel::constants::{MAX_FDS, MAX_PROCESSES, PROCESS_STACK_BASE, PROCESS_STACK_SIZE};
pub use crate::kernel::core::types::ProcessId;
use crate::kernel::fs::handle::FileHandle;
use crate::kernel::ipc::mailbox::{Mailbox, Message};
use crate::kernel::mm::{PageDirectory, PageFlags};

/// One process-table slot.
pub struct Process {
    pub exists: bool,
    pub ready: bool,
    pub exited: bool,
    pub saved_regs: SavedRegs,
    pub pdir: PageDirectory,
    /// Zero outside a syscall; otherwise the call number currently in
    /// progress, so a page fault raised while servicing it is fatal rather
    /// than just a reason to kill this process (see
    /// `kernel::mm::page_fault`).
    pub in_syscall: u32,
    pub last_errno: i32,
    pub filedesc: [Option<Arc<Mutex<FileHandle>>>; MAX_FDS],
    pub cwd: String,
    pub text_start: u32,
    pub text_end: u32,
    pub data_start: u32,
    pub data_end: u32,
    pub stack_start: u32,
    pub stack_end: u32,
    pub parent_pid: Option<ProcessId>,
    pub exit_status: i32,
    pub waiting_on: Option<ProcessId>,
    pub mailbox: Mailbox,
    pub receive_blocked: bool,
    prev: Option<ProcessId>,
    next: Option<ProcessId>,
}

impl Process {
    fn empty(pdir: PageDirectory) -> Self {
        const NO_FD: Option<Arc<Mutex<FileHandle>>> = None;
        Process {
            exists: true,
            ready: false,
            exited: false,
            saved_regs: SavedRegs::zeroed(),
            pdir,
            in_syscall: 0,
            last_errno: 0,
            filedesc: [NO_FD; MAX_FDS],
            cwd: String::from("/"),
            text_start: 0,
            text_end: 0,
            data_start: 0,
            data_end: 0,
            stack_start: 0,
            stack_end: 0,
            parent_pid: None,
            exit_status: 0,
            waiting_on: None,
            mailbox: Mailbox::new(),
            receive_blocked: false,
            prev: None,
            next: None,
        }
    }

    /// Does `[addr, addr+len)` fall entirely within one of this process's
    /// own mapped ranges? Used by the syscall gate to validate user
    /// pointers before dereferencing them.
    pub fn owns_address(&self, addr: u32, len: u32) -> bool {
        let Some(end) = addr.checked_add(len) else {
            return false;
        };
        let in_range = |start: u32, stop: u32| addr >= start && end <= stop;
        in_range(self.text_start, self.text_end)
            || in_range(self.data_start, self.data_end)
            || in_range(self.stack_start, self.stack_end)
    }

    pub fn send_message(&mut self, msg: Message) -> Result<(), ()> {
        self.mailbox.try_push(msg)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Ready,
    Suspended,
}

/// The process table plus its two intrusive lists.
pub struct ProcessTable {
    processes: [Option<Process>; MAX_PROCESSES],
    ready_head: Option<ProcessId>,
    ready_tail: Option<ProcessId>,
    suspended_head: Option<ProcessId>,
    suspended_tail: Option<ProcessId>,
    /// The process whose `saved_regs` the current interrupt frame describes,
    /// or `None` when nothing is scheduled (boot, or every process blocked).
    pub current: Option<ProcessId>,
}

impl ProcessTable {
    const fn new() -> Self {
        const NONE: Option<Process> = None;
        ProcessTable {
            processes: [NONE; MAX_PROCESSES],
            ready_head: None,
            ready_tail: None,
            suspended_head: None,
            suspended_tail: None,
            current: None,
        }
    }

    pub fn get(&self, pid: ProcessId) -> Option<&Process> {
        self.processes.get(pid.0 as usize)?.as_ref()
    }

    pub fn get_mut(&mut self, pid: ProcessId) -> Option<&mut Process> {
        self.processes.get_mut(pid.0 as usize)?.as_mut()
    }

    /// Lowest index `>= 1` with no live process (PID 0 is reserved as "no
    /// process").
    pub fn get_free_pid(&self) -> Option<ProcessId> {
        (1..MAX_PROCESSES as u32)
            .find(|&i| self.processes[i as usize].is_none())
            .map(ProcessId)
    }

    fn head_tail(&mut self, kind: ListKind) -> (&mut Option<ProcessId>, &mut Option<ProcessId>) {
        match kind {
            ListKind::Ready => (&mut self.ready_head, &mut self.ready_tail),
            ListKind::Suspended => (&mut self.suspended_head, &mut self.suspended_tail),
        }
    }

    fn push_back(&mut self, kind: ListKind, pid: ProcessId) {
        let old_tail = *self.head_tail(kind).1;
        *self.head_tail(kind).1 = Some(pid);
        match old_tail {
            Some(t) => self.get_mut(t).expect("list tail is live").next = Some(pid),
            None => *self.head_tail(kind).0 = Some(pid),
        }
        let proc = self.get_mut(pid).expect("pushing a live process");
        proc.prev = old_tail;
        proc.next = None;
    }

    fn remove(&mut self, kind: ListKind, pid: ProcessId) {
        let (prev, next) = {
            let proc = self.get(pid).expect("removing a live process");
            (proc.prev, proc.next)
        };
        match prev {
            Some(p) => self.get_mut(p).expect("prev is live").next = next,
            None => *self.head_tail(kind).0 = next,
        }
        match next {
            Some(n) => self.get_mut(n).expect("next is live").prev = prev,
            None => *self.head_tail(kind).1 = prev,
        }
        if let Some(proc) = self.get_mut(pid) {
            proc.prev = None;
            proc.next = None;
        }
    }

    /// The process after `pid` on the ready list, wrapping to the head; used
    /// by the scheduler to advance the running process round-robin.
    pub fn next_ready_after(&self, pid: ProcessId) -> Option<ProcessId> {
        match self.get(pid).and_then(|p| p.next) {
            Some(next) => Some(next),
            None => self.ready_head,
        }
    }

    pub fn ready_head(&self) -> Option<ProcessId> {
        self.ready_head
    }

    /// Drop a zombie's slot entirely, freeing its PID for reuse. Called by
    /// `waitpid` once it has copied out the exit status; a zombie with a
    /// live parent is otherwise left in the table indefinitely (see
    /// `kill_process`'s "leave it as a zombie" branch).
    pub fn reap(&mut self, pid: ProcessId) {
        self.processes[pid.0 as usize] = None;
    }

    /// Children of `pid`, used by `waitpid` and orphan reparenting.
    pub fn children_of(&self, pid: ProcessId) -> alloc::vec::Vec<ProcessId> {
        self.processes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let proc = slot.as_ref()?;
                (proc.parent_pid == Some(pid)).then_some(ProcessId(i as u32))
            })
            .collect()
    }
}

lazy_static! {
    pub static ref PROCESS_TABLE: Mutex<ProcessTable> = Mutex::new(ProcessTable::new());
}

/// Current process's PID, or `None` if nothing is scheduled.
pub fn current_pid() -> Option<ProcessId> {
    PROCESS_TABLE.lock().current
}

/// Allocate a slot, build its page directory (0-6 MiB supervisor-RO identity
/// map, kernel text user-RO identity map, a fresh mapped stack), and push it
/// onto the ready list. Used once for PID 1 (the shell) and by `fork`.
pub fn start_process(entry: u32) -> Result<ProcessId, ProcessError> {
    let mut table = PROCESS_TABLE.lock();
    let pid = table.get_free_pid().ok_or(ProcessError::TableFull)?;

    let pdir = PageDirectory::allocate().map_err(|_| ProcessError::TableFull)?;
    identity_map_kernel(&pdir);

    let stack_start = PROCESS_STACK_BASE - PROCESS_STACK_SIZE;
    let stack_end = PROCESS_STACK_BASE;
    let page_count = PROCESS_STACK_SIZE / crate::kernel::constants::PAGE_SIZE as u32;
    pdir.map_new_pages(stack_start, page_count)
        .map_err(|_| ProcessError::TableFull)?;

    let mut proc = Process::empty(pdir);
    proc.stack_start = stack_start;
    proc.stack_end = stack_end;
    // `entry` is the PID 1 bootstrap trampoline, one page of already-present
    // code in the kernel heap arena (see `build_init_trampoline`); register
    // it as this process's text range so `owns_address` accepts the string
    // pointers it pushes for its own `execve` call.
    proc.text_start = entry;
    proc.text_end = entry + crate::kernel::constants::PAGE_SIZE as u32;
    proc.saved_regs = initial_regs(entry, stack_end);
    proc.ready = true;

    let stdin_pipe = Arc::new(Mutex::new(crate::kernel::fs::pipe::Pipe::new()));
    crate::kernel::fs::set_input_pipe(stdin_pipe.clone());
    proc.filedesc[0] = Some(Arc::new(Mutex::new(FileHandle::PipeReader(stdin_pipe))));
    proc.filedesc[1] = Some(Arc::new(Mutex::new(FileHandle::Screen)));
    proc.filedesc[2] = Some(Arc::new(Mutex::new(FileHandle::Screen)));

    table.processes[pid.0 as usize] = Some(proc);
    table.push_back(ListKind::Ready, pid);
    Ok(pid)
}

/// Identity-map `[0, PAGE_START)` supervisor-only and `[KERNEL_MEM_BASE,
/// KERNEL_MEM_BASE+KERNEL_MEM_SIZE)` kernel code user-readable, the mapping
/// every process needs so user code faults cleanly against the rest of the
/// address space instead of triple-faulting on an unmapped kernel access.
fn identity_map_kernel(pdir: &PageDirectory) {
    use crate::kernel::constants::{KERNEL_MEM_BASE, KERNEL_MEM_SIZE, PAGE_START};
    let _ = pdir.identity_map(0, PAGE_START as u32, PageFlags::PRESENT, PageFlags::empty());
    let _ = pdir.identity_map(
        KERNEL_MEM_BASE,
        KERNEL_MEM_BASE + KERNEL_MEM_SIZE,
        PageFlags::USER,
        PageFlags::empty(),
    );
}

fn initial_regs(entry: u32, stack_top: u32) -> SavedRegs {
    let mut regs = SavedRegs::zeroed();
    regs.eip = entry;
    regs.useresp = stack_top;
    regs.cs = USER_CODE_SELECTOR as u32;
    regs.ds = USER_DATA_SELECTOR as u32;
    regs.es = regs.ds;
    regs.fs = regs.ds;
    regs.gs = regs.ds;
    regs.ss = USER_DATA_SELECTOR as u32;
    regs.eflags = 0x200; // IF set: the process runs with interrupts enabled
    regs
}

/// Move `pid` from the ready list to the suspended list. Idempotence is not
/// required: callers must only call this when `pid` is actually ready.
pub fn suspend_process(table: &mut ProcessTable, pid: ProcessId) {
    table.remove(ListKind::Ready, pid);
    table.push_back(ListKind::Suspended, pid);
    if let Some(p) = table.get_mut(pid) {
        p.ready = false;
    }
}

/// Move `pid` from the suspended list back to the ready list.
pub fn resume_process(table: &mut ProcessTable, pid: ProcessId) {
    table.remove(ListKind::Suspended, pid);
    table.push_back(ListKind::Ready, pid);
    if let Some(p) = table.get_mut(pid) {
        p.ready = true;
    }
}

/// Close every handle, unmap and free the address space, reparent children,
/// and either free the slot immediately (orphan, parent already gone) or
/// leave it as a zombie for the parent's `waitpid`. Paging is disabled
/// around the table mutation since page tables are edited by physical
/// address (see [`crate::kernel::mm::paging::PagingGuard`]).
pub fn kill_process(pid: ProcessId, exit_status: i32) {
    let mut table = PROCESS_TABLE.lock();

    let Some((on_ready, parent, pdir, stack_start, stack_end, data_start, data_end, text_start, text_end)) =
        table.get(pid).map(|proc| {
            (
                proc.ready,
                proc.parent_pid,
                proc.pdir,
                proc.stack_start,
                proc.stack_end,
                proc.data_start,
                proc.data_end,
                proc.text_start,
                proc.text_end,
            )
        })
    else {
        return;
    };

    if on_ready {
        table.remove(ListKind::Ready, pid);
    } else {
        table.remove(ListKind::Suspended, pid);
    }

    // Handles are taken out but not dropped here: dropping the last `Arc`
    // to a `PipeWriter` runs `Pipe::close_writer`, which locks
    // `PROCESS_TABLE` to resume a blocked reader. `table` is still held
    // for the rest of this function, so these are kept alive in
    // `closed_handles` and only dropped once the lock is released below.
    let mut closed_handles = Vec::new();
    if let Some(proc) = table.get_mut(pid) {
        for fd in proc.filedesc.iter_mut() {
            if let Some(handle) = fd.take() {
                if let Some(pipe) = handle.lock().reader_pipe() {
                    pipe.lock().clear_reader_if(pid);
                }
                closed_handles.push(handle);
            }
        }
    }

    // Orphans: reparent to "no parent" so they self-reap on exit.
    for child in table.children_of(pid) {
        if let Some(c) = table.get_mut(child) {
            c.parent_pid = None;
        }
    }

    unsafe {
        let _guard = crate::kernel::mm::PagingGuard::new(pdir);
        let page_size = crate::kernel::constants::PAGE_SIZE as u32;
        let mut addr = stack_start;
        while addr < stack_end {
            pdir.unmap_and_free_page(addr);
            addr += page_size;
        }
        addr = data_start;
        while addr < data_end {
            pdir.unmap_and_free_page(addr);
            addr += page_size;
        }
        addr = text_start;
        while addr < text_end {
            pdir.unmap_and_free_page(addr);
            addr += page_size;
        }
        pdir.free();
    }

    match parent {
        None => {
            table.processes[pid.0 as usize] = None;
        }
        Some(parent_pid) => {
            if let Some(proc) = table.get_mut(pid) {
                proc.exited = true;
                proc.exit_status = exit_status;
            }
            let parent_waiting = table
                .get(parent_pid)
                .map(|p| p.waiting_on == Some(pid))
                .unwrap_or(false);
            if parent_waiting {
                resume_process(&mut table, parent_pid);
                if let Some(p) = table.get_mut(parent_pid) {
                    p.waiting_on = None;
                }
            }
        }
    }

    if table.current == Some(pid) {
        table.current = None;
    }

    drop(table);
    drop(closed_handles);
}

/// Called from the page fault handler for a fault raised by user-mode code:
/// the current process dies with a synthetic exit status and the scheduler
/// is asked to pick a new one.
pub fn kill_faulting_current(fault_addr: u32) {
    let Some(pid) = current_pid() else { return };
    crate::debug_println!(
        "process {}: page fault at address {:#x}, killing",
        pid.0, fault_addr
    );
    // A process killed by a fault exits as if by a signal: negative status,
    // matching the "non-zero exit code" a parent observes via waitpid.
    kill_process(pid, -1);
}

/// Duplicate the calling process: a fresh page directory with the same
/// identity mappings, a physical copy of every mapped text/data/stack page,
/// and refcount-shared file handles. Returns the child's PID; the caller is
/// responsible for writing `0` into the child's return-value register and
/// the child's PID into its own, since both share `saved_regs` at the point
/// of the call except `eax`.
pub fn fork(parent_pid: ProcessId) -> Result<ProcessId, ProcessError> {
    let mut table = PROCESS_TABLE.lock();
    let child_pid = table.get_free_pid().ok_or(ProcessError::TableFull)?;

    let (parent_regs, text, data, stack, cwd, filedesc, parent_parent_in_syscall) = {
        let parent = table.get(parent_pid).ok_or(ProcessError::NoSuchProcess)?;
        (
            parent.saved_regs,
            (parent.text_start, parent.text_end),
            (parent.data_start, parent.data_end),
            (parent.stack_start, parent.stack_end),
            parent.cwd.clone(),
            parent.filedesc.clone(),
            parent.in_syscall,
        )
    };

    let child_pdir = PageDirectory::allocate().map_err(|_| ProcessError::TableFull)?;
    identity_map_kernel(&child_pdir);

    let parent_pdir = table.get(parent_pid).unwrap().pdir;
    unsafe {
        let _guard = crate::kernel::mm::PagingGuard::new(parent_pdir);
        copy_range(&parent_pdir, &child_pdir, text.0, text.1);
        copy_range(&parent_pdir, &child_pdir, data.0, data.1);
        copy_range(&parent_pdir, &child_pdir, stack.0, stack.1);
    }

    let mut child = Process::empty(child_pdir);
    child.text_start = text.0;
    child.text_end = text.1;
    child.data_start = data.0;
    child.data_end = data.1;
    child.stack_start = stack.0;
    child.stack_end = stack.1;
    child.cwd = cwd;
    child.filedesc = filedesc;
    child.parent_pid = Some(parent_pid);
    child.in_syscall = parent_parent_in_syscall;
    child.saved_regs = parent_regs;
    child.saved_regs.eax = 0; // fork returns 0 in the child
    child.ready = true;

    table.processes[child_pid.0 as usize] = Some(child);
    table.push_back(ListKind::Ready, child_pid);
    Ok(child_pid)
}

/// `sys_vfork` is a pure alias of `fork`: the source kernel this design is
/// grounded on retains full copying semantics for vfork too (there is no
/// true COW or shared address space), so there is no separate code path to
/// keep in sync.
pub fn vfork(parent_pid: ProcessId) -> Result<ProcessId, ProcessError> {
    fork(parent_pid)
}

/// Copy every physical page mapped in `[start, end)` of `src` into a freshly
/// allocated page at the same logical address in `dst`. Requires paging
/// disabled (source lookups use physical addresses) — the caller must hold
/// a `PagingGuard`.
unsafe fn copy_range(src: &PageDirectory, dst: &PageDirectory, start: u32, end: u32) {
    let page_size = crate::kernel::constants::PAGE_SIZE as u32;
    let mut addr = start;
    while addr < end {
        if let Some(phys) = src.lookup_page(addr) {
            if dst
                .map_new_pages(addr, 1)
                .is_ok()
            {
                if let Some(new_phys) = dst.lookup_page(addr) {
                    unsafe {
                        core::ptr::copy_nonoverlapping(
                            phys as *const u8,
                            new_phys as *mut u8,
                            page_size as usize,
                        );
                    }
                }
            }
        }
        addr += page_size;
    }
}
