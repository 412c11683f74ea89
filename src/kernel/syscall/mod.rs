//! System-call gate
//!
//! One dispatcher reached from the `int 0x30` trap stub, analogous to the
//! original kernel's `syscall(regs *r)`. The call number comes from `eax`;
//! arguments sit on the user stack just past the trap frame's return
//! address, since user space traps in with `int` rather than `call`ing into
//! the kernel. Every handler below runs with the calling process's own page
//! directory still active, so ordinary pointer dereferences already go
//! through that process's address space — only the bounds check
//! (`Process::owns_address`) needs doing by hand.
//!
//! Handlers return [`SyscallOutcome`] rather than a raw `-ESUSPEND` sentinel
//! integer; [`dispatch_from_frame`] is the only place that flattens it back
//! into the `(eax, last_errno, context-switch?)` triple the trap return
//! actually needs.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::arch::x86::interrupts::SavedRegs;
use crate::errors::unified::{Errno, FsError, KernelError};
use crate::kernel::constants::{
    MAX_FDS, MAX_PROCESSES, MESSAGE_INLINE_SIZE, NAME_MAX, OPEN_AS_DIRECTORY, PAGE_SIZE,
    PROCESS_DATA_BASE, PROCESS_STACK_BASE, PROCESS_TEXT_BASE,
};
use crate::kernel::fs::handle::{FileHandle, HandleIo};
use crate::kernel::fs::pipe::Pipe;
use crate::kernel::fs::readonly::relative_to_absolute;
use crate::kernel::ipc::mailbox::Message;
use crate::kernel::mm::PagingGuard;
use crate::kernel::process::{self, ProcessId, PROCESS_TABLE};

// Call numbers, 1..21, matching this kernel's own ABI rather than the
// teacher's Linux-style syscall table indices.
pub const GETPID: u32 = 1;
pub const EXIT: u32 = 2;
pub const WRITE: u32 = 3;
pub const READ: u32 = 4;
pub const GETERRNO: u32 = 5;
pub const BRK: u32 = 6;
pub const SEND: u32 = 7;
pub const RECEIVE: u32 = 8;
pub const CLOSE: u32 = 9;
pub const PIPE: u32 = 10;
pub const DUP2: u32 = 11;
pub const FORK: u32 = 12;
pub const EXECVE: u32 = 13;
pub const WAITPID: u32 = 14;
pub const STAT: u32 = 15;
pub const OPEN: u32 = 16;
pub const GETDENT: u32 = 17;
pub const CHDIR: u32 = 18;
pub const GETCWD: u32 = 19;
pub const KILL: u32 = 20;
pub const HALT: u32 = 21;

/// On-wire `struct stat` layout: `mode, uid, gid, size, mtime`, each `u32`.
const STAT_STRUCT_SIZE: u32 = 20;
/// On-wire `struct dirent` layout: `d_ino: u32` followed by a NUL-terminated
/// name of at most `NAME_MAX` bytes plus the terminator.
const DIRENT_STRUCT_SIZE: u32 = 4 + NAME_MAX as u32 + 1;
/// On-wire `struct message` layout: `sender, tag, size: u32` followed by the
/// inline payload, mirroring [`crate::kernel::ipc::mailbox::Message`].
const MESSAGE_STRUCT_SIZE: u32 = 12 + MESSAGE_INLINE_SIZE as u32;
/// Upper bound on byte-by-byte string validation, so a pointer into memory
/// that is mapped but never hits a NUL can't spin the kernel forever. Not
/// present in the original, whose equivalent loop is genuinely unbounded.
const MAX_STRING_SCAN: u32 = 16 * 1024;

/// What a handler decided, one level above the raw `(eax, errno)` pair the
/// trap return actually writes back.
pub enum SyscallOutcome {
    Ok(i32),
    Err(Errno),
    /// The process was suspended (blocking call) or killed (`exit`, a
    /// self-`kill`); the current frame no longer describes anything
    /// runnable and must not be returned to directly.
    Suspended,
}

/// Entry point reached from [`crate::arch::x86::interrupts`] for every
/// `INTERRUPT_SYSCALL` trap, and again from the scheduler when resuming a
/// process that was suspended mid-call.
pub fn dispatch_from_frame(regs: &mut SavedRegs) {
    let Some(pid) = process::current_pid() else {
        return;
    };
    let call_no = regs.eax;

    {
        let mut table = PROCESS_TABLE.lock();
        if let Some(p) = table.get_mut(pid) {
            p.in_syscall = call_no;
        }
    }

    let outcome = dispatch(pid, call_no, regs);

    if matches!(outcome, SyscallOutcome::Suspended) {
        crate::kernel::scheduler::reschedule(regs);
        return;
    }

    let (result, errno) = match outcome {
        SyscallOutcome::Ok(v) => (v, 0),
        SyscallOutcome::Err(e) => (-1, e.code()),
        SyscallOutcome::Suspended => unreachable!("handled above"),
    };

    let changed = {
        let mut table = PROCESS_TABLE.lock();
        let changed = table.current != Some(pid);
        if let Some(p) = table.get_mut(pid) {
            p.in_syscall = 0;
            // geterrno reads last_errno as its own result; overwriting it
            // here would stomp the very thing the caller just asked for.
            if call_no != GETERRNO {
                p.last_errno = errno;
            }
        }
        changed
    };

    regs.eax = result as u32;

    if changed {
        crate::kernel::scheduler::reschedule(regs);
    }
}

fn dispatch(pid: ProcessId, call_no: u32, regs: &mut SavedRegs) -> SyscallOutcome {
    let useresp = regs.useresp;
    let arg = |i: u32| -> u32 {
        unsafe { core::ptr::read_unaligned(useresp.wrapping_add(4 + i * 4) as *const u32) }
    };

    match call_no {
        GETPID => sys_getpid(pid),
        EXIT => sys_exit(pid, arg(0) as i32),
        WRITE => sys_write(pid, arg(0) as i32, arg(1), arg(2)),
        READ => sys_read(pid, arg(0) as i32, arg(1), arg(2)),
        GETERRNO => sys_geterrno(pid),
        BRK => sys_brk(pid, arg(0)),
        SEND => sys_send(pid, arg(0) as i32, arg(1), arg(2), arg(3)),
        RECEIVE => sys_receive(pid, arg(0), arg(1) != 0),
        CLOSE => sys_close(pid, arg(0) as i32),
        PIPE => sys_pipe(pid, arg(0)),
        DUP2 => sys_dup2(pid, arg(0) as i32, arg(1) as i32),
        FORK => sys_fork(pid),
        EXECVE => sys_execve(pid, arg(0), arg(1), regs),
        WAITPID => sys_waitpid(pid, arg(0) as i32, arg(1)),
        STAT => sys_stat(pid, arg(0), arg(1)),
        OPEN => sys_open(pid, arg(0), arg(1)),
        GETDENT => sys_getdent(pid, arg(0) as i32, arg(1)),
        CHDIR => sys_chdir(pid, arg(0)),
        GETCWD => sys_getcwd(pid, arg(0), arg(1)),
        KILL => sys_kill(pid, arg(0) as i32),
        HALT => sys_halt(),
        _ => SyscallOutcome::Err(Errno::Enosys),
    }
}

fn owns(pid: ProcessId, addr: u32, len: u32) -> bool {
    PROCESS_TABLE
        .lock()
        .get(pid)
        .map(|p| p.owns_address(addr, len))
        .unwrap_or(false)
}

/// Extend a length one byte at a time until a NUL is found or a byte fails
/// validation, matching the original's `valid_string`, but bounded so a
/// corrupted or non-terminated pointer can't hang the kernel.
fn valid_string(pid: ProcessId, addr: u32) -> Option<String> {
    let mut len = 0u32;
    loop {
        if len > MAX_STRING_SCAN || !owns(pid, addr, len + 1) {
            return None;
        }
        let byte = unsafe { core::ptr::read(addr.wrapping_add(len) as *const u8) };
        if byte == 0 {
            let slice = unsafe { core::slice::from_raw_parts(addr as *const u8, len as usize) };
            return core::str::from_utf8(slice).ok().map(String::from);
        }
        len += 1;
    }
}

fn write_u32(addr: u32, val: u32) {
    unsafe { core::ptr::write_unaligned(addr as *mut u32, val) }
}

fn read_u32(addr: u32) -> u32 {
    unsafe { core::ptr::read_unaligned(addr as *const u32) }
}

fn write_bytes(addr: u32, data: &[u8]) {
    unsafe { core::ptr::copy_nonoverlapping(data.as_ptr(), addr as *mut u8, data.len()) }
}

fn fs_err(e: FsError) -> Errno {
    KernelError::Fs(e).into()
}

fn cwd_of(pid: ProcessId) -> String {
    PROCESS_TABLE
        .lock()
        .get(pid)
        .map(|p| p.cwd.clone())
        .unwrap_or_else(|| String::from("/"))
}

fn sys_getpid(pid: ProcessId) -> SyscallOutcome {
    SyscallOutcome::Ok(pid.0 as i32)
}

fn sys_exit(pid: ProcessId, status: i32) -> SyscallOutcome {
    process::kill_process(pid, status);
    SyscallOutcome::Suspended
}

fn sys_write(pid: ProcessId, fd: i32, buf_addr: u32, count: u32) -> SyscallOutcome {
    if fd < 0 || fd as usize >= MAX_FDS {
        return SyscallOutcome::Err(Errno::Ebadf);
    }
    if !owns(pid, buf_addr, count) {
        return SyscallOutcome::Err(Errno::Efault);
    }
    let handle = match PROCESS_TABLE.lock().get(pid).and_then(|p| p.filedesc[fd as usize].clone()) {
        Some(h) => h,
        None => return SyscallOutcome::Err(Errno::Ebadf),
    };
    let buf = unsafe { core::slice::from_raw_parts(buf_addr as *const u8, count as usize) };
    match handle.lock().write(buf) {
        HandleIo::Bytes(n) => SyscallOutcome::Ok(n as i32),
        HandleIo::Err(e) => SyscallOutcome::Err(fs_err(e)),
        HandleIo::WouldBlock => SyscallOutcome::Err(Errno::Eagain),
    }
}

fn sys_read(pid: ProcessId, fd: i32, buf_addr: u32, count: u32) -> SyscallOutcome {
    if fd < 0 || fd as usize >= MAX_FDS {
        return SyscallOutcome::Err(Errno::Ebadf);
    }
    if !owns(pid, buf_addr, count) {
        return SyscallOutcome::Err(Errno::Efault);
    }
    let handle = match PROCESS_TABLE.lock().get(pid).and_then(|p| p.filedesc[fd as usize].clone()) {
        Some(h) => h,
        None => return SyscallOutcome::Err(Errno::Ebadf),
    };
    let buf = unsafe { core::slice::from_raw_parts_mut(buf_addr as *mut u8, count as usize) };
    match handle.lock().read(pid, buf) {
        HandleIo::Bytes(n) => SyscallOutcome::Ok(n as i32),
        HandleIo::Err(e) => SyscallOutcome::Err(fs_err(e)),
        HandleIo::WouldBlock => {
            let mut table = PROCESS_TABLE.lock();
            process::suspend_process(&mut table, pid);
            SyscallOutcome::Suspended
        }
    }
}

fn sys_geterrno(pid: ProcessId) -> SyscallOutcome {
    let errno = PROCESS_TABLE.lock().get(pid).map(|p| p.last_errno).unwrap_or(0);
    SyscallOutcome::Ok(errno)
}

/// Grow the data segment. `new_end` is rounded up to a page boundary on its
/// own terms, independent of whatever alignment `old_end` happens to have,
/// matching the original's `sbrk`.
fn sys_brk(pid: ProcessId, new_end: u32) -> SyscallOutcome {
    let (pdir, old_end) = {
        let table = PROCESS_TABLE.lock();
        match table.get(pid) {
            Some(p) => (p.pdir, p.data_end),
            None => return SyscallOutcome::Err(Errno::Esrch),
        }
    };
    if new_end <= old_end {
        return SyscallOutcome::Ok(0);
    }

    let page_size = PAGE_SIZE as u32;
    let mut rounded = new_end;
    if rounded % page_size != 0 {
        rounded = (rounded / page_size + 1) * page_size;
    }
    let page_count = (rounded - old_end) / page_size;

    unsafe {
        let _guard = PagingGuard::new(pdir);
        if pdir.map_new_pages(old_end, page_count).is_err() {
            return SyscallOutcome::Err(Errno::Enomem);
        }
    }

    if let Some(p) = PROCESS_TABLE.lock().get_mut(pid) {
        p.data_end = rounded;
    }
    SyscallOutcome::Ok(0)
}

fn sys_send(pid: ProcessId, to: i32, tag: u32, data_addr: u32, size: u32) -> SyscallOutcome {
    if !owns(pid, data_addr, size) {
        return SyscallOutcome::Err(Errno::Efault);
    }
    if to < 0 || to as usize >= MAX_PROCESSES {
        return SyscallOutcome::Err(Errno::Esrch);
    }
    if size > MESSAGE_INLINE_SIZE as u32 {
        return SyscallOutcome::Err(Errno::Einval);
    }
    let to_pid = ProcessId(to as u32);
    let bytes = unsafe { core::slice::from_raw_parts(data_addr as *const u8, size as usize) };
    let Some(msg) = Message::new(pid, tag, bytes) else {
        return SyscallOutcome::Err(Errno::Einval);
    };

    let mut table = PROCESS_TABLE.lock();
    let should_resume = {
        let Some(dest) = table.get_mut(to_pid) else {
            return SyscallOutcome::Err(Errno::Esrch);
        };
        if dest.send_message(msg).is_err() {
            return SyscallOutcome::Err(Errno::Enomem);
        }
        let was_blocked = dest.receive_blocked;
        dest.receive_blocked = false;
        was_blocked
    };
    if should_resume {
        process::resume_process(&mut table, to_pid);
    }
    SyscallOutcome::Ok(0)
}

fn sys_receive(pid: ProcessId, msg_addr: u32, block: bool) -> SyscallOutcome {
    if !owns(pid, msg_addr, MESSAGE_STRUCT_SIZE) {
        return SyscallOutcome::Err(Errno::Efault);
    }
    let mut table = PROCESS_TABLE.lock();
    let popped = {
        let Some(proc) = table.get_mut(pid) else {
            return SyscallOutcome::Err(Errno::Esrch);
        };
        proc.mailbox.try_pop()
    };
    if let Some(msg) = popped {
        write_u32(msg_addr, msg.sender.0);
        write_u32(msg_addr + 4, msg.tag);
        write_u32(msg_addr + 8, msg.size as u32);
        write_bytes(msg_addr + 12, &msg.data[..msg.size]);
        return SyscallOutcome::Ok(0);
    }
    if block {
        if let Some(proc) = table.get_mut(pid) {
            proc.receive_blocked = true;
        }
        process::suspend_process(&mut table, pid);
        return SyscallOutcome::Suspended;
    }
    SyscallOutcome::Err(Errno::Eagain)
}

fn sys_close(pid: ProcessId, fd: i32) -> SyscallOutcome {
    if fd < 0 || fd as usize >= MAX_FDS {
        return SyscallOutcome::Err(Errno::Ebadf);
    }
    let mut table = PROCESS_TABLE.lock();
    let Some(proc) = table.get_mut(pid) else {
        return SyscallOutcome::Err(Errno::Esrch);
    };
    let Some(handle) = proc.filedesc[fd as usize].take() else {
        return SyscallOutcome::Err(Errno::Ebadf);
    };
    // Drop the table guard before the handle: if this was the last
    // reference to a pipe writer, its Drop locks PROCESS_TABLE to resume a
    // blocked reader, which would deadlock against the guard still above.
    drop(table);
    drop(handle);
    SyscallOutcome::Ok(0)
}

fn sys_pipe(pid: ProcessId, filedes_addr: u32) -> SyscallOutcome {
    if !owns(pid, filedes_addr, 8) {
        return SyscallOutcome::Err(Errno::Efault);
    }
    let mut table = PROCESS_TABLE.lock();
    let Some(proc) = table.get_mut(pid) else {
        return SyscallOutcome::Err(Errno::Esrch);
    };

    let mut readfd = None;
    let mut writefd = None;
    for i in 0..MAX_FDS {
        if proc.filedesc[i].is_none() {
            if readfd.is_none() {
                readfd = Some(i);
            } else if writefd.is_none() {
                writefd = Some(i);
                break;
            }
        }
    }
    let (Some(readfd), Some(writefd)) = (readfd, writefd) else {
        return SyscallOutcome::Err(Errno::Emfile);
    };

    let pipe = Arc::new(Mutex::new(Pipe::new()));
    proc.filedesc[readfd] = Some(Arc::new(Mutex::new(FileHandle::PipeReader(pipe.clone()))));
    proc.filedesc[writefd] = Some(Arc::new(Mutex::new(FileHandle::PipeWriter(pipe))));

    write_u32(filedes_addr, readfd as u32);
    write_u32(filedes_addr + 4, writefd as u32);
    SyscallOutcome::Ok(0)
}

fn sys_dup2(pid: ProcessId, oldfd: i32, newfd: i32) -> SyscallOutcome {
    if oldfd < 0 || oldfd as usize >= MAX_FDS || newfd < 0 || newfd as usize >= MAX_FDS {
        return SyscallOutcome::Err(Errno::Ebadf);
    }
    let mut table = PROCESS_TABLE.lock();
    let Some(proc) = table.get_mut(pid) else {
        return SyscallOutcome::Err(Errno::Esrch);
    };
    let Some(old) = proc.filedesc[oldfd as usize].clone() else {
        return SyscallOutcome::Err(Errno::Ebadf);
    };
    if oldfd == newfd {
        return SyscallOutcome::Ok(newfd);
    }
    // Whatever was at `newfd` is replaced, not just overwritten: keep it
    // alive past the table guard so its Drop (if it's the last reference to
    // a pipe writer) doesn't try to re-lock PROCESS_TABLE underneath us.
    let replaced = core::mem::replace(&mut proc.filedesc[newfd as usize], Some(old));
    drop(table);
    drop(replaced);
    SyscallOutcome::Ok(newfd)
}

fn sys_fork(pid: ProcessId) -> SyscallOutcome {
    match process::fork(pid) {
        Ok(child) => SyscallOutcome::Ok(child.0 as i32),
        Err(_) => SyscallOutcome::Err(Errno::Eagain),
    }
}

/// Replace the calling process's text and data segments with `path`, reset
/// its stack to a fresh argv blob, and redirect `regs` to the new entry
/// point. `vfork` is dispatched through this same handler: the FORK call
/// number is the only one userspace ever issues, whether it asked for
/// `fork()` or `vfork()`.
fn sys_execve(pid: ProcessId, path_addr: u32, argv_addr: u32, regs: &mut SavedRegs) -> SyscallOutcome {
    let Some(path) = valid_string(pid, path_addr) else {
        return SyscallOutcome::Err(Errno::Efault);
    };

    let mut argv: Vec<String> = Vec::new();
    if argv_addr != 0 {
        let mut i = 0u32;
        loop {
            if !owns(pid, argv_addr + i * 4, 4) {
                return SyscallOutcome::Err(Errno::Efault);
            }
            let ptr = read_u32(argv_addr + i * 4);
            if ptr == 0 {
                break;
            }
            let Some(s) = valid_string(pid, ptr) else {
                return SyscallOutcome::Err(Errno::Efault);
            };
            argv.push(s);
            i += 1;
        }
    }

    let abspath = relative_to_absolute(&cwd_of(pid), &path);
    let entry = {
        let image = crate::kernel::fs::image();
        match image.get_directory_entry(&abspath) {
            Ok(e) => *e,
            Err(e) => return SyscallOutcome::Err(fs_err(e)),
        }
    };
    if entry.is_dir() {
        return SyscallOutcome::Err(Errno::Eisdir);
    }

    // Lay out the argv blob the way it will sit on the new stack: argc, a
    // pointer to argv[0], then the pointer array, then the NUL-terminated
    // strings themselves, packed from the end backward so none overwrite
    // another before it is copied.
    let argc = argv.len() as u32;
    let strings_len: u32 = argv.iter().map(|s| s.len() as u32 + 1).sum();
    let blob_size = strings_len + argc * 4 + 8;
    let mut blob = alloc::vec![0u8; blob_size as usize];
    let mut ptrs = alloc::vec![0u32; argc as usize];

    let mut pos = blob_size;
    for (i, s) in argv.iter().enumerate().rev() {
        let nbytes = s.len() as u32 + 1;
        pos -= nbytes;
        let start = pos as usize;
        blob[start..start + s.len()].copy_from_slice(s.as_bytes());
        blob[start + s.len()] = 0;
        ptrs[i] = PROCESS_STACK_BASE - blob_size + pos;
    }
    blob[0..4].copy_from_slice(&argc.to_le_bytes());
    blob[4..8].copy_from_slice(&(PROCESS_STACK_BASE - blob_size + 8).to_le_bytes());
    for (i, ptr) in ptrs.iter().enumerate() {
        let off = 8 + i * 4;
        blob[off..off + 4].copy_from_slice(&ptr.to_le_bytes());
    }

    let (pdir, text_start, text_end, data_start, data_end) = {
        let table = PROCESS_TABLE.lock();
        match table.get(pid) {
            Some(p) => (p.pdir, p.text_start, p.text_end, p.data_start, p.data_end),
            None => return SyscallOutcome::Err(Errno::Esrch),
        }
    };

    let page_size = PAGE_SIZE as u32;
    let page_count = entry.size.div_ceil(page_size).max(1);

    unsafe {
        let _guard = PagingGuard::new(pdir);

        let mut addr = text_start;
        while addr < text_end {
            pdir.unmap_and_free_page(addr);
            addr += page_size;
        }
        addr = data_start;
        while addr < data_end {
            pdir.unmap_and_free_page(addr);
            addr += page_size;
        }

        if pdir.map_new_pages(PROCESS_TEXT_BASE, page_count).is_err() {
            return SyscallOutcome::Err(Errno::Enomem);
        }

        // Text pages are mapped read-write, matching the original: there is
        // no read-only text protection in this design.
        let image = crate::kernel::fs::image();
        let mut read_pos = 0u32;
        while read_pos < entry.size {
            if let Some(phys) = pdir.lookup_page(PROCESS_TEXT_BASE + read_pos) {
                let n = (entry.size - read_pos).min(page_size) as usize;
                let dst = core::slice::from_raw_parts_mut(phys as *mut u8, n);
                image.read_file(&entry, read_pos, dst);
            }
            read_pos += page_size;
        }
    }

    let stack_dest = PROCESS_STACK_BASE - blob_size;
    unsafe {
        core::ptr::copy_nonoverlapping(blob.as_ptr(), stack_dest as *mut u8, blob.len());
    }

    if let Some(p) = PROCESS_TABLE.lock().get_mut(pid) {
        p.text_start = PROCESS_TEXT_BASE;
        p.text_end = PROCESS_TEXT_BASE + page_count * page_size;
        p.data_start = PROCESS_DATA_BASE;
        p.data_end = PROCESS_DATA_BASE;
    }

    regs.eip = PROCESS_TEXT_BASE;
    regs.useresp = stack_dest;
    SyscallOutcome::Ok(0)
}

fn sys_waitpid(pid: ProcessId, child: i32, status_addr: u32) -> SyscallOutcome {
    if child < 0 || child as usize >= MAX_PROCESSES {
        return SyscallOutcome::Err(Errno::Echild);
    }
    let child_pid = ProcessId(child as u32);

    let mut table = PROCESS_TABLE.lock();
    if let Some(p) = table.get_mut(pid) {
        p.waiting_on = None;
    }
    let (child_exited, child_status) = {
        let Some(cproc) = table.get(child_pid) else {
            return SyscallOutcome::Err(Errno::Echild);
        };
        if !cproc.exists || cproc.parent_pid != Some(pid) {
            return SyscallOutcome::Err(Errno::Echild);
        }
        (cproc.exited, cproc.exit_status)
    };

    if child_exited {
        if status_addr != 0 {
            let caller_owns = table.get(pid).map(|p| p.owns_address(status_addr, 4)).unwrap_or(false);
            if !caller_owns {
                return SyscallOutcome::Err(Errno::Efault);
            }
            write_u32(status_addr, child_status as u32);
        }
        // Soft-reap: drop the zombie slot now that its status has been
        // collected, freeing the PID for reuse.
        table.reap(child_pid);
        SyscallOutcome::Ok(child)
    } else {
        if let Some(p) = table.get_mut(pid) {
            p.waiting_on = Some(child_pid);
        }
        process::suspend_process(&mut table, pid);
        SyscallOutcome::Suspended
    }
}

fn sys_stat(pid: ProcessId, path_addr: u32, buf_addr: u32) -> SyscallOutcome {
    let Some(path) = valid_string(pid, path_addr) else {
        return SyscallOutcome::Err(Errno::Efault);
    };
    if !owns(pid, buf_addr, STAT_STRUCT_SIZE) {
        return SyscallOutcome::Err(Errno::Efault);
    }
    let abspath = relative_to_absolute(&cwd_of(pid), &path);
    let image = crate::kernel::fs::image();
    match image.get_directory_entry(&abspath) {
        Ok(entry) => {
            write_u32(buf_addr, entry.mode);
            write_u32(buf_addr + 4, 0);
            write_u32(buf_addr + 8, 0);
            write_u32(buf_addr + 12, entry.size);
            write_u32(buf_addr + 16, entry.mtime);
            SyscallOutcome::Ok(0)
        }
        Err(e) => SyscallOutcome::Err(fs_err(e)),
    }
}

fn sys_open(pid: ProcessId, path_addr: u32, flags: u32) -> SyscallOutcome {
    let Some(path) = valid_string(pid, path_addr) else {
        return SyscallOutcome::Err(Errno::Efault);
    };

    let (fd, cwd) = {
        let table = PROCESS_TABLE.lock();
        let Some(proc) = table.get(pid) else {
            return SyscallOutcome::Err(Errno::Esrch);
        };
        let Some(fd) = (0..MAX_FDS).find(|&i| proc.filedesc[i].is_none()) else {
            return SyscallOutcome::Err(Errno::Emfile);
        };
        (fd, proc.cwd.clone())
    };

    let abspath = relative_to_absolute(&cwd, &path);
    let entry = {
        let image = crate::kernel::fs::image();
        match image.get_directory_entry(&abspath) {
            Ok(e) => *e,
            Err(e) => return SyscallOutcome::Err(fs_err(e)),
        }
    };

    let want_dir = flags == OPEN_AS_DIRECTORY;
    if want_dir && !entry.is_dir() {
        return SyscallOutcome::Err(Errno::Enotdir);
    }
    if !want_dir && entry.is_dir() {
        return SyscallOutcome::Err(Errno::Eisdir);
    }

    let handle = if entry.is_dir() {
        FileHandle::Dir { entry, entryno: 0 }
    } else {
        FileHandle::File { entry, pos: 0 }
    };

    if let Some(proc) = PROCESS_TABLE.lock().get_mut(pid) {
        proc.filedesc[fd] = Some(Arc::new(Mutex::new(handle)));
    }
    SyscallOutcome::Ok(fd as i32)
}

fn sys_getdent(pid: ProcessId, fd: i32, entry_addr: u32) -> SyscallOutcome {
    if fd < 0 || fd as usize >= MAX_FDS {
        return SyscallOutcome::Err(Errno::Ebadf);
    }
    if !owns(pid, entry_addr, DIRENT_STRUCT_SIZE) {
        return SyscallOutcome::Err(Errno::Efault);
    }
    let handle = match PROCESS_TABLE.lock().get(pid).and_then(|p| p.filedesc[fd as usize].clone()) {
        Some(h) => h,
        None => return SyscallOutcome::Err(Errno::Ebadf),
    };
    match handle.lock().next_dirent() {
        Ok(Some(name)) => {
            write_u32(entry_addr, 0);
            let bytes = name.as_bytes();
            let n = bytes.len().min(NAME_MAX);
            write_bytes(entry_addr + 4, &bytes[..n]);
            unsafe { core::ptr::write((entry_addr + 4 + n as u32) as *mut u8, 0) };
            SyscallOutcome::Ok(1)
        }
        Ok(None) => SyscallOutcome::Ok(0),
        Err(_) => SyscallOutcome::Err(Errno::Enotdir),
    }
}

fn sys_chdir(pid: ProcessId, path_addr: u32) -> SyscallOutcome {
    let Some(path) = valid_string(pid, path_addr) else {
        return SyscallOutcome::Err(Errno::Efault);
    };
    let newcwd = relative_to_absolute(&cwd_of(pid), &path);
    let image = crate::kernel::fs::image();
    match image.get_directory_entry(&newcwd) {
        Ok(entry) if entry.is_dir() => {
            if let Some(p) = PROCESS_TABLE.lock().get_mut(pid) {
                p.cwd = newcwd;
            }
            SyscallOutcome::Ok(0)
        }
        Ok(_) => SyscallOutcome::Err(Errno::Enotdir),
        Err(e) => SyscallOutcome::Err(fs_err(e)),
    }
}

fn sys_getcwd(pid: ProcessId, buf_addr: u32, size: u32) -> SyscallOutcome {
    if !owns(pid, buf_addr, size) {
        return SyscallOutcome::Err(Errno::Efault);
    }
    let cwd = cwd_of(pid);
    let bytes = cwd.as_bytes();
    let n = bytes.len().min(size.saturating_sub(1) as usize);
    write_bytes(buf_addr, &bytes[..n]);
    unsafe { core::ptr::write((buf_addr + n as u32) as *mut u8, 0) };
    // Matches the original's pointer-return convention: the caller treats
    // the result as the buffer address, not a byte count.
    SyscallOutcome::Ok(buf_addr as i32)
}

fn sys_kill(pid: ProcessId, target: i32) -> SyscallOutcome {
    if target < 0 || target as usize >= MAX_PROCESSES {
        return SyscallOutcome::Err(Errno::Esrch);
    }
    let target_pid = ProcessId(target as u32);
    let exists = PROCESS_TABLE.lock().get(target_pid).map(|p| p.exists).unwrap_or(false);
    if !exists {
        return SyscallOutcome::Err(Errno::Esrch);
    }
    let is_self = target_pid == pid;
    process::kill_process(target_pid, -1);
    if is_self {
        SyscallOutcome::Suspended
    } else {
        SyscallOutcome::Ok(0)
    }
}

fn sys_halt() -> SyscallOutcome {
    crate::hlt_loop();
}
