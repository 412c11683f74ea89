//! Process management API

use crate::syscall;

/// Matches the original shell's `MAX_ARGS`: the largest argv this library
/// will build on the caller's behalf before `execve`/`spawn` give up.
pub const MAX_ARGS: usize = 32;

/// Exit the current process with the given status.
pub fn exit(code: i32) -> ! {
    syscall::exit(code)
}

/// The calling process's PID.
pub fn getpid() -> i32 {
    syscall::getpid()
}

/// Fork the current process.
///
/// Returns `0` in the child, the child's PID in the parent, or a negative
/// errno on failure.
pub fn fork() -> i32 {
    syscall::fork()
}

/// Fixed-capacity NUL-terminated byte buffer, used to hand the kernel a C
/// string without reaching for an allocator.
struct CBuf<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> CBuf<N> {
    fn new(s: &str) -> Option<Self> {
        let src = s.as_bytes();
        if src.len() >= N {
            return None;
        }
        let mut bytes = [0u8; N];
        bytes[..src.len()].copy_from_slice(src);
        Some(Self { bytes })
    }

    fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }
}

/// Replace the calling process's image with `path`, passing `argv` as the
/// new program's arguments. Does not return on success; on failure returns
/// a negative errno and the caller is still the original program.
///
/// Paths longer than 255 bytes or more than [`MAX_ARGS`] arguments fail with
/// `-1` before any syscall is made.
pub fn execve(path: &str, argv: &[&str]) -> i32 {
    let Some(cpath) = CBuf::<256>::new(path) else {
        return -1;
    };
    if argv.len() > MAX_ARGS {
        return -1;
    }

    let mut storage: [CBuf<128>; MAX_ARGS] = core::array::from_fn(|_| CBuf { bytes: [0u8; 128] });
    for (slot, arg) in storage.iter_mut().zip(argv.iter()) {
        match CBuf::<128>::new(arg) {
            Some(c) => *slot = c,
            None => return -1,
        }
    }

    let mut ptrs: [*const u8; MAX_ARGS + 1] = [core::ptr::null(); MAX_ARGS + 1];
    for (i, slot) in storage.iter().take(argv.len()).enumerate() {
        ptrs[i] = slot.as_ptr();
    }

    syscall::execve(cpath.as_ptr(), ptrs.as_ptr())
}

/// Wait for `pid` (or any child, if negative) to exit, storing its status
/// through `status` when given. Returns the reaped child's PID, or a
/// negative errno (`ECHILD` if the caller has no such child).
pub fn wait(pid: i32, status: Option<&mut i32>) -> i32 {
    syscall::waitpid(pid, status)
}

/// Fork then `execve(path, argv)` in the child. The child never returns from
/// this call: if `execve` fails it exits with status 1.
pub fn spawn(path: &str, argv: &[&str]) -> Result<i32, i32> {
    let pid = fork();
    if pid == 0 {
        execve(path, argv);
        exit(1);
    } else if pid > 0 {
        Ok(pid)
    } else {
        Err(pid)
    }
}

/// Send `SIGKILL`-equivalent termination to `pid`. Killing the caller itself
/// never returns.
pub fn kill(pid: i32) -> i32 {
    syscall::kill(pid)
}
