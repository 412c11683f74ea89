//! QEMU test-exit plumbing
//!
//! Wraps [`crate::arch::x86::qemu::exit_qemu`] with the two codes the
//! `isa-debug-exit` device is wired to report back to the `cargo test`
//! runner as a process exit status.

/// Exit code written to the `isa-debug-exit` port. QEMU maps this through
/// `(code << 1) | 1`, so these must stay odd-after-shift and distinct from
/// each other; the exact values are only ever consumed by the test runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    Success = 0x10,
    Failed = 0x11,
}

pub fn exit_qemu(exit_code: QemuExitCode) {
    crate::arch::x86::qemu::exit_qemu(exit_code as u32);
}
