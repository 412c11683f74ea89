//! QEMU `isa-debug-exit` device (port 0xF4), used by the integration test
//! harness to report a pass/fail exit code without needing a real reboot.

use super::port::Port;

pub fn exit_qemu(code: u32) {
    let mut port: Port<u32> = Port::new(0xF4);
    unsafe {
        port.write(code);
    }
}
