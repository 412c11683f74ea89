// src/kernel/driver/keyboard.rs
//! Scancode-to-ASCII translation
//!
//! Set/1 scancodes from [`crate::arch::x86::keyboard::Ps2Controller`] are
//! translated here and pushed to whatever pipe the kernel has designated as
//! stdin (see `kernel::fs::write_scancode_to_input_pipe`), mirroring the
//! original kernel's `keyboard_handler` → `convert` → `write_to_pipe` chain.
//! Only the US layout plain/shift tables are implemented; function keys,
//! arrows, and the other extended keys the original maps to private escape
//! codes are dropped rather than forwarded as raw bytes a shell can't use.

use spin::Mutex;

const LEFT_SHIFT: u8 = 0x2A;
const RIGHT_SHIFT: u8 = 0x36;
const RELEASED_BIT: u8 = 0x80;

static SHIFT_HELD: Mutex<bool> = Mutex::new(false);

#[rustfmt::skip]
static KBDMAP: [u8; 59] = [
    0, 0x1B, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08,
    b'\t', b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n',
    0,
    b'a', b's', b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\',
    b'z', b'x', b'c', b'v', b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ',
];

#[rustfmt::skip]
static KBDMAP_SHIFT: [u8; 59] = [
    0, 0x1B, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08,
    b'\t', b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n',
    0,
    b'A', b'S', b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, b'|',
    b'Z', b'X', b'C', b'V', b'B', b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ',
];

fn convert(scancode: u8) -> Option<u8> {
    let released = scancode & RELEASED_BIT != 0;
    let code = scancode & !RELEASED_BIT;

    if code == LEFT_SHIFT || code == RIGHT_SHIFT {
        *SHIFT_HELD.lock() = !released;
        return None;
    }
    if released {
        return None;
    }

    let table = if *SHIFT_HELD.lock() { &KBDMAP_SHIFT } else { &KBDMAP };
    match table.get(code as usize) {
        Some(&0) | None => None,
        Some(&byte) => Some(byte),
    }
}

/// Called from the timer-vector-adjacent keyboard IRQ handler with one raw
/// scancode. Feeds the translated byte to stdin if it produced one.
pub fn on_scancode(scancode: u8) {
    if let Some(byte) = convert(scancode) {
        crate::kernel::fs::write_scancode_to_input_pipe(byte);
    }
}
