//! 16550 UART serial port (COM1), used as the `debug_print!`/`debug_println!`
//! sink and for the QEMU `-serial stdio` test harness output.
//!
//! Backed by the `uart_16550` crate rather than hand-rolled port access:
//! the register layout and FIFO/line-status handling are ordinary PC
//! hardware, not kernel-specific logic, so there is no reason to reimplement
//! it by hand the way the 32-bit paging and scheduler code must be.

use core::fmt::{self, Write};
use lazy_static::lazy_static;
use spin::Mutex;
use uart_16550::SerialPort;

const SERIAL_IO_PORT: u16 = 0x3F8;

lazy_static! {
    pub static ref SERIAL1: Mutex<SerialPort> = {
        let mut serial_port = unsafe { SerialPort::new(SERIAL_IO_PORT) };
        serial_port.init();
        Mutex::new(serial_port)
    };
}

/// Write a single byte to COM1, blocking until the transmit FIFO accepts it.
pub fn write_debug_byte(byte: u8) {
    SERIAL1.lock().send(byte);
}

#[doc(hidden)]
pub fn _debug_print(args: fmt::Arguments) {
    crate::arch::critical_section(|| {
        SERIAL1
            .lock()
            .write_fmt(args)
            .expect("serial write never fails");
    });
}
