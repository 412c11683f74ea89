//! PS/2 keyboard controller ports. Scancode-to-ASCII translation lives in
//! `kernel::driver::keyboard`; this module only exposes the raw hardware
//! registers.

use super::port::{PortReadOnly, PortWriteOnly};

pub struct Ps2Controller {
    data: PortReadOnly<u8>,
    status: PortReadOnly<u8>,
    #[allow(dead_code)]
    command: PortWriteOnly<u8>,
}

impl Ps2Controller {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: PortReadOnly::new(0x60),
            status: PortReadOnly::new(0x64),
            command: PortWriteOnly::new(0x64),
        }
    }

    /// Read one pending scancode, if the controller's output buffer is full.
    pub fn read_scancode(&self) -> Option<u8> {
        let status = unsafe { self.status.read() };
        if status & 0x01 != 0 {
            Some(unsafe { self.data.read() })
        } else {
            None
        }
    }
}

impl Default for Ps2Controller {
    fn default() -> Self {
        Self::new()
    }
}
