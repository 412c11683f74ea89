//! Inter-process messaging
//!
//! A fixed-capacity mailbox per process (see [`mailbox`]), fed by `sys_send`
//! and drained by `sys_receive`. There is no routing or addressing beyond a
//! target PID: the sender writes directly into the recipient's mailbox and
//! the kernel wakes it if it was blocked waiting.

pub mod mailbox;
