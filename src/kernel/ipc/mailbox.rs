//! Fixed-capacity per-process mailbox
//!
//! Each process owns one mailbox, inline in its process-table slot (no heap
//! allocation, matching the original kernel's fixed `struct message
//! mailbox[MAILBOX_MAX_CAPACITY]` array). A full mailbox makes `sys_send`
//! fail with `ENOMEM` rather than block the sender; only the receiver ever
//! blocks.

use crate::kernel::constants::{MAILBOX_MAX_CAPACITY, MESSAGE_INLINE_SIZE};
use crate::kernel::process::ProcessId;

/// One queued message. Payloads larger than [`MESSAGE_INLINE_SIZE`] are
/// rejected by the syscall gate before a `Message` is ever built.
#[derive(Clone, Copy)]
pub struct Message {
    pub sender: ProcessId,
    pub tag: u32,
    pub size: usize,
    pub data: [u8; MESSAGE_INLINE_SIZE],
}

impl Message {
    pub fn new(sender: ProcessId, tag: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.len() > MESSAGE_INLINE_SIZE {
            return None;
        }
        let mut data = [0u8; MESSAGE_INLINE_SIZE];
        data[..bytes.len()].copy_from_slice(bytes);
        Some(Message {
            sender,
            tag,
            size: bytes.len(),
            data,
        })
    }
}

/// A ring buffer of [`MAILBOX_MAX_CAPACITY`] slots. `head` is the index of
/// the oldest queued message; `len` the number currently queued.
pub struct Mailbox {
    slots: [Option<Message>; MAILBOX_MAX_CAPACITY],
    head: usize,
    len: usize,
}

impl Mailbox {
    pub const fn new() -> Self {
        const NONE: Option<Message> = None;
        Mailbox {
            slots: [NONE; MAILBOX_MAX_CAPACITY],
            head: 0,
            len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == MAILBOX_MAX_CAPACITY
    }

    /// Enqueue `msg`. Fails if the mailbox is already at capacity.
    pub fn try_push(&mut self, msg: Message) -> Result<(), ()> {
        if self.is_full() {
            return Err(());
        }
        let tail = (self.head + self.len) % MAILBOX_MAX_CAPACITY;
        self.slots[tail] = Some(msg);
        self.len += 1;
        Ok(())
    }

    /// Dequeue the oldest message, if any.
    pub fn try_pop(&mut self) -> Option<Message> {
        if self.is_empty() {
            return None;
        }
        let msg = self.slots[self.head].take();
        self.head = (self.head + 1) % MAILBOX_MAX_CAPACITY;
        self.len -= 1;
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: u32, tag: u32) -> Message {
        Message::new(ProcessId(sender), tag, b"hi").unwrap()
    }

    #[test]
    fn fifo_order() {
        let mut mb = Mailbox::new();
        mb.try_push(msg(1, 10)).unwrap();
        mb.try_push(msg(1, 20)).unwrap();
        assert_eq!(mb.try_pop().unwrap().tag, 10);
        assert_eq!(mb.try_pop().unwrap().tag, 20);
        assert!(mb.try_pop().is_none());
    }

    #[test]
    fn rejects_push_past_capacity() {
        let mut mb = Mailbox::new();
        for _ in 0..MAILBOX_MAX_CAPACITY {
            mb.try_push(msg(1, 0)).unwrap();
        }
        assert!(mb.try_push(msg(1, 0)).is_err());
    }
}
