//! Kernel heap: a [`buddy::MemArea`] wrapped in a `Mutex` and exposed as the
//! `#[global_allocator]` via [`LockedHeap`]. Same `Mutex<inner>` +
//! `AtomicBool` initialized-once shape the teacher's linked-list allocator
//! used; the inner allocation strategy is the buddy algorithm the original
//! kernel's `kmalloc`/`kfree` are built on, not a free-list-of-any-size
//! allocator.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use super::buddy::{BlockInfo, MemArea};
use crate::errors::MemoryError;

/// Heap usage counters, exposed for diagnostics the same way the teacher's
/// `HeapStats` was.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapStats {
    pub allocation_count: usize,
    pub deallocation_count: usize,
    pub bytes_outstanding: usize,
}

struct Inner {
    arena: Option<MemArea>,
    stats: HeapStats,
}

/// Mutex-protected buddy-backed heap. `init` must run exactly once before
/// any allocation; attempting to allocate beforehand returns a null
/// pointer, which the Rust allocation APIs turn into an abort.
pub struct LockedHeap {
    inner: Mutex<Inner>,
    initialized: AtomicBool,
}

impl Default for LockedHeap {
    fn default() -> Self {
        Self::new()
    }
}

impl LockedHeap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                arena: None,
                stats: HeapStats {
                    allocation_count: 0,
                    deallocation_count: 0,
                    bytes_outstanding: 0,
                },
            }),
            initialized: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Initialize the heap to manage `1 << upper` bytes starting at `mem`,
    /// using `blocks` (sized via [`MemArea::nblocks`]) for bookkeeping.
    ///
    /// # Safety
    /// `mem` and `blocks` must point to storage at least as large as
    /// `upper`/`MemArea::nblocks(upper)` demand, and must remain valid and
    /// exclusively owned by this heap for the remainder of the program.
    ///
    /// # Errors
    /// Returns [`MemoryError::ArenaExhausted`] if called a second time.
    pub unsafe fn init(
        &self,
        upper: u32,
        mem: *mut u8,
        blocks: *mut BlockInfo,
    ) -> Result<(), MemoryError> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(MemoryError::ArenaExhausted);
        }

        let mut arena = unsafe { MemArea::new(upper, mem, blocks) };
        arena.init();
        self.inner.lock().arena = Some(arena);
        Ok(())
    }

    #[must_use]
    pub fn stats(&self) -> HeapStats {
        self.inner.lock().stats
    }
}

unsafe impl GlobalAlloc for LockedHeap {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let nbytes = layout.size().max(layout.align());
        let mut inner = self.inner.lock();
        let Some(arena) = inner.arena.as_mut() else {
            return ptr::null_mut();
        };
        match arena.alloc(nbytes) {
            Ok(offset) => {
                inner.stats.allocation_count += 1;
                inner.stats.bytes_outstanding += nbytes;
                unsafe { arena.base().add(offset as usize) }
            }
            Err(_) => ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let nbytes = layout.size().max(layout.align());
        let mut inner = self.inner.lock();
        let base = match inner.arena.as_ref() {
            Some(arena) => arena.base(),
            None => return,
        };
        let offset = (ptr as usize).wrapping_sub(base as usize) as u32;
        if let Some(arena) = inner.arena.as_mut() {
            arena.free(offset);
        }
        inner.stats.deallocation_count += 1;
        inner.stats.bytes_outstanding = inner.stats.bytes_outstanding.saturating_sub(nbytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::mm::buddy::MemArea as Arena;
    use core::alloc::Layout;

    #[test]
    fn alloc_dealloc_roundtrip() {
        const UPPER: u32 = 16; // 64 KiB arena
        static mut MEM: [u8; 1 << 16] = [0; 1 << 16];
        static mut BLOCKS: [BlockInfo; Arena::nblocks(UPPER)] =
            [BlockInfo::empty(); Arena::nblocks(UPPER)];

        let heap = LockedHeap::new();
        unsafe {
            let mem_ptr = core::ptr::addr_of_mut!(MEM) as *mut u8;
            let blocks_ptr = core::ptr::addr_of_mut!(BLOCKS) as *mut BlockInfo;
            heap.init(UPPER, mem_ptr, blocks_ptr).unwrap();

            let layout = Layout::from_size_align(64, 16).unwrap();
            let a = heap.alloc(layout);
            assert!(!a.is_null());
            assert_eq!((a as usize) % 16, 0);
            heap.dealloc(a, layout);
        }
        assert_eq!(heap.stats().allocation_count, 1);
        assert_eq!(heap.stats().deallocation_count, 1);
    }
}
