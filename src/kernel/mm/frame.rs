//! Physical page allocator
//!
//! Bump-pointer plus a free list of 4 KiB pages, threaded through the first
//! four bytes of each free page the way the buddy allocator threads its own
//! free lists. Never released back past the high-water mark; acceptable for
//! a kernel that runs for a single boot.

use spin::Mutex;

use crate::errors::MemoryError;
use crate::kernel::constants::PAGE_SIZE;

/// Sentinel terminating the free list (mirrors [`super::buddy::EMPTY`]).
const EMPTY: u32 = 0xFFFF_FFFF;

struct Inner {
    next_free_physical: u32,
    limit: u32,
    free_list: u32,
}

/// Physical-page allocator over `[start, limit)`, both page-aligned. `start`
/// is typically `PAGE_START` (6 MiB, per the kernel's fixed memory layout);
/// `limit` is the top of usable physical RAM reported by the boot module
/// descriptor.
pub struct FrameAllocator {
    inner: Mutex<Option<Inner>>,
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAllocator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }

    /// # Safety
    /// `start`/`limit` must describe real, unused physical memory, page
    /// aligned, and must not overlap the kernel image or heap arena.
    pub unsafe fn init(&self, start: u32, limit: u32) {
        *self.inner.lock() = Some(Inner {
            next_free_physical: start,
            limit,
            free_list: EMPTY,
        });
    }

    /// Allocate one 4 KiB physical page, preferring a freed page over
    /// advancing the high-water mark.
    ///
    /// The free-list link lives in the first four bytes of the page itself,
    /// addressed directly as a physical address; callers must hold this
    /// allocator's lock (implicit here) with paging either disabled or the
    /// page identity-mapped, matching the `PagingGuard` discipline used
    /// everywhere else cross-process physical memory is touched.
    pub fn alloc_page(&self) -> Result<u32, MemoryError> {
        let mut guard = self.inner.lock();
        let inner = guard.as_mut().expect("frame allocator not initialized");

        let page = if inner.free_list != EMPTY {
            let page = inner.free_list;
            inner.free_list = unsafe { (page as *const u32).read_unaligned() };
            page
        } else {
            if inner.next_free_physical >= inner.limit {
                return Err(MemoryError::OutOfPhysicalPages);
            }
            let page = inner.next_free_physical;
            inner.next_free_physical += PAGE_SIZE as u32;
            page
        };

        unsafe {
            core::ptr::write_bytes(page as *mut u8, 0, PAGE_SIZE);
        }
        Ok(page)
    }

    /// Return a page to the free list. `page` must be a page-aligned
    /// physical address previously returned by [`alloc_page`].
    pub fn free_page(&self, page: u32) {
        let mut guard = self.inner.lock();
        let inner = guard.as_mut().expect("frame allocator not initialized");
        unsafe {
            (page as *mut u32).write_unaligned(inner.free_list);
        }
        inner.free_list = page;
    }
}

lazy_static::lazy_static! {
    pub static ref FRAME_ALLOCATOR: FrameAllocator = FrameAllocator::new();
}
