//! Memory management: buddy-allocated kernel heap, physical page allocator,
//! two-level paging, and the user-mode page fault handler built on top of
//! them.

pub mod allocator;
pub mod buddy;
pub mod frame;
pub mod page_fault;
pub mod paging;
pub mod types;

pub use allocator::{HeapStats, LockedHeap};
pub use buddy::{BlockInfo, MemArea, EMPTY};
pub use frame::{FrameAllocator, FRAME_ALLOCATOR};
pub use paging::{PageDirectory, PageFlags, PagingGuard};
