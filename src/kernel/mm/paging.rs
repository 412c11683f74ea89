//! Two-level x86 paging: page directory + page table, 1024 32-bit entries
//! each. A from-scratch implementation grounded directly in the original
//! kernel's `page.c` (`map_page`/`lookup_page`/`identity_map`/...), since no
//! 32-bit equivalent of the `x86_64` crate's 4-level `OffsetPageTable`
//! exists in this dependency stack.

use bitflags::bitflags;

use super::frame::FRAME_ALLOCATOR;
use crate::arch::x86::cpu;
use crate::errors::MemoryError;
use crate::kernel::constants::PAGE_SIZE;

bitflags! {
    /// Per-entry permission bits, shared by page-directory and page-table
    /// entries.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct PageFlags: u32 {
        const PRESENT    = 0x1;
        const READ_WRITE = 0x2;
        const USER       = 0x4;
    }
}

const ADDRESS_MASK: u32 = 0xFFFF_F000;
const ENTRIES_PER_TABLE: usize = 1024;

/// A page directory or page table: 1024 raw 32-bit entries. Both levels
/// share this representation, matching the original `page_dir`/`page_table`
/// typedefs (`unsigned int *`).
#[repr(C, align(4096))]
pub struct Table {
    entries: [u32; ENTRIES_PER_TABLE],
}

impl Table {
    fn entry(&self, index: usize) -> u32 {
        self.entries[index]
    }

    fn set_entry(&mut self, index: usize, value: u32) {
        self.entries[index] = value;
    }
}

/// Owning handle to a page directory's physical address. The directory and
/// every page table it references are physical pages from
/// [`FRAME_ALLOCATOR`]; all accesses here assume paging is disabled or this
/// directory is identity-mapped, per the `PagingGuard` discipline.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PageDirectory {
    phys: u32,
}

impl PageDirectory {
    /// Allocate a fresh, zeroed page directory.
    pub fn allocate() -> Result<Self, MemoryError> {
        let phys = FRAME_ALLOCATOR.alloc_page()?;
        Ok(PageDirectory { phys })
    }

    #[must_use]
    pub const fn from_physical(phys: u32) -> Self {
        PageDirectory { phys }
    }

    #[must_use]
    pub const fn physical(&self) -> u32 {
        self.phys
    }

    fn table(&self) -> &mut Table {
        unsafe { &mut *(self.phys as *mut Table) }
    }

    fn split(logical: u32) -> (usize, usize) {
        let page_no = logical / PAGE_SIZE as u32;
        ((page_no / 1024) as usize, (page_no % 1024) as usize)
    }

    /// Map `logical` to `physical`, allocating a page-table page if the
    /// covering directory entry is not yet present. Both addresses must be
    /// page-aligned.
    pub fn map_page(
        &self,
        logical: u32,
        physical: u32,
        access: PageFlags,
        rw: PageFlags,
    ) -> Result<(), MemoryError> {
        debug_assert_eq!(logical % PAGE_SIZE as u32, 0);
        debug_assert_eq!(physical % PAGE_SIZE as u32, 0);
        let (dir_index, tbl_index) = Self::split(logical);

        let dir = self.table();
        if dir.entry(dir_index) & PageFlags::PRESENT.bits() == 0 {
            let table_phys = FRAME_ALLOCATOR.alloc_page()?;
            dir.set_entry(
                dir_index,
                table_phys
                    | (PageFlags::PRESENT | PageFlags::USER | PageFlags::READ_WRITE).bits(),
            );
        }

        let table_phys = dir.entry(dir_index) & ADDRESS_MASK;
        let table = unsafe { &mut *(table_phys as *mut Table) };
        table.set_entry(
            tbl_index,
            physical | (PageFlags::PRESENT | access | rw).bits(),
        );
        Ok(())
    }

    /// Look up the physical address mapped at `logical`, if any.
    #[must_use]
    pub fn lookup_page(&self, logical: u32) -> Option<u32> {
        let (dir_index, tbl_index) = Self::split(logical);
        let dir = self.table();
        if dir.entry(dir_index) & PageFlags::PRESENT.bits() == 0 {
            return None;
        }
        let table_phys = dir.entry(dir_index) & ADDRESS_MASK;
        let table = unsafe { &*(table_phys as *const Table) };
        let entry = table.entry(tbl_index);
        if entry & PageFlags::PRESENT.bits() == 0 {
            return None;
        }
        Some(entry & ADDRESS_MASK)
    }

    /// Unmap `logical` and free the physical page it named, if mapped.
    pub fn unmap_and_free_page(&self, logical: u32) {
        let (dir_index, tbl_index) = Self::split(logical);
        let dir = self.table();
        if dir.entry(dir_index) & PageFlags::PRESENT.bits() == 0 {
            return;
        }
        let table_phys = dir.entry(dir_index) & ADDRESS_MASK;
        let table = unsafe { &mut *(table_phys as *mut Table) };
        let entry = table.entry(tbl_index);
        if entry & PageFlags::PRESENT.bits() == 0 {
            return;
        }
        FRAME_ALLOCATOR.free_page(entry & ADDRESS_MASK);
        table.set_entry(tbl_index, 0);
    }

    /// Map every page in `[start, end)` logical == physical.
    pub fn identity_map(
        &self,
        start: u32,
        end: u32,
        access: PageFlags,
        rw: PageFlags,
    ) -> Result<(), MemoryError> {
        let mut addr = start;
        while addr < end {
            self.map_page(addr, addr, access, rw)?;
            addr += PAGE_SIZE as u32;
        }
        Ok(())
    }

    /// Allocate `count` fresh physical pages and map them sequentially
    /// starting at `base` (user-accessible, read-write).
    pub fn map_new_pages(&self, base: u32, count: u32) -> Result<(), MemoryError> {
        debug_assert_eq!(base % PAGE_SIZE as u32, 0);
        for i in 0..count {
            let page = FRAME_ALLOCATOR.alloc_page()?;
            self.map_page(
                base + i * PAGE_SIZE as u32,
                page,
                PageFlags::USER,
                PageFlags::READ_WRITE,
            )?;
        }
        Ok(())
    }

    /// Free every page-table page referenced by this directory, and the
    /// directory itself. Does *not* free the pages the tables point to
    /// (some may be outside the managed physical pool, e.g. kernel code);
    /// callers must have already torn down the mapped pages via
    /// [`unmap_and_free_page`].
    pub fn free(&self) {
        let dir = self.table();
        for index in 0..ENTRIES_PER_TABLE {
            let entry = dir.entry(index);
            if entry & PageFlags::PRESENT.bits() != 0 {
                FRAME_ALLOCATOR.free_page(entry & ADDRESS_MASK);
            }
        }
        FRAME_ALLOCATOR.free_page(self.phys);
    }
}

/// RAII bracket for the "disable paging, edit tables by physical address,
/// re-enable" pattern the spec requires around cross-process page-table
/// edits (`fork`, `kill_process`, `execve`). Re-enables paging with
/// `current`'s page directory on drop, including on an early return via `?`.
pub struct PagingGuard {
    restore_to: u32,
}

impl PagingGuard {
    /// # Safety
    /// Must be constructed only while `restore_to` identity-maps the code
    /// that will run until the guard drops (true for all kernel code, which
    /// the first 6 MiB identity mapping covers).
    #[must_use]
    pub unsafe fn new(restore_to: PageDirectory) -> Self {
        unsafe {
            cpu::disable_paging();
        }
        PagingGuard {
            restore_to: restore_to.physical(),
        }
    }
}

impl Drop for PagingGuard {
    fn drop(&mut self) {
        unsafe {
            cpu::enable_paging(self.restore_to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_matches_directory_table_index() {
        let (dir, tbl) = PageDirectory::split(0x0040_3000);
        assert_eq!(dir, 0x0040_3000u32 as usize / PAGE_SIZE / 1024);
        assert_eq!(tbl, (0x0040_3000u32 as usize / PAGE_SIZE) % 1024);
    }
}
