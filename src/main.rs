#![no_std]
#![no_main]

use core::panic::PanicInfo;

use rhythmos::arch::x86::boot::{self, MultibootInfo};
use rhythmos::arch::{ArchCpu, Cpu};
use rhythmos::kernel::constants::{KERNEL_MEM_BASE, KERNEL_MEM_SIZE, PAGE_SIZE, PAGE_START};
use rhythmos::kernel::driver::{init_console, init_vga};
use rhythmos::kernel::fs;
use rhythmos::kernel::mm::FRAME_ALLOCATOR;
use rhythmos::kernel::process;
use rhythmos::{console_println, debug_println, hlt_loop, init_heap};

/// A fallback physical memory size used only if the loader didn't report
/// one, so boot can still proceed under a minimally-compliant loader.
const FALLBACK_MEMORY_BYTES: u32 = 16 * 1024 * 1024;

/// Reserve the first page of the kernel heap arena for the PID 1 bootstrap
/// trampoline (see `build_init_trampoline`), so the buddy allocator never
/// hands that page back out from under running code.
const TRAMPOLINE_RESERVED: u32 = PAGE_SIZE as u32;

#[no_mangle]
pub extern "C" fn rust_entry(magic: u32, multiboot_info_addr: u32) -> ! {
    if !boot::magic_is_valid(magic) {
        panic!("not loaded by a Multiboot bootloader (magic={magic:#x})");
    }

    // SAFETY: the loader placed a valid multiboot_info struct at this
    // address before jumping to `_start`, and the magic check above is our
    // only evidence of that, same as any Multiboot kernel's entry point.
    let info: &'static MultibootInfo = unsafe { MultibootInfo::read(multiboot_info_addr) };

    let module = info
        .first_module()
        .unwrap_or_else(|| panic!("bootloader did not hand off a boot module"));
    let (mod_start, mod_end) = (module.mod_start, module.mod_end);
    if mod_end >= KERNEL_MEM_BASE {
        panic!("boot module [{mod_start:#x}, {mod_end:#x}) overlaps the kernel heap arena");
    }

    // SAFETY: `[mod_start, mod_end)` is the loader's module, identity-mapped
    // (paging is not yet enabled) and stable for the kernel's lifetime.
    unsafe {
        fs::init_image(mod_start as *const u8, (mod_end - mod_start) as usize);
    }

    let total_memory = if info.has_mem() {
        info.total_memory()
    } else {
        FALLBACK_MEMORY_BYTES
    };

    // SAFETY: [PAGE_START, total_memory) is unused physical RAM: below
    // PAGE_START sits the kernel image and heap arena, and nothing has
    // handed out pages from this range yet.
    unsafe {
        FRAME_ALLOCATOR.init(PAGE_START, total_memory);
    }

    let trampoline_entry = KERNEL_MEM_BASE;
    unsafe {
        build_init_trampoline(trampoline_entry);
    }

    // SAFETY: [heap_start, heap_start + heap_size) is unused, mapped RAM
    // that nothing else claims (the trampoline page just written is
    // excluded from the arena handed to the allocator).
    unsafe {
        init_heap(
            (KERNEL_MEM_BASE + TRAMPOLINE_RESERVED) as usize,
            (KERNEL_MEM_SIZE - TRAMPOLINE_RESERVED) as usize,
        )
        .expect("heap already initialized");
    }

    rhythmos::kernel::core::log_backend::init(log::LevelFilter::Info);

    // SAFETY: called once, with the reserved boot stack from `boot.rs`
    // still valid and nothing else running yet.
    unsafe {
        rhythmos::arch::x86::init(boot::boot_stack_top_addr());
    }

    // console_println! routes through CONSOLE, which picks VGA only if VGA
    // is already initialized at the moment its Once fires. Order matters.
    init_vga().expect("VGA initialization failed");
    init_console();

    console_println!("rhythmos booting ({} bytes RAM detected)", total_memory);
    debug_println!("boot module at [{mod_start:#x}, {mod_end:#x})");

    process::start_process(trampoline_entry).expect("failed to start PID 1");

    ArchCpu::enable_interrupts();

    hlt_loop();
}

/// Write a tiny ring-3 machine-code stub at `dest`, inside the one page of
/// the heap arena reserved for it, that calls `execve("/bin/init", NULL)`
/// and spins if that fails. `start_process` gives a brand-new process
/// nowhere else to start running: user text only exists once `execve` has
/// loaded it, so the very first instruction a process executes has to ask
/// for that itself.
///
/// # Safety
/// `dest` must be 32-byte-aligned-or-better, user-writable, and not yet
/// claimed by the heap allocator.
unsafe fn build_init_trampoline(dest: u32) {
    const EXECVE: u32 = 13;
    let path = b"/bin/init\0";
    let code_len: u32 = 24;
    let path_addr = dest + code_len;

    let mut buf = [0u8; 40];
    let mut put_u32 = |buf: &mut [u8; 40], off: usize, v: u32| {
        buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
    };

    buf[0] = 0x68; // push imm32 (argv = NULL)
    put_u32(&mut buf, 1, 0);
    buf[5] = 0x68; // push imm32 (path_addr)
    put_u32(&mut buf, 6, path_addr);
    buf[10] = 0x68; // push imm32 (dummy word under the syscall gate's
                     // assumed return-address slot)
    put_u32(&mut buf, 11, 0);
    buf[15] = 0xB8; // mov eax, EXECVE
    put_u32(&mut buf, 16, EXECVE);
    buf[20] = 0xCD; // int 0x30
    buf[21] = 0x30;
    buf[22] = 0xEB; // jmp $ (execve only returns on failure)
    buf[23] = 0xFE;

    let total = code_len as usize + path.len();
    buf[code_len as usize..total].copy_from_slice(path);

    unsafe {
        core::ptr::copy_nonoverlapping(buf.as_ptr(), dest as *mut u8, total);
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    debug_println!("[panic] {info}");
    console_println!("kernel panic: {info}");
    hlt_loop();
}
