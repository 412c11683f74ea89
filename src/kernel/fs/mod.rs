//! File handles, pipes, and the read-only boot file system
//!
//! Three layers: [`readonly`] reads the flat image handed off by the boot
//! loader, [`pipe`] implements the one in-memory object type that isn't
//! backed by the image, and [`handle`] ties both into the tagged
//! `FileHandle` every process's `filedesc` table actually stores.

pub mod handle;
pub mod pipe;
pub mod readonly;

use alloc::sync::Arc;
use spin::{Mutex, Once};

use pipe::Pipe;
use readonly::FsImage;

static FS_IMAGE: Once<FsImage> = Once::new();

/// Record the boot module's `[mod_start, mod_end)` as the file system
/// image. Called once during boot after the multiboot info is parsed.
///
/// # Safety
/// `base..base+len` must be mapped read-only-or-better for the kernel's
/// entire lifetime.
pub unsafe fn init_image(base: *const u8, len: usize) {
    FS_IMAGE.call_once(|| unsafe { FsImage::new(base, len) });
}

/// Access the boot file system image.
///
/// # Panics
/// If [`init_image`] has not yet been called.
pub fn image() -> &'static FsImage {
    FS_IMAGE
        .get()
        .expect("file system image not initialized; call init_image() during boot")
}

/// The keyboard driver's target pipe: set once, to PID 1's stdin pipe, when
/// the first process is created. `None` until then, in which case keycodes
/// are simply dropped (matching the original kernel's `if (input_pipe)
/// write_to_pipe(...)` guard).
static INPUT_PIPE: Mutex<Option<Arc<Mutex<Pipe>>>> = Mutex::new(None);

pub fn set_input_pipe(pipe: Arc<Mutex<Pipe>>) {
    *INPUT_PIPE.lock() = Some(pipe);
}

pub fn write_scancode_to_input_pipe(byte: u8) {
    if let Some(pipe) = INPUT_PIPE.lock().as_ref() {
        pipe.lock().write(&[byte]);
    }
}
