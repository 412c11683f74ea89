// tools/mkimage/src/main.rs
//! Builds the flat read-only image the kernel's boot module hands off.
//!
//! Layout: a root directory_entry at offset 0 (size filled in last),
//! followed by a packed `directory` body (count:u32 + entries) for every
//! directory, entries' `location` pointing at either a nested directory
//! body or raw file bytes. Matches `kernel::fs::readonly::FsImage` byte
//! for byte.
//!
//! Usage: mkimage <source_dir> <output_file>

use std::env;
use std::fs;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use walkdir::WalkDir;

const TYPE_DIR: u32 = 0x01;
const TYPE_FILE: u32 = 0x02;
const NAME_LEN: usize = 256;
const ENTRY_SIZE: usize = 4 + 4 + 4 + 4 + 4 + NAME_LEN;

struct Entry {
    size: u32,
    kind: u32,
    location: u32,
    mode: u32,
    mtime: u32,
    name: String,
}

impl Entry {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(&self.kind.to_le_bytes());
        out.extend_from_slice(&self.location.to_le_bytes());
        out.extend_from_slice(&self.mode.to_le_bytes());
        out.extend_from_slice(&self.mtime.to_le_bytes());
        let mut name_buf = [0u8; NAME_LEN];
        let bytes = self.name.as_bytes();
        let n = bytes.len().min(NAME_LEN - 1);
        name_buf[..n].copy_from_slice(&bytes[..n]);
        out.extend_from_slice(&name_buf);
    }

    fn patch_location(out: &mut [u8], entry_offset: usize, location: u32) {
        out[entry_offset + 8..entry_offset + 12].copy_from_slice(&location.to_le_bytes());
    }

    fn patch_size(out: &mut [u8], entry_offset: usize, size: u32) {
        out[entry_offset..entry_offset + 4].copy_from_slice(&size.to_le_bytes());
    }
}

/// List a directory's immediate children, sorted by name for a
/// reproducible image across runs on different filesystems.
fn immediate_children(dir: &Path) -> io::Result<Vec<std::path::PathBuf>> {
    let mut children: Vec<_> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .collect();
    children.sort();
    Ok(children)
}

/// Append `dir`'s packed directory body to `out`, recursing into
/// subdirectories and inlining file contents. Returns nothing: callers
/// learn the body's offset from `out.len()` before calling.
fn process_dir(out: &mut Vec<u8>, dir: &Path) -> io::Result<()> {
    let children = immediate_children(dir)?;

    let mut entries = Vec::with_capacity(children.len());
    for path in &children {
        let metadata = fs::metadata(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "non-UTF8 filename"))?
            .to_string();

        entries.push(Entry {
            size: if metadata.is_dir() { 0 } else { metadata.len() as u32 },
            kind: if metadata.is_dir() { TYPE_DIR } else { TYPE_FILE },
            location: 0, // patched once each child has been written
            mode: metadata.mode(),
            mtime: metadata.mtime() as u32,
            name,
        });
    }

    let body_offset = out.len();
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    let entries_offset = out.len();
    for entry in &entries {
        entry.write(out);
    }

    for (i, path) in children.iter().enumerate() {
        let entry_offset = entries_offset + i * ENTRY_SIZE;
        let location = out.len() as u32;
        Entry::patch_location(out, entry_offset, location);

        if entries[i].kind == TYPE_DIR {
            process_dir(out, path)?;
        } else {
            let bytes = fs::read(path)?;
            out.extend_from_slice(&bytes);
        }
    }

    let _ = body_offset;
    Ok(())
}

fn build(source_dir: &Path, output_file: &Path) -> io::Result<()> {
    let mut out = Vec::new();

    // Root directory_entry occupies [0, ENTRY_SIZE); its body follows
    // immediately, matching the kernel reading entry_at(0) to bootstrap.
    let root = Entry {
        size: 0,
        kind: TYPE_DIR,
        location: ENTRY_SIZE as u32,
        mode: 0o040755,
        mtime: 0,
        name: "ROOT".to_string(),
    };
    root.write(&mut out);

    process_dir(&mut out, source_dir)?;

    let total_size = out.len() as u32;
    Entry::patch_size(&mut out, 0, total_size);

    fs::write(output_file, &out)?;
    println!(
        "mkimage: wrote {} bytes to {}",
        out.len(),
        output_file.display()
    );
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: mkimage <source_dir> <output_file>");
        std::process::exit(1);
    }

    let source_dir = Path::new(&args[1]);
    let output_file = Path::new(&args[2]);

    if let Err(e) = build(source_dir, output_file) {
        eprintln!("mkimage: {e}");
        std::process::exit(1);
    }
}
