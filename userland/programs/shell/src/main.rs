//! Line-oriented command shell
//!
//! Reads a line from stdin, splits it on whitespace, and either runs a
//! built-in (`cd`, `exit`) or forks and `execve`s `/bin/<argv[0]>` with the
//! rest of the line as arguments, waiting for it to finish before prompting
//! again. Mirrors the original `dsh.c` read-parse-dispatch loop.

#![no_std]
#![no_main]

use core::panic::PanicInfo;
use libuser::process::{self, MAX_ARGS};
use libuser::{print, println};

const LINE_MAX: usize = 256;

#[no_mangle]
pub extern "C" fn _start() -> ! {
    let mut line = [0u8; LINE_MAX];

    loop {
        print!("$ ");
        let len = match read_line(&mut line) {
            Some(n) => n,
            None => continue,
        };
        if len == 0 {
            continue;
        }

        let mut argv: [&str; MAX_ARGS] = [""; MAX_ARGS];
        let argc = split_words(core::str::from_utf8(&line[..len]).unwrap_or(""), &mut argv);
        if argc == 0 {
            continue;
        }

        match argv[0] {
            "exit" => process::exit(0),
            "cd" => {
                let target = if argc > 1 { argv[1] } else { "/" };
                if chdir(target) < 0 {
                    println!("cd: {}: no such directory", target);
                }
            }
            name => run(name, &argv[..argc]),
        }
    }
}

/// Read one line (trailing newline stripped) from stdin into `buf`. Returns
/// `None` on a read error or end of input.
fn read_line(buf: &mut [u8]) -> Option<usize> {
    let mut len = 0;
    loop {
        if len >= buf.len() {
            return Some(len);
        }
        let n = libuser::io::read(0, &mut buf[len..len + 1]);
        if n <= 0 {
            return if len == 0 { None } else { Some(len) };
        }
        if buf[len] == b'\n' {
            return Some(len);
        }
        len += 1;
    }
}

fn split_words<'a>(line: &'a str, out: &mut [&'a str; MAX_ARGS]) -> usize {
    let mut argc = 0;
    for word in line.split_whitespace() {
        if argc >= MAX_ARGS {
            break;
        }
        out[argc] = word;
        argc += 1;
    }
    argc
}

fn run(name: &str, argv: &[&str]) {
    let mut path_buf = [0u8; 64];
    let prefix = b"/bin/";
    let name_bytes = name.as_bytes();
    if prefix.len() + name_bytes.len() >= path_buf.len() {
        println!("{}: name too long", name);
        return;
    }
    path_buf[..prefix.len()].copy_from_slice(prefix);
    path_buf[prefix.len()..prefix.len() + name_bytes.len()].copy_from_slice(name_bytes);
    let path_len = prefix.len() + name_bytes.len();
    let path = core::str::from_utf8(&path_buf[..path_len]).unwrap();

    match process::spawn(path, argv) {
        Ok(pid) => {
            let _ = process::wait(pid, None);
        }
        Err(_) => println!("{}: command not found", name),
    }
}

fn chdir(path: &str) -> i32 {
    let mut buf = [0u8; 256];
    let bytes = path.as_bytes();
    if bytes.len() >= buf.len() {
        return -1;
    }
    buf[..bytes.len()].copy_from_slice(bytes);
    libuser::syscall::chdir(buf.as_ptr())
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("shell: panic: {}", info);
    process::exit(1);
}
