//! `log` facade backend over the serial debug sink
//!
//! Every subsystem logs through the `log` crate macros; this is the one
//! place that decides where those records actually go, the same separation
//! of concerns `log` is meant to buy in a userspace binary. Here that sink
//! is `debug_println!`, i.e. the serial port, never the VGA console: log
//! output is for a developer watching the serial line, not the user sitting
//! at the screen.

use log::{Level, LevelFilter, Log, Metadata, Record};

struct SerialLogger;

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        crate::debug_println!("[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger;

/// Install the serial-backed logger. Must be called once, early in boot,
/// before anything calls `log::info!`/`log::warn!`/etc.
pub fn init(level: LevelFilter) {
    // `set_logger` only fails if already called; boot only does this once.
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
