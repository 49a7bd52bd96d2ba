//! Kernel log backend for the `log` facade.
//!
//! Drivers log from probe paths long before the board has a console, so
//! records are formatted into a fixed buffer until [`console_ready`] hands
//! over a sink. From then on every record goes straight to the console.
//!
//! The overflow handler logs in interrupt context. The logger never blocks:
//! if its state is locked by the interrupted code, the record is written to
//! the console unbuffered, or dropped before the console exists.

use conquer_once::spin::OnceCell;
use core::fmt::{self, Write};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

const BUFFER_SIZE: usize = 8192;

/// Output device of the logger, usually a UART.
pub trait ConsoleSink: Sync {
    fn write_str(&self, s: &str);
}

/// `fmt::Write` adapter over a console.
struct ConsoleWriter<'a>(&'a dyn ConsoleSink);

impl Write for ConsoleWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

/// Messages logged before the console exists.
struct LogBuffer {
    buffer: [u8; BUFFER_SIZE],
    position: usize,
    dropped: usize,
}

impl LogBuffer {
    const fn new() -> Self {
        Self {
            buffer: [0; BUFFER_SIZE],
            position: 0,
            dropped: 0,
        }
    }

    fn contents(&self) -> &str {
        core::str::from_utf8(&self.buffer[..self.position]).unwrap_or("<invalid UTF-8>")
    }
}

impl Write for LogBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let remaining = BUFFER_SIZE - self.position;

        if bytes.len() > remaining {
            // Keep the oldest messages, they describe early boot
            self.dropped += 1;
            return Ok(());
        }

        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        Ok(())
    }
}

enum LoggerState {
    /// Buffering messages until the console is ready
    Buffering,
    ConsoleReady,
}

pub struct BufferedLogger {
    buffer: Mutex<LogBuffer>,
    state: Mutex<LoggerState>,
    console: OnceCell<&'static dyn ConsoleSink>,
}

impl BufferedLogger {
    pub const fn new() -> Self {
        BufferedLogger {
            buffer: Mutex::new(LogBuffer::new()),
            state: Mutex::new(LoggerState::Buffering),
            console: OnceCell::uninit(),
        }
    }

    /// Attach the console and flush everything buffered so far.
    ///
    /// Only the first console is kept.
    pub fn console_ready(&self, sink: &'static dyn ConsoleSink) {
        let mut state = self.state.lock();
        let console = self.console.get_or_init(|| sink);

        let buffer = self.buffer.lock();
        if buffer.position > 0 {
            let mut out = ConsoleWriter(*console);
            let _ = writeln!(out, "=== Buffered Boot Messages ===");
            let _ = out.write_str(buffer.contents());
            if buffer.dropped > 0 {
                let _ = writeln!(out, "({} messages dropped)", buffer.dropped);
            }
            let _ = writeln!(out, "=== End Buffered Messages ===");
        }

        *state = LoggerState::ConsoleReady;
    }

    fn write_console(&self, record: &Record) {
        if let Some(console) = self.console.get() {
            let mut out = ConsoleWriter(*console);
            let _ = writeln!(out, "[{:>5}] {}: {}", record.level(), record.target(), record.args());
        }
    }
}

impl Default for BufferedLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for BufferedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Use try_lock so logging from the overflow handler cannot deadlock
        let Some(state) = self.state.try_lock() else {
            self.write_console(record);
            return;
        };

        match *state {
            LoggerState::Buffering => {
                drop(state);
                if let Some(mut buffer) = self.buffer.try_lock() {
                    let _ = writeln!(
                        &mut *buffer,
                        "[{:>5}] {}: {}",
                        record.level(),
                        record.target(),
                        record.args()
                    );
                }
            }
            LoggerState::ConsoleReady => {
                drop(state);
                self.write_console(record);
            }
        }
    }

    fn flush(&self) {}
}

pub static LOGGER: BufferedLogger = BufferedLogger::new();

/// Install [`LOGGER`] as the `log` backend.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Call once the board console works.
pub fn console_ready(sink: &'static dyn ConsoleSink) {
    LOGGER.console_ready(sink);
}
