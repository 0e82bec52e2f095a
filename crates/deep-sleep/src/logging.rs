//! Functions for setting up the logging system
//!
//! The console usually goes down with the clock tree, so every entry is also
//! kept in a small buffer. Diagnostics written while the console was not
//! available can be read back with [`take_recent`] once the chip is awake.

use core::cell::Cell;
use core::cell::RefCell;
use core::fmt;
use core::fmt::Write;
use core::str::FromStr;

use critical_section::Mutex;
use embassy_sync::lazy_lock::LazyLock;
use heapless::Deque;
use heapless::String;
use heapless::Vec;
use log::Level;
use log::LevelFilter;
use log::Log;
use log::Metadata;
use log::Record;

use crate::Error;

#[cfg(test)]
#[path = "logging_tests.rs"]
mod logging_tests;

// Constants for buffer sizes
pub const MAX_STORED_LOGS: usize = 32;
pub const MAX_LOG_LENGTH: usize = 128;
const MAX_CONSOLE_LINE_LENGTH: usize = 256;

/// Writes one finished line to the console
pub type ConsoleWriter = fn(&str);

static LOGGER: LazyLock<SleepLogger> = LazyLock::new(|| SleepLogger::new());

static CONSOLE: Mutex<Cell<Option<ConsoleWriter>>> = Mutex::new(Cell::new(None));

static LOG_BUFFER: Mutex<RefCell<Deque<LogEntry, MAX_STORED_LOGS>>> =
    Mutex::new(RefCell::new(Deque::new()));

/// A stored log line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    level: Level,
    message: String<MAX_LOG_LENGTH>,
}

impl LogEntry {
    pub fn level(&self) -> Level {
        self.level
    }

    /// The message, cut off at [`MAX_LOG_LENGTH`] bytes
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Logger that buffers entries and echoes them to the console
pub struct SleepLogger {}

impl SleepLogger {
    pub fn new() -> Self {
        Self {}
    }

    fn store_log(&self, record: &Record) {
        let entry = LogEntry {
            level: record.level(),
            message: bounded(format_args!("{}", record.args())),
        };

        critical_section::with(|cs| push_evicting(&mut LOG_BUFFER.borrow_ref_mut(cs), entry));
    }
}

/// Append `entry`, dropping the oldest entry when `buffer` is full
fn push_evicting<const N: usize>(buffer: &mut Deque<LogEntry, N>, entry: LogEntry) {
    if buffer.is_full() {
        let _ = buffer.pop_front();
    }

    let _ = buffer.push_back(entry);
}

impl Default for SleepLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for SleepLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.store_log(record);

            log_to_console(record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Log level from the `DEEP_SLEEP_LOG` build environment, `Info` if unset
fn max_level() -> LevelFilter {
    /// Log level from environment
    const LEVEL: Option<&'static str> = option_env!("DEEP_SLEEP_LOG");

    LEVEL
        .map(|level| LevelFilter::from_str(level).unwrap_or(LevelFilter::Info))
        .unwrap_or(LevelFilter::Info)
}

fn log_to_console(level: Level, target: &str, args: &fmt::Arguments) {
    /// Modifier for restoring normal text style
    const RESET: &str = "\u{001B}[0m";
    /// Modifier for setting gray text
    const GRAY: &str = "\u{001B}[2m";
    /// Modifier for setting red text
    const RED: &str = "\u{001B}[31m";
    /// Modifier for setting green text
    const GREEN: &str = "\u{001B}[32m";
    /// Modifier for setting yellow text
    const YELLOW: &str = "\u{001B}[33m";
    /// Modifier for setting blue text
    const BLUE: &str = "\u{001B}[34m";
    /// Modifier for setting cyan text
    const CYAN: &str = "\u{001B}[35m";

    let Some(console) = critical_section::with(|cs| CONSOLE.borrow(cs).get()) else {
        return;
    };

    let color = match level {
        Level::Error => RED,
        Level::Warn => YELLOW,
        Level::Info => GREEN,
        Level::Debug => BLUE,
        Level::Trace => CYAN,
    };

    let line: String<MAX_CONSOLE_LINE_LENGTH> = bounded(format_args!(
        "{}{:>5} {}{}{}]{} {}",
        color, level, RESET, GRAY, target, RESET, args
    ));

    console(&line);
}

/// Format `args`, dropping whatever does not fit in `N` bytes
fn bounded<const N: usize>(args: fmt::Arguments) -> String<N> {
    struct Truncating<const N: usize>(String<N>);

    impl<const N: usize> Write for Truncating<N> {
        fn write_str(&mut self, text: &str) -> fmt::Result {
            for character in text.chars() {
                if self.0.push(character).is_err() {
                    return Err(fmt::Error);
                }
            }

            Ok(())
        }
    }

    let mut writer = Truncating(String::new());
    let _ = writer.write_fmt(args);
    writer.0
}

/// Setup logging
///
/// `console` receives every line that passes the level filter. It may be
/// `None` while no console exists, entries are still buffered.
///
/// To change the log level set the environment variable `DEEP_SLEEP_LOG`
/// before building. This requires a clean rebuild because of
/// <https://github.com/rust-lang/cargo/issues/10358>
pub fn setup(console: Option<ConsoleWriter>) -> Result<(), Error> {
    set_console(console);

    #[cfg(target_has_atomic = "ptr")]
    let logger_set_result = log::set_logger(LOGGER.get());

    // SAFETY:
    // Without pointer atomics the logger can only be set racily. There is
    // only one thread and this runs before anything logs.
    #[cfg(not(target_has_atomic = "ptr"))]
    let logger_set_result = unsafe { log::set_logger_racy(LOGGER.get()) };

    if logger_set_result.is_err() {
        return Err(Error::FailedToSetLogger);
    }

    let level = max_level();
    #[cfg(target_has_atomic = "ptr")]
    log::set_max_level(level);

    // SAFETY: see above
    #[cfg(not(target_has_atomic = "ptr"))]
    unsafe {
        log::set_max_level_racy(level)
    };

    log_to_console(
        Level::Debug,
        "deep_sleep::logging::setup()",
        &format_args!("Logger is ready"),
    );

    Ok(())
}

/// Replace the console writer, for example after the console was restarted
pub fn set_console(console: Option<ConsoleWriter>) {
    critical_section::with(|cs| CONSOLE.borrow(cs).set(console));
}

/// Remove and return the buffered entries, oldest first
pub fn take_recent() -> Vec<LogEntry, MAX_STORED_LOGS> {
    critical_section::with(|cs| {
        let mut buffer = LOG_BUFFER.borrow_ref_mut(cs);
        let mut entries = Vec::new();
        while let Some(entry) = buffer.pop_front() {
            let _ = entries.push(entry);
        }

        entries
    })
}
