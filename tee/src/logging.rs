use log::{Level, LevelFilter, Log, Metadata, Record, set_logger, set_max_level};

use crate::panic_init;

pub struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let color = match record.level() {
            Level::Error => 31, // Red
            Level::Warn => 93,  // BrightYellow
            Level::Info => 37,  // White
            Level::Debug => 32, // Green
            Level::Trace => 90, // BrightBlack
        };
        kserial_println!(
            "\u{1B}[{}m[{:}] {}\u{1B}[0m",
            color,
            record.level(),
            record.args(),
        );
    }

    fn flush(&self) {}
}

/// Route `log` records to the kernel console. Must be called once, after [crate::console::init].
pub fn init(level: LevelFilter) {
    static LOGGER: Logger = Logger;
    set_logger(&LOGGER).unwrap_or_else(|err| panic_init!("Error initializing logger: {:?}", err));
    set_max_level(level);
}

/// Improved debug macro,
/// only compiled in debug mode.
#[macro_export]
macro_rules! debug_ex {
    // debug_ex!(target: "my_target", "a {} event", "log")
    (target: $target:expr, $($arg:tt)+) => {
        #[cfg(debug_assertions)]
        {
            ::log::log!(target: $target, ::log::Level::Debug, $($arg)+)
        }
    };

    // debug_ex!("a {} event", "log")
    ($($arg:tt)+) => {
        #[cfg(debug_assertions)]
        {
            ::log::log!(::log::Level::Debug, $($arg)+)
        }
    }
}
