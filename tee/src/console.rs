use core::fmt::{Arguments, Write};
use spin::Once;

/// Output device behind the kernel console, typically a boot UART.
pub trait Console: Sync {
    fn put_str(&self, s: &str);
}

static CONSOLE: Once<&'static dyn Console> = Once::new();

/// Install the console. Later calls keep the first console.
pub fn init(console: &'static dyn Console) {
    CONSOLE.call_once(|| console);
}

struct SerialOut;

impl Write for SerialOut {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        if let Some(console) = CONSOLE.get() {
            console.put_str(s);
        }
        Ok(())
    }
}

pub fn serial_print(args: Arguments) {
    // SerialOut never fails; output before `init` is dropped.
    let _ = SerialOut.write_fmt(args);
}

#[macro_export]
/// print string macro
macro_rules! kserial_print {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::serial_print(format_args!($fmt $(, $($arg)+)?));
    }
}

#[macro_export]
macro_rules! kserial_println {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::serial_print(format_args!(concat!($fmt, "\n") $(, $($arg)+)?));   // Use LF instead of CR-LF
    }
}
