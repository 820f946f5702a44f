#[macro_export]
/// Trigger panic during initialization
macro_rules! panic_init {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        panic!(
            concat!("An unexpected error occurred during kernel initialization:\n\t",$fmt)
             $(, $($arg)+)?)
    }
}
