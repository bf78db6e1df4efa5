//! Logging facilities.
//!
//! The macros accept any value with `name()` and `time()` methods, such as
//! [`ServerlessSimulator`](crate::simulation::ServerlessSimulator), and prefix the message with the current
//! simulated time and the component name.

use atty::Stream;
use colored::{Color, ColoredString, Colorize};

/// Applies the color to the string if stderr (log) goes to console.
pub fn get_colored(s: &str, color: Color) -> ColoredString {
    if atty::is(Stream::Stderr) {
        s.color(color)
    } else {
        s.normal()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_record {
    ($level:ident, $label:expr, $color:ident, $ctx:expr, $format:literal) => (
        log::$level!(
            target: $ctx.name(),
            concat!("[{:.3} {} {}] ", $format),
            $ctx.time(), $crate::log::get_colored($label, $crate::colored::Color::$color), $ctx.name()
        )
    );
    ($level:ident, $label:expr, $color:ident, $ctx:expr, $format:literal, $($arg:tt)+) => (
        log::$level!(
            target: $ctx.name(),
            concat!("[{:.3} {} {}] ", $format),
            $ctx.time(), $crate::log::get_colored($label, $crate::colored::Color::$color), $ctx.name(), $($arg)+
        )
    );
    ($level:ident, $label:expr, $color:ident, $ctx:expr, $msg:expr) => (
        $crate::__log_record!($level, $label, $color, $ctx, "{}", $msg)
    );
}

/// Logs a message at the info level.
///
/// # Examples
///
/// ```rust
/// use dslab_faas_qos::config::{Config, Termination};
/// use dslab_faas_qos::log_info;
/// use dslab_faas_qos::simulation::ServerlessSimulator;
///
/// let config = Config {
///     termination: Termination::MaxRequests(10),
///     ..Default::default()
/// };
/// let sim = ServerlessSimulator::new(config).unwrap();
/// log_info!(sim, "created simulator with seed {}", 1);
/// ```
#[macro_export]
macro_rules! log_info {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_record!(info, "INFO ", Green, $ctx, $($arg)+));
}

/// Logs a message at the debug level.
#[macro_export]
macro_rules! log_debug {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_record!(debug, "DEBUG", Blue, $ctx, $($arg)+));
}

/// Logs a message at the trace level.
#[macro_export]
macro_rules! log_trace {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_record!(trace, "TRACE", Cyan, $ctx, $($arg)+));
}

/// Logs a message at the warn level.
#[macro_export]
macro_rules! log_warn {
    ($ctx:expr, $($arg:tt)+) => ($crate::__log_record!(warn, "WARN ", Yellow, $ctx, $($arg)+));
}
