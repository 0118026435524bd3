//! Contains tools for debug-mode logging.
//!
//! Logging cannot be enabled when `cfg!(debug_assertions)` is false, otherwise
//! it's enabled by default. Every entry says where and when it was logged and
//! from which thread (see [where_and_when]).

pub mod panic_on_errors;

use std::panic::Location;
#[cfg(debug_assertions)]
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Log some info to stdout if both `cfg!(debug_assertions)` and [enabled] are
/// true.
#[macro_export]
macro_rules! debug_log_info {
    ($($arg:tt)*) => {
        $crate::__debug_log!(println, stdout, "\x1b[35m", "INFO", $($arg)*)
    };
}

/// Log a warning to stderr if both `cfg!(debug_assertions)` and [enabled] are
/// true.
#[macro_export]
macro_rules! debug_log_warning {
    ($($arg:tt)*) => {
        $crate::__debug_log!(eprintln, stderr, "\x1b[33m", "WARNING", $($arg)*)
    };
}

/// Log an error to stderr if both `cfg!(debug_assertions)` and [enabled] are
/// true. Panics afterwards if [panic_on_errors::enabled] is also true.
#[macro_export]
macro_rules! debug_log_error {
    ($($arg:tt)*) => {{
        $crate::__debug_log!(eprintln, stderr, "\x1b[31m", "ERROR", $($arg)*);

        #[cfg(debug_assertions)]
        if $crate::debug_log::enabled() && $crate::debug_log::panic_on_errors::enabled() {
            panic!("Panicking on error logging enabled.");
        }
    }};
}

/// Shared by [debug_log_info], [debug_log_warning] and [debug_log_error].
/// Colors are only used when the output stream is a terminal.
#[doc(hidden)]
#[macro_export]
macro_rules! __debug_log {
    ($print:ident, $stream:ident, $level_color:literal, $level:literal, $($arg:tt)*) => {{
        #[cfg(debug_assertions)]
        if $crate::debug_log::enabled() {
            let is_terminal = ::std::io::IsTerminal::is_terminal(&::std::io::$stream());
            let (blue, level_color, reset_color) = if is_terminal {
                ("\x1b[34m", $level_color, "\x1b[0m")
            } else {
                ("", "", "")
            };

            let where_and_when = $crate::debug_log::where_and_when(blue, reset_color);

            ::std::$print!(
                "{blue}DEBUG LOG{reset_color} [{level_color}{}{reset_color}]: {}\n{where_and_when}",
                $level,
                format!($($arg)*),
            );
        }
    }};
}

/// Whether logging is enabled or not.
///
/// Logging cannot be enabled when `cfg!(debug_assertions)` is false, otherwise
/// it's enabled by default.
#[inline(always)]
pub fn enabled() -> bool {
    #[cfg(debug_assertions)]
    return ENABLED.load(Ordering::Relaxed);

    #[cfg(not(debug_assertions))]
    return false;
}

/// Disable logging.
#[inline(always)]
pub fn disable() {
    #[cfg(debug_assertions)]
    ENABLED.store(false, Ordering::Relaxed);
}

/// Enable logging.
///
/// Trying to manually enable logging when `cfg!(debug_assertions)` is false
/// will result in the program panicking.
#[inline(always)]
pub fn enable() {
    #[cfg(not(debug_assertions))]
    panic!("Debug logging cannot be enabled.");

    #[cfg(debug_assertions)]
    ENABLED.store(true, Ordering::Relaxed);
}

/// The location of the caller, the time this was called, the calling thread
/// (its name, or its ID if it has none), and the executable (argv), one per
/// line.
///
/// This function gets called by the debug log macros (e.g. [debug_log_info])
/// and generally shouldn't be called directly.
#[track_caller]
pub fn where_and_when(color: &str, reset_color: &str) -> String {
    let loc = Location::caller();
    let where_ = format!("{}:{}:{}", loc.file(), loc.line(), loc.column());

    let when = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|e| format!("Unknown time: {e}"));

    let current_thread = thread::current();
    let thread = current_thread
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{:?}", current_thread.id()));

    let exec = std::env::args().collect::<Vec<_>>().join(" ");

    [
        ("Where", where_),
        ("Time", when),
        ("Thread", thread),
        ("Exec.", exec),
    ]
    .map(|(label, value)| format!("\t{label:<7} {color}{value}{reset_color}"))
    .join("\n")
}

#[cfg(debug_assertions)]
static ENABLED: AtomicBool = AtomicBool::new(true);
