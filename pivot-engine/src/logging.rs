//! FILENAME: pivot-engine/src/logging.rs
// PURPOSE: Category-tagged logging on top of the `log` facade.

use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// UNIFIED LOG LINES
// ============================================================================

/// Global sequence counter so interleaved builds can be ordered afterwards.
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

/// Write a log line in unified format (`seq|category|message`).
/// The category doubles as the `log` target so hosts can filter on it.
pub fn write_log(level: log::Level, category: &str, message: &str) {
    if log::log_enabled!(target: category, level) {
        log::log!(target: category, level, "{}|{}|{}", next_seq(), category, message);
    }
}

/// Write an ENTER log line for function entry
pub fn write_log_enter(category: &str, func_name: &str, params: &str) {
    let message = if params.is_empty() {
        format!("ENTER {}", func_name)
    } else {
        format!("ENTER {} {}", func_name, params)
    };
    write_log(log::Level::Debug, category, &message);
}

/// Write an EXIT log line for function exit
pub fn write_log_exit(category: &str, func_name: &str, result: &str) {
    let message = if result.is_empty() {
        format!("EXIT {}", func_name)
    } else {
        format!("EXIT {} {}", func_name, result)
    };
    write_log(log::Level::Debug, category, &message);
}

// ============================================================================
// MACRO DEFINITIONS & EXPORTS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log(::log::Level::Debug, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log(::log::Level::Info, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        $crate::logging::write_log(::log::Level::Warn, $cat, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_enter {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_enter($cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_enter($cat, $func, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_exit {
    ($cat:expr, $func:expr) => {
        $crate::logging::write_log_exit($cat, $func, "")
    };
    ($cat:expr, $func:expr, $($arg:tt)*) => {
        $crate::logging::write_log_exit($cat, $func, &format!($($arg)*))
    };
}

pub use log_debug;
pub use log_info;
pub use log_warn;
pub use log_enter;
pub use log_exit;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = next_seq();
        let b = next_seq();
        assert!(b > a);
    }
}
