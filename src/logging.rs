//! Logging facade.
//!
//! The router never talks to a logging backend directly. Every message goes
//! through one of the macros below, which forward to the [`log`] crate when
//! the `log` feature is enabled (the default) or to [`tracing`] when the
//! `tracing` feature is enabled. Enable at most one of the two.
//!
//! With neither feature enabled the macros expand to nothing.
//!
//! ```ignore
//! use state_router::{debug_log, warn_log};
//!
//! debug_log!("Registered {} states", count);
//! warn_log!("Redirect chain for '{}' has no target", name);
//! ```
//!
//! [`log`]: https://docs.rs/log
//! [`tracing`]: https://docs.rs/tracing

#[doc(hidden)]
#[macro_export]
macro_rules! __dispatch_log {
    ($level:ident, $($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::$level!($($arg)*);
        #[cfg(feature = "log")]
        ::log::$level!($($arg)*);
    };
}

/// Trace-level message: per-lookup and per-segment detail.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => { $crate::__dispatch_log!(trace, $($arg)*) };
}

/// Debug-level message: registration, cache invalidation, guard decisions.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => { $crate::__dispatch_log!(debug, $($arg)*) };
}

/// Info-level message: completed navigations and loaded subtrees.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => { $crate::__dispatch_log!(info, $($arg)*) };
}

/// Warn-level message.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => { $crate::__dispatch_log!(warn, $($arg)*) };
}

/// Error-level message.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => { $crate::__dispatch_log!(error, $($arg)*) };
}
