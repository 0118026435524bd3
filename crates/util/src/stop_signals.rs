//! Tools for handling stop signals (e.g. `SIGINT`). See [polling].
//!
//! Note that enabling the handlers in [polling] disables the default
//! stop-signal handler, so the process keeps running until it decides to stop.

pub mod polling;

const THREAD_EXPECT_MSG: &str = "The other thread shouldn't panic.";
