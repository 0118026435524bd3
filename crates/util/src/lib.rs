//! Small, dependency-light helpers shared by the rest of the workspace.

pub mod channels;
pub mod debug_log;
pub mod drop_join_thread;
pub mod stop_signals;
