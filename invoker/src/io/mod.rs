//! I/O helpers for invoker commands.

pub mod config;
pub mod invoker;
pub mod output;
pub mod process;
pub mod report;
