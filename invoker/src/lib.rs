//! Item-iterating build invoker.
//!
//! Runs an external build tool (Maven by default) once per configured item,
//! substituting a placeholder token into the working directory, goals,
//! profiles and properties. Per-item failures are logged and recorded but
//! never stop the iteration; the caller decides what a failed item means.
//!
//! - **[`core`]**: Pure, deterministic logic (item resolution, placeholder
//!   substitution, request building, outcome types). No I/O.
//! - **[`io`]**: Side-effecting operations (configuration files, process
//!   execution, output forwarding, reports). Isolated behind traits so tests
//!   can script invocations without spawning processes.
//!
//! [`iterate`] drives the two together.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod iterate;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
