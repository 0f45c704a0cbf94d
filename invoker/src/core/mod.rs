//! Deterministic core logic for item iteration.
//!
//! Nothing in here touches the filesystem or spawns processes.

pub mod items;
pub mod outcome;
pub mod placeholder;
pub mod request;
