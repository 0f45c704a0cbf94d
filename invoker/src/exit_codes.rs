//! Stable exit codes for invoker CLI commands.

/// Command succeeded. Without strict mode this includes runs where items failed.
pub const OK: i32 = 0;
/// Invalid configuration (no item source, both item sources) or other errors.
pub const INVALID: i32 = 1;
/// At least one item failed and `fail_at_end` was requested.
pub const ITEM_FAILED: i32 = 2;
