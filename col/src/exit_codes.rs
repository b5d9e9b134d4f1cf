//! Stable exit codes for `col` commands.

/// Command succeeded, including "nothing to apply".
pub const OK: i32 = 0;
/// Invalid input (context, config, response file, flags) or any other failure.
pub const INVALID: i32 = 1;
/// `col run` got provider output that failed to parse. The artifact is still written.
pub const PARSE_FAILED: i32 = 2;
