//! Exit codes following sysexits.h conventions.
//!
//! `exit(code)` from the host overrides these; they apply only when the
//! process ends on its own.

/// Successful execution, or the host closed its end of the channel.
pub const SUCCESS: i32 = 0;

/// General error (catch-all).
pub const GENERAL_ERROR: i32 = 1;

/// Command line usage error (invalid arguments).
/// Maps to EX_USAGE from sysexits.h.
pub const USAGE_ERROR: i32 = 64;

/// I/O error on the host channel.
/// Maps to EX_IOERR from sysexits.h.
pub const IO_ERROR: i32 = 74;
