//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes. Exit codes are part of
//! the shell contract — orchestration scripts rely on them to decide
//! whether a failed run is retryable.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 1    | General error (unspecified)                         |
//! | 2    | CLI usage error (bad args, unreadable file)         |
//! | 3    | Config error (parse or validation)                  |
//! | 4    | Data-quality error (unmapped status, ambiguity)     |
//! | 5    | Storage error (substrate failure, missing table)    |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable input file.
pub const EXIT_USAGE: u8 = 2;

/// Config parse or validation failed. Not retryable without a config fix.
pub const EXIT_CONFIG: u8 = 3;

/// Data-quality failure (unmapped status, residual ambiguity, bad CSV
/// value). The prior silver/gold snapshots remain intact.
pub const EXIT_DATA_QUALITY: u8 = 4;

/// Storage substrate failure, surfaced verbatim. Safe to retry externally:
/// all writes are atomic full-replaces.
pub const EXIT_STORE: u8 = 5;
