//! Process exit codes.
//!
//! Declared command failures carry their own code; everything the core
//! itself reports maps onto this fixed table.

pub const SUCCESS: i32 = 0;

/// Code used when a declared failure asks for `0`.
pub const GENERAL_FAILURE: i32 = 1;

/// A required option or positional argument was not supplied.
pub const MISSING_REQUIRED: i32 = 2;

/// Malformed invocation: bad value, unknown flag, surplus argument.
pub const USAGE: i32 = 64;

/// Unhandled command error, panic, or a misdeclared command.
pub const UNEXPECTED: i32 = 70;

/// Configuration file could not be read or parsed.
pub const CONFIG: i32 = 78;

/// No registered command matched the requested path.
pub const COMMAND_NOT_FOUND: i32 = 127;

/// Conventional 128 + SIGINT.
pub const INTERRUPTED: i32 = 130;
