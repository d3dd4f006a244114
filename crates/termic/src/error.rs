// SPDX-License-Identifier: MIT
//
// Library error type.
//
// Most of the crate speaks `io::Result` because the failures it can hit are
// plain OS errors (write to the terminal, poll, read). The variants here
// cover the conditions that are not I/O: a non-tty stdin at startup, the
// timer registry being full, and a broken key table.

use std::io;

use thiserror::Error;

/// Errors reported by `termic`.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from the terminal or a timer descriptor.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Standard input is not attached to a terminal.
    #[error("standard input is not a terminal")]
    NotATerminal,

    /// The decoder already owns the maximum number of active timers.
    #[error("too many active timers (max {max})")]
    TooManyTimers {
        /// Configured registry capacity.
        max: usize,
    },

    /// Two entries of the key table share the same byte sequence.
    #[error(transparent)]
    KeyTable(#[from] KeyTableError),

    /// The platform lacks a primitive this operation needs.
    #[error("unsupported on this platform: {0}")]
    Unsupported(&'static str),
}

/// A byte sequence mapped to two different keys.
///
/// Kept separate from [`Error`] so the validated built-in table can be
/// stored in a `static` and cloned out on every lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("duplicate key sequence {sequence:?}: {first} vs {second}")]
pub struct KeyTableError {
    /// Escaped rendering of the offending bytes.
    pub sequence: String,
    /// The first mapping found for the sequence.
    pub first: String,
    /// The conflicting mapping.
    pub second: String,
}

/// Result alias for `termic` operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let err: Error = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "I/O error: boom");
    }

    #[test]
    fn too_many_timers_message() {
        let err = Error::TooManyTimers { max: 16 };
        assert_eq!(err.to_string(), "too many active timers (max 16)");
    }

    #[test]
    fn key_table_error_is_transparent() {
        let inner = KeyTableError {
            sequence: "\\e[A".into(),
            first: "Up".into(),
            second: "Down".into(),
        };
        let err: Error = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
        assert!(err.to_string().contains("Up vs Down"));
    }
}
