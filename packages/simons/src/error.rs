use thiserror::Error;

use crate::SimonKind;

/// Errors that can occur when working with a [`Registry`][crate::Registry] or its Simons.
///
/// All of these indicate programming errors on the caller side. None of them are transient
/// and retrying the same operation will produce the same error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller provided a name that does not match the Simon name grammar.
    #[error("invalid Simon name '{name}': names must match [-_\\[\\]A-Za-z0-9.,@$%()<>]+")]
    InvalidName {
        /// The name that was rejected.
        name: String,
    },

    /// The caller provided a pattern that is not a valid Simon pattern.
    #[error("invalid Simon pattern '{pattern}': {problem}")]
    InvalidPattern {
        /// The pattern that was rejected.
        pattern: String,

        /// A human-readable description of the problem.
        problem: String,
    },

    /// The reserved root Simon (empty name) was used in a way that is not allowed.
    #[error("the root Simon cannot be used for this operation: {operation}")]
    RootSimonMisuse {
        /// The operation that was attempted on the root Simon.
        operation: &'static str,
    },

    /// The name is already bound to a Simon of a different concrete kind.
    #[error("Simon '{name}' already exists as {existing} but {requested} was requested")]
    KindConflict {
        /// The name that was requested.
        name: String,

        /// The kind that the name is already bound to.
        existing: SimonKind,

        /// The kind that the caller asked for.
        requested: SimonKind,
    },

    /// No Simon with the given name is registered.
    #[error("no Simon named '{name}' is registered")]
    NotFound {
        /// The name that was looked up.
        name: String,
    },

    /// A purger lifecycle operation was called out of sequence.
    #[error(transparent)]
    Purger(#[from] PurgerStateError),
}

/// Lifecycle violations of a [`Purger`][crate::Purger].
///
/// A purger goes through `Idle -> Running -> Cancelled` exactly once.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum PurgerStateError {
    /// `start()` was called on a purger that is running or was already cancelled.
    #[error("the purger has already been started")]
    AlreadyStarted,

    /// `cancel()` was called on a purger that was never started.
    #[error("the purger has not been started")]
    NotStarted,

    /// `cancel()` was called on a purger that was already cancelled.
    #[error("the purger has already been cancelled")]
    AlreadyCancelled,
}

/// A specialized `Result` type for Simon operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
