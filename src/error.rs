use thiserror::Error;

use crate::model::{Atom, Predicate, Rule};

/// Errors raised while evaluating a program.
///
/// All of these are input errors scoped to one rule or atom. They abort the
/// evaluation instead of being retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// An atom or a fact has a different number of positions than its
    /// predicate declares.
    #[error("arity mismatch for {predicate}: expected {expected} values, found {found}")]
    ArityMismatch {
        /// The predicate whose arity was violated
        predicate: Predicate,
        /// The declared arity
        expected: usize,
        /// The number of terms or values actually supplied
        found: usize,
    },

    /// A rule head mentions a term that no body atom binds.
    #[error("rule `{rule}` has `{term}` in its head, which is not a variable bound by the body")]
    UnboundHeadVariable {
        /// The offending rule
        rule: Box<Rule>,
        /// The head term that could not be resolved
        term: String,
    },

    /// A fact assigns two different values to a variable that is repeated
    /// inside a single atom.
    #[error("atom `{atom}` binds `{variable}` to both `{first}` and `{second}`")]
    SelfInconsistentAtom {
        /// The atom that repeats the variable
        atom: Box<Atom>,
        /// The repeated variable
        variable: String,
        /// The value seen first
        first: String,
        /// The conflicting value
        second: String,
    },

    /// The configured round limit was reached before a fixpoint.
    #[error("no fixpoint reached within {limit} rounds")]
    RoundLimitExceeded {
        /// The configured limit
        limit: usize,
    },

    /// A configuration document could not be parsed.
    #[cfg(feature = "serde")]
    #[error("invalid evaluator configuration: {0}")]
    InvalidConfig(String),

    /// A background evaluation task panicked or was cancelled.
    #[cfg(feature = "async")]
    #[error("evaluation task failed: {0}")]
    TaskFailed(String),
}

/// Result alias used throughout the crate.
pub type Result<T, E = EvalError> = std::result::Result<T, E>;
