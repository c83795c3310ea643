#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use crate::error::{EvalError, Result};

/// What to do when a fact gives two values to a variable repeated inside one
/// atom, as in `likes(x, x)` against `likes("alice", "bob")`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum RepeatedVariablePolicy {
    /// The fact does not satisfy the atom and is ignored
    #[default]
    Skip,
    /// Evaluation fails with [`crate::EvalError::SelfInconsistentAtom`]
    Reject,
}

/// Tuning knobs for an evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct EvaluatorConfig {
    /// Upper bound on incremental rounds, `None` for no bound
    ///
    /// Seeding is not a round; the final round that finds nothing new is.
    /// The naive evaluator counts every pass after its first.
    pub max_rounds: Option<usize>,
    /// Handling of repeated variables within a body atom
    pub repeated_variables: RepeatedVariablePolicy,
}

impl EvaluatorConfig {
    /// Default configuration: unbounded rounds, inconsistent facts skipped
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`crate::EvalError::RoundLimitExceeded`] after `limit`
    /// rounds without a fixpoint
    #[must_use]
    pub fn with_max_rounds(mut self, limit: usize) -> Self {
        self.max_rounds = Some(limit);
        self
    }

    /// Set the repeated-variable policy
    #[must_use]
    pub fn with_repeated_variables(mut self, policy: RepeatedVariablePolicy) -> Self {
        self.repeated_variables = policy;
        self
    }

    /// Parse a JSON document such as `{"max_rounds": 100}`.
    /// Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidConfig`] if the document is malformed.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EvalError::InvalidConfig(e.to_string()))
    }
}
