//! # Seminaive
//!
//! Bottom-up evaluation of positive Datalog programs.
//!
//! ## Features
//!
//! - Semi-naive fixpoint evaluation driven by per-round deltas
//! - Naive evaluation as a reference
//! - Explicit errors for arity mismatches, unbound head variables and
//!   self-inconsistent atoms
//!
//! ## Example
//!
//! ```rust
//! use seminaive::{evaluate, Atom, Database, Fact, Predicate, Rule, Term};
//!
//! let parent = Predicate::new("parent", 2);
//! let ancestor = Predicate::new("ancestor", 2);
//! let var = |name: &str| Term::var(name);
//!
//! let rules = vec![
//!     // ancestor(x, y) :- parent(x, y).
//!     Rule::new(
//!         Atom::new(ancestor.clone(), [var("x"), var("y")]),
//!         [Atom::new(parent.clone(), [var("x"), var("y")])],
//!     ),
//!     // ancestor(x, y) :- ancestor(x, z), parent(z, y).
//!     Rule::new(
//!         Atom::new(ancestor.clone(), [var("x"), var("y")]),
//!         [
//!             Atom::new(ancestor.clone(), [var("x"), var("z")]),
//!             Atom::new(parent.clone(), [var("z"), var("y")]),
//!         ],
//!     ),
//! ];
//!
//! let edb = Database::from_facts([
//!     (parent.clone(), Fact::new(["alice", "bob"])),
//!     (parent.clone(), Fact::new(["bob", "carol"])),
//! ])?;
//!
//! let idb = evaluate(&rules, &edb)?;
//! assert!(idb.contains(&ancestor, &Fact::new(["alice", "carol"])));
//! # Ok::<(), seminaive::EvalError>(())
//! ```

/// Background evaluation on the tokio blocking pool.
#[cfg(feature = "async")]
pub mod background;
/// Evaluator configuration.
pub mod config;
/// Error types.
pub mod error;
/// Matching a single atom against a relation.
pub mod matcher;
/// Predicates, atoms, rules, facts, relations and databases.
pub mod model;
/// Naive reference evaluation.
pub mod naive;
/// Evaluating one rule.
pub mod rule;
/// Semi-naive fixpoint driver.
pub mod seminaive;
/// Variable substitutions and their join.
pub mod substitution;

#[cfg(feature = "async")]
pub use background::evaluate_in_background;
pub use config::{EvaluatorConfig, RepeatedVariablePolicy};
pub use error::{EvalError, Result};
pub use model::{Atom, Database, Fact, Predicate, Relation, Rule, Term};
pub use rule::{evaluate_rule, evaluate_rule_with, RelationSource};
pub use seminaive::{evaluate, evaluate_with, Evaluation, EvaluationStats, RoundState, SemiNaive, Step};
pub use substitution::{join, Substitution, SubstitutionSet};
