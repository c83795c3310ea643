use indexmap::IndexSet;

use crate::config::{EvaluatorConfig, RepeatedVariablePolicy};
use crate::error::{EvalError, Result};
use crate::matcher::match_atom;
use crate::model::{Atom, Database, Predicate, Relation, Rule};
use crate::rule::{evaluate_validated, RelationSource};

/// Counters describing the work done by an evaluation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    /// Incremental rounds performed, including the final empty one
    pub rounds: usize,
    /// Rule evaluations, counting each delta position separately
    pub rule_evaluations: usize,
    /// Intensional facts that were not already known
    pub facts_derived: usize,
}

/// The outcome of evaluating a program to its fixpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// One relation per intensional predicate
    pub database: Database,
    /// Work counters
    pub stats: EvaluationStats,
}

/// Snapshot between two rounds
///
/// A state is consumed by [`SemiNaive::step`], which hands back the next one.
/// Nothing is shared between snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundState {
    accumulated: Database,
    delta: Database,
    round: usize,
    stats: EvaluationStats,
}

impl RoundState {
    /// Every intensional fact known so far
    #[must_use]
    pub fn accumulated(&self) -> &Database {
        &self.accumulated
    }

    /// Facts first derived in the most recent round
    #[must_use]
    pub fn delta(&self) -> &Database {
        &self.delta
    }

    /// Number of incremental rounds completed, 0 right after seeding
    #[must_use]
    pub fn round(&self) -> usize {
        self.round
    }

    /// Work done so far
    #[must_use]
    pub fn stats(&self) -> EvaluationStats {
        self.stats
    }

    /// Finish with the accumulated database
    #[must_use]
    pub fn into_evaluation(self) -> Evaluation {
        Evaluation {
            database: self.accumulated,
            stats: self.stats,
        }
    }
}

/// Result of a single incremental round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// New facts were found; run another round from this state
    Continue(RoundState),
    /// Nothing new was derived
    Fixpoint(RoundState),
}

/// Semi-naive bottom-up evaluator for one program and one extensional database
///
/// - Seeding: rules whose bodies mention no intensional predicate are
///   evaluated once against the extensional database
/// - Rounds: every remaining rule is evaluated once per intensional body
///   position, with that position reading only the previous round's delta
/// - Termination: a round that derives nothing new
///
/// ## Example
///
/// For `ancestor(x, z) :- ancestor(x, y), parent(y, z)`:
/// - Seeding derives nothing from this rule (it is recursive)
/// - Round n joins only the `ancestor` facts found in round n-1 with all of
///   `parent`, so old combinations are never re-joined
#[derive(Debug)]
pub struct SemiNaive<'a> {
    rules: &'a [Rule],
    edb: &'a Database,
    idb: IndexSet<Predicate>,
    config: EvaluatorConfig,
}

impl<'a> SemiNaive<'a> {
    /// Create an evaluator with the default configuration
    ///
    /// # Errors
    ///
    /// See [`SemiNaive::with_config`].
    pub fn new(rules: &'a [Rule], edb: &'a Database) -> Result<Self> {
        Self::with_config(rules, edb, EvaluatorConfig::default())
    }

    /// Create an evaluator, validating every rule up front
    ///
    /// # Errors
    ///
    /// Returns the first [`Rule::validate`] failure, before any facts are
    /// derived.
    pub fn with_config(
        rules: &'a [Rule],
        edb: &'a Database,
        config: EvaluatorConfig,
    ) -> Result<Self> {
        for rule in rules {
            rule.validate()?;
        }

        let idb: IndexSet<Predicate> = rules
            .iter()
            .map(|rule| rule.head.predicate.clone())
            .collect();
        log::debug!(
            "evaluating {} rules over {} intensional predicates",
            rules.len(),
            idb.len()
        );

        Ok(Self {
            rules,
            edb,
            idb,
            config,
        })
    }

    /// Predicates defined by rule heads
    #[must_use]
    pub fn intensional(&self) -> &IndexSet<Predicate> {
        &self.idb
    }

    fn is_recursive(&self, rule: &Rule) -> bool {
        rule.body
            .iter()
            .any(|atom| self.idb.contains(&atom.predicate))
    }

    /// Evaluate the non-recursive rules once against the extensional database
    ///
    /// Facts the extensional database already holds for intensional
    /// predicates count as known and are part of the first delta.
    ///
    /// Under [`RepeatedVariablePolicy::Reject`] every extensional body atom
    /// that repeats a variable is checked against its whole relation here,
    /// since a recursive rule may never be evaluated against all of it.
    ///
    /// # Errors
    ///
    /// Propagates rule evaluation errors.
    pub fn seed(&self) -> Result<RoundState> {
        if self.config.repeated_variables == RepeatedVariablePolicy::Reject {
            self.check_extensional_atoms()?;
        }

        let mut accumulated = self.edb.restrict_to(&self.idb);
        let mut stats = EvaluationStats::default();

        for rule in self.rules.iter().filter(|rule| !self.is_recursive(rule)) {
            let derived = evaluate_validated(rule, self.edb, self.config.repeated_variables)?;
            stats.rule_evaluations += 1;
            stats.facts_derived += accumulated.insert_relation(&derived)?;
        }

        log::debug!("seeded {} intensional facts", accumulated.total_facts());
        Ok(RoundState {
            delta: accumulated.clone(),
            accumulated,
            round: 0,
            stats,
        })
    }

    fn check_extensional_atoms(&self) -> Result<()> {
        let atoms = self
            .rules
            .iter()
            .flat_map(|rule| &rule.body)
            .filter(|atom| !self.idb.contains(&atom.predicate) && atom.has_repeated_variable());
        for atom in atoms {
            match_atom(atom, self.edb.get(&atom.predicate), RepeatedVariablePolicy::Reject)?;
        }
        Ok(())
    }

    /// Perform one incremental round
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::RoundLimitExceeded`] when the configured limit
    /// would be passed, and propagates rule evaluation errors.
    pub fn step(&self, state: RoundState) -> Result<Step> {
        let RoundState {
            mut accumulated,
            delta,
            round,
            mut stats,
        } = state;

        let current = round + 1;
        if let Some(limit) = self.config.max_rounds {
            if current > limit {
                return Err(EvalError::RoundLimitExceeded { limit });
            }
        }

        let mut next_delta = Database::new().restrict_to(&self.idb);
        for rule in self.rules.iter().filter(|rule| self.is_recursive(rule)) {
            let known = accumulated.get(&rule.head.predicate);

            for (position, atom) in rule.body.iter().enumerate() {
                if !self.idb.contains(&atom.predicate) {
                    continue;
                }
                // An empty delta here cannot produce anything new
                if delta.get(&atom.predicate).map_or(true, Relation::is_empty) {
                    continue;
                }

                let view = DeltaView {
                    delta_position: position,
                    delta: &delta,
                    accumulated: &accumulated,
                    edb: self.edb,
                    idb: &self.idb,
                };
                let derived =
                    evaluate_validated(rule, &view, self.config.repeated_variables)?;
                stats.rule_evaluations += 1;

                let fresh = match known {
                    Some(known) => derived.difference(known),
                    None => derived,
                };
                log::trace!(
                    "round {current}: `{rule}` with delta at position {position} found {} new facts",
                    fresh.len()
                );
                next_delta.insert_relation(&fresh)?;
            }
        }

        stats.rounds = current;
        let found = next_delta.total_facts();
        log::debug!("round {current}: {found} new facts");

        if found == 0 {
            log::info!(
                "fixpoint after {current} rounds with {} intensional facts",
                accumulated.total_facts()
            );
            return Ok(Step::Fixpoint(RoundState {
                accumulated,
                delta: next_delta,
                round: current,
                stats,
            }));
        }

        stats.facts_derived += accumulated.merge(&next_delta)?;
        Ok(Step::Continue(RoundState {
            accumulated,
            delta: next_delta,
            round: current,
            stats,
        }))
    }

    /// Seed and run rounds until the fixpoint
    ///
    /// # Errors
    ///
    /// See [`SemiNaive::seed`] and [`SemiNaive::step`].
    pub fn run(&self) -> Result<Evaluation> {
        let mut state = self.seed()?;
        loop {
            match self.step(state)? {
                Step::Continue(next) => state = next,
                Step::Fixpoint(done) => return Ok(done.into_evaluation()),
            }
        }
    }
}

/// Resolves body atoms for one (rule, delta position) evaluation
struct DeltaView<'v> {
    delta_position: usize,
    delta: &'v Database,
    accumulated: &'v Database,
    edb: &'v Database,
    idb: &'v IndexSet<Predicate>,
}

impl RelationSource for DeltaView<'_> {
    fn relation_for(&self, position: usize, atom: &Atom) -> Option<&Relation> {
        let predicate = &atom.predicate;
        if position == self.delta_position {
            self.delta.get(predicate)
        } else if self.idb.contains(predicate) {
            self.accumulated.get(predicate)
        } else {
            self.edb.get(predicate)
        }
    }
}

/// Evaluate `rules` over `edb` to the fixpoint
///
/// Returns one relation per predicate that appears in a rule head.
///
/// # Errors
///
/// See [`SemiNaive::run`].
pub fn evaluate(rules: &[Rule], edb: &Database) -> Result<Database> {
    Ok(SemiNaive::new(rules, edb)?.run()?.database)
}

/// Like [`evaluate`], with a configuration and work counters
///
/// # Errors
///
/// See [`SemiNaive::run`].
pub fn evaluate_with(
    rules: &[Rule],
    edb: &Database,
    config: EvaluatorConfig,
) -> Result<Evaluation> {
    SemiNaive::with_config(rules, edb, config)?.run()
}
