use indexmap::IndexSet;

use crate::config::EvaluatorConfig;
use crate::error::{EvalError, Result};
use crate::model::{Database, Predicate, Rule};
use crate::rule::evaluate_validated;

/// Evaluate `rules` over `edb` naively
///
/// # Errors
///
/// See [`evaluate_with`].
pub fn evaluate(rules: &[Rule], edb: &Database) -> Result<Database> {
    evaluate_with(rules, edb, EvaluatorConfig::default())
}

/// Evaluate `rules` over `edb` naively, honoring `config`
///
/// Every rule is re-evaluated over everything known until a pass adds
/// nothing. Much slower than [`crate::seminaive`], but simple enough to serve
/// as a reference for its results, which have the same shape: one relation
/// per intensional predicate.
///
/// The first pass plays the part of the semi-naive seed. Each later pass
/// counts as one round against `config.max_rounds`, so both evaluators
/// accept the same limits.
///
/// # Errors
///
/// Returns rule validation and evaluation errors, or
/// [`EvalError::RoundLimitExceeded`] when more rounds than
/// `config.max_rounds` would be needed.
pub fn evaluate_with(rules: &[Rule], edb: &Database, config: EvaluatorConfig) -> Result<Database> {
    for rule in rules {
        rule.validate()?;
    }
    let idb: IndexSet<Predicate> = rules
        .iter()
        .map(|rule| rule.head.predicate.clone())
        .collect();

    let mut known = edb.clone();
    let mut passes: usize = 0;
    loop {
        passes += 1;
        if let Some(limit) = config.max_rounds {
            if passes - 1 > limit {
                return Err(EvalError::RoundLimitExceeded { limit });
            }
        }

        let mut derived = Database::new();
        for rule in rules {
            derived.insert_relation(&evaluate_validated(
                rule,
                &known,
                config.repeated_variables,
            )?)?;
        }

        let added = known.merge(&derived)?;
        log::debug!("naive pass {passes}: {added} new facts");
        if added == 0 {
            return Ok(known.restrict_to(&idb));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Atom, Fact, Term};

    fn path_rules(edge: &Predicate, path: &Predicate) -> Vec<Rule> {
        vec![
            Rule::new(
                Atom::new(path.clone(), [Term::var("x"), Term::var("y")]),
                [Atom::new(edge.clone(), [Term::var("x"), Term::var("y")])],
            ),
            Rule::new(
                Atom::new(path.clone(), [Term::var("x"), Term::var("z")]),
                [
                    Atom::new(path.clone(), [Term::var("x"), Term::var("y")]),
                    Atom::new(edge.clone(), [Term::var("y"), Term::var("z")]),
                ],
            ),
        ]
    }

    fn edges(edge: &Predicate, pairs: &[(&str, &str)]) -> Database {
        Database::from_facts(
            pairs
                .iter()
                .map(|(from, to)| (edge.clone(), Fact::new([*from, *to]))),
        )
        .unwrap()
    }

    #[test]
    fn test_naive_transitive_closure() {
        let edge = Predicate::new("edge", 2);
        let path = Predicate::new("path", 2);
        let rules = path_rules(&edge, &path);
        let edb = edges(&edge, &[("a", "b"), ("b", "c"), ("c", "a")]);

        let result = evaluate(&rules, &edb).unwrap();
        // a cycle over three nodes reaches every pair
        assert_eq!(result.get(&path).unwrap().len(), 9);
        assert!(result.get(&edge).is_none());
    }

    #[test]
    fn test_naive_round_limit_excludes_first_pass() {
        let edge = Predicate::new("edge", 2);
        let path = Predicate::new("path", 2);
        let rules = path_rules(&edge, &path);
        let edb = edges(&edge, &[("a", "b"), ("b", "c"), ("c", "d")]);

        // first pass finds direct paths, then 2, 1 and nothing
        let err = evaluate_with(&rules, &edb, EvaluatorConfig::new().with_max_rounds(2))
            .unwrap_err();
        assert_eq!(err, EvalError::RoundLimitExceeded { limit: 2 });

        let result = evaluate_with(&rules, &edb, EvaluatorConfig::new().with_max_rounds(3)).unwrap();
        assert_eq!(result.get(&path).unwrap().len(), 6);
    }
}
