use crate::config::RepeatedVariablePolicy;
use crate::error::{EvalError, Result};
use crate::matcher::match_atom;
use crate::model::{Atom, Database, Fact, Relation, Rule, Term};
use crate::substitution::{identity, join, Substitution, SubstitutionSet};

/// Supplies the relation each body atom is matched against
///
/// The body position is passed along so that one predicate can resolve to
/// different relations at different positions of the same rule.
pub trait RelationSource {
    /// The relation for the atom at `position`, `None` if empty
    fn relation_for(&self, position: usize, atom: &Atom) -> Option<&Relation>;
}

impl RelationSource for Database {
    fn relation_for(&self, _position: usize, atom: &Atom) -> Option<&Relation> {
        self.get(&atom.predicate)
    }
}

/// Evaluate a rule against a single database
///
/// # Errors
///
/// See [`evaluate_rule_with`].
pub fn evaluate_rule(rule: &Rule, database: &Database) -> Result<Relation> {
    evaluate_rule_with(rule, database, RepeatedVariablePolicy::default())
}

/// Evaluate a rule and project the satisfying substitutions onto its head
///
/// Body atoms are joined left to right starting from [`identity`]. The result
/// is a relation of the head predicate.
///
/// # Errors
///
/// - [`EvalError::ArityMismatch`] for malformed atoms or facts
/// - [`EvalError::UnboundHeadVariable`] when the head uses a term the body
///   does not bind
/// - [`EvalError::SelfInconsistentAtom`] under
///   [`RepeatedVariablePolicy::Reject`]
pub fn evaluate_rule_with<S>(
    rule: &Rule,
    source: &S,
    policy: RepeatedVariablePolicy,
) -> Result<Relation>
where
    S: RelationSource + ?Sized,
{
    rule.validate()?;
    evaluate_validated(rule, source, policy)
}

/// [`evaluate_rule_with`] for rules that already passed [`Rule::validate`]
///
/// Under [`RepeatedVariablePolicy::Reject`] every body atom is matched even
/// once the join is empty, so inconsistent facts are reported regardless of
/// body order.
pub(crate) fn evaluate_validated<S>(
    rule: &Rule,
    source: &S,
    policy: RepeatedVariablePolicy,
) -> Result<Relation>
where
    S: RelationSource + ?Sized,
{
    let mut bindings = identity();
    for (position, atom) in rule.body.iter().enumerate() {
        let matches = match_atom(atom, source.relation_for(position, atom), policy)?;
        bindings = join(&bindings, &matches);

        // Nothing can satisfy the rest of the body
        if bindings.is_empty() && policy == RepeatedVariablePolicy::Skip {
            break;
        }
    }

    project(rule, &bindings)
}

/// Instantiate the rule head once per substitution
fn project(rule: &Rule, bindings: &SubstitutionSet) -> Result<Relation> {
    let mut derived = Relation::new(rule.head.predicate.clone());
    for binding in bindings {
        derived.insert(instantiate(rule, binding)?)?;
    }
    Ok(derived)
}

fn instantiate(rule: &Rule, binding: &Substitution) -> Result<Fact> {
    rule.head
        .terms
        .iter()
        .map(|term| match term {
            Term::Variable(name) => {
                binding
                    .get(name)
                    .ok_or_else(|| EvalError::UnboundHeadVariable {
                        rule: Box::new(rule.clone()),
                        term: name.clone(),
                    })
            }
            Term::Constant(value) => Err(EvalError::UnboundHeadVariable {
                rule: Box::new(rule.clone()),
                term: value.clone(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Predicate;

    fn edge() -> Predicate {
        Predicate::new("edge", 2)
    }

    fn var_atom(predicate: Predicate, vars: &[&str]) -> Atom {
        Atom::new(predicate, vars.iter().map(|v| Term::var(*v)))
    }

    fn graph(edges: &[(&str, &str)]) -> Database {
        Database::from_facts(
            edges
                .iter()
                .map(|(from, to)| (edge(), Fact::new([*from, *to]))),
        )
        .unwrap()
    }

    #[test]
    fn test_single_atom_copy_rule() {
        let db = graph(&[("a", "b"), ("b", "c")]);
        let rule = Rule::new(
            var_atom(Predicate::new("path", 2), &["x", "y"]),
            [var_atom(edge(), &["x", "y"])],
        );

        let derived = evaluate_rule(&rule, &db).unwrap();
        assert_eq!(derived.predicate(), &Predicate::new("path", 2));
        assert_eq!(
            derived.sorted(),
            vec![Fact::new(["a", "b"]), Fact::new(["b", "c"])]
        );
    }

    #[test]
    fn test_two_hop_join() {
        let db = graph(&[("1", "2"), ("2", "3"), ("3", "4")]);
        let rule = Rule::new(
            var_atom(Predicate::new("hop2", 2), &["x", "z"]),
            [var_atom(edge(), &["x", "y"]), var_atom(edge(), &["y", "z"])],
        );

        let derived = evaluate_rule(&rule, &db).unwrap();
        assert_eq!(
            derived.sorted(),
            vec![Fact::new(["1", "3"]), Fact::new(["2", "4"])]
        );
    }

    #[test]
    fn test_projection_collapses_duplicates() {
        let db = graph(&[("a", "b"), ("a", "c"), ("a", "d")]);
        let rule = Rule::new(
            var_atom(Predicate::new("source", 1), &["x"]),
            [var_atom(edge(), &["x", "y"])],
        );

        let derived = evaluate_rule(&rule, &db).unwrap();
        assert_eq!(derived.len(), 1);
        assert!(derived.contains(&Fact::new(["a"])));
    }

    #[test]
    fn test_repeated_head_variable() {
        let db = graph(&[("a", "b")]);
        let rule = Rule::new(
            var_atom(Predicate::new("loop", 2), &["x", "x"]),
            [var_atom(edge(), &["x", "y"])],
        );

        let derived = evaluate_rule(&rule, &db).unwrap();
        assert_eq!(derived.sorted(), vec![Fact::new(["a", "a"])]);
    }

    #[test]
    fn test_body_constant_acts_as_filter() {
        let db = graph(&[("a", "b"), ("c", "b"), ("c", "d")]);
        let rule = Rule::new(
            var_atom(Predicate::new("into_b", 1), &["x"]),
            [Atom::new(edge(), [Term::var("x"), Term::constant("b")])],
        );

        let derived = evaluate_rule(&rule, &db).unwrap();
        assert_eq!(derived.sorted(), vec![Fact::new(["a"]), Fact::new(["c"])]);
    }

    #[test]
    fn test_empty_relation_yields_nothing() {
        let db = Database::new();
        let rule = Rule::new(
            var_atom(Predicate::new("path", 2), &["x", "y"]),
            [var_atom(edge(), &["x", "y"])],
        );
        assert!(evaluate_rule(&rule, &db).unwrap().is_empty());
    }

    #[test]
    fn test_unbound_head_variable_is_reported() {
        let db = graph(&[("a", "b")]);
        let rule = Rule::new(
            var_atom(Predicate::new("path", 2), &["x", "w"]),
            [var_atom(edge(), &["x", "y"])],
        );

        match evaluate_rule(&rule, &db) {
            Err(EvalError::UnboundHeadVariable { term, rule: reported }) => {
                assert_eq!(term, "w");
                assert_eq!(*reported, rule);
            }
            other => panic!("expected unbound head variable, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_body_zero_arity_head_is_always_true() {
        let rule = Rule::new(Atom::new(Predicate::new("ready", 0), []), []);
        let derived = evaluate_rule(&rule, &Database::new()).unwrap();
        assert_eq!(derived.len(), 1);
        assert!(derived.contains(&Fact::default()));
    }

    #[test]
    fn test_reject_checks_atoms_after_an_empty_join() {
        let likes = Predicate::new("likes", 2);
        let db = Database::from_facts([(likes.clone(), Fact::new(["alice", "pizza"]))]).unwrap();
        // the first atom matches nothing, the second is inconsistent
        let rule = Rule::new(
            var_atom(Predicate::new("fan", 1), &["x"]),
            [
                var_atom(Predicate::new("person", 1), &["x"]),
                var_atom(likes, &["x", "x"]),
            ],
        );

        assert!(evaluate_rule(&rule, &db).unwrap().is_empty());
        assert!(matches!(
            evaluate_rule_with(&rule, &db, RepeatedVariablePolicy::Reject),
            Err(EvalError::SelfInconsistentAtom { .. })
        ));
    }

    struct PerPosition {
        first: Relation,
        rest: Relation,
    }

    impl RelationSource for PerPosition {
        fn relation_for(&self, position: usize, _atom: &Atom) -> Option<&Relation> {
            Some(if position == 0 { &self.first } else { &self.rest })
        }
    }

    #[test]
    fn test_source_resolves_by_position() {
        let mut first = Relation::new(edge());
        first.insert(Fact::new(["a", "b"])).unwrap();
        let mut rest = Relation::new(edge());
        rest.insert(Fact::new(["a", "b"])).unwrap();
        rest.insert(Fact::new(["b", "c"])).unwrap();

        let rule = Rule::new(
            var_atom(Predicate::new("hop2", 2), &["x", "z"]),
            [var_atom(edge(), &["x", "y"]), var_atom(edge(), &["y", "z"])],
        );

        let derived = evaluate_rule_with(
            &rule,
            &PerPosition { first, rest },
            RepeatedVariablePolicy::Skip,
        )
        .unwrap();
        assert_eq!(derived.sorted(), vec![Fact::new(["a", "c"])]);
    }
}
