use crate::config::RepeatedVariablePolicy;
use crate::error::{EvalError, Result};
use crate::model::{Atom, Database, Fact, Relation, Term};
use crate::substitution::{Substitution, SubstitutionSet};

/// Match an atom against every fact of a relation
///
/// An absent relation is treated as empty. Constants in the atom filter facts,
/// and a variable repeated across positions requires those positions to hold
/// the same value; how a violation is reported depends on `policy`.
///
/// # Errors
///
/// - [`EvalError::ArityMismatch`] if the atom does not fit its predicate or a
///   fact has a different length than the atom
/// - [`EvalError::SelfInconsistentAtom`] under
///   [`RepeatedVariablePolicy::Reject`]
pub fn match_atom(
    atom: &Atom,
    relation: Option<&Relation>,
    policy: RepeatedVariablePolicy,
) -> Result<SubstitutionSet> {
    atom.check_arity()?;

    let Some(relation) = relation else {
        return Ok(SubstitutionSet::new());
    };

    let mut matches = SubstitutionSet::with_capacity(relation.len());
    for fact in relation {
        if fact.len() != atom.terms.len() {
            return Err(EvalError::ArityMismatch {
                predicate: atom.predicate.clone(),
                expected: atom.terms.len(),
                found: fact.len(),
            });
        }
        if let Some(substitution) = match_fact(atom, fact, policy)? {
            matches.insert(substitution);
        }
    }
    Ok(matches)
}

/// Match an atom against the relation stored for its predicate in `database`
///
/// # Errors
///
/// See [`match_atom`].
pub fn match_atom_in(atom: &Atom, database: &Database) -> Result<SubstitutionSet> {
    match_atom(
        atom,
        database.get(&atom.predicate),
        RepeatedVariablePolicy::default(),
    )
}

/// Pair atom terms with fact values positionally.
/// `Ok(None)` means the fact does not satisfy the atom.
fn match_fact(
    atom: &Atom,
    fact: &Fact,
    policy: RepeatedVariablePolicy,
) -> Result<Option<Substitution>> {
    let mut substitution = Substitution::new();

    for (term, value) in atom.terms.iter().zip(fact.values()) {
        match term {
            Term::Constant(constant) => {
                if constant != value {
                    return Ok(None);
                }
            }
            Term::Variable(variable) => {
                let Some(first) = substitution.bind(variable, value) else {
                    continue;
                };
                return match policy {
                    RepeatedVariablePolicy::Skip => Ok(None),
                    RepeatedVariablePolicy::Reject => Err(EvalError::SelfInconsistentAtom {
                        atom: Box::new(atom.clone()),
                        variable: variable.clone(),
                        first,
                        second: value.clone(),
                    }),
                };
            }
        }
    }

    Ok(Some(substitution))
}
