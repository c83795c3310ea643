use std::fmt;

use indexmap::{IndexMap, IndexSet};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{EvalError, Result};

/// A named relation symbol with a fixed arity (e.g., `parent/2`)
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Predicate {
    /// The name of the predicate (e.g., `"parent"`)
    pub name: String,
    /// The number of positions every atom and fact of this predicate has
    pub arity: usize,
}

impl Predicate {
    /// Create a predicate
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// A position in an atom
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Term {
    /// A variable bound during evaluation (e.g., `x`, `y`)
    Variable(String),
    /// A concrete value (e.g., `"alice"`, `"bob"`)
    Constant(String),
}

impl Term {
    /// Shorthand for [`Term::Variable`]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Shorthand for [`Term::Constant`]
    pub fn constant(value: impl Into<String>) -> Self {
        Self::Constant(value.into())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(name) => f.write_str(name),
            Self::Constant(value) => write!(f, "{value:?}"),
        }
    }
}

/// A predicate applied to terms (e.g., `ancestor(x, y)`)
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Atom {
    /// The predicate of the atom
    pub predicate: Predicate,
    /// The arguments, one per predicate position
    pub terms: Vec<Term>,
}

impl Atom {
    /// Create an atom
    pub fn new(predicate: Predicate, terms: impl IntoIterator<Item = Term>) -> Self {
        Self {
            predicate,
            terms: terms.into_iter().collect(),
        }
    }

    /// Check that the atom has exactly as many terms as its predicate's arity
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ArityMismatch`] when the lengths differ.
    pub fn check_arity(&self) -> Result<()> {
        if self.terms.len() == self.predicate.arity {
            Ok(())
        } else {
            Err(EvalError::ArityMismatch {
                predicate: self.predicate.clone(),
                expected: self.predicate.arity,
                found: self.terms.len(),
            })
        }
    }

    /// Iterate over the variable names of this atom, in position order
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter_map(|term| match term {
            Term::Variable(name) => Some(name.as_str()),
            Term::Constant(_) => None,
        })
    }

    /// Whether some variable occurs at more than one position
    #[must_use]
    pub fn has_repeated_variable(&self) -> bool {
        let mut seen = IndexSet::new();
        self.variables().any(|name| !seen.insert(name))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.predicate.name)?;
        for (idx, term) in self.terms.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{term}")?;
        }
        f.write_str(")")
    }
}

/// A Horn clause (e.g., `ancestor(x, z) :- ancestor(x, y), parent(y, z)`)
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rule {
    /// The conclusion of the rule
    pub head: Atom,
    /// The conjunction that must hold for the head to be derived
    pub body: Vec<Atom>,
}

impl Rule {
    /// Create a rule
    pub fn new(head: Atom, body: impl IntoIterator<Item = Atom>) -> Self {
        Self {
            head,
            body: body.into_iter().collect(),
        }
    }

    /// Check that every atom matches its predicate's arity and that the head
    /// only uses variables bound by the body
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ArityMismatch`] for a malformed atom, or
    /// [`EvalError::UnboundHeadVariable`] when a head term is a constant or a
    /// variable absent from the body.
    pub fn validate(&self) -> Result<()> {
        self.head.check_arity()?;
        for atom in &self.body {
            atom.check_arity()?;
        }

        let bound: IndexSet<&str> = self.body.iter().flat_map(Atom::variables).collect();
        for term in &self.head.terms {
            match term {
                Term::Variable(name) if bound.contains(name.as_str()) => {}
                Term::Variable(name) | Term::Constant(name) => {
                    return Err(EvalError::UnboundHeadVariable {
                        rule: Box::new(self.clone()),
                        term: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.body.is_empty() {
            f.write_str(" :- ")?;
            for (idx, atom) in self.body.iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{atom}")?;
            }
        }
        f.write_str(".")
    }
}

/// A ground tuple of values, positionally aligned with a predicate
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Fact(SmallVec<[String; 4]>);

impl Fact {
    /// Create a fact from its values
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values.into_iter().collect()
    }

    /// Number of values
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the zero-arity fact
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value at `position`
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&str> {
        self.0.get(position).map(String::as_str)
    }

    /// All values, in position order
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Fact {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(value)?;
        }
        f.write_str(")")
    }
}

/// The duplicate-free set of facts of one predicate
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "RelationRepr")
)]
pub struct Relation {
    predicate: Predicate,
    facts: IndexSet<Fact>,
}

impl Relation {
    /// Create an empty relation for `predicate`
    #[must_use]
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            facts: IndexSet::new(),
        }
    }

    /// The predicate this relation belongs to
    #[must_use]
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Adds a fact.
    /// Returns true if the fact was not already present.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ArityMismatch`] if the fact's length differs from
    /// the predicate's arity.
    pub fn insert(&mut self, fact: Fact) -> Result<bool> {
        if fact.len() != self.predicate.arity {
            return Err(EvalError::ArityMismatch {
                predicate: self.predicate.clone(),
                expected: self.predicate.arity,
                found: fact.len(),
            });
        }
        Ok(self.facts.insert(fact))
    }

    /// Adds every fact of `other`, returning how many were new
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ArityMismatch`] if `other` has a different arity.
    pub fn union_with(&mut self, other: &Relation) -> Result<usize> {
        if other.predicate.arity != self.predicate.arity {
            return Err(EvalError::ArityMismatch {
                predicate: self.predicate.clone(),
                expected: self.predicate.arity,
                found: other.predicate.arity,
            });
        }
        let before = self.facts.len();
        self.facts.extend(other.facts.iter().cloned());
        Ok(self.facts.len() - before)
    }

    /// Facts of `self` that are not in `other`
    #[must_use]
    pub fn difference(&self, other: &Relation) -> Relation {
        Relation {
            predicate: self.predicate.clone(),
            facts: self.facts.difference(&other.facts).cloned().collect(),
        }
    }

    /// Whether every fact of `self` is also in `other`
    #[must_use]
    pub fn is_subset(&self, other: &Relation) -> bool {
        self.facts.is_subset(&other.facts)
    }

    /// Whether `fact` is present
    #[must_use]
    pub fn contains(&self, fact: &Fact) -> bool {
        self.facts.contains(fact)
    }

    /// Number of facts
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Whether the relation has no facts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Iterate over the facts in insertion order
    pub fn iter(&self) -> indexmap::set::Iter<'_, Fact> {
        self.facts.iter()
    }

    /// The facts sorted, for deterministic output
    #[must_use]
    pub fn sorted(&self) -> Vec<Fact> {
        let mut facts: Vec<Fact> = self.facts.iter().cloned().collect();
        facts.sort();
        facts
    }
}

impl<'a> IntoIterator for &'a Relation {
    type Item = &'a Fact;
    type IntoIter = indexmap::set::Iter<'a, Fact>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RelationRepr {
    predicate: Predicate,
    facts: Vec<Fact>,
}

#[cfg(feature = "serde")]
impl TryFrom<RelationRepr> for Relation {
    type Error = EvalError;

    fn try_from(repr: RelationRepr) -> Result<Self> {
        let mut relation = Relation::new(repr.predicate);
        for fact in repr.facts {
            relation.insert(fact)?;
        }
        Ok(relation)
    }
}

/// A mapping from predicates to their relations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(into = "Vec<Relation>", try_from = "Vec<Relation>")
)]
pub struct Database {
    relations: IndexMap<Predicate, Relation>,
}

impl Database {
    /// Create an empty database
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a database from `(predicate, fact)` pairs
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ArityMismatch`] for a fact of the wrong length.
    pub fn from_facts<I>(facts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Predicate, Fact)>,
    {
        let mut database = Self::new();
        for (predicate, fact) in facts {
            database.insert(&predicate, fact)?;
        }
        Ok(database)
    }

    /// Adds a single fact under `predicate`.
    /// Returns true if the fact was not already present.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ArityMismatch`] for a fact of the wrong length.
    pub fn insert(&mut self, predicate: &Predicate, fact: Fact) -> Result<bool> {
        if fact.len() != predicate.arity {
            return Err(EvalError::ArityMismatch {
                predicate: predicate.clone(),
                expected: predicate.arity,
                found: fact.len(),
            });
        }
        self.relations
            .entry(predicate.clone())
            .or_insert_with(|| Relation::new(predicate.clone()))
            .insert(fact)
    }

    /// Merges a whole relation into the entry for its predicate.
    /// Returns how many facts were new.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ArityMismatch`] if the relation's arity differs
    /// from its predicate's.
    pub fn insert_relation(&mut self, relation: &Relation) -> Result<usize> {
        let predicate = relation.predicate();
        if let Some(existing) = self.relations.get_mut(predicate) {
            return existing.union_with(relation);
        }
        let mut fresh = Relation::new(predicate.clone());
        let added = fresh.union_with(relation)?;
        self.relations.insert(predicate.clone(), fresh);
        Ok(added)
    }

    /// Make sure `predicate` has a (possibly empty) relation
    pub fn ensure(&mut self, predicate: &Predicate) {
        self.relations
            .entry(predicate.clone())
            .or_insert_with(|| Relation::new(predicate.clone()));
    }

    /// The relation of `predicate`, if one is stored
    #[must_use]
    pub fn get(&self, predicate: &Predicate) -> Option<&Relation> {
        self.relations.get(predicate)
    }

    /// Whether `fact` is stored under `predicate`
    #[must_use]
    pub fn contains(&self, predicate: &Predicate, fact: &Fact) -> bool {
        self.get(predicate)
            .is_some_and(|relation| relation.contains(fact))
    }

    /// Merge all relations of `other` into `self`, returning how many facts
    /// were new
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ArityMismatch`] if a relation's arity is
    /// inconsistent with its predicate.
    pub fn merge(&mut self, other: &Database) -> Result<usize> {
        let mut added = 0;
        for relation in other.relations.values() {
            added += self.insert_relation(relation)?;
        }
        Ok(added)
    }

    /// A new database holding the facts of both `self` and `other`
    ///
    /// # Errors
    ///
    /// See [`Database::merge`].
    pub fn union(&self, other: &Database) -> Result<Database> {
        let mut combined = self.clone();
        combined.merge(other)?;
        Ok(combined)
    }

    /// A new database with one entry per predicate in `predicates`, empty
    /// when `self` has no facts for it
    #[must_use]
    pub fn restrict_to<'a, I>(&self, predicates: I) -> Database
    where
        I: IntoIterator<Item = &'a Predicate>,
    {
        let relations = predicates
            .into_iter()
            .map(|predicate| {
                let relation = self
                    .get(predicate)
                    .cloned()
                    .unwrap_or_else(|| Relation::new(predicate.clone()));
                (predicate.clone(), relation)
            })
            .collect();
        Database { relations }
    }

    /// Whether every fact of `self` is also in `other`
    #[must_use]
    pub fn is_subset(&self, other: &Database) -> bool {
        self.relations.iter().all(|(predicate, relation)| {
            relation.is_empty()
                || other
                    .get(predicate)
                    .is_some_and(|theirs| relation.is_subset(theirs))
        })
    }

    /// Total number of facts across all relations
    #[must_use]
    pub fn total_facts(&self) -> usize {
        self.relations.values().map(Relation::len).sum()
    }

    /// Predicates with an entry, in insertion order
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.relations.keys()
    }

    /// Iterate over `(predicate, relation)` entries
    pub fn iter(&self) -> indexmap::map::Iter<'_, Predicate, Relation> {
        self.relations.iter()
    }

    /// Number of predicate entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    /// Whether there are no predicate entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

impl<'a> IntoIterator for &'a Database {
    type Item = (&'a Predicate, &'a Relation);
    type IntoIter = indexmap::map::Iter<'a, Predicate, Relation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(feature = "serde")]
impl From<Database> for Vec<Relation> {
    fn from(database: Database) -> Self {
        database.relations.into_values().collect()
    }
}

#[cfg(feature = "serde")]
impl TryFrom<Vec<Relation>> for Database {
    type Error = EvalError;

    fn try_from(relations: Vec<Relation>) -> Result<Self> {
        let mut database = Database::new();
        for relation in &relations {
            database.insert_relation(relation)?;
        }
        Ok(database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> Predicate {
        Predicate::new("parent", 2)
    }

    #[test]
    fn test_predicate_equality_uses_name_and_arity() {
        assert_eq!(Predicate::new("p", 2), Predicate::new("p", 2));
        assert_ne!(Predicate::new("p", 2), Predicate::new("p", 3));
        assert_ne!(Predicate::new("p", 2), Predicate::new("q", 2));
    }

    #[test]
    fn test_relation_rejects_wrong_length() {
        let mut relation = Relation::new(parent());
        assert_eq!(relation.insert(Fact::new(["a", "b"])), Ok(true));
        assert_eq!(relation.insert(Fact::new(["a", "b"])), Ok(false));

        let err = relation.insert(Fact::new(["a", "b", "c"])).unwrap_err();
        assert_eq!(
            err,
            EvalError::ArityMismatch {
                predicate: parent(),
                expected: 2,
                found: 3,
            }
        );
        assert_eq!(relation.len(), 1);
    }

    #[test]
    fn test_atom_arity_check() {
        let good = Atom::new(parent(), [Term::var("x"), Term::var("y")]);
        assert!(good.check_arity().is_ok());

        let bad = Atom::new(parent(), [Term::var("x")]);
        assert!(matches!(
            bad.check_arity(),
            Err(EvalError::ArityMismatch {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_rule_validation_rejects_unbound_head_variable() {
        let rule = Rule::new(
            Atom::new(Predicate::new("result", 2), [Term::var("x"), Term::var("y")]),
            [Atom::new(Predicate::new("person", 1), [Term::var("x")])],
        );

        match rule.validate() {
            Err(EvalError::UnboundHeadVariable { term, .. }) => assert_eq!(term, "y"),
            other => panic!("expected unbound head variable, got {other:?}"),
        }
    }

    #[test]
    fn test_rule_validation_rejects_head_constant() {
        let rule = Rule::new(
            Atom::new(parent(), [Term::var("x"), Term::constant("bob")]),
            [Atom::new(parent(), [Term::var("x"), Term::var("y")])],
        );

        assert!(matches!(
            rule.validate(),
            Err(EvalError::UnboundHeadVariable { ref term, .. }) if term == "bob"
        ));
    }

    #[test]
    fn test_rule_validation_rejects_empty_body_with_variables() {
        let rule = Rule::new(
            Atom::new(Predicate::new("always", 1), [Term::var("x")]),
            [],
        );
        assert!(matches!(
            rule.validate(),
            Err(EvalError::UnboundHeadVariable { .. })
        ));
    }

    #[test]
    fn test_failed_insert_leaves_database_untouched() {
        let mut db = Database::new();
        assert!(db.insert(&parent(), Fact::new(["a"])).is_err());
        assert!(db.is_empty());
        assert_eq!(db, Database::new());
    }

    #[test]
    fn test_repeated_variable_detection() {
        let repeated = Atom::new(parent(), [Term::var("x"), Term::var("x")]);
        let distinct = Atom::new(parent(), [Term::var("x"), Term::var("y")]);
        let constants = Atom::new(parent(), [Term::constant("a"), Term::constant("a")]);
        assert!(repeated.has_repeated_variable());
        assert!(!distinct.has_repeated_variable());
        assert!(!constants.has_repeated_variable());
    }

    #[test]
    fn test_database_restrict_adds_missing_predicates() {
        let mut db = Database::new();
        db.insert(&parent(), Fact::new(["a", "b"])).unwrap();

        let ancestor = Predicate::new("ancestor", 2);
        let restricted = db.restrict_to([&ancestor]);

        assert_eq!(restricted.len(), 1);
        assert!(restricted.get(&ancestor).is_some_and(Relation::is_empty));
        assert!(restricted.get(&parent()).is_none());
    }

    #[test]
    fn test_database_union_and_subset() {
        let left = Database::from_facts([(parent(), Fact::new(["a", "b"]))]).unwrap();
        let right = Database::from_facts([(parent(), Fact::new(["b", "c"]))]).unwrap();

        let both = left.union(&right).unwrap();
        assert_eq!(both.total_facts(), 2);
        assert!(left.is_subset(&both));
        assert!(right.is_subset(&both));
        assert!(!both.is_subset(&left));
        // union never touches its inputs
        assert_eq!(left.total_facts(), 1);
    }

    #[test]
    fn test_display() {
        let rule = Rule::new(
            Atom::new(Predicate::new("ancestor", 2), [Term::var("x"), Term::var("z")]),
            [
                Atom::new(Predicate::new("ancestor", 2), [Term::var("x"), Term::var("y")]),
                Atom::new(parent(), [Term::var("y"), Term::constant("bob")]),
            ],
        );
        assert_eq!(
            rule.to_string(),
            "ancestor(x, z) :- ancestor(x, y), parent(y, \"bob\")."
        );
        assert_eq!(Fact::new(["a", "b"]).to_string(), "(a, b)");
        assert_eq!(parent().to_string(), "parent/2");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_database_json_round_trip_checks_arity() {
        let db = Database::from_facts([
            (parent(), Fact::new(["alice", "bob"])),
            (parent(), Fact::new(["bob", "charlie"])),
        ])
        .unwrap();

        let json = serde_json::to_string(&db).unwrap();
        let back: Database = serde_json::from_str(&json).unwrap();
        assert_eq!(back, db);

        let malformed = r#"[{"predicate":{"name":"parent","arity":2},"facts":[["a"]]}]"#;
        assert!(serde_json::from_str::<Database>(malformed).is_err());
    }
}
