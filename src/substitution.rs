use std::collections::BTreeMap;

use indexmap::IndexSet;

/// Variable bindings produced while evaluating a rule body
///
/// Ordered by variable name so that equal bindings hash equally and can be
/// collected into a [`SubstitutionSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Substitution {
    bindings: BTreeMap<String, String>,
}

/// A duplicate-free collection of substitutions
pub type SubstitutionSet = IndexSet<Substitution>;

/// The set holding only the empty substitution, the identity for [`join`]
#[must_use]
pub fn identity() -> SubstitutionSet {
    IndexSet::from([Substitution::new()])
}

impl Substitution {
    /// Create an empty substitution
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The value bound to `variable`
    #[must_use]
    pub fn get(&self, variable: &str) -> Option<&str> {
        self.bindings.get(variable).map(String::as_str)
    }

    /// Binds `variable` to `value`.
    /// Returns the previously bound value when it differs, leaving the
    /// existing binding in place.
    pub fn bind(&mut self, variable: &str, value: &str) -> Option<String> {
        match self.bindings.get(variable) {
            Some(bound) if bound == value => None,
            Some(bound) => Some(bound.clone()),
            None => {
                self.bindings.insert(variable.to_string(), value.to_string());
                None
            }
        }
    }

    /// Number of bound variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate over `(variable, value)` pairs ordered by variable
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(variable, value)| (variable.as_str(), value.as_str()))
    }

    /// Union of both bindings, or `None` when a shared variable disagrees
    #[must_use]
    pub fn merge(&self, other: &Substitution) -> Option<Substitution> {
        // walk the smaller side
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };

        let mut merged = large.clone();
        for (variable, value) in small.iter() {
            if merged.bind(variable, value).is_some() {
                return None;
            }
        }
        Some(merged)
    }
}

impl<K, V> FromIterator<(K, V)> for Substitution
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(variable, value)| (variable.into(), value.into()))
                .collect(),
        }
    }
}

/// Every compatible merge of one substitution from `lhs` with one from `rhs`
///
/// Two substitutions are compatible when they agree on all shared variables.
/// Pairs are compared exhaustively.
#[must_use]
pub fn join(lhs: &SubstitutionSet, rhs: &SubstitutionSet) -> SubstitutionSet {
    lhs.iter()
        .flat_map(|left| rhs.iter().filter_map(move |right| left.merge(right)))
        .collect()
}
