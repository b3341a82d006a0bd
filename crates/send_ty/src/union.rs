use std::collections::BTreeSet;
use std::fmt;

use derive_more::Debug;

/// An ordered, de-duplicated set of union members.
///
/// Iteration order is the members' `Ord` order, which is what makes union
/// expansion deterministic regardless of how the union was written.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[debug("Union({set:?})")]
pub struct Union<R: Ord> {
    set: BTreeSet<R>,
}

impl<R: Ord> Union<R> {
    pub fn new() -> Self {
        Self {
            set: BTreeSet::new(),
        }
    }

    /// Member at a given position in iteration order.
    pub fn nth(&self, idx: usize) -> Option<&R> {
        self.set.iter().nth(idx)
    }

    pub fn iter(&self) -> std::collections::btree_set::Iter<'_, R> {
        self.set.iter()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Unwrap a one-member union into its member.
    pub fn into_single(mut self) -> Result<R, Self> {
        if self.set.len() == 1 {
            if let Some(only) = self.set.pop_first() {
                return Ok(only);
            }
        }
        Err(self)
    }
}

impl<R: Ord> FromIterator<R> for Union<R> {
    fn from_iter<T: IntoIterator<Item = R>>(iter: T) -> Self {
        let set: BTreeSet<R> = iter.into_iter().collect();

        Self { set }
    }
}

impl<R: Ord, const N: usize> From<[R; N]> for Union<R> {
    fn from(value: [R; N]) -> Self {
        let set: BTreeSet<R> = value.into();

        Self { set }
    }
}

impl<'a, R: Ord> IntoIterator for &'a Union<R> {
    type Item = &'a R;
    type IntoIter = std::collections::btree_set::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.set.iter()
    }
}

impl<R: Ord + fmt::Display> fmt::Display for Union<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, m) in self.set.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{m}")?;
        }
        Ok(())
    }
}
