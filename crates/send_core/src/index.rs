use la_arena::Arena;
use rustc_hash::FxHashMap;
use send_ty::Arity;
use smol_str::SmolStr;

use crate::extract::RetainedMethod;

/// Arity of every overload sharing one name, and their aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArityRecord {
    pub arity: Arity,
    pub overloads: Vec<Arity>,
}

/// Per-name arity and existence, independent of the dispatch tables.
///
/// A name is present exactly when at least one retained method carries it.
/// Whether skip-marked methods count is decided when the index is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntrospectionIndex {
    records: FxHashMap<SmolStr, ArityRecord>,
}

impl IntrospectionIndex {
    pub fn build(methods: &Arena<RetainedMethod>, include_skipped: bool) -> Self {
        let mut records: FxHashMap<SmolStr, ArityRecord> = FxHashMap::default();

        for (_, method) in methods.iter() {
            if method.is_skipped() && !include_skipped {
                continue;
            }
            records
                .entry(method.descriptor.name.clone())
                .and_modify(|record| {
                    record.arity = record.arity.merge(method.arity);
                    record.overloads.push(method.arity);
                })
                .or_insert_with(|| ArityRecord {
                    arity: method.arity,
                    overloads: vec![method.arity],
                });
        }

        Self { records }
    }

    pub fn arity_of(&self, name: &str) -> Option<Arity> {
        self.records.get(name).map(|r| r.arity)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn record(&self, name: &str) -> Option<&ArityRecord> {
        self.records.get(name)
    }

    /// Names in sorted order.
    pub fn names(&self) -> Vec<&SmolStr> {
        let mut names: Vec<_> = self.records.keys().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
