// ==============================================================================
// Dispatch tables
// ==============================================================================
//
// One table per interned combination, mapping a method name to the single
// method that handles that name for exactly those argument types. Tables are
// built in combination first-seen order, and entries iterate by name.

use std::collections::BTreeMap;

use la_arena::Arena;
use send_ty::{label, Combination};
use smol_str::SmolStr;

use crate::expand::{ComboId, CombinationSet};
use crate::extract::{MethodId, RetainedMethod};
use crate::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTable {
    pub combination: ComboId,
    pub entries: BTreeMap<SmolStr, MethodId>,
}

impl DispatchTable {
    pub fn get(&self, name: &str) -> Option<MethodId> {
        self.entries.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DispatchTables {
    pub combinations: CombinationSet,
    /// Indexed in step with `combinations`: `tables[i]` belongs to the `i`-th
    /// interned combination.
    tables: Vec<DispatchTable>,
}

impl DispatchTables {
    pub fn table(&self, combo: ComboId) -> &DispatchTable {
        &self.tables[slot(combo)]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Combination, &DispatchTable)> + '_ {
        self.tables
            .iter()
            .map(|table| (&self.combinations[table.combination], table))
    }

    /// Tables with at least one entry; only these get a dispatch entry.
    pub fn populated(&self) -> impl Iterator<Item = (&Combination, &DispatchTable)> + '_ {
        self.iter().filter(|(_, table)| !table.is_empty())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn slot(combo: ComboId) -> usize {
    u32::from(combo.into_raw()) as usize
}

/// Build every table for one type. `expansions` lists, in declaration order,
/// each retained method with the combinations its signature expands to.
///
/// Skipped methods still contribute their combinations (possibly leaving a
/// table empty) but never an entry.
pub fn build_tables(
    owner: &SmolStr,
    methods: &Arena<RetainedMethod>,
    expansions: Vec<(MethodId, Vec<Combination>)>,
) -> Result<DispatchTables, ConfigurationError> {
    let mut out = DispatchTables::default();

    for (method_id, combos) in expansions {
        let method = &methods[method_id];

        for combo in combos {
            let combo_id = out.combinations.intern(combo);
            let idx = slot(combo_id);
            if idx == out.tables.len() {
                log::trace!("new table {}", label::table_ident(&out.combinations[combo_id]));
                out.tables.push(DispatchTable {
                    combination: combo_id,
                    entries: BTreeMap::new(),
                });
            }

            if method.is_skipped() {
                continue;
            }

            let table = &mut out.tables[idx];
            if let Some(&existing) = table.entries.get(method.name()) {
                if existing != method_id {
                    return Err(ConfigurationError::Collision {
                        owner: owner.clone(),
                        name: method.descriptor.name.clone(),
                        combination: out.combinations[combo_id].clone(),
                        first: methods[existing].signature.to_string().into(),
                        second: method.signature.to_string().into(),
                    });
                }
                continue;
            }
            table.entries.insert(method.descriptor.name.clone(), method_id);
        }
    }

    Ok(out)
}
