use std::fmt;

use la_arena::Arena;
use rustc_hash::FxHashMap;
use send_ty::{label, Strategy};
use smol_str::SmolStr;

use crate::extract::{MethodId, RetainedMethod};
use crate::index::IntrospectionIndex;
use crate::table::DispatchTables;

/// Everything the compiler decided for one type, without any handlers
/// attached. A `Dispatcher` is this plus the call-sites.
#[derive(Debug, Clone)]
pub struct DispatchPlan {
    pub owner: SmolStr,
    pub methods: Arena<RetainedMethod>,
    pub tables: DispatchTables,
    /// Resolved strategy of every non-skipped method.
    pub strategies: FxHashMap<MethodId, Strategy>,
    pub index: IntrospectionIndex,
}

impl DispatchPlan {
    pub fn strategy_of(&self, method: MethodId) -> Strategy {
        self.strategies.get(&method).copied().unwrap_or_default()
    }

    /// Number of dispatch entries, i.e. populated tables.
    pub fn entry_count(&self) -> usize {
        self.tables.populated().count()
    }
}

impl fmt::Display for DispatchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "type {} ({} combinations, {} entries)",
            self.owner,
            self.tables.len(),
            self.entry_count()
        )?;

        for (combo, table) in self.tables.populated() {
            writeln!(f, "  {} {combo}", label::table_ident(combo))?;
            for (name, &method) in &table.entries {
                let retained = &self.methods[method];
                writeln!(
                    f,
                    "    {name} -> {} [{}]",
                    label::callsite_ident(name, &retained.signature),
                    self.strategy_of(method)
                )?;
            }
        }

        if !self.index.is_empty() {
            writeln!(f, "  arity")?;
            for name in self.index.names() {
                if let Some(arity) = self.index.arity_of(name) {
                    writeln!(f, "    {name} {arity}")?;
                }
            }
        }

        Ok(())
    }
}
