pub mod callsite;
pub mod diagnostic;
mod dispatch;
mod error;
pub mod expand;
pub mod extract;
pub mod handler;
pub mod index;
mod plan;
pub mod registry;
pub mod table;

#[cfg(test)]
mod tests;

#[cfg(test)]
mod pbt;

use rustc_hash::FxHashMap;
use send_ty::{label, Strategy, TypeDecl};

pub use callsite::CallSite;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use dispatch::{Bound, DispatchEntry, Dispatchable, Dispatcher, Participant};
pub use error::{ConfigurationError, MethodMissing};
pub use handler::{Handler, IntoOutcome};
pub use index::{ArityRecord, IntrospectionIndex};
pub use plan::DispatchPlan;
pub use registry::{MethodSpec, Registry, State, TypeSpec};

use crate::expand::expand;
use crate::extract::{extract, RetainedMethod};

/// Knobs for one compile pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Used for methods whose type and declaration set no strategy.
    pub default_strategy: Strategy,
    /// Keep skip-marked methods visible to `arity_of` and `exists`.
    pub introspect_skipped: bool,
    /// Expansions above this many combinations are reported.
    pub combination_warning: usize,
    /// Expansions above this many combinations are rejected.
    pub max_combinations: Option<usize>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            default_strategy: Strategy::ValueObject,
            introspect_skipped: true,
            combination_warning: 64,
            max_combinations: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Compiled {
    pub plan: DispatchPlan,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the whole build pass for one type: extraction, union expansion, table
/// construction, strategy resolution and the introspection index.
///
/// Any `ConfigurationError` aborts the pass; nothing partial is returned.
pub fn compile(decl: &TypeDecl, options: &CompileOptions) -> Result<Compiled, ConfigurationError> {
    let extracted = extract(decl);
    let mut diagnostics = extracted.diagnostics;
    let methods = extracted.methods;

    let mut expansions = Vec::with_capacity(methods.len());
    for (id, method) in methods.iter() {
        let count = method.signature.combination_count();
        if let Some(limit) = options.max_combinations {
            if count > limit {
                return Err(ConfigurationError::CombinationLimit {
                    owner: decl.name.clone(),
                    name: method.descriptor.name.clone(),
                    count,
                    limit,
                });
            }
        }
        if count > options.combination_warning {
            log::warn!(
                "{}#{} expands to {count} combinations",
                decl.name,
                method.descriptor.name
            );
            diagnostics.push(Diagnostic {
                owner: decl.name.clone(),
                method: method.descriptor.name.clone(),
                kind: DiagnosticKind::LargeExpansion {
                    count,
                    threshold: options.combination_warning,
                },
            });
        }
        expansions.push((id, expand(&method.signature)));
    }

    let tables = table::build_tables(&decl.name, &methods, expansions)?;

    let mut strategies = FxHashMap::default();
    for (id, method) in methods.iter() {
        if method.is_skipped() {
            continue;
        }
        strategies.insert(id, resolve_strategy(method, decl, options));
    }

    // a value-object site must have storage for every position it serves
    for (combo, table) in tables.populated() {
        for &id in table.entries.values() {
            if strategies.get(&id) != Some(&Strategy::ValueObject) {
                continue;
            }
            if let Err(ty) = callsite::record_layout(combo) {
                return Err(ConfigurationError::Unstorable {
                    owner: decl.name.clone(),
                    name: methods[id].descriptor.name.clone(),
                    ty,
                    combination: combo.clone(),
                });
            }
        }
    }

    let index = IntrospectionIndex::build(&methods, options.introspect_skipped);

    log::debug!(
        "compiled {}: {} methods, {} combinations",
        decl.name,
        methods.len(),
        tables.len()
    );
    for (combo, _) in tables.populated() {
        log::trace!("{}: {}", decl.name, label::table_ident(combo));
    }

    Ok(Compiled {
        plan: DispatchPlan {
            owner: decl.name.clone(),
            methods,
            tables,
            strategies,
            index,
        },
        diagnostics,
    })
}

/// Method override, then type override, then the global default.
pub fn resolve_strategy(
    method: &RetainedMethod,
    decl: &TypeDecl,
    options: &CompileOptions,
) -> Strategy {
    method
        .descriptor
        .strategy
        .or(decl.strategy)
        .unwrap_or(options.default_strategy)
}
