// ==============================================================================
// Compile diagnostics
// ==============================================================================
//
// Non-fatal findings of the compiler. They never stop activation: an excluded
// method is simply not dispatchable, and a large expansion still compiles.
// Fatal problems are `ConfigurationError`s instead.

use std::fmt;

use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub owner: SmolStr,
    pub method: SmolStr,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A parameter without a type restriction. The whole method is left out
    /// of the dispatch tables and the introspection index.
    UntypedParameter { param: SmolStr },
    /// A defaulted parameter followed by a required one.
    InteriorDefault { param: SmolStr },
    /// A signature whose expansion crossed the warning threshold.
    LargeExpansion { count: usize, threshold: usize },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::UntypedParameter { param } => {
                write!(f, "parameter `{param}` has no type restriction; not dispatchable")
            }
            DiagnosticKind::InteriorDefault { param } => write!(
                f,
                "required parameter `{param}` follows a defaulted one; not dispatchable"
            ),
            DiagnosticKind::LargeExpansion { count, threshold } => write!(
                f,
                "signature expands to {count} combinations (warning threshold {threshold})"
            ),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}: {}", self.owner, self.method, self.kind)
    }
}
