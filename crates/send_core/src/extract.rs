// ==============================================================================
// Signature extraction
// ==============================================================================
//
// First pass over a type declaration. Every method that can be routed by its
// argument types is kept, with its signature and arity computed once; every
// other method is reported and dropped, so later passes never see an untyped
// parameter.

use la_arena::{Arena, Idx};
use send_ty::{Arity, MethodDescriptor, TypeDecl, TypeSignature};

use crate::diagnostic::{Diagnostic, DiagnosticKind};

pub type MethodId = Idx<RetainedMethod>;

/// A method that survived extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetainedMethod {
    pub descriptor: MethodDescriptor,
    pub signature: TypeSignature,
    pub arity: Arity,
    /// Position in the declaring `TypeDecl`, used to find the handler again.
    pub decl_index: usize,
}

impl RetainedMethod {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn is_skipped(&self) -> bool {
        self.descriptor.skip
    }
}

#[derive(Debug, Default)]
pub struct Extracted {
    /// Retained methods in declaration order.
    pub methods: Arena<RetainedMethod>,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn extract(decl: &TypeDecl) -> Extracted {
    let mut out = Extracted::default();

    for (decl_index, method) in decl.methods.iter().enumerate() {
        if let Some(kind) = exclusion(method) {
            log::debug!("excluding {method}: {kind}");
            out.diagnostics.push(Diagnostic {
                owner: decl.name.clone(),
                method: method.name.clone(),
                kind,
            });
            continue;
        }

        let Some(signature) = method.signature() else {
            continue;
        };
        out.methods.alloc(RetainedMethod {
            arity: method.arity(),
            descriptor: method.clone(),
            signature,
            decl_index,
        });
    }

    out
}

fn exclusion(method: &MethodDescriptor) -> Option<DiagnosticKind> {
    if let Some(param) = method.first_untyped() {
        return Some(DiagnosticKind::UntypedParameter {
            param: param.name.clone(),
        });
    }

    if method.has_interior_default() {
        let param = method
            .params
            .iter()
            .skip_while(|p| !p.has_default)
            .find(|p| !p.has_default)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        return Some(DiagnosticKind::InteriorDefault { param });
    }

    None
}
