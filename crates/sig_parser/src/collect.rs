use pest::iterators::{Pair, Pairs};
use rustc_hash::FxHashSet;
use send_ty::{ConcreteTy, Constraint, MethodDescriptor, Param, Strategy, TypeDecl};
use smol_str::SmolStr;

use crate::{ManifestError, Rule};

#[derive(Debug, Default)]
struct Attributes {
    strategy: Option<Strategy>,
    skip: Option<miette::SourceSpan>,
}

fn span_of(pair: &Pair<Rule>) -> miette::SourceSpan {
    let span = pair.as_span();
    (span.start(), span.end() - span.start()).into()
}

pub fn collect_manifest(pairs: Pairs<Rule>) -> Result<Vec<TypeDecl>, ManifestError> {
    let mut decls = Vec::new();
    let mut seen: FxHashSet<SmolStr> = FxHashSet::default();

    for pair in pairs {
        match pair.as_rule() {
            Rule::manifest => {
                for inner in pair.into_inner() {
                    if inner.as_rule() != Rule::type_decl {
                        continue;
                    }
                    let span = span_of(&inner);
                    let decl = collect_type_decl(inner)?;
                    if !seen.insert(decl.name.clone()) {
                        return Err(ManifestError::DuplicateType {
                            name: decl.name,
                            span,
                        });
                    }
                    decls.push(decl);
                }
            }
            Rule::EOI => {}
            _ => unreachable!("collect_manifest: unexpected rule {:?}", pair.as_rule()),
        }
    }

    Ok(decls)
}

fn collect_type_decl(pair: Pair<Rule>) -> Result<TypeDecl, ManifestError> {
    let mut attrs = Attributes::default();
    let mut decl = TypeDecl::new("");

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::attribute => collect_attribute(inner, &mut attrs)?,
            Rule::kw_type => {}
            Rule::type_path => decl.name = inner.as_str().into(),
            Rule::method => {
                let method = collect_method(inner, &decl.name)?;
                decl.methods.push(method);
            }
            _ => unreachable!("collect_type_decl: unexpected rule {:?}", inner.as_rule()),
        }
    }

    if let Some(span) = attrs.skip {
        return Err(ManifestError::SkipOnType {
            ty: decl.name,
            span,
        });
    }
    decl.strategy = attrs.strategy;

    Ok(decl)
}

fn collect_attribute(pair: Pair<Rule>, attrs: &mut Attributes) -> Result<(), ManifestError> {
    let Some(name) = pair.into_inner().find(|p| p.as_rule() == Rule::attr_name) else {
        return Ok(());
    };
    let span = span_of(&name);

    let strategy = match name.as_str() {
        "Skip" => {
            attrs.skip = Some(span);
            return Ok(());
        }
        "UseClosureStrategy" => Strategy::Closure,
        "UseValueObjectStrategy" => Strategy::ValueObject,
        other => {
            return Err(ManifestError::UnknownAttribute {
                name: other.into(),
                span,
            })
        }
    };

    if attrs.strategy.is_some() {
        return Err(ManifestError::ConflictingStrategy { span });
    }
    attrs.strategy = Some(strategy);
    Ok(())
}

fn collect_method(pair: Pair<Rule>, owner: &SmolStr) -> Result<MethodDescriptor, ManifestError> {
    let mut attrs = Attributes::default();
    let mut name = SmolStr::default();
    let mut params = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::attribute => collect_attribute(inner, &mut attrs)?,
            Rule::kw_def | Rule::return_ty => {}
            Rule::method_name => name = inner.as_str().into(),
            Rule::params => {
                params = inner
                    .into_inner()
                    .filter(|p| p.as_rule() == Rule::param)
                    .map(collect_param)
                    .collect();
            }
            _ => unreachable!("collect_method: unexpected rule {:?}", inner.as_rule()),
        }
    }

    let mut method = MethodDescriptor::new(owner.clone(), name, params);
    method.strategy = attrs.strategy;
    method.skip = attrs.skip.is_some();
    Ok(method)
}

fn collect_param(pair: Pair<Rule>) -> Param {
    let mut param = Param::untyped("");

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => param.name = inner.as_str().into(),
            Rule::type_expr => param.constraint = Some(collect_type_expr(inner)),
            Rule::default => param.has_default = true,
            _ => unreachable!("collect_param: unexpected rule {:?}", inner.as_rule()),
        }
    }

    param
}

/// `type_name ("|" type_name)*`. A single member collapses to a concrete
/// constraint.
fn collect_type_expr(pair: Pair<Rule>) -> Constraint {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::type_name)
        .map(|p| ConcreteTy::parse(p.as_str()))
        .collect()
}
