mod collect;

use miette::{Diagnostic, SourceSpan};
use pest::{iterators::Pairs, Parser};
use pest_derive::Parser;
use send_ty::TypeDecl;
use smol_str::SmolStr;
use thiserror::Error;

pub use collect::collect_manifest;

#[derive(Parser)]
#[grammar = "manifest.pest"]
pub struct ManifestParser;

// box the error since pest errors are large
type PestError = Box<pest::error::Error<Rule>>;

pub fn parse_manifest_pairs(source: &str) -> Result<Pairs<'_, Rule>, PestError> {
    Ok(ManifestParser::parse(Rule::manifest, source)?)
}

/// Parse a signature manifest into type declarations, in source order.
pub fn parse_manifest(source: &str) -> Result<Vec<TypeDecl>, ManifestError> {
    let pairs = parse_manifest_pairs(source).map_err(ManifestError::from_pest)?;
    collect_manifest(pairs)
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ManifestError {
    #[error("syntax error: {message}")]
    #[diagnostic(code(send::manifest::syntax))]
    Syntax {
        message: String,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("unknown attribute `{name}`")]
    #[diagnostic(
        code(send::manifest::unknown_attribute),
        help("expected one of `Skip`, `UseClosureStrategy`, `UseValueObjectStrategy`")
    )]
    UnknownAttribute {
        name: SmolStr,
        #[label("not a send attribute")]
        span: SourceSpan,
    },

    #[error("`Skip` can only be applied to methods, not to type `{ty}`")]
    #[diagnostic(code(send::manifest::skip_on_type))]
    SkipOnType {
        ty: SmolStr,
        #[label("remove this attribute")]
        span: SourceSpan,
    },

    #[error("conflicting strategy attributes")]
    #[diagnostic(
        code(send::manifest::conflicting_strategy),
        help("use either `UseClosureStrategy` or `UseValueObjectStrategy`, not both")
    )]
    ConflictingStrategy {
        #[label("second strategy attribute")]
        span: SourceSpan,
    },

    #[error("type `{name}` is declared more than once")]
    #[diagnostic(code(send::manifest::duplicate_type))]
    DuplicateType {
        name: SmolStr,
        #[label("redeclared here")]
        span: SourceSpan,
    },
}

impl ManifestError {
    fn from_pest(err: PestError) -> Self {
        let span = match err.location {
            pest::error::InputLocation::Pos(pos) => SourceSpan::from((pos, 0)),
            pest::error::InputLocation::Span((start, end)) => {
                SourceSpan::from((start, end.saturating_sub(start)))
            }
        };
        ManifestError::Syntax {
            message: err.variant.message().into_owned(),
            span,
        }
    }

    pub fn span(&self) -> SourceSpan {
        match self {
            ManifestError::Syntax { span, .. }
            | ManifestError::UnknownAttribute { span, .. }
            | ManifestError::SkipOnType { span, .. }
            | ManifestError::ConflictingStrategy { span }
            | ManifestError::DuplicateType { span, .. } => *span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use send_ty::{ConcreteTy, Constraint, Param, Strategy};

    #[test]
    fn foo_manifest() {
        let src = indoc! {r#"
            # four methods over Int32 and String
            type Foo {
              def a(val : Int32)
              def b(x : Int32, y : Int32)
              def c(val : Int32, val2 : Int32)
              def d(xx : String, yy : Int32) : UInt128
            }
        "#};

        let decls = parse_manifest(src).expect("No parse error");
        assert_eq!(decls.len(), 1);

        let foo = &decls[0];
        assert_eq!(foo.name, "Foo");
        assert_eq!(foo.strategy, None);
        let names: Vec<_> = foo.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);

        assert_eq!(
            foo.methods[3].params,
            vec![
                Param::typed("xx", Constraint::Concrete(ConcreteTy::String)),
                Param::typed("yy", Constraint::Concrete(ConcreteTy::Int32)),
            ]
        );
        assert!(foo.methods.iter().all(|m| m.owner == "Foo"));
    }

    #[test]
    fn attributes_unions_and_defaults() {
        let src = indoc! {r#"
            @[UseClosureStrategy]
            type Calc {
              def abc(n : Int32)

              @[UseValueObjectStrategy]
              def onetwothree(x : Int::Signed | Int::Unsigned, y : Int::Signed | Int::Unsigned)

              @[Skip]
              def hidden(x)

              def pow(base : Int32, exp : Int32 = default_exp(2, 3))
            }
        "#};

        let decls = parse_manifest(src).expect("No parse error");
        let calc = &decls[0];
        assert_eq!(calc.strategy, Some(Strategy::Closure));

        let onetwothree = &calc.methods[1];
        assert_eq!(onetwothree.strategy, Some(Strategy::ValueObject));
        assert_eq!(
            onetwothree.params[0].constraint,
            Some(Constraint::from_names(["Int::Signed", "Int::Unsigned"]))
        );

        let hidden = &calc.methods[2];
        assert!(hidden.skip);
        assert_eq!(hidden.params, vec![Param::untyped("x")]);

        let pow = &calc.methods[3];
        assert!(!pow.params[0].has_default);
        assert!(pow.params[1].has_default);
    }

    #[test]
    fn defaults_with_brackets_and_literals() {
        let src = indoc! {r#"
            type Foo {
              def f(x : Array(Int32) = [1, 2], y : Int32)
              def g(s : String = "a, b", t : String = "(", u : Char = ',')
              def h(opts : Hash(String, Int32) = {"k" => [3, (4)]}, z : Int32 = f(1, [2]))
            }
        "#};

        let decls = parse_manifest(src).expect("No parse error");
        let arities: Vec<_> = decls[0]
            .methods
            .iter()
            .map(|m| (m.name.as_str(), m.params.len(), m.arity()))
            .collect();
        assert_eq!(
            arities,
            vec![
                ("f", 2, send_ty::Arity::new(1, 2)),
                ("g", 3, send_ty::Arity::new(0, 3)),
                ("h", 2, send_ty::Arity::new(0, 2)),
            ]
        );
        assert_eq!(decls[0].methods[1].params[2].name, "u");
    }

    #[test]
    fn unbalanced_default_is_a_syntax_error() {
        let err = parse_manifest("type Foo {\n  def f(x : Int32 = [1, 2)\n}").unwrap_err();
        assert!(matches!(err, ManifestError::Syntax { .. }), "{err:?}");
    }

    #[test]
    fn operator_methods_and_generic_types() {
        let src = indoc! {r#"
            type Geo::Grid {
              def [](x : Int32, y : Int32)
              def <=>(other : Geo::Grid)
              def empty?()
              def merge!(cells : Hash(String, Array(Int32)))
            }
        "#};

        let decls = parse_manifest(src).expect("No parse error");
        let grid = &decls[0];
        assert_eq!(grid.name, "Geo::Grid");

        let names: Vec<_> = grid.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["[]", "<=>", "empty?", "merge!"]);
        assert!(grid.methods[2].params.is_empty());
        assert_eq!(
            grid.methods[3].params[0].constraint,
            Some(Constraint::Concrete(ConcreteTy::Named(
                "Hash(String,Array(Int32))".into()
            )))
        );
    }

    #[test]
    fn syntax_error_has_span() {
        let err = parse_manifest("type Foo {\n  def a(val : )\n}").unwrap_err();
        assert!(matches!(err, ManifestError::Syntax { .. }), "{err:?}");
        assert!(err.span().offset() > 10);
    }

    #[test]
    fn unknown_attribute_rejected() {
        let err = parse_manifest("type Foo {\n  @[Sometimes]\n  def a(val : Int32)\n}").unwrap_err();
        assert_eq!(
            err,
            ManifestError::UnknownAttribute {
                name: "Sometimes".into(),
                span: (15, 9).into(),
            }
        );
    }

    #[test]
    fn skip_on_type_rejected() {
        let err = parse_manifest("@[Skip]\ntype Foo {}").unwrap_err();
        assert!(matches!(err, ManifestError::SkipOnType { .. }), "{err:?}");
    }

    #[test]
    fn conflicting_strategies_rejected() {
        let src = "type Foo {\n@[UseClosureStrategy] @[UseValueObjectStrategy] def a(x : Int32)\n}";
        let err = parse_manifest(src).unwrap_err();
        assert!(matches!(err, ManifestError::ConflictingStrategy { .. }), "{err:?}");
    }

    #[test]
    fn duplicate_type_rejected() {
        let err = parse_manifest("type Foo {}\ntype Foo {}").unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateType { .. }), "{err:?}");
    }
}
