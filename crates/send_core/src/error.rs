use miette::Diagnostic;
use send_ty::{Combination, ConcreteTy};
use smol_str::SmolStr;
use thiserror::Error;

/// Fatal problems found while compiling or activating dispatch tables.
/// Every variant is reported before any table becomes visible.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ConfigurationError {
    #[error("dispatch tables were already activated")]
    #[diagnostic(
        code(send::already_activated),
        help("activation is write-once; register every type before the single `activate` call")
    )]
    AlreadyActivated,

    #[error("cannot register `{ty}` after activation")]
    #[diagnostic(code(send::register_after_activation))]
    RegisterAfterActivation { ty: SmolStr },

    #[error("type `{ty}` is registered more than once")]
    #[diagnostic(code(send::duplicate_type))]
    DuplicateType { ty: SmolStr },

    #[error(
        "`{owner}#{name}` is declared more than once for argument types {combination}: \
         {first} and {second}"
    )]
    #[diagnostic(
        code(send::collision),
        help("overloads sharing a name must not overlap in any expanded combination")
    )]
    Collision {
        owner: SmolStr,
        name: SmolStr,
        combination: Combination,
        first: SmolStr,
        second: SmolStr,
    },

    #[error(
        "`{owner}#{name}` cannot use the value-object strategy: `{ty}` has no fixed storage \
         (argument types {combination})"
    )]
    #[diagnostic(
        code(send::unstorable),
        help("mark the method or its type with the closure strategy")
    )]
    Unstorable {
        owner: SmolStr,
        name: SmolStr,
        ty: ConcreteTy,
        combination: Combination,
    },

    #[error("no handler was supplied for `{owner}#{name}`")]
    #[diagnostic(code(send::missing_handler))]
    MissingHandler { owner: SmolStr, name: SmolStr },

    #[error("`{owner}#{name}` expands to {count} combinations, more than the limit of {limit}")]
    #[diagnostic(
        code(send::combination_limit),
        help("narrow the union parameters or raise `max_combinations`")
    )]
    CombinationLimit {
        owner: SmolStr,
        name: SmolStr,
        count: usize,
        limit: usize,
    },
}

/// Raised by the catch-all entry when no table holds a matching method.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error(
    "Can not send to '{name}' on {receiver} with argument types {args}; check that it exists \
     and all of its arguments have type restrictions"
)]
#[diagnostic(code(send::method_missing))]
pub struct MethodMissing {
    pub receiver: SmolStr,
    pub name: SmolStr,
    pub args: Combination,
}
