use crate::{Combination, ConcreteTy, Constraint, TypeSignature};
use proptest::{
    prelude::{any, prop, prop_oneof, Arbitrary, BoxedStrategy, Just, Strategy},
    prop_compose,
};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy)]
pub struct SignatureParams {
    pub max_width: usize,
    pub max_union: usize,
}

impl Default for SignatureParams {
    fn default() -> Self {
        // keeps the worst case at 4^4 = 256 combinations
        Self {
            max_width: 4,
            max_union: 4,
        }
    }
}

pub fn arb_builtin() -> impl Strategy<Value = ConcreteTy> {
    prop_oneof![
        Just(ConcreteTy::Nil),
        Just(ConcreteTy::Bool),
        Just(ConcreteTy::Char),
        Just(ConcreteTy::Int8),
        Just(ConcreteTy::Int32),
        Just(ConcreteTy::Int64),
        Just(ConcreteTy::UInt8),
        Just(ConcreteTy::UInt128),
        Just(ConcreteTy::Float32),
        Just(ConcreteTy::Float64),
        Just(ConcreteTy::String),
        Just(ConcreteTy::Symbol),
    ]
    .boxed()
}

prop_compose! {
    // user type names, including the punctuation generic and namespaced
    // names bring along
    pub fn arb_type_name()(name in "[A-Z][a-z]{0,6}((::|_)[A-Z][a-z]{0,4})?(\\([A-Z][a-z]{0,4}\\))?") -> SmolStr {
        name.into()
    }
}

impl Arbitrary for ConcreteTy {
    type Parameters = ();
    type Strategy = BoxedStrategy<ConcreteTy>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            4 => arb_builtin(),
            1 => arb_type_name().prop_map(|name| ConcreteTy::parse(&name)),
        ]
        .boxed()
    }
}

pub fn arb_constraint(max_union: usize) -> impl Strategy<Value = Constraint> {
    prop::collection::vec(any::<ConcreteTy>(), 1..=max_union.max(1))
        .prop_map(|members| members.into_iter().collect::<Constraint>())
}

impl Arbitrary for Constraint {
    type Parameters = SignatureParams;
    type Strategy = BoxedStrategy<Constraint>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        arb_constraint(args.max_union).boxed()
    }
}

impl Arbitrary for TypeSignature {
    type Parameters = SignatureParams;
    type Strategy = BoxedStrategy<TypeSignature>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        prop::collection::vec(arb_constraint(args.max_union), 0..=args.max_width)
            .prop_map(TypeSignature::new)
            .boxed()
    }
}

impl Arbitrary for Combination {
    type Parameters = SignatureParams;
    type Strategy = BoxedStrategy<Combination>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        prop::collection::vec(any::<ConcreteTy>(), 0..=args.max_width)
            .prop_map(Combination::new)
            .boxed()
    }
}
