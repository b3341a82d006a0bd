// ==============================================================================
// Property-Based Tests for the Dispatch Compiler
// ==============================================================================
//
// Random signatures (up to 4 positions, unions of up to 4 members) drive the
// expander and the labeler; random argument values drive sends through the
// activated `Foo` dispatcher from `tests.rs`.

use proptest::prelude::{
    any, any_with, prop, prop_assert, prop_assert_eq, prop_assert_ne, prop_assume, proptest,
    ProptestConfig,
};
use rustc_hash::FxHashSet;
use send_ty::arbitrary::{arb_builtin, SignatureParams};
use send_ty::{
    label, Combination, Constraint, MethodDescriptor, Param, TypeDecl, TypeSignature, Value,
};

use crate::expand::expand;
use crate::tests::{activated, Foo};
use crate::{compile, CompileOptions};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256, .. ProptestConfig::default()
    })]

    #[test]
    fn test_expansion_is_the_full_product(sig in any_with::<TypeSignature>(SignatureParams::default())) {
        let combos = expand(&sig);
        prop_assert_eq!(combos.len(), sig.combination_count());
        for combo in &combos {
            prop_assert_eq!(combo.len(), sig.len());
            prop_assert!(combo.instantiates(&sig));
        }
    }

    #[test]
    fn test_expansion_order_is_stable(sig in any_with::<TypeSignature>(SignatureParams::default())) {
        let combos = expand(&sig);
        // rightmost-fastest over sorted members is lexicographic order, which
        // also rules out duplicates
        prop_assert!(combos.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(combos, expand(&sig));
    }

    #[test]
    fn test_combination_labels_are_injective(
        a in any_with::<Combination>(SignatureParams::default()),
        b in any_with::<Combination>(SignatureParams::default()),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(label::combination_label(&a), label::combination_label(&b));
    }

    #[test]
    fn test_labels_are_identifiers(
        sig in any_with::<TypeSignature>(SignatureParams::default()),
        method in "[a-z_]{1,6}[?!=]?",
    ) {
        let ident = label::callsite_ident(&method, &sig);
        prop_assert!(label::is_identifier_safe(&ident), "{}", ident);
        for combo in expand(&sig) {
            let table = label::table_ident(&combo);
            prop_assert!(label::is_identifier_safe(&table), "{}", table);
        }
    }

    #[test]
    fn test_union_gives_one_table_per_member(
        members in prop::collection::btree_set(arb_builtin(), 1..=6),
    ) {
        let constraint: Constraint = members.iter().cloned().collect();
        let decl = TypeDecl::new("T").method(MethodDescriptor::new(
            "T",
            "f",
            vec![Param::typed("x", constraint)],
        ));

        let compiled = compile(&decl, &CompileOptions::default()).unwrap();
        prop_assert_eq!(compiled.plan.tables.len(), members.len());

        let seen: FxHashSet<Combination> = compiled
            .plan
            .tables
            .populated()
            .map(|(combo, _)| combo.clone())
            .collect();
        prop_assert_eq!(seen.len(), members.len());
    }

    #[test]
    fn test_send_matches_direct_call(val in -100_000i32..100_000, x in any::<i16>(), y in any::<i16>()) {
        let (_, dispatcher) = activated();
        let mut sent = Foo::default();

        prop_assert_eq!(
            dispatcher.invoke(&mut sent, "a", &[val.into()]),
            Ok(Value::from(val + 7))
        );
        let (x, y) = (i32::from(x), i32::from(y));
        prop_assert_eq!(
            dispatcher.invoke(&mut sent, "b", &[x.into(), y.into()]),
            Ok(Value::from(x * y))
        );
        prop_assert_eq!(sent.calls, 1);
    }
}
