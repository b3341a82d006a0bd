use std::sync::{Arc, OnceLock};

use indoc::indoc;
use send_ty::{
    combo, AnyObject, Arity, ConcreteTy, Float, Int, Number, Or, SignedInt, Strategy, Symbol,
    UnsignedInt, Value,
};
use smol_str::SmolStr;
use thiserror::Error;

use crate::{
    compile, CompileOptions, ConfigurationError, DiagnosticKind, Dispatchable, Dispatcher,
    MethodMissing, MethodSpec, Participant, Registry, State, TypeSpec,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FooError {
    #[error(transparent)]
    Missing(#[from] MethodMissing),
    #[error("boom: {0}")]
    Boom(String),
}

#[derive(Debug, Default)]
pub struct Foo {
    pub calls: usize,
}

impl Foo {
    fn a(&mut self, val: i32) -> i32 {
        self.calls += 1;
        val + 7
    }

    fn b(&self, x: i32, y: i32) -> i32 {
        x * y
    }

    fn d(&self, xx: String, yy: i32) -> u128 {
        xx.parse::<u128>().unwrap_or_default().pow(yy as u32)
    }

    fn k(&self, x: Or<i32, String>) -> String {
        match x {
            Or::Left(n) => format!("int {n}"),
            Or::Right(s) => format!("string {s}"),
        }
    }

    fn fail(&self, reason: String) -> Result<i32, FooError> {
        Err(FooError::Boom(reason))
    }

    fn hidden(&mut self, _x: i32) -> bool {
        true
    }
}

pub fn foo_spec() -> TypeSpec<Foo, FooError> {
    TypeSpec::new("Foo")
        .handler("a", Foo::a)
        .handler("b", Foo::b)
        .handler("d", Foo::d)
        .handler("k", Foo::k)
        .handler("fail", Foo::fail)
        .method(MethodSpec::new("hidden", Foo::hidden).skip())
        .method(
            MethodSpec::new("pow", |_: &Foo, base: i32, exp: i32, _m: i32| base.pow(exp as u32))
                .params(["base", "exp", "modulus"])
                .defaults(1),
        )
        .handler("loose", |_: &mut Foo, v: Value| v)
}

pub fn activated() -> (Registry, Arc<Dispatcher<Foo, FooError>>) {
    let mut registry = Registry::new();
    registry.register(foo_spec()).expect("register Foo");
    registry.activate().expect("activate");
    let dispatcher = registry.dispatcher::<Foo, FooError>().expect("Foo is active");
    (registry, dispatcher)
}

#[track_caller]
pub fn expect_invoke(name: &str, args: &[Value], expected: Value) {
    let (_, dispatcher) = activated();
    let mut foo = Foo::default();
    assert_eq!(dispatcher.invoke(&mut foo, name, args), Ok(expected));
}

#[track_caller]
pub fn expect_missing(name: &str, args: &[Value]) {
    let (_, dispatcher) = activated();
    let mut foo = Foo::default();
    let types = args.iter().map(Value::ty).collect();
    assert_eq!(
        dispatcher.invoke(&mut foo, name, args),
        Err(FooError::Missing(MethodMissing {
            receiver: "Foo".into(),
            name: name.into(),
            args: types,
        }))
    );
}

// ==============================================================================
// Sends
// ==============================================================================

#[test]
fn foo_round_trip() {
    expect_invoke("a", &[7.into()], Value::Int32(14));
    expect_invoke("d", &["2".into(), 64.into()], Value::UInt128(1 << 64));
    expect_missing("z", &[7.into()]);
}

#[test]
fn send_matches_direct_call() {
    let (_, dispatcher) = activated();
    let mut sent = Foo::default();
    let mut direct = Foo::default();

    for val in [-3, 0, 41] {
        let value = dispatcher.invoke(&mut sent, "a", &[val.into()]).unwrap();
        assert_eq!(value, Value::from(direct.a(val)));
    }
    assert_eq!(sent.calls, direct.calls);
}

#[test]
fn names_can_be_strings_or_symbols() {
    let (_, dispatcher) = activated();
    let mut foo = Foo::default();
    let args = [Value::from(2), Value::from(3)];

    assert_eq!(dispatcher.invoke(&mut foo, "b", &args), Ok(Value::Int32(6)));
    assert_eq!(dispatcher.invoke(&mut foo, String::from("b"), &args), Ok(Value::Int32(6)));
    assert_eq!(dispatcher.invoke(&mut foo, SmolStr::new("b"), &args), Ok(Value::Int32(6)));
    assert_eq!(dispatcher.invoke(&mut foo, Symbol::new("b"), &args), Ok(Value::Int32(6)));
}

#[test]
fn wrong_argument_types_miss() {
    expect_missing("a", &["7".into()]);
    expect_missing("a", &[7i64.into()]);
    expect_missing("a", &[]);
    // shape outside every known combination: the catch-all
    expect_missing("a", &[1.5f32.into(), Value::Nil, 'c'.into()]);
}

#[test]
fn invoke_or_absent() {
    let (_, dispatcher) = activated();
    let mut foo = Foo::default();

    assert_eq!(dispatcher.invoke_or_absent(&mut foo, "z", &[7.into()]), Ok(None));
    assert_eq!(
        dispatcher.invoke_or_absent(&mut foo, "a", &[7.into()]),
        Ok(Some(Value::Int32(14)))
    );
    assert_eq!(
        dispatcher.invoke_or_absent(&mut foo, "fail", &["nope".into()]),
        Err(FooError::Boom("nope".into()))
    );
}

#[test]
fn method_errors_pass_through() {
    let (_, dispatcher) = activated();
    let mut foo = Foo::default();
    assert_eq!(
        dispatcher.invoke(&mut foo, "fail", &["disk".into()]),
        Err(FooError::Boom("disk".into()))
    );
}

#[test]
fn union_parameter_routes_every_member() {
    let (_, dispatcher) = activated();
    let mut foo = Foo::default();

    let k_combos: Vec<_> = dispatcher
        .entries()
        .iter()
        .filter(|entry| entry.get("k").is_some())
        .map(|entry| entry.combination().clone())
        .collect();
    assert_eq!(k_combos, vec![combo!["Int32"], combo!["String"]]);

    assert_eq!(
        dispatcher.invoke(&mut foo, "k", &[3.into()]),
        Ok(Value::from("int 3"))
    );
    assert_eq!(
        dispatcher.invoke(&mut foo, "k", &["x".into()]),
        Ok(Value::from("string x"))
    );
}

#[test]
fn skipped_methods_are_never_sent() {
    expect_missing("hidden", &[1.into()]);

    let (_, dispatcher) = activated();
    assert!(dispatcher
        .entries()
        .iter()
        .all(|entry| entry.get("hidden").is_none()));
    // the Int32 table exists, the skipped method is just not in it
    assert!(dispatcher.combinations().any(|c| *c == combo!["Int32"]));
}

#[test]
fn untyped_methods_are_invisible() {
    let (registry, dispatcher) = activated();
    assert!(!dispatcher.exists("loose"));
    expect_missing("loose", &[1.into()]);
    assert!(registry
        .diagnostics()
        .iter()
        .any(|d| d.method == "loose"
            && d.kind == DiagnosticKind::UntypedParameter { param: "arg0".into() }));
}

// ==============================================================================
// Introspection
// ==============================================================================

#[test]
fn arity_with_optional_parameter() {
    let (_, dispatcher) = activated();
    assert_eq!(dispatcher.arity_of("pow"), Some(Arity::new(2, 3)));
    assert_eq!(dispatcher.arity_of("pow").map(<(usize, usize)>::from), Some((2, 3)));
    assert_eq!(dispatcher.arity_of("a"), Some(Arity::new(1, 1)));
    assert_eq!(dispatcher.arity_of("z"), None);
    assert!(dispatcher.exists("d"));
    assert!(!dispatcher.exists("z"));
}

#[test]
fn skipped_methods_are_introspectable_by_default() {
    let (_, dispatcher) = activated();
    assert!(dispatcher.exists("hidden"));
    assert_eq!(dispatcher.arity_of("hidden"), Some(Arity::new(1, 1)));

    let options = CompileOptions {
        introspect_skipped: false,
        ..CompileOptions::default()
    };
    let (strict, _) = foo_spec().build(&options).unwrap();
    assert!(!strict.exists("hidden"));
    assert_eq!(strict.arity_of("hidden"), None);
}

// ==============================================================================
// Lifecycle
// ==============================================================================

#[test]
fn second_activation_fails_and_changes_nothing() {
    let (mut registry, before) = activated();

    assert_eq!(registry.activate(), Err(ConfigurationError::AlreadyActivated));

    let after = registry.dispatcher::<Foo, FooError>().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(registry.is_activated());
    assert_eq!(registry.state(), State::Activated);
}

#[test]
fn register_after_activation_fails() {
    let (mut registry, _) = activated();
    let err = registry
        .register(TypeSpec::<String, FooError>::new("Other"))
        .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::RegisterAfterActivation { ty: "Other".into() }
    );
}

#[test]
fn duplicate_registration_fails() {
    let mut registry = Registry::new();
    registry.register(foo_spec()).unwrap();
    assert_eq!(
        registry.register(foo_spec()),
        Err(ConfigurationError::DuplicateType { ty: "Foo".into() })
    );
}

#[test]
fn failed_activation_publishes_nothing() {
    let clashing = foo_spec().handler("a", |_: &Foo, v: i32| v);

    let mut registry = Registry::new();
    registry.register(clashing).unwrap();
    assert_eq!(registry.state(), State::Uninitialized);
    let err = registry.activate().unwrap_err();

    assert!(matches!(
        err,
        ConfigurationError::Collision { ref name, ref combination, .. }
            if name == "a" && *combination == combo!["Int32"]
    ));
    assert_eq!(registry.state(), State::Uninitialized);
    assert!(registry.dispatcher::<Foo, FooError>().is_none());
}

#[test]
fn dispatcher_lookup_needs_the_registered_error_type() {
    let (registry, _) = activated();
    assert!(registry.dispatcher::<Foo, MethodMissing>().is_none());
    assert!(registry.dispatcher::<String, FooError>().is_none());
}

// ==============================================================================
// Strategies and abstract families
// ==============================================================================

#[derive(Debug, Default)]
struct Gauge {
    total: f64,
}

fn gauge_spec() -> TypeSpec<Gauge, MethodMissing> {
    TypeSpec::new("Gauge")
        .strategy(Strategy::Closure)
        .handler("add", |g: &mut Gauge, n: Number| {
            g.total += n.as_f64();
            g.total
        })
        .handler("describe", |_: &Gauge, _: Number| "number")
        .handler("describe", |_: &Gauge, _: i32| "int32")
        .method(
            MethodSpec::new("exact", |_: &Gauge, n: i64| n * 2).strategy(Strategy::ValueObject),
        )
}

#[test]
fn value_object_rejects_abstract_types() {
    let spec = TypeSpec::<Gauge, MethodMissing>::new("Gauge")
        .handler("add", |_: &mut Gauge, n: Number| n.as_f64());

    let err = spec.build(&CompileOptions::default()).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::Unstorable {
            owner: "Gauge".into(),
            name: "add".into(),
            ty: ConcreteTy::Number,
            combination: combo!["Number"],
        }
    );
}

#[test]
fn strategy_precedence() {
    let (gauge, _) = gauge_spec().build(&CompileOptions::default()).unwrap();

    let add = gauge.resolve("add", &[ConcreteTy::Number]).unwrap();
    assert_eq!(add.strategy(), Strategy::Closure);

    let exact = gauge.resolve("exact", &[ConcreteTy::Int64]).unwrap();
    assert_eq!(exact.strategy(), Strategy::ValueObject);

    let options = CompileOptions {
        default_strategy: Strategy::Closure,
        ..CompileOptions::default()
    };
    let (foo, _) = foo_spec().build(&options).unwrap();
    let a = foo.resolve("a", &[ConcreteTy::Int32]).unwrap();
    assert_eq!(a.strategy(), Strategy::Closure);
}

#[test]
fn families_accept_their_members() {
    let (dispatcher, _) = gauge_spec().build(&CompileOptions::default()).unwrap();
    let mut gauge = Gauge::default();

    dispatcher.invoke(&mut gauge, "add", &[2u8.into()]).unwrap();
    dispatcher.invoke(&mut gauge, "add", &[0.5f64.into()]).unwrap();
    assert_eq!(gauge.total, 2.5);

    assert!(dispatcher.invoke(&mut gauge, "add", &["1".into()]).is_err());
}

#[test]
fn exact_combination_wins_over_family() {
    let (dispatcher, _) = gauge_spec().build(&CompileOptions::default()).unwrap();
    let mut gauge = Gauge::default();

    assert_eq!(
        dispatcher.invoke(&mut gauge, "describe", &[1.into()]),
        Ok(Value::from("int32"))
    );
    assert_eq!(
        dispatcher.invoke(&mut gauge, "describe", &[1i8.into()]),
        Ok(Value::from("number"))
    );
}

#[derive(Debug, Default)]
struct Calc;

type AnyInt = Or<SignedInt, UnsignedInt>;

fn widen(n: AnyInt) -> i128 {
    match n {
        Or::Left(signed) => signed.as_i128(),
        Or::Right(unsigned) => unsigned.as_u128() as i128,
    }
}

fn calc_spec() -> TypeSpec<Calc, MethodMissing> {
    TypeSpec::new("Calc")
        .strategy(Strategy::Closure)
        .handler("onetwothree", |_: &Calc, x: AnyInt, y: AnyInt| widen(x) + widen(y))
        .handler("classify", |_: &Calc, _: Number| "number")
        .handler("classify", |_: &Calc, _: AnyObject| "object")
        .handler("classify", |_: &Calc, _: Int| "int")
        .handler("classify", |_: &Calc, _: SignedInt| "signed")
        .handler("classify", |_: &Calc, _: Float| "float")
}

#[test]
fn signed_and_unsigned_families_route_through_closures() {
    let (dispatcher, _) = calc_spec().build(&CompileOptions::default()).unwrap();
    let mut calc = Calc;

    let combos: Vec<_> = dispatcher
        .entries()
        .iter()
        .filter(|entry| entry.get("onetwothree").is_some())
        .map(|entry| entry.combination().clone())
        .collect();
    assert_eq!(
        combos,
        vec![
            combo!["Int::Signed", "Int::Signed"],
            combo!["Int::Signed", "Int::Unsigned"],
            combo!["Int::Unsigned", "Int::Signed"],
            combo!["Int::Unsigned", "Int::Unsigned"],
        ]
    );

    let send = |calc: &mut Calc, x: Value, y: Value| {
        dispatcher.invoke(calc, "onetwothree", &[x, y])
    };
    assert_eq!(send(&mut calc, 1i8.into(), 2u64.into()), Ok(Value::Int128(3)));
    assert_eq!(send(&mut calc, 40u8.into(), (-2i32).into()), Ok(Value::Int128(38)));
    assert_eq!(send(&mut calc, 5u16.into(), 6u128.into()), Ok(Value::Int128(11)));
    assert!(send(&mut calc, 1.0f64.into(), 2i8.into()).is_err());
}

#[test]
fn signed_and_unsigned_families_have_no_value_object() {
    let spec = TypeSpec::<Calc, MethodMissing>::new("Calc")
        .handler("onetwothree", |_: &Calc, x: AnyInt, y: AnyInt| widen(x) + widen(y));

    assert_eq!(
        spec.build(&CompileOptions::default()).unwrap_err(),
        ConfigurationError::Unstorable {
            owner: "Calc".into(),
            name: "onetwothree".into(),
            ty: ConcreteTy::SignedInt,
            combination: combo!["Int::Signed", "Int::Signed"],
        }
    );
}

#[test]
fn narrowest_family_wins() {
    let (dispatcher, _) = calc_spec().build(&CompileOptions::default()).unwrap();
    let mut calc = Calc;
    let mut classify = |value: Value| dispatcher.invoke(&mut calc, "classify", &[value]);

    assert_eq!(classify(1i8.into()), Ok(Value::from("signed")));
    assert_eq!(classify(1u8.into()), Ok(Value::from("int")));
    assert_eq!(classify(0.5f32.into()), Ok(Value::from("float")));
    assert_eq!(classify("x".into()), Ok(Value::from("object")));
    assert_eq!(classify(Value::Nil), Ok(Value::from("object")));

    let picked = dispatcher.resolve("classify", &[ConcreteTy::Int64]).unwrap();
    assert_eq!(picked.combination(), &combo!["Int::Signed"]);
}

// ==============================================================================
// Dispatchable
// ==============================================================================

fn send_all(target: &mut dyn Dispatchable<Error = FooError>) -> Vec<Option<Value>> {
    vec![
        target.invoke_or_absent("a", &[1.into()]).unwrap(),
        target.invoke_or_absent("z", &[1.into()]).unwrap(),
    ]
}

#[test]
fn bound_dispatcher_is_dispatchable() {
    let (_, dispatcher) = activated();
    let mut foo = Foo::default();

    let mut bound = dispatcher.bind(&mut foo);
    assert_eq!(send_all(&mut bound), vec![Some(Value::Int32(8)), None]);
    assert_eq!(bound.arity_of("b"), Some(Arity::new(2, 2)));
    assert!(bound.exists("a"));
    assert_eq!(bound.receiver().calls, 1);
}

#[derive(Debug, Default)]
struct Counter(i32);

static COUNTER: OnceLock<Arc<Dispatcher<Counter, MethodMissing>>> = OnceLock::new();

impl Participant for Counter {
    type Error = MethodMissing;

    fn dispatcher() -> Option<Arc<Dispatcher<Self, Self::Error>>> {
        COUNTER.get().cloned()
    }
}

#[test]
fn participants_reach_their_dispatcher() {
    let mut counter = Counter(1);
    assert!(counter.invoke("bump", &[1.into()]).is_err());
    assert!(!counter.exists("bump"));

    let mut registry = Registry::new();
    registry
        .register(TypeSpec::<Counter, MethodMissing>::new("Counter").handler(
            "bump",
            |c: &mut Counter, by: i32| {
                c.0 += by;
                c.0
            },
        ))
        .unwrap();
    registry.activate().unwrap();
    let _ = COUNTER.set(registry.dispatcher().unwrap());

    assert_eq!(counter.invoke("bump", &[2.into()]), Ok(Value::Int32(3)));
    assert_eq!(counter.arity_of("bump"), Some(Arity::new(1, 1)));
    assert_eq!(counter.invoke_or_absent("nope", &[]), Ok(None));
}

// ==============================================================================
// Plans and options
// ==============================================================================

#[test]
fn plan_rendering() {
    let decl = TypeSpec::<Foo, FooError>::new("Foo")
        .handler("a", Foo::a)
        .handler("k", Foo::k)
        .method(MethodSpec::new("hidden", Foo::hidden).skip())
        .decl();
    let compiled = compile(&decl, &CompileOptions::default()).unwrap();

    let expected = indoc! {"
        type Foo (2 combinations, 2 entries)
          SendLookup___Int32 (Int32)
            a -> Send_a_Int32 [value-object]
            k -> Send_k_Int32_or_String [value-object]
          SendLookup___String (String)
            k -> Send_k_Int32_or_String [value-object]
          arity
            a 1
            hidden 1
            k 1
    "};
    assert_eq!(compiled.plan.to_string(), expected);
}

#[test]
fn large_expansions_warn_or_fail() {
    let wide = |_: &Foo, _: Or<i32, String>, _: Or<i32, String>, _: Or<i32, String>| ();
    let spec = || TypeSpec::<Foo, FooError>::new("Foo").handler("wide", wide);

    let options = CompileOptions {
        combination_warning: 4,
        ..CompileOptions::default()
    };
    let (dispatcher, diagnostics) = spec().build(&options).unwrap();
    assert_eq!(dispatcher.combinations().count(), 8);
    assert_eq!(
        diagnostics[0].kind,
        DiagnosticKind::LargeExpansion {
            count: 8,
            threshold: 4
        }
    );

    let options = CompileOptions {
        max_combinations: Some(6),
        ..CompileOptions::default()
    };
    assert_eq!(
        spec().build(&options).unwrap_err(),
        ConfigurationError::CombinationLimit {
            owner: "Foo".into(),
            name: "wide".into(),
            count: 8,
            limit: 6,
        }
    );
}
