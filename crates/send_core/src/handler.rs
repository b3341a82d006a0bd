// ==============================================================================
// Typed handlers
// ==============================================================================
//
// Plain Rust functions and closures become dispatchable methods through
// `Handler`. The parameter types declare the signature (via `FromValue`) and
// decode the arguments; the return type is turned into a `Value` (or the
// method's own error) by `IntoOutcome`.
//
// Receivers can be taken by `&mut T` or `&T`. The marker in `Args` keeps the
// two families of impls apart, so `Foo::by_ref` and `Foo::by_mut` both work as
// handlers without annotations.

use std::marker::PhantomData;

use send_ty::{
    AnyObject, Constraint, Float, FromValue, Int, Number, Object, SignedInt, Symbol, UnsignedInt,
    Value,
};
use smol_str::SmolStr;

/// Result of one decoded call: `None` when the arguments did not decode into
/// the handler's parameter types, otherwise whatever the method produced.
pub type Outcome<E> = Option<Result<Value, E>>;

pub trait Handler<T, E, Args>: Send + Sync + 'static {
    /// One entry per parameter; `None` marks an untyped parameter.
    fn constraints() -> Vec<Option<Constraint>>;

    fn call(&self, receiver: &mut T, args: &[Value]) -> Outcome<E>;
}

/// Receiver taken by exclusive reference.
pub struct ByMut<Args>(PhantomData<Args>);

/// Receiver taken by shared reference.
pub struct ByRef<Args>(PhantomData<Args>);

/// Conversion of a method's return value into a dispatch result.
///
/// Plain values are always `Ok`. `Result<V, E>` hands the method's error back
/// untouched.
pub trait IntoOutcome<E> {
    fn into_outcome(self) -> Result<Value, E>;
}

macro_rules! plain_outcome {
    ($($ty:ty),* $(,)?) => {
        $(
            impl<E> IntoOutcome<E> for $ty {
                fn into_outcome(self) -> Result<Value, E> {
                    Ok(self.into())
                }
            }
        )*
    };
}

plain_outcome!(
    (), bool, char, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, f32, f64,
    String, &'static str, SmolStr, Symbol, Object,
    Number, Int, SignedInt, UnsignedInt, Float, AnyObject,
);

impl<E> IntoOutcome<E> for Value {
    fn into_outcome(self) -> Result<Value, E> {
        Ok(self)
    }
}

impl<E, V: Into<Value>> IntoOutcome<E> for Option<V> {
    fn into_outcome(self) -> Result<Value, E> {
        Ok(self.into())
    }
}

impl<E, V: Into<Value>> IntoOutcome<E> for Result<V, E> {
    fn into_outcome(self) -> Result<Value, E> {
        self.map(Into::into)
    }
}

macro_rules! impl_handler {
    ($($arg:ident),*) => {
        #[allow(non_snake_case, unused_mut)]
        impl<T, E, F, R, $($arg,)*> Handler<T, E, ByMut<($($arg,)*)>> for F
        where
            F: Fn(&mut T, $($arg),*) -> R + Send + Sync + 'static,
            R: IntoOutcome<E>,
            $($arg: FromValue,)*
        {
            fn constraints() -> Vec<Option<Constraint>> {
                vec![$($arg::constraint()),*]
            }

            fn call(&self, receiver: &mut T, args: &[Value]) -> Outcome<E> {
                let mut args = args.iter();
                $(let $arg = $arg::from_value(args.next()?)?;)*
                if args.next().is_some() {
                    return None;
                }
                Some((self)(receiver, $($arg),*).into_outcome())
            }
        }

        #[allow(non_snake_case, unused_mut)]
        impl<T, E, F, R, $($arg,)*> Handler<T, E, ByRef<($($arg,)*)>> for F
        where
            F: Fn(&T, $($arg),*) -> R + Send + Sync + 'static,
            R: IntoOutcome<E>,
            $($arg: FromValue,)*
        {
            fn constraints() -> Vec<Option<Constraint>> {
                vec![$($arg::constraint()),*]
            }

            fn call(&self, receiver: &mut T, args: &[Value]) -> Outcome<E> {
                let mut args = args.iter();
                $(let $arg = $arg::from_value(args.next()?)?;)*
                if args.next().is_some() {
                    return None;
                }
                Some((self)(&*receiver, $($arg),*).into_outcome())
            }
        }
    };
}

impl_handler!();
impl_handler!(A1);
impl_handler!(A1, A2);
impl_handler!(A1, A2, A3);
impl_handler!(A1, A2, A3, A4);
impl_handler!(A1, A2, A3, A4, A5);
impl_handler!(A1, A2, A3, A4, A5, A6);
