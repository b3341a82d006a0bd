mod concrete;
pub mod label;
mod signature;
mod union;
mod value;

#[cfg(feature = "proptest_support")]
pub mod arbitrary;

pub use concrete::{Carrier, ConcreteTy};
pub use signature::{
    Arity, Combination, Constraint, MethodDescriptor, Param, Strategy, TypeDecl, TypeSignature,
};
pub use union::Union;
pub use value::{
    AnyObject, Float, FromValue, Int, Nominal, Number, Object, Or, SignedInt, Symbol, UnsignedInt,
    Value,
};

/// Build a `TypeSignature` from type names. Each position is either a single
/// name or a `|`-separated union of names.
///
/// ```
/// let sig = send_ty::sig!["String", "Int32" | "Float64"];
/// assert_eq!(sig.len(), 2);
/// ```
#[macro_export]
macro_rules! sig {
    () => {
        $crate::TypeSignature::default()
    };
    ($($($name:literal)|+),+ $(,)?) => {
        $crate::TypeSignature::from_iter([
            $($crate::Constraint::from_names([$($name),+])),+
        ])
    };
}

/// Build a `Combination` from concrete type names.
#[macro_export]
macro_rules! combo {
    ($($name:literal),* $(,)?) => {
        $crate::Combination::from_iter([$($crate::ConcreteTy::parse($name)),*])
    };
}
