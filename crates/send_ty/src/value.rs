// ==============================================================================
// Runtime values
// ==============================================================================
//
// `Value` is what travels through a dynamic send: every argument and every
// result. Each variant maps to exactly one `ConcreteTy`, so the runtime type of
// an argument list is always a concrete tuple that can be matched against the
// compiled combinations.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use derive_more::Debug;
use smol_str::SmolStr;

use crate::{Carrier, ConcreteTy, Constraint};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    #[debug("nil")]
    Nil,
    #[debug("{_0:?}")]
    Bool(bool),
    #[debug("{_0:?}")]
    Char(char),
    #[debug("{_0}_i8")]
    Int8(i8),
    #[debug("{_0}_i16")]
    Int16(i16),
    #[debug("{_0}")]
    Int32(i32),
    #[debug("{_0}_i64")]
    Int64(i64),
    #[debug("{_0}_i128")]
    Int128(i128),
    #[debug("{_0}_u8")]
    UInt8(u8),
    #[debug("{_0}_u16")]
    UInt16(u16),
    #[debug("{_0}_u32")]
    UInt32(u32),
    #[debug("{_0}_u64")]
    UInt64(u64),
    #[debug("{_0}_u128")]
    UInt128(u128),
    #[debug("{_0:?}_f32")]
    Float32(f32),
    #[debug("{_0:?}")]
    Float64(f64),
    #[debug("{_0:?}")]
    String(SmolStr),
    #[debug(":{_0}")]
    Symbol(SmolStr),
    #[debug("{_0:?}")]
    Object(Object),
}

impl Value {
    /// The runtime type tag used to pick a dispatch combination.
    pub fn ty(&self) -> ConcreteTy {
        match self {
            Value::Nil => ConcreteTy::Nil,
            Value::Bool(_) => ConcreteTy::Bool,
            Value::Char(_) => ConcreteTy::Char,
            Value::Int8(_) => ConcreteTy::Int8,
            Value::Int16(_) => ConcreteTy::Int16,
            Value::Int32(_) => ConcreteTy::Int32,
            Value::Int64(_) => ConcreteTy::Int64,
            Value::Int128(_) => ConcreteTy::Int128,
            Value::UInt8(_) => ConcreteTy::UInt8,
            Value::UInt16(_) => ConcreteTy::UInt16,
            Value::UInt32(_) => ConcreteTy::UInt32,
            Value::UInt64(_) => ConcreteTy::UInt64,
            Value::UInt128(_) => ConcreteTy::UInt128,
            Value::Float32(_) => ConcreteTy::Float32,
            Value::Float64(_) => ConcreteTy::Float64,
            Value::String(_) => ConcreteTy::String,
            Value::Symbol(_) => ConcreteTy::Symbol,
            Value::Object(obj) => obj.ty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Symbol(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Typed extraction, e.g. `value.get::<u128>()`.
    pub fn get<T: FromValue>(&self) -> Option<T> {
        T::from_value(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Int128(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::UInt128(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Symbol(v) => write!(f, ":{v}"),
            Value::Object(obj) => write!(f, "#<{}>", obj.ty()),
        }
    }
}

impl Carrier {
    /// Whether `value` fits this slot without conversion.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Carrier::Unit, Value::Nil)
            | (Carrier::Bool, Value::Bool(_))
            | (Carrier::Char, Value::Char(_))
            | (Carrier::Str, Value::String(_))
            | (Carrier::Sym, Value::Symbol(_)) => true,
            (Carrier::Signed(8), Value::Int8(_))
            | (Carrier::Signed(16), Value::Int16(_))
            | (Carrier::Signed(32), Value::Int32(_))
            | (Carrier::Signed(64), Value::Int64(_))
            | (Carrier::Signed(128), Value::Int128(_)) => true,
            (Carrier::Unsigned(8), Value::UInt8(_))
            | (Carrier::Unsigned(16), Value::UInt16(_))
            | (Carrier::Unsigned(32), Value::UInt32(_))
            | (Carrier::Unsigned(64), Value::UInt64(_))
            | (Carrier::Unsigned(128), Value::UInt128(_)) => true,
            (Carrier::Float(32), Value::Float32(_)) | (Carrier::Float(64), Value::Float64(_)) => {
                true
            }
            (Carrier::Handle(name), Value::Object(obj)) => {
                matches!(obj.ty(), ConcreteTy::Named(ty) if ty == *name)
            }
            _ => false,
        }
    }
}

/// A user-typed value. The payload is shared, so cloning an `Object` clones
/// the handle, not the data.
#[derive(Debug, Clone)]
#[debug("#<{ty}>")]
pub struct Object {
    ty: SmolStr,
    data: Arc<dyn Any + Send + Sync>,
}

impl Object {
    pub fn new<T: Nominal + Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Nominal + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            ty: T::TYPE_NAME.into(),
            data: value,
        }
    }

    pub fn ty(&self) -> ConcreteTy {
        ConcreteTy::parse(&self.ty)
    }

    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.data).downcast::<T>().ok()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && Arc::ptr_eq(&self.data, &other.data)
    }
}

/// A Rust type that participates in sends as a named type.
pub trait Nominal {
    const TYPE_NAME: &'static str;
}

// ==============================================================================
// Typed extraction
// ==============================================================================

/// A Rust type usable as a dispatchable parameter.
///
/// `constraint` is the static type restriction the parameter declares.
/// `None` means the parameter is untyped, which keeps its method out of the
/// dispatch tables entirely.
pub trait FromValue: Sized {
    fn constraint() -> Option<Constraint>;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! scalar_value {
    ($($rust:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$rust> for Value {
                fn from(value: $rust) -> Self {
                    Value::$variant(value)
                }
            }

            impl FromValue for $rust {
                fn constraint() -> Option<Constraint> {
                    Some(Constraint::Concrete(ConcreteTy::$variant))
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            }
        )*
    };
}

scalar_value! {
    bool => Bool,
    char => Char,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    i128 => Int128,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    u128 => UInt128,
    f32 => Float32,
    f64 => Float64,
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value.into())
    }
}

impl From<SmolStr> for Value {
    fn from(value: SmolStr) -> Self {
        Value::String(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}

impl FromValue for String {
    fn constraint() -> Option<Constraint> {
        Some(Constraint::Concrete(ConcreteTy::String))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.to_string()),
            _ => None,
        }
    }
}

impl FromValue for SmolStr {
    fn constraint() -> Option<Constraint> {
        Some(Constraint::Concrete(ConcreteTy::String))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

/// The raw value. Declares no restriction, so it marks the parameter untyped.
impl FromValue for Value {
    fn constraint() -> Option<Constraint> {
        None
    }

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: Nominal + Send + Sync + 'static> FromValue for Arc<T> {
    fn constraint() -> Option<Constraint> {
        Some(Constraint::Concrete(ConcreteTy::parse(T::TYPE_NAME)))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(obj) => obj.downcast::<T>(),
            _ => None,
        }
    }
}

/// An interned name, the `Symbol` counterpart of `String`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[debug(":{_0}")]
pub struct Symbol(pub SmolStr);

impl Symbol {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Symbol> for Value {
    fn from(value: Symbol) -> Self {
        Value::Symbol(value.0)
    }
}

impl FromValue for Symbol {
    fn constraint() -> Option<Constraint> {
        Some(Constraint::Concrete(ConcreteTy::Symbol))
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Symbol(s) => Some(Symbol(s.clone())),
            _ => None,
        }
    }
}

// ==============================================================================
// Abstract families
// ==============================================================================
//
// Each wrapper declares one abstract family as its parameter type and accepts
// any value of a member type. None of them has a fixed storage layout, so
// methods taking them need the closure strategy.

macro_rules! family_value {
    ($($(#[$meta:meta])* $name:ident => $family:ident, $admits:expr;)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq)]
            #[debug("{_0:?}")]
            pub struct $name(Value);

            impl $name {
                pub fn value(&self) -> &Value {
                    &self.0
                }
            }

            impl From<$name> for Value {
                fn from(value: $name) -> Self {
                    value.0
                }
            }

            impl FromValue for $name {
                fn constraint() -> Option<Constraint> {
                    Some(Constraint::Concrete(ConcreteTy::$family))
                }

                fn from_value(value: &Value) -> Option<Self> {
                    let admits: fn(&ConcreteTy) -> bool = $admits;
                    admits(&value.ty()).then(|| $name(value.clone()))
                }
            }
        )*
    };
}

family_value! {
    /// Any numeric value, declared as `Number`.
    Number => Number, ConcreteTy::is_number;
    /// Any signed or unsigned integer, declared as `Int`.
    Int => Int, ConcreteTy::is_int;
    /// A signed integer of any width, declared as `Int::Signed`.
    SignedInt => SignedInt, ConcreteTy::is_signed_int;
    /// An unsigned integer of any width, declared as `Int::Unsigned`.
    UnsignedInt => UnsignedInt, ConcreteTy::is_unsigned_int;
    /// `Float32` or `Float64`, declared as `Float`.
    Float => Float, ConcreteTy::is_float;
    /// Any value at all, declared as `Object`.
    AnyObject => Object, |_| true;
}

fn to_f64(value: &Value) -> f64 {
    match *value {
        Value::Int8(v) => v as f64,
        Value::Int16(v) => v as f64,
        Value::Int32(v) => v as f64,
        Value::Int64(v) => v as f64,
        Value::Int128(v) => v as f64,
        Value::UInt8(v) => v as f64,
        Value::UInt16(v) => v as f64,
        Value::UInt32(v) => v as f64,
        Value::UInt64(v) => v as f64,
        Value::UInt128(v) => v as f64,
        Value::Float32(v) => v as f64,
        Value::Float64(v) => v,
        _ => f64::NAN,
    }
}

fn to_i128(value: &Value) -> Option<i128> {
    match *value {
        Value::Int8(v) => Some(v.into()),
        Value::Int16(v) => Some(v.into()),
        Value::Int32(v) => Some(v.into()),
        Value::Int64(v) => Some(v.into()),
        Value::Int128(v) => Some(v),
        Value::UInt8(v) => Some(v.into()),
        Value::UInt16(v) => Some(v.into()),
        Value::UInt32(v) => Some(v.into()),
        Value::UInt64(v) => Some(v.into()),
        Value::UInt128(v) => i128::try_from(v).ok(),
        _ => None,
    }
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        to_f64(&self.0)
    }

    /// Integer view, `None` for floats and for unsigned values above `i128::MAX`.
    pub fn as_i128(&self) -> Option<i128> {
        to_i128(&self.0)
    }
}

impl Int {
    /// `None` only for unsigned values above `i128::MAX`.
    pub fn as_i128(&self) -> Option<i128> {
        to_i128(&self.0)
    }
}

impl SignedInt {
    pub fn as_i128(&self) -> i128 {
        to_i128(&self.0).unwrap_or_default()
    }
}

impl UnsignedInt {
    pub fn as_u128(&self) -> u128 {
        match self.0 {
            Value::UInt8(v) => v.into(),
            Value::UInt16(v) => v.into(),
            Value::UInt32(v) => v.into(),
            Value::UInt64(v) => v.into(),
            Value::UInt128(v) => v,
            _ => 0,
        }
    }
}

impl Float {
    pub fn as_f64(&self) -> f64 {
        to_f64(&self.0)
    }
}

/// A two-way union parameter. Nest it for wider unions:
/// `Or<i32, Or<String, f64>>` declares `Int32 | String | Float64`.
#[derive(Debug, Clone, PartialEq)]
pub enum Or<A, B> {
    Left(A),
    Right(B),
}

impl<A: FromValue, B: FromValue> FromValue for Or<A, B> {
    fn constraint() -> Option<Constraint> {
        Some(A::constraint()?.union(&B::constraint()?))
    }

    fn from_value(value: &Value) -> Option<Self> {
        A::from_value(value)
            .map(Or::Left)
            .or_else(|| B::from_value(value).map(Or::Right))
    }
}

impl<A: Into<Value>, B: Into<Value>> From<Or<A, B>> for Value {
    fn from(value: Or<A, B>) -> Self {
        match value {
            Or::Left(a) => a.into(),
            Or::Right(b) => b.into(),
        }
    }
}
