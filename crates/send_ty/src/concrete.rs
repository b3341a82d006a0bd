use std::fmt;

use derive_more::Debug;
use smol_str::SmolStr;

/// A single, fully resolved parameter type.
///
/// The builtin variants cover the scalar types a `Value` can carry. The
/// family variants (`Number`, `Int`, `SignedInt`, `UnsignedInt`, `Float`,
/// `Object`) are abstract: they can appear in a signature and match at
/// dispatch time, but a value-object call-site has nowhere to store them.
/// Anything else is a user type, kept by its normalized name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConcreteTy {
    Nil,
    Bool,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    Int128,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    UInt128,
    Float32,
    Float64,
    String,
    Symbol,

    // -- abstract families -------------------------------------------------
    Number,
    Int,
    #[debug("Int::Signed")]
    SignedInt,
    #[debug("Int::Unsigned")]
    UnsignedInt,
    Float,
    Object,

    #[debug("{_0}")]
    Named(SmolStr),
}

const BUILTIN_NAMES: &[(&str, ConcreteTy)] = &[
    ("Nil", ConcreteTy::Nil),
    ("Bool", ConcreteTy::Bool),
    ("Char", ConcreteTy::Char),
    ("Int8", ConcreteTy::Int8),
    ("Int16", ConcreteTy::Int16),
    ("Int32", ConcreteTy::Int32),
    ("Int64", ConcreteTy::Int64),
    ("Int128", ConcreteTy::Int128),
    ("UInt8", ConcreteTy::UInt8),
    ("UInt16", ConcreteTy::UInt16),
    ("UInt32", ConcreteTy::UInt32),
    ("UInt64", ConcreteTy::UInt64),
    ("UInt128", ConcreteTy::UInt128),
    ("Float32", ConcreteTy::Float32),
    ("Float64", ConcreteTy::Float64),
    ("String", ConcreteTy::String),
    ("Symbol", ConcreteTy::Symbol),
    ("Number", ConcreteTy::Number),
    ("Int", ConcreteTy::Int),
    ("Int::Signed", ConcreteTy::SignedInt),
    ("Int::Unsigned", ConcreteTy::UnsignedInt),
    ("Float", ConcreteTy::Float),
    ("Object", ConcreteTy::Object),
];

impl ConcreteTy {
    /// Resolve a type name. Whitespace is insignificant, so `Hash(String, Int32)`
    /// and `Hash(String,Int32)` name the same type. Names that are not builtin
    /// become `Named`.
    pub fn parse(name: &str) -> Self {
        let normalized: String = name.chars().filter(|c| !c.is_whitespace()).collect();

        BUILTIN_NAMES
            .iter()
            .find(|(builtin, _)| *builtin == normalized)
            .map(|(_, ty)| ty.clone())
            .unwrap_or_else(|| ConcreteTy::Named(normalized.into()))
    }

    pub fn name(&self) -> &str {
        match self {
            ConcreteTy::Named(name) => name.as_str(),
            builtin => BUILTIN_NAMES
                .iter()
                .find(|(_, ty)| ty == builtin)
                .map(|(name, _)| *name)
                .unwrap_or("Object"),
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(
            self,
            ConcreteTy::Number
                | ConcreteTy::Int
                | ConcreteTy::SignedInt
                | ConcreteTy::UnsignedInt
                | ConcreteTy::Float
                | ConcreteTy::Object
        )
    }

    pub fn is_signed_int(&self) -> bool {
        matches!(
            self,
            ConcreteTy::Int8
                | ConcreteTy::Int16
                | ConcreteTy::Int32
                | ConcreteTy::Int64
                | ConcreteTy::Int128
        )
    }

    pub fn is_unsigned_int(&self) -> bool {
        matches!(
            self,
            ConcreteTy::UInt8
                | ConcreteTy::UInt16
                | ConcreteTy::UInt32
                | ConcreteTy::UInt64
                | ConcreteTy::UInt128
        )
    }

    pub fn is_int(&self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ConcreteTy::Float32 | ConcreteTy::Float64)
    }

    pub fn is_number(&self) -> bool {
        self.is_signed_int()
            || self.is_unsigned_int()
            || self.is_float()
            || matches!(
                self,
                ConcreteTy::Number
                    | ConcreteTy::Int
                    | ConcreteTy::SignedInt
                    | ConcreteTy::UnsignedInt
                    | ConcreteTy::Float
            )
    }

    /// Whether an argument of type `other` can be passed where `self` is
    /// expected. Reflexive; the abstract families accept their members and
    /// sub-families.
    pub fn accepts(&self, other: &ConcreteTy) -> bool {
        if self == other {
            return true;
        }

        match self {
            ConcreteTy::Object => true,
            ConcreteTy::Number => other.is_number(),
            ConcreteTy::Int => {
                other.is_int() || matches!(other, ConcreteTy::SignedInt | ConcreteTy::UnsignedInt)
            }
            ConcreteTy::SignedInt => other.is_signed_int(),
            ConcreteTy::UnsignedInt => other.is_unsigned_int(),
            ConcreteTy::Float => other.is_float(),
            _ => false,
        }
    }

    /// How wide a family is: 0 for every non-abstract type, growing with each
    /// enclosing family (`Int::Signed` < `Int` < `Number` < `Object`).
    pub fn breadth(&self) -> u8 {
        match self {
            ConcreteTy::SignedInt | ConcreteTy::UnsignedInt | ConcreteTy::Float => 1,
            ConcreteTy::Int => 2,
            ConcreteTy::Number => 3,
            ConcreteTy::Object => 4,
            _ => 0,
        }
    }

    /// Storage class used by value-object call-sites. `None` for the abstract
    /// families, which have no fixed representation.
    pub fn carrier(&self) -> Option<Carrier> {
        let carrier = match self {
            ConcreteTy::Nil => Carrier::Unit,
            ConcreteTy::Bool => Carrier::Bool,
            ConcreteTy::Char => Carrier::Char,
            ConcreteTy::Int8 => Carrier::Signed(8),
            ConcreteTy::Int16 => Carrier::Signed(16),
            ConcreteTy::Int32 => Carrier::Signed(32),
            ConcreteTy::Int64 => Carrier::Signed(64),
            ConcreteTy::Int128 => Carrier::Signed(128),
            ConcreteTy::UInt8 => Carrier::Unsigned(8),
            ConcreteTy::UInt16 => Carrier::Unsigned(16),
            ConcreteTy::UInt32 => Carrier::Unsigned(32),
            ConcreteTy::UInt64 => Carrier::Unsigned(64),
            ConcreteTy::UInt128 => Carrier::Unsigned(128),
            ConcreteTy::Float32 => Carrier::Float(32),
            ConcreteTy::Float64 => Carrier::Float(64),
            ConcreteTy::String => Carrier::Str,
            ConcreteTy::Symbol => Carrier::Sym,
            ConcreteTy::Named(name) => Carrier::Handle(name.clone()),
            ConcreteTy::Number
            | ConcreteTy::Int
            | ConcreteTy::SignedInt
            | ConcreteTy::UnsignedInt
            | ConcreteTy::Float
            | ConcreteTy::Object => return None,
        };
        Some(carrier)
    }
}

impl fmt::Display for ConcreteTy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<&str> for ConcreteTy {
    fn from(value: &str) -> Self {
        ConcreteTy::parse(value)
    }
}

/// Fixed storage layout of one argument slot in a value-object call-site.
/// Widths are in bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Carrier {
    Unit,
    Bool,
    Char,
    Signed(u8),
    Unsigned(u8),
    Float(u8),
    Str,
    Sym,
    #[debug("Handle({_0})")]
    Handle(SmolStr),
}
