// ==============================================================================
// Method signatures
// ==============================================================================
//
// The declaration side of the data model: what a method looks like before any
// expansion happens. `MethodDescriptor`s are produced either by the manifest
// parser or by the registry from typed handlers, and are immutable afterwards.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use derive_more::Debug;
use itertools::Itertools;
use smol_str::SmolStr;

use crate::{ConcreteTy, Union};

/// How a call-site is represented once synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    /// A boxed closure over the method. Works for every parameter type.
    Closure,
    /// A small value object with a fixed storage slot per argument. Cannot
    /// represent the abstract numeric/root families.
    #[default]
    ValueObject,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Closure => write!(f, "closure"),
            Strategy::ValueObject => write!(f, "value-object"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closure" | "proc" => Ok(Strategy::Closure),
            "value-object" | "value_object" | "valueobject" | "record" => {
                Ok(Strategy::ValueObject)
            }
            other => Err(format!(
                "unknown strategy `{other}` (expected `closure` or `value-object`)"
            )),
        }
    }
}

/// The type restriction on one parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constraint {
    #[debug("{_0:?}")]
    Concrete(ConcreteTy),
    #[debug("{_0:?}")]
    Union(Union<ConcreteTy>),
}

impl Constraint {
    /// Build a constraint from member names, collapsing one-member unions.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().map(ConcreteTy::parse).collect()
    }

    /// Number of concrete alternatives at this position.
    pub fn radix(&self) -> usize {
        match self {
            Constraint::Concrete(_) => 1,
            Constraint::Union(members) => members.len(),
        }
    }

    /// The `idx`-th alternative, in the deterministic member order.
    pub fn member(&self, idx: usize) -> Option<&ConcreteTy> {
        match self {
            Constraint::Concrete(ty) => (idx == 0).then_some(ty),
            Constraint::Union(members) => members.nth(idx),
        }
    }

    pub fn members(&self) -> impl Iterator<Item = &ConcreteTy> {
        (0..self.radix()).filter_map(move |idx| self.member(idx))
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Constraint::Union(_))
    }

    pub fn union(&self, other: &Constraint) -> Constraint {
        self.members().chain(other.members()).cloned().collect()
    }
}

impl FromIterator<ConcreteTy> for Constraint {
    fn from_iter<T: IntoIterator<Item = ConcreteTy>>(iter: T) -> Self {
        let members: Union<ConcreteTy> = iter.into_iter().collect();
        match members.into_single() {
            Ok(single) => Constraint::Concrete(single),
            Err(members) => Constraint::Union(members),
        }
    }
}

impl From<ConcreteTy> for Constraint {
    fn from(value: ConcreteTy) -> Self {
        Constraint::Concrete(value)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Concrete(ty) => write!(f, "{ty}"),
            Constraint::Union(members) => write!(f, "{members}"),
        }
    }
}

/// Ordered parameter constraints of a method.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[debug("Sig{_0:?}")]
pub struct TypeSignature(Vec<Constraint>);

impl TypeSignature {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self(constraints)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Constraint] {
        &self.0
    }

    /// Product of the per-position radices: how many combinations this
    /// signature expands to. Saturates instead of overflowing.
    pub fn combination_count(&self) -> usize {
        self.0
            .iter()
            .fold(1usize, |acc, c| acc.saturating_mul(c.radix()))
    }
}

impl FromIterator<Constraint> for TypeSignature {
    fn from_iter<T: IntoIterator<Item = Constraint>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

/// One fully concrete instantiation of a `TypeSignature`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[debug("Combo{_0:?}")]
pub struct Combination(Vec<ConcreteTy>);

impl Combination {
    pub fn new(types: Vec<ConcreteTy>) -> Self {
        Self(types)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConcreteTy> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ConcreteTy] {
        &self.0
    }

    /// Positions holding an abstract family type.
    pub fn abstract_positions(&self) -> usize {
        self.0.iter().filter(|ty| ty.is_abstract()).count()
    }

    /// Summed family breadth of every position. Among combinations with the
    /// same number of abstract positions, the smaller one is more specific.
    pub fn breadth(&self) -> usize {
        self.0.iter().map(|ty| usize::from(ty.breadth())).sum()
    }

    /// Whether arguments of the given runtime types can be routed through this
    /// combination, either exactly or via abstract families.
    pub fn accepts(&self, args: &[ConcreteTy]) -> bool {
        self.0.len() == args.len() && self.0.iter().zip(args).all(|(slot, arg)| slot.accepts(arg))
    }

    /// Whether this combination is one of the expansions of `sig`.
    pub fn instantiates(&self, sig: &TypeSignature) -> bool {
        self.0.len() == sig.len()
            && self
                .0
                .iter()
                .zip(sig.iter())
                .all(|(ty, constraint)| constraint.members().any(|m| m == ty))
    }
}

// Lets a combination table be probed with the runtime argument types directly.
impl Borrow<[ConcreteTy]> for Combination {
    fn borrow(&self) -> &[ConcreteTy] {
        &self.0
    }
}

impl FromIterator<ConcreteTy> for Combination {
    fn from_iter<T: IntoIterator<Item = ConcreteTy>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

/// Required/total parameter counts of a method, or the aggregate across
/// every overload sharing a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[debug("{min}..={max}")]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn merge(self, other: Arity) -> Arity {
        Arity {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

impl From<Arity> for (usize, usize) {
    fn from(value: Arity) -> Self {
        (value.min, value.max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}..{}", self.min, self.max)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: SmolStr,
    /// `None` when the parameter carries no type restriction.
    pub constraint: Option<Constraint>,
    pub has_default: bool,
}

impl Param {
    pub fn typed(name: impl Into<SmolStr>, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            constraint: Some(constraint),
            has_default: false,
        }
    }

    pub fn untyped(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
            has_default: false,
        }
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(constraint) = &self.constraint {
            write!(f, " : {constraint}")?;
        }
        if self.has_default {
            write!(f, " = ...")?;
        }
        Ok(())
    }
}

/// One declared method of a participating type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub owner: SmolStr,
    pub name: SmolStr,
    pub params: Vec<Param>,
    /// Method-level strategy override.
    pub strategy: Option<Strategy>,
    /// Excluded from dispatch tables.
    pub skip: bool,
}

impl MethodDescriptor {
    pub fn new(owner: impl Into<SmolStr>, name: impl Into<SmolStr>, params: Vec<Param>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            params,
            strategy: None,
            skip: false,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    /// The first parameter without a type restriction, if any.
    pub fn first_untyped(&self) -> Option<&Param> {
        self.params.iter().find(|p| p.constraint.is_none())
    }

    /// The type signature, or `None` when any parameter is untyped.
    pub fn signature(&self) -> Option<TypeSignature> {
        self.params.iter().map(|p| p.constraint.clone()).collect()
    }

    /// `min` counts parameters without a default, `max` counts all of them.
    pub fn arity(&self) -> Arity {
        let required = self.params.iter().filter(|p| !p.has_default).count();
        Arity::new(required, self.params.len())
    }

    /// A defaulted parameter followed by a required one: positional calls can
    /// not skip the default, so the arity range is not a plain interval.
    pub fn has_interior_default(&self) -> bool {
        self.params
            .iter()
            .skip_while(|p| !p.has_default)
            .any(|p| !p.has_default)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}({})",
            self.owner,
            self.name,
            self.params.iter().join(", ")
        )
    }
}

/// A participating type and its methods, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: SmolStr,
    /// Type-level strategy, applied to every method without its own override.
    pub strategy: Option<Strategy>,
    pub methods: Vec<MethodDescriptor>,
}

impl TypeDecl {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            strategy: None,
            methods: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }
}
