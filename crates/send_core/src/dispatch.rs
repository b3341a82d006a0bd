// ==============================================================================
// Dispatch
// ==============================================================================
//
// A `Dispatcher` holds one `DispatchEntry` per populated combination table.
// A send resolves in three steps:
//
// 1. The entry whose combination is exactly the runtime argument types.
// 2. Otherwise, entries whose combination accepts those types through an
//    abstract family (`Number`, `Int::Signed`, ...), most specific first:
//    fewest abstract positions, then narrowest families, then table order.
// 3. Nothing matched: the catch-all. It always raises `MethodMissing`.
//
// After activation a dispatcher is immutable and shared behind an `Arc`.

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use rustc_hash::FxHashMap;
use send_ty::{label, Arity, Combination, ConcreteTy, Value};
use smol_str::SmolStr;

use crate::callsite::{synthesize, CallSite, ErasedMethod};
use crate::{ConfigurationError, DispatchPlan, IntrospectionIndex, MethodMissing};

/// The compiled entry for one combination.
pub struct DispatchEntry<T, E> {
    ident: SmolStr,
    combination: Combination,
    sites: FxHashMap<SmolStr, CallSite<T, E>>,
}

impl<T, E> DispatchEntry<T, E> {
    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn combination(&self) -> &Combination {
        &self.combination
    }

    pub fn get(&self, name: &str) -> Option<&CallSite<T, E>> {
        self.sites.get(name)
    }

    /// Method names in this entry, sorted.
    pub fn names(&self) -> Vec<&SmolStr> {
        self.sites.keys().sorted().collect()
    }
}

pub struct Dispatcher<T, E> {
    receiver: SmolStr,
    entries: Vec<DispatchEntry<T, E>>,
    by_combination: FxHashMap<Combination, usize>,
    index: IntrospectionIndex,
}

impl<T: 'static, E: 'static> Dispatcher<T, E> {
    /// Synthesize every call-site of `plan`. `handlers[i]` is the handler of
    /// the `i`-th method of the declaration the plan was compiled from.
    pub fn from_plan(
        plan: &DispatchPlan,
        handlers: &[ErasedMethod<T, E>],
    ) -> Result<Self, ConfigurationError> {
        let mut entries = Vec::new();
        let mut by_combination = FxHashMap::default();

        for (combo, table) in plan.tables.populated() {
            let mut sites = FxHashMap::default();
            for (name, &id) in &table.entries {
                let method = &plan.methods[id];
                let handler = handlers.get(method.decl_index).cloned().ok_or_else(|| {
                    ConfigurationError::MissingHandler {
                        owner: plan.owner.clone(),
                        name: name.clone(),
                    }
                })?;
                let site = synthesize(method, combo, plan.strategy_of(id), handler)?;
                sites.insert(name.clone(), site);
            }

            by_combination.insert(combo.clone(), entries.len());
            entries.push(DispatchEntry {
                ident: label::table_ident(combo),
                combination: combo.clone(),
                sites,
            });
        }

        Ok(Self {
            receiver: plan.owner.clone(),
            entries,
            by_combination,
            index: plan.index.clone(),
        })
    }
}

impl<T, E> Dispatcher<T, E> {
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn entries(&self) -> &[DispatchEntry<T, E>] {
        &self.entries
    }

    pub fn combinations(&self) -> impl Iterator<Item = &Combination> + '_ {
        self.entries.iter().map(|e| &e.combination)
    }

    pub fn index(&self) -> &IntrospectionIndex {
        &self.index
    }

    pub fn arity_of(&self, name: impl AsRef<str>) -> Option<Arity> {
        self.index.arity_of(name.as_ref())
    }

    pub fn exists(&self, name: impl AsRef<str>) -> bool {
        self.index.exists(name.as_ref())
    }

    /// The call-site a send of `name` with arguments of `arg_tys` would use.
    pub fn resolve(&self, name: &str, arg_tys: &[ConcreteTy]) -> Option<&CallSite<T, E>> {
        let exact = self.by_combination.get(arg_tys).copied();
        if let Some(site) = exact.and_then(|idx| self.entries[idx].get(name)) {
            return Some(site);
        }

        self.entries
            .iter()
            .enumerate()
            .filter(|(idx, entry)| Some(*idx) != exact && entry.combination.accepts(arg_tys))
            .sorted_by_key(|(idx, entry)| {
                let combo = &entry.combination;
                (combo.abstract_positions(), combo.breadth(), *idx)
            })
            .find_map(|(_, entry)| entry.get(name))
    }

    /// Send `name` to `receiver`. The outer error is a miss; the inner result
    /// is exactly what the method returned.
    pub fn try_invoke(
        &self,
        receiver: &mut T,
        name: impl AsRef<str>,
        args: &[Value],
    ) -> Result<Result<Value, E>, MethodMissing> {
        let name = name.as_ref();
        let arg_tys: Vec<ConcreteTy> = args.iter().map(Value::ty).collect();

        let Some(site) = self.resolve(name, &arg_tys) else {
            if !self.entries.iter().any(|e| e.combination.accepts(&arg_tys)) {
                log::debug!("{}: catch-all for `{name}`", self.receiver);
            }
            return Err(self.missing(name, arg_tys));
        };

        log::trace!("{}: `{name}` via {}", self.receiver, site.ident());
        site.invoke(receiver, args).ok_or_else(|| self.missing(name, arg_tys))
    }

    /// Send `name` to `receiver`, raising `MethodMissing` on a miss.
    pub fn invoke(
        &self,
        receiver: &mut T,
        name: impl AsRef<str>,
        args: &[Value],
    ) -> Result<Value, E>
    where
        E: From<MethodMissing>,
    {
        self.try_invoke(receiver, name, args)?
    }

    /// Like `invoke`, but a miss is `Ok(None)`. Errors raised by the method
    /// itself still come back as `Err`.
    pub fn invoke_or_absent(
        &self,
        receiver: &mut T,
        name: impl AsRef<str>,
        args: &[Value],
    ) -> Result<Option<Value>, E> {
        match self.try_invoke(receiver, name, args) {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    pub fn bind<'a>(&'a self, receiver: &'a mut T) -> Bound<'a, T, E> {
        Bound {
            dispatcher: self,
            receiver,
        }
    }

    fn missing(&self, name: &str, arg_tys: Vec<ConcreteTy>) -> MethodMissing {
        MethodMissing {
            receiver: self.receiver.clone(),
            name: name.into(),
            args: Combination::new(arg_tys),
        }
    }
}

impl<T, E> fmt::Debug for Dispatcher<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("receiver", &self.receiver)
            .field(
                "entries",
                &self.entries.iter().map(|e| &e.ident).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ==============================================================================
// Dynamic send surface
// ==============================================================================

/// Send by name to a value that can reach its dispatch tables.
pub trait Dispatchable {
    type Error;

    fn invoke(&mut self, name: &str, args: &[Value]) -> Result<Value, Self::Error>;

    fn invoke_or_absent(
        &mut self,
        name: &str,
        args: &[Value],
    ) -> Result<Option<Value>, Self::Error>;

    fn arity_of(&self, name: &str) -> Option<Arity>;

    fn exists(&self, name: &str) -> bool;
}

/// A dispatcher together with the receiver it sends to.
pub struct Bound<'a, T, E> {
    dispatcher: &'a Dispatcher<T, E>,
    receiver: &'a mut T,
}

impl<T, E> Bound<'_, T, E> {
    pub fn receiver(&mut self) -> &mut T {
        self.receiver
    }
}

impl<T, E: From<MethodMissing>> Dispatchable for Bound<'_, T, E> {
    type Error = E;

    fn invoke(&mut self, name: &str, args: &[Value]) -> Result<Value, E> {
        self.dispatcher.invoke(self.receiver, name, args)
    }

    fn invoke_or_absent(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, E> {
        self.dispatcher.invoke_or_absent(self.receiver, name, args)
    }

    fn arity_of(&self, name: &str) -> Option<Arity> {
        self.dispatcher.arity_of(name)
    }

    fn exists(&self, name: &str) -> bool {
        self.dispatcher.exists(name)
    }
}

/// A type that knows where its activated dispatcher lives, usually a
/// `OnceLock` filled right after `Registry::activate`.
pub trait Participant: Sized + 'static {
    type Error: From<MethodMissing>;

    fn dispatcher() -> Option<Arc<Dispatcher<Self, Self::Error>>>;
}

impl<P: Participant> Dispatchable for P {
    type Error = P::Error;

    fn invoke(&mut self, name: &str, args: &[Value]) -> Result<Value, P::Error> {
        match P::dispatcher() {
            Some(dispatcher) => dispatcher.invoke(self, name, args),
            None => Err(unactivated::<P>(name, args).into()),
        }
    }

    fn invoke_or_absent(
        &mut self,
        name: &str,
        args: &[Value],
    ) -> Result<Option<Value>, P::Error> {
        match P::dispatcher() {
            Some(dispatcher) => dispatcher.invoke_or_absent(self, name, args),
            None => Ok(None),
        }
    }

    fn arity_of(&self, name: &str) -> Option<Arity> {
        P::dispatcher()?.arity_of(name)
    }

    fn exists(&self, name: &str) -> bool {
        P::dispatcher().is_some_and(|d| d.exists(name))
    }
}

/// Before activation every send misses.
fn unactivated<P>(name: &str, args: &[Value]) -> MethodMissing {
    MethodMissing {
        receiver: std::any::type_name::<P>().into(),
        name: name.into(),
        args: args.iter().map(Value::ty).collect(),
    }
}
