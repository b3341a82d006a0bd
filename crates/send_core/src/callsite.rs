// ==============================================================================
// Call-site synthesis
// ==============================================================================
//
// A call-site is the invocable wrapper for one (method, combination) pair.
// Both strategies end in the same erased method call and behave identically;
// they differ in how the arguments are held on the way there.
//
// - Closure: the site is a boxed closure over the method.
// - Value object: the site owns a fixed storage layout derived from the
//   combination, and each call packs its arguments into a `Record` with that
//   layout before invoking. Abstract family types have no fixed storage, so
//   synthesis fails for them.

use std::sync::Arc;

use send_ty::{label, Carrier, Combination, ConcreteTy, Strategy, Value};
use smol_str::SmolStr;

use crate::extract::RetainedMethod;
use crate::handler::Outcome;
use crate::ConfigurationError;

/// A handler with its argument types erased.
pub type ErasedMethod<T, E> = Arc<dyn Fn(&mut T, &[Value]) -> Outcome<E> + Send + Sync>;

type SiteFn<T, E> = Box<dyn Fn(&mut T, &[Value]) -> Outcome<E> + Send + Sync>;

pub struct CallSite<T, E> {
    ident: SmolStr,
    combination: Combination,
    kind: SiteKind<T, E>,
}

enum SiteKind<T, E> {
    Closure(SiteFn<T, E>),
    Record(RecordSite<T, E>),
}

/// Storage layout for a value-object call-site.
struct RecordSite<T, E> {
    layout: Box<[Carrier]>,
    method: ErasedMethod<T, E>,
}

/// The arguments of one call, packed according to a `RecordSite` layout.
struct Record<'site, T, E> {
    site: &'site RecordSite<T, E>,
    slots: Vec<Value>,
}

/// The carrier of every position, or the first type that has none.
pub fn record_layout(combo: &Combination) -> Result<Box<[Carrier]>, ConcreteTy> {
    combo
        .iter()
        .map(|ty| ty.carrier().ok_or_else(|| ty.clone()))
        .collect()
}

/// Build the call-site for `method` at `combo`. Never calls the method.
pub fn synthesize<T: 'static, E: 'static>(
    method: &RetainedMethod,
    combo: &Combination,
    strategy: Strategy,
    handler: ErasedMethod<T, E>,
) -> Result<CallSite<T, E>, ConfigurationError> {
    let kind = match strategy {
        Strategy::Closure => {
            SiteKind::Closure(Box::new(move |receiver: &mut T, args: &[Value]| {
                handler(receiver, args)
            }))
        }
        Strategy::ValueObject => {
            let layout =
                record_layout(combo).map_err(|ty| ConfigurationError::Unstorable {
                    owner: method.descriptor.owner.clone(),
                    name: method.descriptor.name.clone(),
                    ty,
                    combination: combo.clone(),
                })?;
            SiteKind::Record(RecordSite {
                layout,
                method: handler,
            })
        }
    };

    Ok(CallSite {
        ident: label::callsite_ident(method.name(), &method.signature),
        combination: combo.clone(),
        kind,
    })
}

impl<T, E> CallSite<T, E> {
    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn combination(&self) -> &Combination {
        &self.combination
    }

    pub fn strategy(&self) -> Strategy {
        match self.kind {
            SiteKind::Closure(_) => Strategy::Closure,
            SiteKind::Record(_) => Strategy::ValueObject,
        }
    }

    /// Call the method on `receiver`. `None` when the arguments do not fit
    /// the site, which the dispatcher reports as a missing method.
    pub fn invoke(&self, receiver: &mut T, args: &[Value]) -> Outcome<E> {
        match &self.kind {
            SiteKind::Closure(f) => f(receiver, args),
            SiteKind::Record(site) => site.pack(args)?.call(receiver),
        }
    }
}

impl<T, E> RecordSite<T, E> {
    fn pack(&self, args: &[Value]) -> Option<Record<'_, T, E>> {
        if args.len() != self.layout.len() {
            return None;
        }
        let fits = self
            .layout
            .iter()
            .zip(args)
            .all(|(carrier, value)| carrier.admits(value));
        fits.then(|| Record {
            site: self,
            slots: args.to_vec(),
        })
    }
}

impl<T, E> Record<'_, T, E> {
    fn call(self, receiver: &mut T) -> Outcome<E> {
        (self.site.method)(receiver, &self.slots)
    }
}

impl<T, E> std::fmt::Debug for CallSite<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSite")
            .field("ident", &self.ident)
            .field("combination", &self.combination)
            .field("strategy", &self.strategy())
            .finish()
    }
}
