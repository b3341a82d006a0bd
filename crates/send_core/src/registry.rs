// ==============================================================================
// Registry lifecycle
// ==============================================================================
//
// Participating types are registered one `TypeSpec` at a time while the
// registry is `Uninitialized`. A single `activate` call compiles all of them;
// afterwards the registry is `Activated` and read-only:
//
//   Uninitialized --register--> Uninitialized --activate--> Activated
//
// Activation is all or nothing. If any type fails to compile nothing is
// published and the registry stays `Uninitialized`. A second activation is a
// `ConfigurationError` and leaves the published dispatchers untouched.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use send_ty::{Constraint, MethodDescriptor, Param, Strategy, TypeDecl, Value};
use smol_str::{format_smolstr, SmolStr};

use crate::callsite::ErasedMethod;
use crate::handler::Handler;
use crate::{compile, CompileOptions, ConfigurationError, Diagnostic, Dispatcher};

/// One method of a participating type, with its handler.
pub struct MethodSpec<T, E> {
    name: SmolStr,
    constraints: Vec<Option<Constraint>>,
    param_names: Vec<SmolStr>,
    defaults: usize,
    strategy: Option<Strategy>,
    skip: bool,
    method: ErasedMethod<T, E>,
}

impl<T: 'static, E: 'static> MethodSpec<T, E> {
    /// The parameter types of `handler` become the method's signature.
    pub fn new<H, Args>(name: impl Into<SmolStr>, handler: H) -> Self
    where
        H: Handler<T, E, Args>,
    {
        let constraints = <H as Handler<T, E, Args>>::constraints();
        let method: ErasedMethod<T, E> =
            Arc::new(move |receiver: &mut T, args: &[Value]| handler.call(receiver, args));

        Self {
            name: name.into(),
            constraints,
            param_names: Vec::new(),
            defaults: 0,
            strategy: None,
            skip: false,
            method,
        }
    }
}

impl<T, E> MethodSpec<T, E> {
    /// Parameter names, used in diagnostics. Unnamed positions are `argN`.
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        self.param_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the last `count` parameters as defaulted. This only widens the
    /// reported arity; a send still passes every argument.
    pub fn defaults(mut self, count: usize) -> Self {
        self.defaults = count;
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Keep the method out of every dispatch table.
    pub fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    fn descriptor(&self, owner: &SmolStr) -> MethodDescriptor {
        let first_default = self.constraints.len().saturating_sub(self.defaults);
        let params = self
            .constraints
            .iter()
            .enumerate()
            .map(|(idx, constraint)| Param {
                name: self
                    .param_names
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format_smolstr!("arg{idx}")),
                constraint: constraint.clone(),
                has_default: idx >= first_default,
            })
            .collect();

        MethodDescriptor {
            owner: owner.clone(),
            name: self.name.clone(),
            params,
            strategy: self.strategy,
            skip: self.skip,
        }
    }
}

/// A participating type: its name, type-level strategy and methods.
pub struct TypeSpec<T, E> {
    name: SmolStr,
    strategy: Option<Strategy>,
    methods: Vec<MethodSpec<T, E>>,
}

impl<T: 'static, E: 'static> TypeSpec<T, E> {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            strategy: None,
            methods: Vec::new(),
        }
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn method(mut self, method: MethodSpec<T, E>) -> Self {
        self.methods.push(method);
        self
    }

    /// Shorthand for `method(MethodSpec::new(name, handler))`.
    pub fn handler<H, Args>(self, name: impl Into<SmolStr>, handler: H) -> Self
    where
        H: Handler<T, E, Args>,
    {
        self.method(MethodSpec::new(name, handler))
    }

    pub fn name(&self) -> &SmolStr {
        &self.name
    }

    pub fn decl(&self) -> TypeDecl {
        TypeDecl {
            name: self.name.clone(),
            strategy: self.strategy,
            methods: self.methods.iter().map(|m| m.descriptor(&self.name)).collect(),
        }
    }

    /// Compile this type on its own, outside any registry.
    pub fn build(
        &self,
        options: &CompileOptions,
    ) -> Result<(Dispatcher<T, E>, Vec<Diagnostic>), ConfigurationError> {
        let compiled = compile(&self.decl(), options)?;
        let handlers: Vec<_> = self.methods.iter().map(|m| m.method.clone()).collect();
        let dispatcher = Dispatcher::from_plan(&compiled.plan, &handlers)?;
        Ok((dispatcher, compiled.diagnostics))
    }
}

type AnyDispatcher = Arc<dyn Any + Send + Sync>;

trait PendingType: Send + Sync {
    fn name(&self) -> &SmolStr;

    fn build_any(
        &self,
        options: &CompileOptions,
    ) -> Result<(AnyDispatcher, Vec<Diagnostic>), ConfigurationError>;
}

impl<T: 'static, E: 'static> PendingType for TypeSpec<T, E> {
    fn name(&self) -> &SmolStr {
        &self.name
    }

    fn build_any(
        &self,
        options: &CompileOptions,
    ) -> Result<(AnyDispatcher, Vec<Diagnostic>), ConfigurationError> {
        let (dispatcher, diagnostics) = self.build(options)?;
        Ok((Arc::new(dispatcher), diagnostics))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Uninitialized,
    Activated,
}

#[derive(Default)]
pub struct Registry {
    options: CompileOptions,
    state: State,
    pending: Vec<(TypeId, Box<dyn PendingType>)>,
    dispatchers: FxHashMap<TypeId, AnyDispatcher>,
    diagnostics: Vec<Diagnostic>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_activated(&self) -> bool {
        self.state == State::Activated
    }

    /// Add a participating type. Only allowed before activation, and at most
    /// once per Rust type and per type name.
    pub fn register<T: 'static, E: 'static>(
        &mut self,
        spec: TypeSpec<T, E>,
    ) -> Result<(), ConfigurationError> {
        if self.is_activated() {
            return Err(ConfigurationError::RegisterAfterActivation { ty: spec.name });
        }

        let id = TypeId::of::<T>();
        let taken = self
            .pending
            .iter()
            .any(|(other, pending)| *other == id || *pending.name() == spec.name);
        if taken {
            return Err(ConfigurationError::DuplicateType { ty: spec.name });
        }

        log::debug!("registered {}", spec.name);
        self.pending.push((id, Box::new(spec)));
        Ok(())
    }

    /// Compile every registered type and publish the dispatchers.
    pub fn activate(&mut self) -> Result<(), ConfigurationError> {
        if self.is_activated() {
            return Err(ConfigurationError::AlreadyActivated);
        }

        let mut dispatchers = FxHashMap::default();
        let mut diagnostics = Vec::new();
        for (id, pending) in &self.pending {
            let (dispatcher, diags) = pending.build_any(&self.options)?;
            dispatchers.insert(*id, dispatcher);
            diagnostics.extend(diags);
        }

        for diag in &diagnostics {
            log::info!("{diag}");
        }
        log::debug!("activated {} types", dispatchers.len());

        self.dispatchers = dispatchers;
        self.diagnostics = diagnostics;
        self.pending.clear();
        self.state = State::Activated;
        Ok(())
    }

    /// The published dispatcher for `T`. `None` before activation, for
    /// unregistered types, and when `E` is not the registered error type.
    pub fn dispatcher<T: 'static, E: 'static>(&self) -> Option<Arc<Dispatcher<T, E>>> {
        let any = self.dispatchers.get(&TypeId::of::<T>())?;
        Arc::clone(any).downcast::<Dispatcher<T, E>>().ok()
    }

    /// Non-fatal findings of the activation pass.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("state", &self.state)
            .field(
                "pending",
                &self.pending.iter().map(|(_, p)| p.name()).collect::<Vec<_>>(),
            )
            .field("activated", &self.dispatchers.len())
            .finish()
    }
}
