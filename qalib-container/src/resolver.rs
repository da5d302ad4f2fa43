//! The resolution engine.
//!
//! A [`ResolutionContext`] lives for one top-level `get`/`make` call and
//! owns that call's resolution stack. Factories receive it as a
//! [`Resolver`], so builds they trigger are checked for cycles against
//! the same stack.
//!
//! For a `(type, variant)` pair the engine:
//! 1. pushes the pair (cycle and depth check), popping it on every exit,
//! 2. replays a registered recipe if there is one,
//! 3. otherwise auto-resolves the default variant from the type's
//!    constructor parameters; other variants must be registered.

use std::any::type_name;
use std::cell::RefCell;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::CacheKey;
use crate::component::{Component, ComponentDescriptor, Parameter, ParameterKind};
use crate::container::Shared;
use crate::error::{QalibError, Result, VariantNotFoundError};
use crate::key::DEFAULT_VARIANT;
use crate::registry::Recipe;
use crate::stack::{ResolutionStack, StackGuard};
use crate::value::{Instance, Params, Value};

/// What factory functions receive to build their own dependencies.
///
/// Use the typed methods of [`ResolverExt`].
pub trait Resolver {
    /// Builds (or returns the cached) instance for `(type, variant, params)`.
    fn get_erased(
        &self,
        descriptor: &ComponentDescriptor,
        variant: &str,
        params: &Params,
    ) -> Result<Instance>;

    /// Builds a fresh instance, bypassing the cache.
    fn resolve_erased(
        &self,
        descriptor: &ComponentDescriptor,
        variant: &str,
        params: &Params,
    ) -> Result<Instance>;
}

/// Typed helpers over any [`Resolver`].
///
/// ```rust,ignore
/// Recipe::factory(|r, _| {
///     let icon: Arc<Icon> = r.get(Params::new())?;
///     Ok(Button::with_icon("Save", icon))
/// })
/// ```
pub trait ResolverExt: Resolver {
    /// Cached build. A `variant` key in `params` selects the variant.
    fn get<T: Component>(&self, mut params: Params) -> Result<Arc<T>> {
        let variant = params.take_variant()?;
        let variant = variant.as_deref().unwrap_or(DEFAULT_VARIANT);
        downcast(self.get_erased(&T::descriptor(), variant, &params)?)
    }

    /// Fresh build. A `variant` key in `params` selects the variant.
    fn make<T: Component>(&self, mut params: Params) -> Result<Arc<T>> {
        let variant = params.take_variant()?;
        let variant = variant.as_deref().unwrap_or(DEFAULT_VARIANT);
        downcast(self.resolve_erased(&T::descriptor(), variant, &params)?)
    }

    /// Fresh build of an explicit variant.
    fn resolve<T: Component>(&self, variant: &str, params: &Params) -> Result<Arc<T>> {
        downcast(self.resolve_erased(&T::descriptor(), variant, params)?)
    }
}

impl<R: Resolver + ?Sized> ResolverExt for R {}

/// Recovers the concrete type of an instance.
pub(crate) fn downcast<T: Component>(instance: Instance) -> Result<Arc<T>> {
    instance.downcast::<T>().map_err(|_| QalibError::TypeMismatch {
        expected: T::descriptor().name(),
        reason: format!("resolved instance is not a {}", type_name::<T>()),
    })
}

/// One top-level resolution call.
pub(crate) struct ResolutionContext<'c> {
    shared: &'c Shared,
    stack: RefCell<ResolutionStack>,
}

impl<'c> ResolutionContext<'c> {
    pub fn new(shared: &'c Shared) -> Self {
        Self {
            shared,
            stack: RefCell::new(ResolutionStack::new()),
        }
    }

    /// Cache-first resolution.
    pub fn get(
        &self,
        descriptor: &ComponentDescriptor,
        variant: &str,
        params: &Params,
    ) -> Result<Instance> {
        let key = CacheKey::new(descriptor.key(), variant, params);
        if let Some(hit) = self.shared.cache.get(&key) {
            return Ok(hit);
        }

        let instance = self.resolve(descriptor, variant, params)?;
        Ok(self.shared.cache.insert(key, instance))
    }

    /// Builds an instance without consulting the cache.
    pub fn resolve(
        &self,
        descriptor: &ComponentDescriptor,
        variant: &str,
        params: &Params,
    ) -> Result<Instance> {
        let type_key = descriptor.key();
        let _guard = StackGuard::enter(
            &self.stack,
            type_key.variant(variant),
            self.shared.settings.max_depth,
        )?;

        // Cloned out so the lock is released before a factory runs.
        let recipe = self.shared.registry.read().recipe(&type_key, variant);

        match recipe {
            Some(Recipe::Ready { instance, .. }) => {
                trace!(component = %type_key, variant, "Using ready instance");
                Ok(instance)
            }
            Some(Recipe::Arguments(values)) => {
                trace!(component = %type_key, variant, args = values.len(), "Constructing from arguments");
                self.construct_positional(descriptor, values)
            }
            Some(Recipe::Factory { factory, .. }) => {
                trace!(component = %type_key, variant, "Invoking factory");
                let instance = factory(self, params)?;
                if !descriptor.is_instance(&instance) {
                    return Err(QalibError::TypeMismatch {
                        expected: descriptor.name(),
                        reason: format!("factory for variant '{variant}' returned another type"),
                    });
                }
                Ok(instance)
            }
            None if variant != DEFAULT_VARIANT => {
                Err(QalibError::VariantNotFound(VariantNotFoundError {
                    type_name: descriptor.name(),
                    variant: variant.to_string(),
                    available: self.shared.registry.read().variants_of(&type_key),
                }))
            }
            None => self.autowire(descriptor, params),
        }
    }

    /// Builds `descriptor` from its constructor parameters.
    fn autowire(&self, descriptor: &ComponentDescriptor, params: &Params) -> Result<Instance> {
        debug!(component = %descriptor.key(), "Auto-resolving");

        let parameters = descriptor.parameters();
        let mut values = Vec::with_capacity(parameters.len());
        for parameter in &parameters {
            values.push(self.resolve_parameter(descriptor, parameter, params)?);
        }

        descriptor.construct(values)
    }

    fn resolve_parameter(
        &self,
        owner: &ComponentDescriptor,
        parameter: &Parameter,
        params: &Params,
    ) -> Result<Value> {
        // Explicit values are used verbatim, whatever they look like.
        if let Some(value) = params.get(parameter.name()) {
            return Ok(value.clone());
        }

        if let ParameterKind::Dependency(dependency) = parameter.kind() {
            let dependency = dependency();
            return match self.resolve(&dependency, DEFAULT_VARIANT, &Params::new()) {
                Ok(instance) => Ok(Value::erased(instance, parameter.declared_type())),
                Err(_) if parameter.is_nullable() => {
                    trace!(parameter = parameter.name(), "Dependency unavailable, using absent value");
                    Ok(Value::null())
                }
                Err(err) if err.is_cycle() => Err(err),
                Err(err) => Err(QalibError::UnresolvableDependency {
                    owner: owner.name(),
                    parameter: parameter.name().to_string(),
                    dependency: dependency.name(),
                    source: Box::new(err),
                }),
            };
        }

        self.fallback_value(owner, parameter)
    }

    /// Default, then absent, then failure.
    fn fallback_value(&self, owner: &ComponentDescriptor, parameter: &Parameter) -> Result<Value> {
        if let Some(default) = parameter.default_value() {
            return default;
        }

        if parameter.is_nullable() {
            return Ok(Value::null());
        }

        Err(QalibError::UnresolvableRequiredParameter {
            owner: owner.name(),
            parameter: parameter.name().to_string(),
            declared_type: qalib_support::rendering::shorten_type_name(parameter.declared_type()),
        })
    }

    /// Spreads a registered argument list into the constructor.
    fn construct_positional(
        &self,
        descriptor: &ComponentDescriptor,
        mut values: Vec<Value>,
    ) -> Result<Instance> {
        let parameters = descriptor.parameters();

        if values.len() > parameters.len() {
            return Err(QalibError::construction(
                descriptor.name(),
                format!(
                    "expected at most {} arguments, got {}",
                    parameters.len(),
                    values.len()
                ),
            ));
        }

        for parameter in parameters.iter().skip(values.len()) {
            values.push(self.fallback_value(descriptor, parameter)?);
        }

        descriptor.construct(values)
    }
}

impl Resolver for ResolutionContext<'_> {
    fn get_erased(
        &self,
        descriptor: &ComponentDescriptor,
        variant: &str,
        params: &Params,
    ) -> Result<Instance> {
        self.get(descriptor, variant, params)
    }

    fn resolve_erased(
        &self,
        descriptor: &ComponentDescriptor,
        variant: &str,
        params: &Params,
    ) -> Result<Instance> {
        self.resolve(descriptor, variant, params)
    }
}
