//! # The Container: factory mode
//!
//! Produces component instances from registered recipes, falling back to
//! automatic constructor resolution for the default variant.
//!
//! # Architecture
//! ```text
//! ContainerBuilder ──build()──> Container ──get()──> InstanceCache
//!                                   │                    │ miss
//!                                   └──make()──> ResolutionContext ──> Registry
//! ```
//!
//! # Examples
//! ```rust
//! use qalib_container::prelude::*;
//! use qalib_container::component::{Arguments, Parameter};
//! use qalib_container::value::{FieldMap, Value};
//!
//! struct Greeting {
//!     text: String,
//! }
//!
//! impl Component for Greeting {
//!     fn parameters() -> Vec<Parameter> {
//!         vec![Parameter::primitive::<String>("text").with_default(|| Value::data("Hello"))]
//!     }
//!     fn construct(mut args: Arguments) -> Result<Self> {
//!         Ok(Self { text: args.data("text")? })
//!     }
//!     fn fields(&self) -> Result<FieldMap> {
//!         Ok(FieldMap::new().with("text", Value::data(&self.text)?))
//!     }
//! }
//!
//! let container = Container::builder()
//!     .add_variant::<Greeting>("formal", Recipe::arguments(["Good evening"]))
//!     .build()
//!     .expect("Failed to build container");
//!
//! let plain: std::sync::Arc<Greeting> = container.get(Params::new()).unwrap();
//! let formal: std::sync::Arc<Greeting> = container.get(params! { "variant" => "formal" }).unwrap();
//! assert_eq!(plain.text, "Hello");
//! assert_eq!(formal.text, "Good evening");
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use qalib_support::rendering::suggest_similar;

use crate::cache::InstanceCache;
use crate::component::{Component, ComponentDescriptor};
use crate::error::{ClassNotFoundError, QalibError, Result};
use crate::key::{DEFAULT_VARIANT, TypeKey};
use crate::provider::{Provider, RecipeRegistry};
use crate::registry::{Recipe, Registration, Registry};
use crate::resolver::{ResolutionContext, downcast};
use crate::settings::Settings;
use crate::value::{Instance, Params};

/// State shared by a container and every resolution it runs.
pub(crate) struct Shared {
    pub registry: RwLock<Registry>,
    pub cache: InstanceCache,
    pub settings: Settings,
}

impl Shared {
    pub fn new(settings: Settings) -> Self {
        Self {
            registry: RwLock::new(Registry::new()),
            cache: InstanceCache::new(),
            settings,
        }
    }
}

// ============================================================
// ContainerBuilder
// ============================================================

/// Builds a [`Container`] with initial recipes and settings.
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .max_depth(32)
///     .add::<Theme>(Recipe::instance(Theme::dark()))
///     .add_variant::<Button>("danger", Recipe::arguments(["Delete", "danger"]))
///     .add_provider(&FormsProvider)
///     .build()?;
/// ```
pub struct ContainerBuilder {
    registrations: Vec<Registration>,
    settings: Settings,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            registrations: Vec::new(),
            settings: Settings::default(),
        }
    }

    /// Replaces all settings.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Bounds nested resolution depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.settings.max_depth = max_depth;
        self
    }

    /// Register a recipe as the default variant of `T`.
    pub fn add<T: Component>(self, recipe: Recipe) -> Self {
        self.add_variant::<T>(DEFAULT_VARIANT, recipe)
    }

    /// Register a recipe for a named variant of `T`.
    pub fn add_variant<T: Component>(mut self, variant: impl Into<String>, recipe: Recipe) -> Self {
        self.registrations
            .push(Registration::of::<T>(recipe).variant(variant));
        self
    }

    /// Register several variants of `T` at once.
    pub fn add_variants<T, V>(mut self, recipes: impl IntoIterator<Item = (V, Recipe)>) -> Self
    where
        T: Component,
        V: Into<String>,
    {
        for (variant, recipe) in recipes {
            self = self.add_variant::<T>(variant, recipe);
        }
        self
    }

    /// Add a [`Provider`] module.
    pub fn add_provider(mut self, provider: &dyn Provider) -> Self {
        debug!(provider = provider.name(), "Applying provider");
        provider.register(&mut self);
        self
    }

    /// Build the container.
    ///
    /// # Errors
    /// [`QalibError::TypeMismatch`] if a recipe produces a type other than
    /// the one it was registered for.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<Container> {
        info!(registered = self.registrations.len(), "Building container");

        let shared = Shared::new(self.settings);
        {
            let mut registry = shared.registry.write();
            for registration in self.registrations {
                registry.register(registration)?;
            }
        }

        info!("Container built successfully ✓");
        Ok(Container {
            shared: Arc::new(shared),
        })
    }
}

impl RecipeRegistry for ContainerBuilder {
    fn register_recipe(&mut self, registration: Registration) {
        self.registrations.push(registration);
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Thread-safe component container in factory mode.
///
/// Cloning is cheap; clones share registrations and cache.
#[derive(Clone)]
pub struct Container {
    shared: Arc<Shared>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// An empty container with default settings.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::new(Settings::default())),
        }
    }

    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    // ── Registration ──

    /// Register a recipe as the default variant of `T`.
    pub fn add<T: Component>(&self, recipe: Recipe) -> Result<()> {
        self.add_variant::<T>(DEFAULT_VARIANT, recipe)
    }

    /// Register a recipe for a named variant of `T`, replacing any previous one.
    pub fn add_variant<T: Component>(&self, variant: impl Into<String>, recipe: Recipe) -> Result<()> {
        self.shared
            .registry
            .write()
            .register(Registration::of::<T>(recipe).variant(variant))
    }

    /// Register several variants of `T` at once.
    pub fn add_variants<T, V>(&self, recipes: impl IntoIterator<Item = (V, Recipe)>) -> Result<()>
    where
        T: Component,
        V: Into<String>,
    {
        self.add_all(
            recipes
                .into_iter()
                .map(|(variant, recipe)| Registration::of::<T>(recipe).variant(variant)),
        )
    }

    /// Register entries for any number of types.
    ///
    /// Stops at the first rejected entry; earlier entries stay registered.
    pub fn add_all(&self, registrations: impl IntoIterator<Item = Registration>) -> Result<()> {
        let mut registry = self.shared.registry.write();
        for registration in registrations {
            registry.register(registration)?;
        }
        Ok(())
    }

    // ── Resolution ──

    /// Resolve `T`, reusing a cached instance for identical parameters.
    ///
    /// A `variant` key in `params` selects the variant; every other key
    /// overrides a constructor parameter.
    ///
    /// ```rust,ignore
    /// let button: Arc<Button> = container.get(params! { "variant" => "danger" })?;
    /// ```
    pub fn get<T: Component>(&self, mut params: Params) -> Result<Arc<T>> {
        let variant = params.take_variant()?;
        self.get_variant(variant.as_deref().unwrap_or(DEFAULT_VARIANT), params)
    }

    /// Resolve a named variant of `T` through the cache.
    pub fn get_variant<T: Component>(&self, variant: &str, params: Params) -> Result<Arc<T>> {
        downcast(self.get_instance(&T::descriptor(), variant, &params)?)
    }

    /// Resolve `T` freshly, ignoring the cache.
    pub fn make<T: Component>(&self, mut params: Params) -> Result<Arc<T>> {
        let variant = params.take_variant()?;
        self.make_variant(variant.as_deref().unwrap_or(DEFAULT_VARIANT), params)
    }

    /// Resolve a named variant of `T` freshly, ignoring the cache.
    pub fn make_variant<T: Component>(&self, variant: &str, params: Params) -> Result<Arc<T>> {
        downcast(self.make_instance(&T::descriptor(), variant, &params)?)
    }

    /// Resolve a component by type name, through the cache.
    ///
    /// # Errors
    /// [`QalibError::ClassNotFound`] if no component has that name.
    pub fn get_by_name(&self, name: &str, mut params: Params) -> Result<Instance> {
        let descriptor = self.locate(name)?;
        let variant = params.take_variant()?;
        self.get_instance(&descriptor, variant.as_deref().unwrap_or(DEFAULT_VARIANT), &params)
    }

    /// Resolve a component by type name, ignoring the cache.
    pub fn make_by_name(&self, name: &str, mut params: Params) -> Result<Instance> {
        let descriptor = self.locate(name)?;
        let variant = params.take_variant()?;
        self.make_instance(&descriptor, variant.as_deref().unwrap_or(DEFAULT_VARIANT), &params)
    }

    #[instrument(skip_all, fields(component = %descriptor.key(), variant = %variant))]
    fn get_instance(
        &self,
        descriptor: &ComponentDescriptor,
        variant: &str,
        params: &Params,
    ) -> Result<Instance> {
        ResolutionContext::new(&self.shared).get(descriptor, variant, params)
    }

    #[instrument(skip_all, fields(component = %descriptor.key(), variant = %variant))]
    fn make_instance(
        &self,
        descriptor: &ComponentDescriptor,
        variant: &str,
        params: &Params,
    ) -> Result<Instance> {
        ResolutionContext::new(&self.shared).resolve(descriptor, variant, params)
    }

    fn locate(&self, name: &str) -> Result<ComponentDescriptor> {
        let registry = self.shared.registry.read();
        registry.descriptor_by_name(name).ok_or_else(|| {
            let known = registry.known_names();
            QalibError::ClassNotFound(ClassNotFoundError {
                requested: name.to_string(),
                suggestions: suggest_similar(name, &known, 3),
            })
        })
    }

    // ── Introspection ──

    /// Returns `true` if a recipe is registered for `(T, variant)`.
    pub fn has<T: Component>(&self, variant: &str) -> bool {
        self.shared.registry.read().has(&TypeKey::of::<T>(), variant)
    }

    /// Registered variants of `T`, in registration order.
    pub fn variants<T: Component>(&self) -> Vec<String> {
        self.shared.registry.read().variants_of(&TypeKey::of::<T>())
    }

    /// Number of cached instances.
    pub fn cached(&self) -> usize {
        self.shared.cache.len()
    }

    /// Drops all recipes and cached instances.
    pub fn clear(&self) {
        self.shared.registry.write().clear();
        self.shared.cache.clear();
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.shared.registry.read().len())
            .field("cached", &self.shared.cache.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder};
    pub use crate::component::Component;
    pub use crate::error::{QalibError, Result};
    pub use crate::fallback::ErrorComponent;
    pub use crate::key::{DEFAULT_VARIANT, TypeKey};
    pub use crate::params;
    pub use crate::prototype::{Built, PrototypeContainer};
    pub use crate::provider::{Provider, RecipeRegistry};
    pub use crate::registry::{Recipe, Registration};
    pub use crate::resolver::{Resolver, ResolverExt};
    pub use crate::settings::{ErrorMode, Settings};
    pub use crate::value::{Params, Value};
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
