//! Component registry: recipes and prototypes per `(type, variant)`.
//!
//! Variants of a type are kept in registration order; registering the
//! same pair again replaces the entry in place.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::component::{self, Component, ComponentDescriptor};
use crate::error::{QalibError, Result};
use crate::key::{DEFAULT_VARIANT, TypeKey, VariantKey};
use crate::resolver::Resolver;
use crate::value::{Instance, Params, Value};

/// Type alias for factory functions.
///
/// A factory receives the per-call [`Resolver`] (to build its own
/// dependencies) and the caller's parameters. Recipes are cloned out of
/// the registry lock before they run, so a factory may re-enter the
/// container.
pub type FactoryFn = Arc<dyn Fn(&dyn Resolver, &Params) -> Result<Instance> + Send + Sync>;

/// A registered means of producing an instance.
#[derive(Clone)]
pub enum Recipe {
    /// A ready object, returned as is.
    Ready { instance: Instance, produces: TypeKey },
    /// Positional constructor arguments.
    Arguments(Vec<Value>),
    /// A factory function.
    Factory {
        factory: FactoryFn,
        produces: Option<TypeKey>,
    },
}

impl Recipe {
    /// A ready object.
    pub fn instance<T: Any + Send + Sync>(value: T) -> Self {
        Self::shared(Arc::new(value))
    }

    /// A ready object that is already shared.
    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Recipe::Ready {
            instance: value,
            produces: TypeKey::of::<T>(),
        }
    }

    /// Positional constructor arguments.
    pub fn arguments<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Recipe::Arguments(values.into_iter().map(Into::into).collect())
    }

    /// A typed factory.
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&dyn Resolver, &Params) -> Result<T> + Send + Sync + 'static,
    {
        Recipe::Factory {
            factory: Arc::new(move |resolver: &dyn Resolver, params: &Params| {
                Ok(Arc::new(factory(resolver, params)?) as Instance)
            }),
            produces: Some(TypeKey::of::<T>()),
        }
    }

    /// An untyped factory; its result is checked when it runs.
    pub fn factory_erased<F>(factory: F) -> Self
    where
        F: Fn(&dyn Resolver, &Params) -> Result<Instance> + Send + Sync + 'static,
    {
        Recipe::Factory {
            factory: Arc::new(factory),
            produces: None,
        }
    }

    /// The type this recipe is known to produce, if any.
    pub fn produces(&self) -> Option<TypeKey> {
        match self {
            Recipe::Ready { produces, .. } => Some(*produces),
            Recipe::Arguments(_) => None,
            Recipe::Factory { produces, .. } => *produces,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Recipe::Ready { .. } => "instance",
            Recipe::Arguments(_) => "arguments",
            Recipe::Factory { .. } => "factory",
        }
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipe::Arguments(values) => f.debug_tuple("Arguments").field(values).finish(),
            other => write!(f, "Recipe({})", other.kind()),
        }
    }
}

/// One `(type, variant) → recipe` entry.
#[derive(Clone, Debug)]
pub struct Registration {
    pub descriptor: ComponentDescriptor,
    pub variant: String,
    pub recipe: Recipe,
}

impl Registration {
    /// Registers `recipe` as the default variant of `T`.
    pub fn of<T: Component>(recipe: Recipe) -> Self {
        Self {
            descriptor: T::descriptor(),
            variant: DEFAULT_VARIANT.to_string(),
            recipe,
        }
    }

    /// Changes the variant name.
    pub fn variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = variant.into();
        self
    }

    pub fn key(&self) -> VariantKey {
        self.descriptor.key().variant(self.variant.clone())
    }
}

/// Variant name → entry, in insertion order.
#[derive(Debug)]
struct VariantTable<E> {
    entries: Vec<(String, E)>,
}

impl<E: Clone> VariantTable<E> {
    fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Inserts or replaces in place; returns `true` on replace.
    fn insert(&mut self, variant: String, entry: E) -> bool {
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == variant) {
            slot.1 = entry;
            return true;
        }
        self.entries.push((variant, entry));
        false
    }

    fn get(&self, variant: &str) -> Option<&E> {
        self.entries
            .iter()
            .find(|(name, _)| name == variant)
            .map(|(_, entry)| entry)
    }

    fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Stores recipes, prototypes and the component types seen so far.
#[derive(Default)]
pub(crate) struct Registry {
    descriptors: HashMap<TypeKey, ComponentDescriptor>,
    recipes: HashMap<TypeKey, VariantTable<Recipe>>,
    prototypes: HashMap<TypeKey, VariantTable<Instance>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers a component type, so it can be found by name.
    pub fn know(&mut self, descriptor: ComponentDescriptor) {
        self.descriptors.entry(descriptor.key()).or_insert(descriptor);
    }

    /// Looks up a component type seen by this registry or derived anywhere.
    pub fn descriptor(&self, key: &TypeKey) -> Option<ComponentDescriptor> {
        self.descriptors
            .get(key)
            .copied()
            .or_else(|| component::find_by_key(key))
    }

    /// Looks up a component type by short or fully qualified name.
    pub fn descriptor_by_name(&self, name: &str) -> Option<ComponentDescriptor> {
        self.descriptors
            .values()
            .find(|d| d.matches_name(name))
            .copied()
            .or_else(|| component::find_by_name(name))
    }

    /// Every component type name this registry can locate.
    pub fn known_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .descriptors
            .keys()
            .map(TypeKey::type_name)
            .collect();
        for descriptor in component::known_components() {
            let name = descriptor.key().type_name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Stores a recipe, replacing any previous one for the same pair.
    ///
    /// # Errors
    /// [`QalibError::TypeMismatch`] if the recipe is known to produce a
    /// different type than the one it is registered for.
    pub fn register(&mut self, registration: Registration) -> Result<()> {
        let key = registration.descriptor.key();

        if let Some(produces) = registration.recipe.produces() {
            if produces != key {
                return Err(QalibError::TypeMismatch {
                    expected: key.short_name(),
                    reason: format!("recipe produces {}", produces.short_name()),
                });
            }
        }

        self.know(registration.descriptor);
        let kind = registration.recipe.kind();
        let replaced = self
            .recipes
            .entry(key)
            .or_insert_with(VariantTable::new)
            .insert(registration.variant.clone(), registration.recipe);

        debug!(
            component = %key,
            variant = %registration.variant,
            recipe = kind,
            replaced,
            "Registered recipe"
        );
        Ok(())
    }

    /// Stores a prototype instance.
    ///
    /// # Errors
    /// [`QalibError::TypeMismatch`] if `key` is not a component type or
    /// `prototype` is not an instance of it.
    pub fn register_prototype(
        &mut self,
        key: &TypeKey,
        prototype: Instance,
        variant: &str,
    ) -> Result<()> {
        let descriptor = self.descriptor(key).ok_or_else(|| QalibError::TypeMismatch {
            expected: key.short_name(),
            reason: "not a component type; derive `Component` for it".to_string(),
        })?;

        if !descriptor.is_instance(&prototype) {
            return Err(QalibError::TypeMismatch {
                expected: descriptor.name(),
                reason: "prototype is an instance of a different type".to_string(),
            });
        }

        self.know(descriptor);
        let replaced = self
            .prototypes
            .entry(*key)
            .or_insert_with(VariantTable::new)
            .insert(variant.to_string(), prototype);

        debug!(component = %key, variant, replaced, "Registered prototype");
        Ok(())
    }

    pub fn has(&self, key: &TypeKey, variant: &str) -> bool {
        self.recipes
            .get(key)
            .is_some_and(|table| table.get(variant).is_some())
    }

    pub fn has_prototype(&self, key: &TypeKey, variant: &str) -> bool {
        self.prototypes
            .get(key)
            .is_some_and(|table| table.get(variant).is_some())
    }

    /// Recipe variants of `key`, in registration order.
    pub fn variants_of(&self, key: &TypeKey) -> Vec<String> {
        self.recipes.get(key).map(VariantTable::names).unwrap_or_default()
    }

    /// Prototype variants of `key`, in registration order.
    pub fn prototype_variants_of(&self, key: &TypeKey) -> Vec<String> {
        self.prototypes.get(key).map(VariantTable::names).unwrap_or_default()
    }

    pub fn recipe(&self, key: &TypeKey, variant: &str) -> Option<Recipe> {
        let recipe = self.recipes.get(key)?.get(variant).cloned();
        trace!(component = %key, variant, found = recipe.is_some(), "Recipe lookup");
        recipe
    }

    pub fn prototype(&self, key: &TypeKey, variant: &str) -> Option<Instance> {
        self.prototypes.get(key)?.get(variant).cloned()
    }

    /// Drops every recipe and prototype. Known component types stay known.
    pub fn clear(&mut self) {
        debug!(entries = self.len(), "Clearing registry");
        self.recipes.clear();
        self.prototypes.clear();
    }

    /// Returns the number of registered recipes and prototypes.
    pub fn len(&self) -> usize {
        self.recipes.values().map(VariantTable::len).sum::<usize>()
            + self.prototypes.values().map(VariantTable::len).sum::<usize>()
    }

    /// Returns true if nothing is registered.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.descriptors.len())
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::tests::Label;

    fn label(text: &str) -> Label {
        Label { text: text.into(), tone: "muted".into(), hint: None }
    }

    #[test]
    fn register_and_get() {
        let mut reg = Registry::new();
        reg.register(Registration::of::<Label>(Recipe::instance(label("a")))).unwrap();
        let key = TypeKey::of::<Label>();
        assert!(reg.has(&key, DEFAULT_VARIANT));
        assert!(reg.recipe(&key, DEFAULT_VARIANT).is_some());
        assert!(!reg.has(&key, "primary"));
    }

    #[test]
    fn variants_keep_insertion_order() {
        let mut reg = Registry::new();
        for variant in ["secondary", "primary", "danger"] {
            reg.register(Registration::of::<Label>(Recipe::arguments(["x"])).variant(variant))
                .unwrap();
        }
        // Re-registering keeps the original position.
        reg.register(Registration::of::<Label>(Recipe::arguments(["y"])).variant("secondary"))
            .unwrap();

        assert_eq!(
            reg.variants_of(&TypeKey::of::<Label>()),
            vec!["secondary", "primary", "danger"]
        );
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn unknown_type_has_no_variants() {
        let reg = Registry::new();
        assert!(reg.variants_of(&TypeKey::of::<Label>()).is_empty());
    }

    #[test]
    fn recipe_for_other_type_rejected() {
        let mut reg = Registry::new();
        let err = reg
            .register(Registration::of::<Label>(Recipe::instance(42u32)))
            .unwrap_err();
        assert!(matches!(err, QalibError::TypeMismatch { .. }));
    }

    #[test]
    fn prototype_of_wrong_type_rejected() {
        let mut reg = Registry::new();
        reg.know(Label::descriptor());
        let err = reg
            .register_prototype(&TypeKey::of::<Label>(), Arc::new(7u8), DEFAULT_VARIANT)
            .unwrap_err();
        assert!(matches!(err, QalibError::TypeMismatch { .. }));
    }

    #[test]
    fn prototype_for_non_component_rejected() {
        let mut reg = Registry::new();
        let err = reg
            .register_prototype(&TypeKey::of::<String>(), Arc::new(String::new()), DEFAULT_VARIANT)
            .unwrap_err();
        assert!(err.to_string().contains("not a component type"));
    }

    #[test]
    fn clear_drops_everything() {
        let mut reg = Registry::new();
        reg.register(Registration::of::<Label>(Recipe::instance(label("a")))).unwrap();
        reg.register_prototype(&TypeKey::of::<Label>(), Arc::new(label("b")), "x")
            .unwrap();
        assert_eq!(reg.len(), 2);

        reg.clear();
        assert!(reg.is_empty());
        assert!(reg.descriptor_by_name("Label").is_some());
    }
}
