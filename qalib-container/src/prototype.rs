//! # Prototype mode
//!
//! Registered instances act as templates. Building with no overrides
//! hands back the template itself; building with overrides snapshots the
//! template's fields, applies the overrides and constructs a new instance.
//!
//! ```rust,ignore
//! let prototypes = PrototypeContainer::new();
//! prototypes.add(Button::new("Submit", "primary"), "submit")?;
//!
//! let submit = prototypes.build::<Button>(Params::new(), "submit")?;
//! let save = prototypes.build::<Button>(params! { "text" => "Save" }, "submit")?;
//! ```

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument, trace, warn};

use crate::component::{Component, ComponentDescriptor};
use crate::error::{QalibError, Result, VariantNotFoundError};
use crate::fallback::ErrorComponent;
use crate::key::TypeKey;
use crate::registry::Registry;
use crate::resolver::downcast;
use crate::settings::{ErrorMode, Settings};
use crate::value::{Instance, Params};

/// Outcome of [`PrototypeContainer::build`].
#[derive(Debug)]
pub enum Built<T> {
    /// The requested component.
    Component(Arc<T>),
    /// The build failed and the container runs in fallback mode.
    Fallback(Arc<ErrorComponent>),
}

impl<T> Built<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Built::Fallback(_))
    }

    pub fn component(&self) -> Option<&Arc<T>> {
        match self {
            Built::Component(component) => Some(component),
            Built::Fallback(_) => None,
        }
    }

    pub fn fallback(&self) -> Option<&Arc<ErrorComponent>> {
        match self {
            Built::Component(_) => None,
            Built::Fallback(fallback) => Some(fallback),
        }
    }

    pub fn into_component(self) -> Option<Arc<T>> {
        match self {
            Built::Component(component) => Some(component),
            Built::Fallback(_) => None,
        }
    }
}

/// Container of prototype instances, keyed by type and variant.
pub struct PrototypeContainer {
    registry: RwLock<Registry>,
    settings: Settings,
    production: bool,
}

impl Default for PrototypeContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl PrototypeContainer {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// The production flag is resolved once, here.
    pub fn with_settings(settings: Settings) -> Self {
        let production = settings.is_production();
        debug!(error_mode = %settings.error_mode, production, "Prototype container created");
        Self {
            registry: RwLock::new(Registry::new()),
            settings,
            production,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn error_mode(&self) -> ErrorMode {
        self.settings.error_mode
    }

    pub fn is_production(&self) -> bool {
        self.production
    }

    // ── Registration ──

    /// Registers `prototype` under `variant`, replacing any previous one.
    pub fn add<T: Component>(&self, prototype: T, variant: &str) -> Result<()> {
        self.add_shared(Arc::new(prototype), variant)
    }

    /// Registers an already shared prototype.
    pub fn add_shared<T: Component>(&self, prototype: Arc<T>, variant: &str) -> Result<()> {
        let mut registry = self.registry.write();
        registry.know(T::descriptor());
        registry.register_prototype(&TypeKey::of::<T>(), prototype, variant)
    }

    /// Registers a type-erased prototype for `key`.
    ///
    /// # Errors
    /// [`QalibError::TypeMismatch`] if `key` is not a component type or the
    /// prototype is not an instance of it.
    pub fn add_erased(&self, key: TypeKey, prototype: Instance, variant: &str) -> Result<()> {
        self.registry.write().register_prototype(&key, prototype, variant)
    }

    // ── Building ──

    /// Builds `T` from its `variant` prototype with `overrides` applied.
    ///
    /// In [`ErrorMode::Fallback`] failures come back as
    /// [`Built::Fallback`] instead of `Err`.
    #[instrument(skip(self, overrides), fields(component = T::name()))]
    pub fn build<T: Component>(&self, overrides: Params, variant: &str) -> Result<Built<T>> {
        let descriptor = T::descriptor();
        let outcome = self
            .rebuild(&descriptor, overrides, variant)
            .and_then(downcast::<T>);

        match (outcome, self.settings.error_mode) {
            (Ok(component), _) => Ok(Built::Component(component)),
            (Err(err), ErrorMode::Strict) => Err(err),
            (Err(err), ErrorMode::Fallback) => {
                if !self.production {
                    warn!(component = %descriptor.key(), variant, error = %err, "Build failed, rendering fallback");
                }
                Ok(Built::Fallback(Arc::new(ErrorComponent::new(
                    err.to_string(),
                    format!("variant '{variant}'"),
                    descriptor.name(),
                    self.production,
                ))))
            }
        }
    }

    fn rebuild(
        &self,
        descriptor: &ComponentDescriptor,
        overrides: Params,
        variant: &str,
    ) -> Result<Instance> {
        let key = descriptor.key();
        let prototype = {
            let registry = self.registry.read();
            registry.prototype(&key, variant).ok_or_else(|| {
                QalibError::VariantNotFound(VariantNotFoundError {
                    type_name: descriptor.name(),
                    variant: variant.to_string(),
                    available: registry.prototype_variants_of(&key),
                })
            })?
        };

        if overrides.is_empty() {
            trace!(component = %key, variant, "Returning prototype as is");
            return Ok(prototype);
        }

        let mut merged = descriptor.fields(&prototype)?;
        if let Some(unknown) = overrides.keys().find(|name| !merged.contains(name)) {
            return Err(QalibError::UnknownOverrideProperty {
                property: unknown.to_string(),
                type_name: descriptor.name(),
                known: merged.keys().map(str::to_string).collect(),
            });
        }
        merged.merge(overrides);

        let parameters = descriptor.parameters();
        let mut values = Vec::with_capacity(parameters.len());
        for parameter in &parameters {
            let value = match merged.remove(parameter.name()) {
                Some(value) => value,
                None => match parameter.default_value() {
                    Some(default) => default?,
                    None => {
                        return Err(QalibError::MissingRequiredField {
                            field: parameter.name().to_string(),
                            type_name: descriptor.name(),
                        });
                    }
                },
            };
            values.push(value);
        }

        debug!(component = %key, variant, "Rebuilding from prototype");
        descriptor.construct(values)
    }

    // ── Introspection ──

    pub fn has<T: Component>(&self, variant: &str) -> bool {
        self.registry.read().has_prototype(&TypeKey::of::<T>(), variant)
    }

    /// Prototype variants of `T`, in registration order.
    pub fn variants<T: Component>(&self) -> Vec<String> {
        self.registry.read().prototype_variants_of(&TypeKey::of::<T>())
    }

    /// The registered prototype, if any.
    pub fn prototype<T: Component>(&self, variant: &str) -> Option<Arc<T>> {
        self.registry
            .read()
            .prototype(&TypeKey::of::<T>(), variant)?
            .downcast::<T>()
            .ok()
    }

    /// Drops every prototype.
    pub fn clear(&self) {
        self.registry.write().clear();
    }
}

impl fmt::Debug for PrototypeContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrototypeContainer")
            .field("prototypes", &self.registry.read().len())
            .field("error_mode", &self.settings.error_mode)
            .field("production", &self.production)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::tests::Label;
    use crate::key::DEFAULT_VARIANT;
    use crate::params;
    use crate::value::Value;

    fn label(text: &str, tone: &str) -> Label {
        Label { text: text.into(), tone: tone.into(), hint: None }
    }

    fn strict() -> PrototypeContainer {
        PrototypeContainer::with_settings(Settings::default().with_production(false))
    }

    fn fallback(production: bool) -> PrototypeContainer {
        PrototypeContainer::with_settings(
            Settings::default()
                .with_error_mode(ErrorMode::Fallback)
                .with_production(production),
        )
    }

    #[test]
    fn empty_overrides_return_the_prototype() {
        let prototypes = strict();
        prototypes.add(label("Submit", "primary"), "submit").unwrap();

        let built = prototypes.build::<Label>(Params::new(), "submit").unwrap();
        let registered = prototypes.prototype::<Label>("submit").unwrap();
        assert!(Arc::ptr_eq(built.component().unwrap(), &registered));
    }

    #[test]
    fn overrides_build_a_new_instance() {
        let prototypes = strict();
        prototypes.add(label("Submit", "primary"), "submit").unwrap();

        let saved = prototypes
            .build::<Label>(params! { "text" => "Save" }, "submit")
            .unwrap()
            .into_component()
            .unwrap();
        let original = prototypes.prototype::<Label>("submit").unwrap();

        assert!(!Arc::ptr_eq(&saved, &original));
        assert_eq!(saved.text, "Save");
        assert_eq!(saved.tone, "primary");
        assert_eq!(original.text, "Submit");
    }

    #[test]
    fn null_override_clears_optional_field() {
        let prototypes = strict();
        prototypes
            .add(Label { text: "x".into(), tone: "y".into(), hint: Some("h".into()) }, DEFAULT_VARIANT)
            .unwrap();

        let built = prototypes
            .build::<Label>(params! { "hint" => Value::null() }, DEFAULT_VARIANT)
            .unwrap();
        assert_eq!(built.component().unwrap().hint, None);
    }

    #[test]
    fn unknown_override_names_key_and_type() {
        let prototypes = strict();
        prototypes.add(label("a", "b"), DEFAULT_VARIANT).unwrap();

        match prototypes
            .build::<Label>(params! { "colour" => "red" }, DEFAULT_VARIANT)
            .unwrap_err()
        {
            QalibError::UnknownOverrideProperty { property, type_name, known } => {
                assert_eq!(property, "colour");
                assert_eq!(type_name, "Label");
                assert_eq!(known, vec!["hint", "text", "tone"]);
            }
            other => panic!("Expected UnknownOverrideProperty, got: {other:?}"),
        }
    }

    #[test]
    fn missing_variant_lists_registered_ones() {
        let prototypes = strict();
        prototypes.add(label("a", "b"), "primary").unwrap();
        prototypes.add(label("c", "d"), "secondary").unwrap();

        let err = prototypes.build::<Label>(Params::new(), "nonexistent").unwrap_err();
        assert!(err.to_string().contains("primary, secondary"));

        prototypes.clear();
        let err = prototypes.build::<Label>(Params::new(), "primary").unwrap_err();
        assert!(err.to_string().contains("none"));
    }

    #[test]
    fn wrong_prototype_type_rejected() {
        let prototypes = strict();
        let err = prototypes
            .add_erased(TypeKey::of::<Label>(), Arc::new(5u8), DEFAULT_VARIANT)
            .unwrap_err();
        assert!(matches!(err, QalibError::TypeMismatch { .. }));
        assert!(!prototypes.has::<Label>(DEFAULT_VARIANT));
    }

    #[test]
    fn fallback_mode_returns_error_component() {
        let prototypes = fallback(false);

        let built = prototypes.build::<Label>(Params::new(), "ghost").unwrap();
        assert!(built.is_fallback());

        let err = built.fallback().unwrap();
        assert_eq!(err.component, "Label");
        assert!(err.message.contains("ghost"));
        assert!(!err.production);
        assert!(err.render().contains("qalib-error"));
    }

    #[test]
    fn fallback_in_production_is_inert() {
        let prototypes = fallback(true);
        let built = prototypes.build::<Label>(Params::new(), "ghost").unwrap();
        let html = built.fallback().unwrap().render();
        assert_eq!(html, crate::fallback::PRODUCTION_MARKER);
    }

    #[test]
    fn variants_in_order_and_has() {
        let prototypes = strict();
        prototypes.add(label("a", "b"), "danger").unwrap();
        prototypes.add(label("a", "b"), "primary").unwrap();

        assert_eq!(prototypes.variants::<Label>(), vec!["danger", "primary"]);
        assert!(prototypes.has::<Label>("danger"));
        assert!(prototypes.prototype::<Label>("other").is_none());
    }
}
