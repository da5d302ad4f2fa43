//! Provider trait: a module of related recipe registrations.
//!
//! Providers group the variants of a design system together, so a
//! "forms" module can register every button and input variant at once.
//!
//! # Examples
//! ```rust,ignore
//! struct FormsProvider;
//!
//! impl Provider for FormsProvider {
//!     fn register(&self, registry: &mut dyn RecipeRegistry) {
//!         registry.register_recipe(
//!             Registration::of::<Button>(Recipe::arguments(["Submit", "primary"])).variant("submit"),
//!         );
//!         registry.register_recipe(
//!             Registration::of::<Button>(Recipe::arguments(["Cancel", "secondary"])).variant("cancel"),
//!         );
//!     }
//! }
//! ```

use crate::registry::Registration;

/// A module that registers related recipes into a container.
///
/// Instead of one giant registration block, split recipes by area:
///
/// ```rust,ignore
/// let container = Container::builder()
///     .add_provider(&FormsProvider)
///     .add_provider(&LayoutProvider)
///     .build()?;
/// ```
pub trait Provider: Send + Sync {
    /// Register recipes into the registry.
    ///
    /// Called once while the container is being built.
    fn register(&self, registry: &mut dyn RecipeRegistry);

    /// Optional: human-readable name for log messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Interface that providers use to register recipes.
///
/// Implemented by the container builder; kept separate so providers
/// can be tested against a mock.
pub trait RecipeRegistry {
    /// Register one `(type, variant) → recipe` entry.
    fn register_recipe(&mut self, registration: Registration);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::tests::Label;
    use crate::registry::Recipe;

    // Mock registry for testing providers
    struct MockRegistry {
        variants: Vec<String>,
    }

    impl RecipeRegistry for MockRegistry {
        fn register_recipe(&mut self, registration: Registration) {
            self.variants.push(registration.variant);
        }
    }

    struct LabelProvider;

    impl Provider for LabelProvider {
        fn register(&self, registry: &mut dyn RecipeRegistry) {
            registry.register_recipe(Registration::of::<Label>(Recipe::arguments(["Note"])));
            registry.register_recipe(
                Registration::of::<Label>(Recipe::arguments(["Alert", "loud"])).variant("alert"),
            );
        }
    }

    #[test]
    fn provider_registers_recipes() {
        let mut registry = MockRegistry { variants: vec![] };
        LabelProvider.register(&mut registry);
        assert_eq!(registry.variants, vec!["default", "alert"]);
    }

    #[test]
    fn provider_has_name() {
        assert!(LabelProvider.name().contains("LabelProvider"));
    }
}
