//! Error types for Qalib container operations.
//!
//! Every failure names the type, variant, key or parameter involved,
//! so a broken page tells you which component to look at.

use std::fmt;

use qalib_support::rendering::{render_chain, render_list};

use crate::key::VariantKey;

/// Main error type for all Qalib operations.
#[derive(Debug, thiserror::Error)]
pub enum QalibError {
    /// The requested type identifier does not name any known component.
    #[error("{}", .0)]
    ClassNotFound(ClassNotFoundError),

    /// The `(type, variant)` pair has no registration.
    #[error("{}", .0)]
    VariantNotFound(VariantNotFoundError),

    /// A registered value is not an instance of the declared type, or the
    /// declared type is not a component.
    #[error("Type mismatch for {expected}: {reason}")]
    TypeMismatch { expected: String, reason: String },

    /// An override key does not name a field of the prototype's type.
    #[error("Unknown override property `{property}` for {type_name}\n  Known properties: {}", render_list(.known))]
    UnknownOverrideProperty {
        property: String,
        type_name: String,
        known: Vec<String>,
    },

    /// A `(type, variant)` pair re-entered the resolution stack.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A component-typed constructor parameter could not be built.
    #[error("Cannot resolve dependency `{parameter}` ({dependency}) of {owner}: {source}")]
    UnresolvableDependency {
        owner: String,
        parameter: String,
        dependency: String,
        #[source]
        source: Box<QalibError>,
    },

    /// A plain constructor parameter has no value, default, or absent fallback.
    #[error(
        "Cannot resolve required parameter `{parameter}` ({declared_type}) of {owner}\n  Hint: pass it in the parameters, give it a default, or make it optional"
    )]
    UnresolvableRequiredParameter {
        owner: String,
        parameter: String,
        declared_type: String,
    },

    /// The merged field set used to rebuild a prototype lacks a required field.
    #[error("Missing required field `{field}` while rebuilding {type_name}")]
    MissingRequiredField { field: String, type_name: String },

    /// A constructor or factory rejected its input.
    #[error("Failed to construct {type_name}: {source}")]
    ConstructionFailed {
        type_name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Nested resolution went deeper than the configured limit.
    #[error("Resolution depth limit of {limit} exceeded:\n  {}", render_keys(.chain))]
    ResolutionTooDeep { limit: usize, chain: Vec<VariantKey> },

    /// A configuration value could not be parsed.
    #[error("Invalid setting {key}={value:?}: expected {expected}")]
    InvalidSetting {
        key: String,
        value: String,
        expected: &'static str,
    },
}

impl QalibError {
    /// Shorthand for [`QalibError::ConstructionFailed`].
    pub fn construction(
        type_name: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ConstructionFailed {
            type_name: type_name.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for errors raised by the resolution stack itself.
    ///
    /// These pass through dependency resolution unwrapped.
    pub fn is_cycle(&self) -> bool {
        matches!(
            self,
            QalibError::CircularDependency(_) | QalibError::ResolutionTooDeep { .. }
        )
    }
}

/// Error when a type identifier cannot be located.
#[derive(Debug)]
pub struct ClassNotFoundError {
    /// The name that was requested
    pub requested: String,
    /// Known component names that look similar
    pub suggestions: Vec<String>,
}

impl fmt::Display for ClassNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component type not found: {}", self.requested)?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: derive `Component` for {} or register it with the container",
            self.requested
        )
    }
}

/// Error when a variant has no registration.
#[derive(Debug)]
pub struct VariantNotFoundError {
    pub type_name: String,
    pub variant: String,
    /// Registered variants of the type, in registration order.
    pub available: Vec<String>,
}

impl fmt::Display for VariantNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Variant '{}' not found for {}. Available variants: {}",
            self.variant,
            self.type_name,
            render_list(&self.available),
        )
    }
}

/// Error when a circular dependency is detected.
///
/// Shows the full chain so you can see WHERE the cycle is.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// Example: `[Page, Card, Page]`
    pub chain: Vec<VariantKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  ")?;

        write!(f, "{}", render_keys(&self.chain))?;

        write!(
            f,
            "\n  Hint: register an explicit recipe for one of these components, or make the dependency optional"
        )
    }
}

fn render_keys(chain: &[VariantKey]) -> String {
    let names: Vec<String> = chain.iter().map(ToString::to_string).collect();
    render_chain(&names)
}

/// Convenient Result type for Qalib operations.
pub type Result<T> = std::result::Result<T, QalibError>;
