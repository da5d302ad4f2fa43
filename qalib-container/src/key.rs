//! Type and variant identification keys.
//!
//! [`TypeKey`] identifies a component type within the container.
//! [`VariantKey`] pairs it with a variant name, which is what
//! registrations and the resolution stack are keyed by.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use qalib_support::rendering::shorten_type_name;

/// Variant used when none is specified.
pub const DEFAULT_VARIANT: &str = "default";

/// Uniquely identifies a type in the container.
///
/// # Examples
/// ```
/// use qalib_container::key::TypeKey;
///
/// let key = TypeKey::of::<String>();
/// assert_eq!(key.type_name(), "alloc::string::String");
/// assert_eq!(key.short_name(), "String");
/// ```
#[derive(Clone, Copy)]
pub struct TypeKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl TypeKey {
    /// Creates a key for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Creates a key from a raw [`TypeId`] and type name.
    #[inline]
    pub fn from_raw(type_id: TypeId, type_name: &'static str) -> Self {
        Self { type_id, type_name }
    }

    /// Returns the [`TypeId`] of this type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name without module paths.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.type_name)
    }

    /// Pairs this type with a variant name.
    pub fn variant(&self, variant: impl Into<String>) -> VariantKey {
        VariantKey::new(*self, variant)
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.type_name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// A `(type, variant)` pair.
///
/// ```
/// use qalib_container::key::{TypeKey, VariantKey, DEFAULT_VARIANT};
///
/// let primary = TypeKey::of::<String>().variant("primary");
/// let default = VariantKey::new(TypeKey::of::<String>(), DEFAULT_VARIANT);
/// assert_ne!(primary, default);
/// assert!(default.is_default());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    type_key: TypeKey,
    variant: String,
}

impl VariantKey {
    pub fn new(type_key: TypeKey, variant: impl Into<String>) -> Self {
        Self {
            type_key,
            variant: variant.into(),
        }
    }

    #[inline]
    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    #[inline]
    pub fn variant(&self) -> &str {
        &self.variant
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        self.variant == DEFAULT_VARIANT
    }
}

impl fmt::Debug for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariantKey({}, variant={:?})", self.type_key.type_name, self.variant)
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            write!(f, "{}", self.type_key)
        } else {
            write!(f, "{}[{}]", self.type_key, self.variant)
        }
    }
}
