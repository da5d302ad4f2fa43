//! Constructor introspection for component types.
//!
//! A [`Component`] exposes its constructor as an ordered list of
//! [`Parameter`]s plus a positional constructor, and can snapshot its
//! fields by name. `#[derive(Component)]` generates all of it; the
//! container only ever talks to the type-erased [`ComponentDescriptor`].
//!
//! # Examples
//! ```
//! use qalib_container::component::{Arguments, Component, Parameter};
//! use qalib_container::value::{FieldMap, Value};
//! use qalib_container::Result;
//!
//! struct Badge {
//!     label: String,
//! }
//!
//! impl Component for Badge {
//!     fn parameters() -> Vec<Parameter> {
//!         vec![Parameter::primitive::<String>("label")]
//!     }
//!
//!     fn construct(mut args: Arguments) -> Result<Self> {
//!         Ok(Self { label: args.data("label")? })
//!     }
//!
//!     fn fields(&self) -> Result<FieldMap> {
//!         Ok(FieldMap::new().with("label", Value::data(&self.label)?))
//!     }
//! }
//!
//! assert_eq!(Badge::descriptor().name(), "Badge");
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use tracing::trace;

use qalib_support::rendering::shorten_type_name;

use crate::error::{QalibError, Result};
use crate::key::TypeKey;
use crate::value::{FieldMap, Instance, Value};

/// An immutable, attribute-only value type the container can build.
pub trait Component: Any + Send + Sync + Sized {
    /// Display name used in messages and for lookup by name.
    fn name() -> &'static str {
        type_name::<Self>()
    }

    /// Constructor parameters, in declaration order.
    fn parameters() -> Vec<Parameter>;

    /// Builds an instance from arguments supplied in [`parameters`](Self::parameters) order.
    fn construct(args: Arguments) -> Result<Self>;

    /// Snapshot of every public field, by name.
    fn fields(&self) -> Result<FieldMap>;

    /// The type-erased view the container works with.
    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor::of::<Self>()
    }
}

/// What a parameter needs to be satisfied.
#[derive(Clone, Copy)]
pub enum ParameterKind {
    /// Plain data: strings, numbers, flags, collections.
    Primitive,
    /// Another component the container can build.
    Dependency(fn() -> ComponentDescriptor),
}

/// One constructor parameter.
#[derive(Clone)]
pub struct Parameter {
    name: &'static str,
    declared_type: &'static str,
    kind: ParameterKind,
    default: Option<fn() -> Result<Value>>,
    nullable: bool,
}

impl Parameter {
    /// A plain-data parameter of type `T`.
    pub fn primitive<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            declared_type: type_name::<T>(),
            kind: ParameterKind::Primitive,
            default: None,
            nullable: false,
        }
    }

    /// A parameter holding a shared instance of component `T`.
    pub fn dependency<T: Component>(name: &'static str) -> Self {
        Self {
            name,
            declared_type: type_name::<T>(),
            kind: ParameterKind::Dependency(T::descriptor),
            default: None,
            nullable: false,
        }
    }

    /// Declares a default value.
    pub fn with_default(mut self, default: fn() -> Result<Value>) -> Self {
        self.default = Some(default);
        self
    }

    /// Declares that the absent value is acceptable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn declared_type(&self) -> &'static str {
        self.declared_type
    }

    #[inline]
    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[inline]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Produces the declared default, if any.
    pub fn default_value(&self) -> Option<Result<Value>> {
        self.default.map(|default| default())
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("dependency", &matches!(self.kind, ParameterKind::Dependency(_)))
            .field("has_default", &self.has_default())
            .field("nullable", &self.nullable)
            .finish()
    }
}

/// Positional constructor arguments.
///
/// Values are consumed front to back; each accessor names the parameter
/// it reads so failures point at the right field.
pub struct Arguments {
    owner: &'static str,
    values: std::vec::IntoIter<Value>,
}

impl Arguments {
    pub fn new(owner: &'static str, values: Vec<Value>) -> Self {
        Self {
            owner,
            values: values.into_iter(),
        }
    }

    /// Number of arguments not yet consumed.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    fn next(&mut self, name: &'static str) -> Result<Value> {
        self.values.next().ok_or_else(|| {
            QalibError::construction(
                shorten_type_name(self.owner),
                format!("missing argument `{name}`"),
            )
        })
    }

    fn fail(&self, name: &'static str, reason: String) -> QalibError {
        QalibError::construction(
            shorten_type_name(self.owner),
            format!("argument `{name}`: {reason}"),
        )
    }

    /// Reads a plain-data argument.
    pub fn data<T: DeserializeOwned>(&mut self, name: &'static str) -> Result<T> {
        let value = self.next(name)?;
        value.deserialize().map_err(|reason| self.fail(name, reason))
    }

    /// Reads a required instance argument.
    pub fn instance<T: Any + Send + Sync>(&mut self, name: &'static str) -> Result<Arc<T>> {
        let value = self.next(name)?;
        value.downcast().map_err(|reason| self.fail(name, reason))
    }

    /// Reads an optional instance argument; the absent value maps to `None`.
    pub fn optional_instance<T: Any + Send + Sync>(
        &mut self,
        name: &'static str,
    ) -> Result<Option<Arc<T>>> {
        let value = self.next(name)?;
        value.downcast_optional().map_err(|reason| self.fail(name, reason))
    }
}

/// Type-erased vtable of a [`Component`].
#[derive(Clone, Copy)]
pub struct ComponentDescriptor {
    key: TypeKey,
    name: &'static str,
    parameters: fn() -> Vec<Parameter>,
    construct: fn(Arguments) -> Result<Instance>,
    fields: fn(&Instance) -> Result<FieldMap>,
}

impl ComponentDescriptor {
    pub fn of<T: Component>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            name: T::name(),
            parameters: T::parameters,
            construct: construct_erased::<T>,
            fields: fields_erased::<T>,
        }
    }

    #[inline]
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Short display name, e.g. `Button`.
    pub fn name(&self) -> String {
        shorten_type_name(self.name)
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        (self.parameters)()
    }

    /// Constructs an instance from positional arguments.
    pub fn construct(&self, values: Vec<Value>) -> Result<Instance> {
        (self.construct)(Arguments::new(self.name, values))
    }

    /// Snapshots the fields of `instance`, which must be of this type.
    pub fn fields(&self, instance: &Instance) -> Result<FieldMap> {
        (self.fields)(instance)
    }

    /// Returns `true` if `instance` is of this component's concrete type.
    pub fn is_instance(&self, instance: &Instance) -> bool {
        (**instance).type_id() == self.key.type_id()
    }

    /// Returns `true` if `name` refers to this component.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name == name || self.key.type_name() == name || self.name() == name
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("type", &self.key.type_name())
            .field("name", &self.name)
            .finish()
    }
}

fn construct_erased<T: Component>(args: Arguments) -> Result<Instance> {
    Ok(Arc::new(T::construct(args)?))
}

fn fields_erased<T: Component>(instance: &Instance) -> Result<FieldMap> {
    let component = instance.downcast_ref::<T>().ok_or_else(|| QalibError::TypeMismatch {
        expected: shorten_type_name(type_name::<T>()),
        reason: "instance is of a different type".to_string(),
    })?;
    component.fields()
}

/// Link-time registration of a component, submitted by `#[derive(Component)]`.
pub struct ComponentEntry {
    descriptor: fn() -> ComponentDescriptor,
}

impl ComponentEntry {
    pub const fn new(descriptor: fn() -> ComponentDescriptor) -> Self {
        Self { descriptor }
    }
}

inventory::collect!(ComponentEntry);

static KNOWN: Lazy<Vec<ComponentDescriptor>> = Lazy::new(|| {
    let known: Vec<ComponentDescriptor> = inventory::iter::<ComponentEntry>()
        .map(|entry| (entry.descriptor)())
        .collect();
    trace!(count = known.len(), "Collected derived components");
    known
});

/// All components submitted at link time.
pub fn known_components() -> &'static [ComponentDescriptor] {
    &KNOWN
}

/// Finds a derived component by name or fully qualified type name.
pub fn find_by_name(name: &str) -> Option<ComponentDescriptor> {
    KNOWN.iter().find(|d| d.matches_name(name)).copied()
}

/// Finds a derived component by type.
pub fn find_by_key(key: &TypeKey) -> Option<ComponentDescriptor> {
    KNOWN.iter().find(|d| d.key() == *key).copied()
}
