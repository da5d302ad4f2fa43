//! Core container implementation for Qalib components.

pub mod cache;
pub mod component;
pub mod container;
pub mod error;
pub mod fallback;
pub mod key;
pub mod prototype;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod value;

mod stack;

pub use container::prelude;
pub use error::{QalibError, Result};
pub use key::{TypeKey, VariantKey};

#[doc(hidden)]
pub mod __private {
    pub use crate::component::ComponentEntry;
    pub use inventory;
}
