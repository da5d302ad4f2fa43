//! # Qalib: variant-aware component container
//!
//! Builds immutable UI components from named variants ("primary",
//! "danger", ...), wiring constructor dependencies automatically and
//! reusing registered prototypes with per-use overrides.
//!
//! ```rust
//! use std::sync::Arc;
//! use qalib::prelude::*;
//! use qalib::Component;
//!
//! #[derive(Component)]
//! pub struct Button {
//!     pub text: String,
//!     #[component(default = "primary")]
//!     pub style: String,
//! }
//!
//! fn primary() -> String {
//!     "primary".to_string()
//! }
//!
//! let container = Container::builder()
//!     .add_variant::<Button>("danger", Recipe::arguments(["Delete", "danger"]))
//!     .build()
//!     .unwrap();
//!
//! let save: Arc<Button> = container.get(params! { "text" => "Save" }).unwrap();
//! let delete: Arc<Button> = container.get(params! { "variant" => "danger" }).unwrap();
//! assert_eq!(save.style, "primary");
//! assert_eq!(delete.text, "Delete");
//! ```

pub use qalib_container::*;
pub use qalib_container::component::Component;
pub use qalib_container::container::{Container, ContainerBuilder};
pub use qalib_container::fallback::ErrorComponent;
pub use qalib_container::prototype::{Built, PrototypeContainer};
pub use qalib_container::registry::{Recipe, Registration};
pub use qalib_container::settings::{ErrorMode, Settings};
pub use qalib_container::value::{Params, Value};
pub use qalib_derive::Component;
pub use qalib_support as support;
