//! The placeholder returned by prototype mode when a build fails and the
//! container runs in [`ErrorMode::Fallback`](crate::settings::ErrorMode).
//!
//! Its presence on a page is what matters; in production it renders to an
//! inert marker and leaks nothing about the failure.

use std::fmt::Write as _;

use crate::component::{Arguments, Component, Parameter};
use crate::error::Result;
use crate::value::{FieldMap, Value};

/// Marker emitted in place of a failed component in production.
pub const PRODUCTION_MARKER: &str = "<!-- qalib: component unavailable -->";

/// Stands in for a component that could not be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorComponent {
    pub message: String,
    pub context: String,
    /// Short name of the component that failed.
    pub component: String,
    pub production: bool,
}

impl ErrorComponent {
    pub fn new(
        message: impl Into<String>,
        context: impl Into<String>,
        component: impl Into<String>,
        production: bool,
    ) -> Self {
        Self {
            message: message.into(),
            context: context.into(),
            component: component.into(),
            production,
        }
    }

    /// HTML for the failure.
    ///
    /// ```
    /// use qalib_container::fallback::{ErrorComponent, PRODUCTION_MARKER};
    ///
    /// let prod = ErrorComponent::new("boom", "", "Button", true);
    /// assert_eq!(prod.render(), PRODUCTION_MARKER);
    ///
    /// let dev = ErrorComponent::new("boom", "variant 'submit'", "Button", false);
    /// assert!(dev.render().contains("boom"));
    /// ```
    pub fn render(&self) -> String {
        if self.production {
            return PRODUCTION_MARKER.to_string();
        }

        let mut html = String::new();
        let _ = write!(
            html,
            r#"<div class="qalib-error" data-component="{component}"><strong>{component}</strong>: {message}"#,
            component = escape(&self.component),
            message = escape(&self.message),
        );
        if !self.context.is_empty() {
            let _ = write!(html, "<pre>{}</pre>", escape(&self.context));
        }
        html.push_str("</div>");
        html
    }
}

impl Component for ErrorComponent {
    fn name() -> &'static str {
        "ErrorComponent"
    }

    fn parameters() -> Vec<Parameter> {
        vec![
            Parameter::primitive::<String>("message"),
            Parameter::primitive::<String>("context").with_default(|| Value::data("")),
            Parameter::primitive::<String>("component").with_default(|| Value::data("")),
            Parameter::primitive::<bool>("production").with_default(|| Value::data(&true)),
        ]
    }

    fn construct(mut args: Arguments) -> Result<Self> {
        Ok(Self {
            message: args.data("message")?,
            context: args.data("context")?,
            component: args.data("component")?,
            production: args.data("production")?,
        })
    }

    fn fields(&self) -> Result<FieldMap> {
        Ok(FieldMap::new()
            .with("message", Value::data(&self.message)?)
            .with("context", Value::data(&self.context)?)
            .with("component", Value::data(&self.component)?)
            .with("production", Value::data(&self.production)?))
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
