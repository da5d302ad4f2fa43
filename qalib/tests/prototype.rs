use std::sync::Arc;

use qalib::Component;
use qalib::prelude::*;

#[derive(Debug, Clone, PartialEq, Component)]
pub struct Button {
    pub text: String,
    #[component(default = "primary")]
    pub style: String,
    pub icon: Option<String>,
}

fn primary() -> String {
    "primary".to_string()
}

impl Button {
    fn new(text: &str, style: &str) -> Self {
        Self { text: text.to_string(), style: style.to_string(), icon: None }
    }
}

fn design_system(settings: Settings) -> PrototypeContainer {
    let prototypes = PrototypeContainer::with_settings(settings);
    prototypes.add(Button::new("Submit", "primary"), "submit").unwrap();
    prototypes.add(Button::new("Cancel", "secondary"), "cancel").unwrap();
    prototypes
}

fn strict() -> PrototypeContainer {
    design_system(Settings::default().with_production(false))
}

#[test]
fn submit_button_scenario() {
    let prototypes = strict();

    let submit = prototypes.build::<Button>(Params::new(), "submit").unwrap();
    let registered = prototypes.prototype::<Button>("submit").unwrap();
    assert!(Arc::ptr_eq(submit.component().unwrap(), &registered));

    let save = prototypes
        .build::<Button>(params! { "text" => "Save" }, "submit")
        .unwrap()
        .into_component()
        .unwrap();
    assert!(!Arc::ptr_eq(&save, &registered));
    assert_eq!(save.text, "Save");
    assert_eq!(save.style, "primary");
    assert_eq!(*registered, Button::new("Submit", "primary"));
}

#[test]
fn overrides_touch_only_named_fields() {
    let prototypes = strict();

    let built = prototypes
        .build::<Button>(params! { "style" => "danger", "icon" => "trash" }, "cancel")
        .unwrap();
    let button = built.component().unwrap();
    assert_eq!(button.text, "Cancel");
    assert_eq!(button.style, "danger");
    assert_eq!(button.icon.as_deref(), Some("trash"));
}

#[test]
fn unknown_override_in_strict_mode() {
    let prototypes = strict();

    let err = prototypes
        .build::<Button>(params! { "colour" => "red" }, "submit")
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("colour"));
    assert!(message.contains("Button"));
}

#[test]
fn unknown_variant_lists_prototypes() {
    let prototypes = strict();

    let err = prototypes.build::<Button>(Params::new(), "danger").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Variant 'danger' not found for Button. Available variants: submit, cancel"
    );
    assert_eq!(prototypes.variants::<Button>(), vec!["submit", "cancel"]);
}

#[test]
fn fallback_mode_renders_diagnostics_outside_production() {
    let prototypes = design_system(
        Settings::default()
            .with_error_mode(ErrorMode::Fallback)
            .with_production(false),
    );

    let built = prototypes
        .build::<Button>(params! { "colour" => "red" }, "submit")
        .unwrap();
    let fallback = built.fallback().unwrap();
    assert_eq!(fallback.component, "Button");
    assert!(!fallback.production);

    let html = fallback.render();
    assert!(html.contains("Button"));
    assert!(html.contains("colour"));
}

#[test]
fn fallback_mode_is_silent_in_production() {
    let prototypes = design_system(
        Settings::default()
            .with_error_mode(ErrorMode::Fallback)
            .with_production(true),
    );
    assert!(prototypes.is_production());

    let built = prototypes.build::<Button>(Params::new(), "ghost").unwrap();
    let html = built.fallback().unwrap().render();
    assert!(html.starts_with("<!--"));
    assert!(!html.contains("ghost"));

    // Successful builds are unaffected by the error mode.
    assert!(!prototypes.build::<Button>(Params::new(), "submit").unwrap().is_fallback());
}

#[test]
fn settings_from_json() {
    let settings: Settings =
        serde_json::from_str(r#"{ "max_depth": 12, "error_mode": "fallback" }"#).unwrap();
    assert_eq!(settings.max_depth, 12);
    assert_eq!(settings.error_mode, ErrorMode::Fallback);
    assert_eq!(settings.production, None);

    let defaults: Settings = serde_json::from_str("{}").unwrap();
    assert_eq!(defaults, Settings::default());

    assert!(serde_json::from_str::<Settings>(r#"{ "max_depth": 0 }"#).is_err());
    assert!(serde_json::from_str::<Settings>(r#"{ "depth": 12 }"#).is_err());
}

#[test]
fn settings_from_environment_lookup() {
    let settings = Settings::from_lookup(|name| match name {
        "QALIB_ERROR_MODE" => Some("fallback".to_string()),
        "QALIB_PRODUCTION" => Some("true".to_string()),
        _ => None,
    })
    .unwrap();

    let prototypes = PrototypeContainer::with_settings(settings);
    assert_eq!(prototypes.error_mode(), ErrorMode::Fallback);
    assert!(prototypes.is_production());
}

#[test]
fn clear_drops_prototypes() {
    let prototypes = strict();
    assert!(prototypes.has::<Button>("submit"));

    prototypes.clear();
    assert!(!prototypes.has::<Button>("submit"));
    assert!(prototypes.prototype::<Button>("submit").is_none());
}
