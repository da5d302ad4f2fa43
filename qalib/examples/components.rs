//! A small design system wired through Qalib.

use std::sync::Arc;

use qalib::Component;
use qalib::prelude::*;

// === Components ===

#[derive(Debug, Component)]
pub struct Icon {
    #[component(default = "dot")]
    pub glyph: String,
}

fn dot() -> String {
    "•".to_string()
}

#[derive(Debug, Component)]
pub struct Button {
    #[component(default = "submit_text")]
    pub text: String,
    #[component(default = "primary")]
    pub style: String,
    pub icon: Arc<Icon>,
}

fn submit_text() -> String {
    "Submit".to_string()
}

fn primary() -> String {
    "primary".to_string()
}

impl Button {
    fn render(&self) -> String {
        format!(
            r#"<button class="btn btn-{}">{} {}</button>"#,
            self.style, self.icon.glyph, self.text
        )
    }
}

#[derive(Debug, Component)]
pub struct Form {
    pub title: String,
    pub submit: Arc<Button>,
}

// === Providers ===

struct FormsProvider;

impl Provider for FormsProvider {
    fn register(&self, registry: &mut dyn RecipeRegistry) {
        registry.register_recipe(
            Registration::of::<Button>(Recipe::factory(|r, params: &Params| {
                let text = params.get("text").and_then(Value::as_str).unwrap_or("Delete");
                Ok(Button {
                    text: text.to_string(),
                    style: "danger".to_string(),
                    icon: r.make(params! { "glyph" => "✗" })?,
                })
            }))
            .variant("danger"),
        );
    }
}

fn main() -> Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("qalib_container=debug")
        .init();

    // === Factory mode ===
    let container = Container::builder()
        .add_variant::<Button>("cancel", Recipe::arguments([
            Value::from("Cancel"),
            Value::from("secondary"),
            Value::instance(Arc::new(Icon { glyph: "←".into() })),
        ]))
        .add_provider(&FormsProvider)
        .build()?;

    println!("✅ Container built successfully!");
    println!("{container:?}");

    let save: Arc<Button> = container.get(params! { "text" => "Save" })?;
    let cancel: Arc<Button> = container.get(params! { "variant" => "cancel" })?;
    let delete: Arc<Button> = container.get(params! { "variant" => "danger" })?;
    println!("🔘 {}", save.render());
    println!("🔘 {}", cancel.render());
    println!("🔘 {}", delete.render());

    // Same key, same instance.
    let again: Arc<Button> = container.get(params! { "text" => "Save" })?;
    println!("♻️  cached: {}", Arc::ptr_eq(&save, &again));

    // Form is never registered; its Button is built for it from defaults.
    let form: Arc<Form> = container.make(params! { "title" => "Sign up" })?;
    println!("📋 {}: {}", form.title, form.submit.render());

    if let Err(err) = container.get::<Button>(params! { "variant" => "ghost" }) {
        println!("⚠️  {err}");
    }

    // === Prototype mode ===
    let prototypes = PrototypeContainer::with_settings(
        Settings::default()
            .with_error_mode(ErrorMode::Fallback)
            .with_production(false),
    );
    prototypes.add_shared(save.clone(), "submit")?;

    let submit = prototypes.build::<Button>(Params::new(), "submit")?;
    let publish = prototypes.build::<Button>(params! { "text" => "Publish" }, "submit")?;
    let broken = prototypes.build::<Button>(params! { "colour" => "red" }, "submit")?;

    if let Some(button) = submit.component() {
        println!("🧩 prototype reused: {}", Arc::ptr_eq(button, &save));
    }
    if let Some(button) = publish.component() {
        println!("🧩 {}", button.render());
    }
    if let Some(fallback) = broken.fallback() {
        println!("🧩 {}", fallback.render());
    }

    println!("\n🎉 Everything works!");
    Ok(())
}
