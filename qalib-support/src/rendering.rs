//! Text rendering utilities for human-friendly error messages.
//!
//! Provides helpers to format resolution chains, variant lists,
//! type names and "did you mean?" suggestions in error output.

/// Word used when a list has nothing to show.
pub const NONE: &str = "none";

/// Renders a resolution chain as a readable string.
///
/// # Examples
/// ```
/// use qalib_support::rendering::render_chain;
///
/// let chain = vec!["Page", "Card", "Button", "Page"];
/// let rendered = render_chain(&chain);
/// assert_eq!(rendered, "Page → Card → Button → Page");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders a list of names comma-joined, or [`NONE`] when empty.
///
/// ```
/// use qalib_support::rendering::render_list;
///
/// assert_eq!(render_list(&["primary", "secondary"]), "primary, secondary");
/// assert_eq!(render_list(&[] as &[&str]), "none");
/// ```
pub fn render_list(items: &[impl AsRef<str>]) -> String {
    if items.is_empty() {
        return NONE.to_string();
    }

    items
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use qalib_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::components::forms::Button");
/// assert_eq!(short, "Button");
///
/// let short = shorten_type_name("alloc::sync::Arc<my_app::components::Card>");
/// assert_eq!(short, "Arc<Card>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    // "my_app::components::Button" → "Button"
    // "Arc<my_app::Card>" → "Arc<Card>"

    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut current_segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next(); // consume second ':'
                current_segment.clear(); // discard path prefix
            }
            '<' | '>' | ',' | ' ' => {
                result.push_str(&current_segment);
                result.push(ch);
                current_segment.clear();
            }
            _ => {
                current_segment.push(ch);
            }
        }
    }

    result.push_str(&current_segment);
    result
}

/// Generates a "did you mean?" suggestion based on known type names.
///
/// Compares the requested name against available names
/// and suggests close matches, best first.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            let name_short = shorten_type_name(name).to_lowercase();

            if name_lower.contains(&requested_lower)
                || requested_lower.contains(&name_lower)
            {
                return Some((name, 100));
            }

            if name_short.contains(&requested_short)
                || requested_short.contains(&name_short)
            {
                return Some((name, 80));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.dedup_by(|a, b| a.0 == b.0);
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_simple_chain() {
        let chain = vec!["A", "B", "A"];
        assert_eq!(render_chain(&chain), "A → B → A");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn render_list_keeps_order() {
        let variants = vec!["secondary".to_string(), "primary".to_string()];
        assert_eq!(render_list(&variants), "secondary, primary");
    }

    #[test]
    fn render_empty_list_says_none() {
        let variants: Vec<String> = vec![];
        assert_eq!(render_list(&variants), "none");
    }

    #[test]
    fn shorten_simple_path() {
        assert_eq!(shorten_type_name("my_app::ui::Button"), "Button");
    }

    #[test]
    fn shorten_with_generics() {
        assert_eq!(
            shorten_type_name("core::option::Option<alloc::sync::Arc<my_app::Card>>"),
            "Option<Arc<Card>>"
        );
    }

    #[test]
    fn shorten_no_path() {
        assert_eq!(shorten_type_name("Button"), "Button");
    }

    #[test]
    fn suggest_similar_types() {
        let available = vec!["my_app::Button", "my_app::ButtonGroup", "my_app::Card"];

        let suggestions = suggest_similar("Buton", &available, 3);
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].contains("Button"));
    }

    #[test]
    fn suggest_no_match() {
        let available = vec!["my_app::Card"];
        let suggestions = suggest_similar("XyzAbcDef", &available, 3);
        assert!(suggestions.is_empty());
    }
}
