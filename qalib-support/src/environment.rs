//! Production-mode detection.
//!
//! Decides whether diagnostics may be shown to end users. The order is:
//! 1. an explicit flag passed by the caller,
//! 2. the `QALIB_ENV` (or `APP_ENV`) environment setting,
//! 3. otherwise production, whether or not stdout is a terminal.
//!
//! Diagnostics only appear when someone asked for them. The terminal
//! check is only reported in the trace output.

use std::io::IsTerminal;

use tracing::trace;

/// Environment variables consulted, in order.
pub const ENV_VARS: [&str; 2] = ["QALIB_ENV", "APP_ENV"];

/// Interprets an environment name.
///
/// Returns `None` for names that say nothing about production.
pub fn parse_environment(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "production" | "prod" => Some(true),
        "development" | "dev" | "local" | "testing" | "test" | "staging" => Some(false),
        _ => None,
    }
}

/// Detects production mode from the real process environment.
pub fn is_production(explicit: Option<bool>) -> bool {
    is_production_with(
        explicit,
        |name| std::env::var(name).ok(),
        std::io::stdout().is_terminal(),
    )
}

/// Detects production mode from an arbitrary variable lookup.
///
/// With no explicit flag and no recognised setting the answer is
/// production, interactive or not; `interactive` is only traced.
///
/// ```
/// use qalib_support::environment::is_production_with;
///
/// let lookup = |name: &str| (name == "APP_ENV").then(|| "local".to_string());
/// assert!(!is_production_with(None, lookup, false));
/// assert!(is_production_with(Some(true), lookup, false));
/// ```
pub fn is_production_with(
    explicit: Option<bool>,
    lookup: impl Fn(&str) -> Option<String>,
    interactive: bool,
) -> bool {
    if let Some(flag) = explicit {
        return flag;
    }

    for name in ENV_VARS {
        if let Some(flag) = lookup(name).as_deref().and_then(parse_environment) {
            trace!(variable = name, production = flag, "Environment setting found");
            return flag;
        }
    }

    trace!(interactive, "No environment setting, assuming production");
    true
}
