//! Container settings.
//!
//! Settings can be built in code, deserialized with serde from any
//! format, or read from `QALIB_*` environment variables.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use qalib_support::environment;

use crate::error::{QalibError, Result};

/// Default bound on nested resolution depth.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// What `build` does when it fails in prototype mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// Return the error to the caller.
    #[default]
    Strict,
    /// Return an error component in place of the requested one.
    Fallback,
}

impl FromStr for ErrorMode {
    type Err = QalibError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ErrorMode::Strict),
            "fallback" | "soft" => Ok(ErrorMode::Fallback),
            _ => Err(QalibError::InvalidSetting {
                key: "error_mode".to_string(),
                value: value.to_string(),
                expected: "`strict` or `fallback`",
            }),
        }
    }
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMode::Strict => write!(f, "strict"),
            ErrorMode::Fallback => write!(f, "fallback"),
        }
    }
}

/// Container configuration.
///
/// ```
/// use qalib_container::settings::{ErrorMode, Settings};
///
/// let settings = Settings::default().with_error_mode(ErrorMode::Fallback);
/// assert_eq!(settings.max_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Maximum number of nested resolutions in one call. Never zero.
    #[serde(deserialize_with = "positive_depth")]
    pub max_depth: usize,
    /// Prototype-mode error handling.
    pub error_mode: ErrorMode,
    /// Explicit production flag; detected from the environment when unset.
    pub production: Option<bool>,
}

fn positive_depth<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    NonZeroUsize::deserialize(deserializer).map(NonZeroUsize::get)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            error_mode: ErrorMode::Strict,
            production: None,
        }
    }
}

impl Settings {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = error_mode;
        self
    }

    pub fn with_production(mut self, production: bool) -> Self {
        self.production = Some(production);
        self
    }

    /// Reads `QALIB_MAX_DEPTH`, `QALIB_ERROR_MODE` and `QALIB_PRODUCTION`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Settings::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    /// [`QalibError::InvalidSetting`] for values that do not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(value) = lookup("QALIB_MAX_DEPTH") {
            settings.max_depth = value
                .trim()
                .parse::<NonZeroUsize>()
                .map(NonZeroUsize::get)
                .map_err(|_| QalibError::InvalidSetting {
                    key: "QALIB_MAX_DEPTH".to_string(),
                    value: value.clone(),
                    expected: "a positive integer",
                })?;
        }

        if let Some(value) = lookup("QALIB_ERROR_MODE") {
            settings.error_mode = value.parse()?;
        }

        if let Some(value) = lookup("QALIB_PRODUCTION") {
            settings.production = Some(parse_flag(&value).ok_or_else(|| {
                QalibError::InvalidSetting {
                    key: "QALIB_PRODUCTION".to_string(),
                    value: value.clone(),
                    expected: "true or false",
                }
            })?);
        }

        Ok(settings)
    }

    /// Resolves the production flag: explicit setting, then environment.
    pub fn is_production(&self) -> bool {
        environment::is_production(self.production)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::default();
        assert_eq!(settings.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(settings.error_mode, ErrorMode::Strict);
        assert_eq!(settings.production, None);
    }

    #[test]
    fn deserialize_partial() {
        let settings: Settings =
            serde_json::from_str(r#"{ "error_mode": "fallback", "production": false }"#).unwrap();
        assert_eq!(settings.error_mode, ErrorMode::Fallback);
        assert_eq!(settings.production, Some(false));
        assert_eq!(settings.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn deserialize_rejects_unknown_keys() {
        assert!(serde_json::from_str::<Settings>(r#"{ "depth": 3 }"#).is_err());
    }

    #[test]
    fn from_lookup_reads_variables() {
        let settings = Settings::from_lookup(|name| match name {
            "QALIB_MAX_DEPTH" => Some("8".to_string()),
            "QALIB_ERROR_MODE" => Some("Fallback".to_string()),
            "QALIB_PRODUCTION" => Some("no".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(settings.max_depth, 8);
        assert_eq!(settings.error_mode, ErrorMode::Fallback);
        assert_eq!(settings.production, Some(false));
        assert!(!settings.is_production());
    }

    #[test]
    fn from_lookup_rejects_garbage() {
        let err = Settings::from_lookup(|name| {
            (name == "QALIB_MAX_DEPTH").then(|| "deep".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("QALIB_MAX_DEPTH"));

        assert!("loud".parse::<ErrorMode>().is_err());
    }

    #[test]
    fn from_lookup_rejects_zero_depth() {
        let err = Settings::from_lookup(|name| {
            (name == "QALIB_MAX_DEPTH").then(|| "0".to_string())
        })
        .unwrap_err();
        match err {
            QalibError::InvalidSetting { key, value, .. } => {
                assert_eq!(key, "QALIB_MAX_DEPTH");
                assert_eq!(value, "0");
            }
            other => panic!("Expected InvalidSetting, got: {other:?}"),
        }
    }

    #[test]
    fn explicit_production_wins() {
        assert!(Settings::default().with_production(true).is_production());
        assert!(!Settings::default().with_production(false).is_production());
    }
}
