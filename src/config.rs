//! Storefront configuration, loaded from TOML.
//!
//! ```toml
//! base_path = "/shop"
//! storage_key = "shopping_cart"
//! default_limit = 20
//! toast_duration_ms = 3000
//! max_toasts = 3
//! fetch_retries = 1
//! related_limit = 20
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::store::PageLimit;

// ============================================================================
// ConfigError
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

// ============================================================================
// ShopConfig
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShopConfig {
    /// Prefix stripped from every pathname before route matching.
    pub base_path: String,
    /// Storage key the cart is persisted under.
    pub storage_key: String,
    /// Page size used when the URL does not name one.
    pub default_limit: u32,
    pub toast_duration_ms: u64,
    pub max_toasts: usize,
    /// Automatic retries after a failed fetch, before showing the error.
    pub fetch_retries: u32,
    /// How many same-category products the detail page asks for.
    pub related_limit: u32,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            storage_key: "shopping_cart".to_string(),
            default_limit: 20,
            toast_duration_ms: 3000,
            max_toasts: 3,
            fetch_retries: 1,
            related_limit: 20,
        }
    }
}

impl ShopConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source =
            std::fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if PageLimit::from_value(self.default_limit).is_none() {
            return Err(ConfigError::Validation(format!(
                "default_limit must be one of 10, 20, 50, 100 (got {})",
                self.default_limit
            )));
        }
        if !self.base_path.is_empty() && (!self.base_path.starts_with('/') || self.base_path.ends_with('/')) {
            return Err(ConfigError::Validation(format!(
                "base_path must be empty or look like `/shop` (got `{}`)",
                self.base_path
            )));
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Validation("storage_key must not be empty".into()));
        }
        if self.max_toasts == 0 {
            return Err(ConfigError::Validation("max_toasts must be at least 1".into()));
        }
        Ok(())
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_duration_ms)
    }

    pub fn page_limit(&self) -> PageLimit {
        PageLimit::from_value(self.default_limit).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_empty_source_gives_defaults() {
        assert_eq!(ShopConfig::from_toml_str("").unwrap(), ShopConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = ShopConfig::from_toml_str("base_path = \"/shop\"\ndefault_limit = 50\n").unwrap();
        assert_eq!(config.base_path, "/shop");
        assert_eq!(config.page_limit(), PageLimit::Fifty);
        assert_eq!(config.storage_key, "shopping_cart");
    }

    #[test]
    fn test_validation_failures() {
        for source in [
            "default_limit = 25",
            "base_path = \"shop\"",
            "base_path = \"/shop/\"",
            "storage_key = \" \"",
            "max_toasts = 0",
        ] {
            let err = ShopConfig::from_toml_str(source).unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)), "{source}: {err}");
        }
    }

    #[test]
    fn test_unknown_field_is_parse_error() {
        let err = ShopConfig::from_toml_str("colour = \"red\"").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "toast_duration_ms = 500").unwrap();
        let config = ShopConfig::load(file.path()).unwrap();
        assert_eq!(config.toast_duration(), Duration::from_millis(500));

        let missing = ShopConfig::load(file.path().with_extension("missing")).unwrap_err();
        assert!(missing.to_string().contains("IO error"));
    }
}
