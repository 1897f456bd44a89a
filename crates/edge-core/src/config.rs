//! Service configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Largest page a key listing may request.
pub const MAX_LIST_PAGE_SIZE: u32 = 1000;

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown environment '{0}' (expected production, staging or development)")]
    InvalidEnvironment(String),

    #[error("list page size must be between 1 and {max}, got {0}", max = MAX_LIST_PAGE_SIZE)]
    InvalidPageSize(u32),

    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: String, value: String },
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    #[default]
    Development,
}

impl Environment {
    /// Parse an environment name.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" | "dev" => Ok(Self::Development),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Whether diagnostic detail must be withheld from clients.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of the key-value stores the service reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreBindings {
    /// Package name -> package metadata JSON.
    pub packages: String,
    /// `package/version` -> version metadata JSON.
    pub versions: String,
    /// `package/version/file` -> record whose metadata carries `sri`.
    pub sris: String,
    /// Package name -> gzip-compressed aggregated metadata.
    pub aggregated: String,
    /// Store backing the response cache.
    pub response_cache: String,
}

impl Default for StoreBindings {
    fn default() -> Self {
        Self {
            packages: "CDNJS_PACKAGES".to_string(),
            versions: "CDNJS_VERSIONS".to_string(),
            sris: "CDNJS_SRIS".to_string(),
            aggregated: "CDNJS_AGGREGATED_METADATA".to_string(),
            response_cache: "default".to_string(),
        }
    }
}

/// Top-level service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Deployment environment.
    pub environment: Environment,
    /// Store binding names.
    pub stores: StoreBindings,
    /// Page-size hint forwarded to every key listing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_page_size: Option<u32>,
    /// Destination of the failure reporter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_dsn: Option<String>,
    /// Honour `X-Debug-Cache: 1` by adding cache explain headers.
    pub debug_cache_headers: bool,
}

impl ServiceConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Build a config from a flat variable source.
    ///
    /// Recognised names: `environment`, `packages_store`, `versions_store`,
    /// `sris_store`, `aggregated_store`, `response_cache_store`,
    /// `list_page_size`, `failure_dsn`, `debug_cache_headers`. Missing names
    /// keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(env) = lookup("environment") {
            config.environment = Environment::from_name(&env)?;
        }
        if let Some(name) = lookup("packages_store") {
            config.stores.packages = name;
        }
        if let Some(name) = lookup("versions_store") {
            config.stores.versions = name;
        }
        if let Some(name) = lookup("sris_store") {
            config.stores.sris = name;
        }
        if let Some(name) = lookup("aggregated_store") {
            config.stores.aggregated = name;
        }
        if let Some(name) = lookup("response_cache_store") {
            config.stores.response_cache = name;
        }
        if let Some(size) = lookup("list_page_size") {
            let parsed = size.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "list_page_size".to_string(),
                value: size.clone(),
            })?;
            config.list_page_size = Some(parsed);
        }
        config.failure_dsn = lookup("failure_dsn").filter(|dsn| !dsn.is_empty());
        if let Some(flag) = lookup("debug_cache_headers") {
            config.debug_cache_headers = parse_flag("debug_cache_headers", &flag)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(size) = self.list_page_size {
            if size == 0 || size > MAX_LIST_PAGE_SIZE {
                return Err(ConfigError::InvalidPageSize(size));
            }
        }
        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.stores.packages, "CDNJS_PACKAGES");
        assert_eq!(config.stores.aggregated, "CDNJS_AGGREGATED_METADATA");
        assert!(config.list_page_size.is_none());
        assert!(!config.debug_cache_headers);
    }

    #[test]
    fn test_from_toml() {
        let config = ServiceConfig::from_toml_str(
            r#"
            environment = "production"
            list_page_size = 500

            [stores]
            packages = "PKGS"
            "#,
        )
        .unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.list_page_size, Some(500));
        assert_eq!(config.stores.packages, "PKGS");
        // Unset bindings keep defaults.
        assert_eq!(config.stores.versions, "CDNJS_VERSIONS");
    }

    #[test]
    fn test_from_toml_rejects_oversized_page() {
        let err = ServiceConfig::from_toml_str("list_page_size = 5000").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPageSize(5000)));
    }

    #[test]
    fn test_from_toml_rejects_unknown_environment() {
        assert!(ServiceConfig::from_toml_str(r#"environment = "moon""#).is_err());
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("environment", "Production"),
            ("sris_store", "SRIS"),
            ("list_page_size", "250"),
            ("debug_cache_headers", "true"),
            ("failure_dsn", ""),
        ]
        .into_iter()
        .collect();

        let config =
            ServiceConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.stores.sris, "SRIS");
        assert_eq!(config.list_page_size, Some(250));
        assert!(config.debug_cache_headers);
        assert!(config.failure_dsn.is_none());
    }

    #[test]
    fn test_from_lookup_bad_values() {
        let err = ServiceConfig::from_lookup(|name| {
            (name == "list_page_size").then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("list_page_size"));

        let err = ServiceConfig::from_lookup(|name| {
            (name == "environment").then(|| "qa".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvironment(_)));
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::Staging.to_string(), "staging");
        assert_eq!(Environment::from_name("dev").unwrap(), Environment::Development);
    }
}
