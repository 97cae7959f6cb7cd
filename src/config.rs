//! Service configuration: TOML file first, then `SPR_*` environment overrides
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub store: StoreConfig,
    pub access: AccessConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    // sled deletes the database on drop
    pub temporary: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Role claim value that grants reviewer rights.
    pub reviewer_role: String,
    /// Accept creates with no principal, as posted by the form service webhook.
    pub allow_anonymous_create: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./spr-data"),
            temporary: false,
        }
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            reviewer_role: "reviewer".to_owned(),
            allow_anonymous_create: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Compact,
        }
    }
}

impl ServiceConfig {
    /// Load from `path` if given, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|key| env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// `lookup` stands in for the environment so overrides can be tested
    /// without mutating process state.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = lookup("SPR_STORE_PATH") {
            self.store.path = PathBuf::from(path);
        }
        if let Some(value) = lookup("SPR_STORE_TEMPORARY") {
            self.store.temporary = parse_bool("SPR_STORE_TEMPORARY", &value)?;
        }
        if let Some(role) = lookup("SPR_REVIEWER_ROLE") {
            self.access.reviewer_role = role;
        }
        if let Some(value) = lookup("SPR_ALLOW_ANONYMOUS_CREATE") {
            self.access.allow_anonymous_create = parse_bool("SPR_ALLOW_ANONYMOUS_CREATE", &value)?;
        }
        if let Some(level) = lookup("SPR_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(value) = lookup("SPR_LOG_FORMAT") {
            self.logging.format = match value.to_ascii_lowercase().as_str() {
                "compact" => LogFormat::Compact,
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidEnvOverride {
                        key: "SPR_LOG_FORMAT".to_owned(),
                        value,
                    });
                }
            };
        }
        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml(
            r#"
            [access]
            reviewer_role = "spr-admin"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.access.reviewer_role, "spr-admin");
        assert!(!config.access.allow_anonymous_create);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("SPR_STORE_PATH", "/var/lib/spr"),
            ("SPR_ALLOW_ANONYMOUS_CREATE", "true"),
            ("SPR_LOG_FORMAT", "Pretty"),
        ]
        .into_iter()
        .collect();

        let config = ServiceConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.store.path, PathBuf::from("/var/lib/spr"));
        assert!(config.access.allow_anonymous_create);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn rejects_unparseable_override() {
        let err = ServiceConfig::default()
            .with_overrides(|key| (key == "SPR_STORE_TEMPORARY").then(|| "maybe".to_owned()))
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidEnvOverride { .. }));
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let err = ServiceConfig::from_file(Path::new("/nonexistent/spr.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/spr.toml"));
    }
}
