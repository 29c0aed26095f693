use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

use crate::translator::{DEFAULT_MAX_DEPTH, TranslateOptions};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid value for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Settings of the translate server. Every field has a default, so YAML
/// files only need to name what they change.
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    #[validate(length(min = 1, message = "HTTP host cannot be empty"))]
    pub http_host: String,

    #[validate(range(min = 1, message = "HTTP port cannot be 0"))]
    pub http_port: u16,

    /// Type definitions compiled once at startup
    #[validate(length(min = 1, message = "Type definitions path cannot be empty"))]
    pub type_defs: String,

    /// Bound on selection and input nesting
    #[validate(range(min = 1, max = 64, message = "Max depth must be between 1 and 64"))]
    pub max_depth: usize,

    #[validate(range(min = 1, max = 3600, message = "Request timeout must be between 1 and 3600 seconds"))]
    pub request_timeout_secs: u64,

    #[validate(range(min = 1024, message = "Body limit must be at least 1024 bytes"))]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            type_defs: "schema.graphql".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by any `GRAPHCYPHER_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(host) = env::var("GRAPHCYPHER_HOST") {
            config.http_host = host;
        }
        if let Ok(type_defs) = env::var("GRAPHCYPHER_TYPEDEFS") {
            config.type_defs = type_defs;
        }
        override_from_env("GRAPHCYPHER_PORT", &mut config.http_port)?;
        override_from_env("GRAPHCYPHER_MAX_DEPTH", &mut config.max_depth)?;
        override_from_env("GRAPHCYPHER_REQUEST_TIMEOUT", &mut config.request_timeout_secs)?;
        override_from_env("GRAPHCYPHER_MAX_BODY_BYTES", &mut config.max_body_bytes)?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: path.display().to_string(),
            value: "YAML document".to_string(),
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// YAML file when given, environment otherwise, then command line values on top.
    pub fn load(file: Option<&Path>, cli: CliConfig) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::from_env()?,
        };
        config.merge(cli);
        config.validate()?;
        Ok(config)
    }

    /// Apply the command line values that were actually given.
    pub fn merge(&mut self, cli: CliConfig) {
        if let Some(host) = cli.http_host {
            self.http_host = host;
        }
        if let Some(port) = cli.http_port {
            self.http_port = port;
        }
        if let Some(type_defs) = cli.type_defs {
            self.type_defs = type_defs;
        }
        if let Some(max_depth) = cli.max_depth {
            self.max_depth = max_depth;
        }
    }

    /// Options for one request; a request may only tighten the configured depth.
    pub fn translate_options(&self, requested_depth: Option<usize>) -> TranslateOptions {
        TranslateOptions {
            max_depth: requested_depth.map_or(self.max_depth, |depth| depth.min(self.max_depth)),
        }
    }
}

/// Command line overrides; `None` keeps the file or environment value.
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub http_host: Option<String>,
    pub http_port: Option<u16>,
    pub type_defs: Option<String>,
    pub max_depth: Option<usize>,
}

fn override_from_env<T: std::str::FromStr>(key: &str, target: &mut T) -> Result<(), ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Ok(value) = env::var(key) else {
        return Ok(());
    };
    *target = value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn yaml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_out_of_range_values() {
        for config in [
            ServerConfig {
                http_port: 0,
                ..Default::default()
            },
            ServerConfig {
                max_depth: 0,
                ..Default::default()
            },
            ServerConfig {
                http_host: String::new(),
                ..Default::default()
            },
            ServerConfig {
                max_body_bytes: 10,
                ..Default::default()
            },
        ] {
            assert!(config.validate().is_err(), "{:?}", config);
        }
    }

    #[test]
    fn test_yaml_names_only_what_changes() {
        let file = yaml("http_port: 9090\ntype_defs: movies.graphql\nmax_depth: 8");
        let config = ServerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.type_defs, "movies.graphql");
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.http_host, "0.0.0.0");
    }

    #[test]
    fn test_yaml_file_is_validated() {
        let file = yaml("max_depth: 500");
        assert!(matches!(
            ServerConfig::from_yaml_file(file.path()),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            ServerConfig::from_yaml_file("/nonexistent/graphcypher.yaml"),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_command_line_overrides_file() {
        let file = yaml("http_port: 9090\nmax_depth: 8");
        let cli = CliConfig {
            max_depth: Some(4),
            ..CliConfig::default()
        };
        let config = ServerConfig::load(Some(file.path()), cli).unwrap();
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.max_depth, 4);

        let cli = CliConfig {
            max_depth: Some(100),
            ..CliConfig::default()
        };
        assert!(ServerConfig::load(Some(file.path()), cli).is_err());
    }

    #[test]
    fn test_requests_can_only_tighten_depth() {
        let config = ServerConfig {
            max_depth: 8,
            ..Default::default()
        };
        assert_eq!(config.translate_options(None).max_depth, 8);
        assert_eq!(config.translate_options(Some(3)).max_depth, 3);
        assert_eq!(config.translate_options(Some(30)).max_depth, 8);
    }
}
