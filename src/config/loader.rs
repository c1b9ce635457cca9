//! Configuration loader for system descriptors.
//!
//! Reads a `system.yaml` document, splits it into the `global` section and the
//! raw stack definitions, and resolves stack inheritance before returning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::inheritance::resolve_stacks;
use super::spec::SystemConfig;

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["system.yaml", "system.yml"];

/// Loader for the system configuration document.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Base path for locating the `.env` file.
    base_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory searched for a `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads and resolves configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be read, is not valid
    /// YAML, or has an unresolvable inheritance chain.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<SystemConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::parse(
                format!("Failed to read file: {e}"),
                Some(path.display().to_string()),
            )
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses and resolves configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or inheritance cannot be
    /// resolved.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<SystemConfig> {
        debug!("Parsing YAML configuration");
        let location = || source.map(|p| p.display().to_string());

        let document: Value = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::parse(format!("YAML parse error: {e}"), location()))?;

        let root = match document {
            Value::Null => Mapping::new(),
            Value::Mapping(root) => root,
            _ => {
                return Err(ConfigError::parse(
                    "Configuration root must be a mapping",
                    location(),
                )
                .into());
            }
        };

        let global = match root.get("global") {
            None | Some(Value::Null) => Mapping::new(),
            Some(Value::Mapping(global)) => global.clone(),
            Some(_) => {
                return Err(ConfigError::parse("'global' must be a mapping", location()).into());
            }
        };

        let raw = raw_stacks(&root).map_err(|message| ConfigError::parse(message, location()))?;
        let stacks = resolve_stacks(&raw)?;

        debug!("Loaded {} stack(s)", stacks.len());
        Ok(SystemConfig { global, stacks })
    }

    /// Loads the `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the `.env` file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                ConfigError::parse(
                    format!("Failed to load .env file: {e}"),
                    Some(env_path.display().to_string()),
                )
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Extracts the raw stack definitions from the document root.
fn raw_stacks(root: &Mapping) -> std::result::Result<BTreeMap<String, Mapping>, String> {
    let stacks = match root.get("stacks") {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Mapping(stacks)) => stacks,
        Some(_) => return Err(String::from("'stacks' must be a mapping")),
    };

    let mut raw = BTreeMap::new();
    for (name, definition) in stacks {
        let Some(name) = name.as_str() else {
            return Err(format!("Stack names must be strings, got: {name:?}"));
        };
        let definition = match definition {
            Value::Null => Mapping::new(),
            Value::Mapping(definition) => definition.clone(),
            _ => return Err(format!("{name}: Stack definition must be a mapping")),
        };
        raw.insert(name.to_string(), definition);
    }
    Ok(raw)
}

/// Finds the configuration file in `start_dir` or one of its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeployError;

    const SAMPLE: &str = r"
global:
  superset:
    version: 3.1.0
stacks:
  base:
    type: standard
    environment: gcp
    gcp:
      project_id: acme
      region: us-central1
  staging:
    extends: base
    gcp:
      region: europe-west1
  empty:
";

    #[test]
    fn test_parse_resolves_inheritance() {
        let config = ConfigLoader::new()
            .parse_yaml(SAMPLE, None)
            .expect("sample parses");

        assert_eq!(config.stack_names(), vec!["base", "empty", "staging"]);
        let staging = config.stack("staging").expect("staging exists");
        assert_eq!(staging.get("type").and_then(Value::as_str), Some("standard"));
        assert!(staging.get("extends").is_none());

        let gcp = staging
            .get("gcp")
            .and_then(Value::as_mapping)
            .expect("gcp section");
        assert_eq!(gcp.get("project_id").and_then(Value::as_str), Some("acme"));
        assert_eq!(gcp.get("region").and_then(Value::as_str), Some("europe-west1"));
        assert!(config.global.contains_key("superset"));
    }

    #[test]
    fn test_null_stack_is_empty_mapping() {
        let config = ConfigLoader::new()
            .parse_yaml(SAMPLE, None)
            .expect("sample parses");
        assert_eq!(config.stack("empty"), Some(&Mapping::new()));
    }

    #[test]
    fn test_empty_document_is_empty_config() {
        let config = ConfigLoader::new().parse_yaml("", None).expect("empty parses");
        assert!(config.global.is_empty());
        assert!(config.stacks.is_empty());
    }

    #[test]
    fn test_malformed_documents_are_parse_errors() {
        let loader = ConfigLoader::new();
        for content in ["stacks: [a, b", "- just\n- a list", "stacks: 3", "stacks: {a: 1}"] {
            let err = loader.parse_yaml(content, None).expect_err("must fail");
            assert!(
                matches!(err, DeployError::Config(ConfigError::ParseError { .. })),
                "{content:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_missing_parent_surfaces() {
        let err = ConfigLoader::new()
            .parse_yaml("stacks:\n  child: {extends: nowhere}", None)
            .expect_err("missing parent must fail");
        assert!(matches!(
            err,
            DeployError::Config(ConfigError::ParentNotFound { .. })
        ));
    }

    #[test]
    fn test_load_file_and_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("system.yaml");
        std::fs::write(&path, SAMPLE).expect("write config");

        let config = ConfigLoader::new().load_file(&path).expect("file loads");
        assert_eq!(config.stacks.len(), 3);

        let err = ConfigLoader::new()
            .load_file(dir.path().join("absent.yaml"))
            .expect_err("missing file must fail");
        assert!(matches!(
            err,
            DeployError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_parse_error_carries_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("system.yaml");
        std::fs::write(&path, "stacks: [").expect("write config");

        let err = ConfigLoader::new().load_file(&path).expect_err("must fail");
        match err {
            DeployError::Config(ConfigError::ParseError { location, .. }) => {
                assert_eq!(location, Some(path.display().to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("create dirs");
        std::fs::write(dir.path().join("system.yml"), "stacks: {}").expect("write config");

        let found = find_config_file(&nested).expect("config found");
        assert_eq!(found, dir.path().join("system.yml"));
    }

    #[test]
    fn test_missing_dotenv_is_ok() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(ConfigLoader::new().with_base_path(dir.path()).load_dotenv().is_ok());
    }
}
