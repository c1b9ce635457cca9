//! Configuration validation for stack descriptors.
//!
//! Validation runs on the resolved YAML mapping of a stack, before any typed
//! conversion, so that a malformed value shows up as a readable error string
//! instead of a deserialization failure. Every rule runs; errors accumulate.
//! A stack that passes every rule is then run through the typed conversion,
//! so an accepted stack always deploys past the parsing step.

use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::spec::{
    CacheType, DatabaseType, Environment, SECTIONS, StackConfig, StackType, SystemConfig,
};

/// Validator for stack configurations.
#[derive(Debug, Default, Clone, Copy)]
pub struct StackValidator;

impl StackValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a single resolved stack.
    ///
    /// Returns every rule violation found; an empty list means the stack is
    /// valid and converts to a [`StackConfig`].
    #[must_use]
    pub fn validate_stack(&self, config: &Mapping) -> Vec<String> {
        self.validate_stack_with_global(config, &Mapping::new())
    }

    /// Validates a stack as it will be deployed, with `global.superset`
    /// layered under its own `superset` section.
    #[must_use]
    pub fn validate_stack_with_global(&self, config: &Mapping, global: &Mapping) -> Vec<String> {
        let mut errors = Vec::new();

        Self::validate_sections(config, &mut errors);
        Self::validate_identity(config, &mut errors);
        Self::validate_gcp(config, &mut errors);
        Self::validate_superset(config, &mut errors);
        Self::validate_database(config, &mut errors);
        Self::validate_cache(config, &mut errors);

        // Shapes the rules above do not name still have to fit the typed record.
        if errors.is_empty() {
            if let Err(e) = StackConfig::convert(config, global) {
                errors.push(format!("Invalid stack configuration: {e}"));
            }
        }

        debug!("Stack validation finished with {} error(s)", errors.len());
        errors
    }

    /// Validates a whole configuration document.
    ///
    /// The document must define at least one stack. Each stack error is
    /// prefixed with the stack name.
    #[must_use]
    pub fn validate_system(&self, document: &Value) -> Vec<String> {
        let stacks = match document.get("stacks") {
            Some(Value::Mapping(stacks)) if !stacks.is_empty() => stacks,
            _ => return vec![String::from("No stacks defined in configuration")],
        };

        let global = document
            .get("global")
            .and_then(Value::as_mapping)
            .cloned()
            .unwrap_or_default();

        let mut errors = Vec::new();
        for (name, stack) in stacks {
            let name = display_value(name);
            match stack {
                Value::Mapping(config) => self.collect_prefixed(&name, config, &global, &mut errors),
                _ => errors.push(format!("{name}: Stack definition must be a mapping")),
            }
        }
        errors
    }

    /// Validates every stack of an already resolved configuration.
    #[must_use]
    pub fn validate_resolved(&self, system: &SystemConfig) -> Vec<String> {
        if system.stacks.is_empty() {
            return vec![String::from("No stacks defined in configuration")];
        }

        let mut errors = Vec::new();
        for (name, config) in &system.stacks {
            self.collect_prefixed(name, config, &system.global, &mut errors);
        }
        errors
    }

    fn collect_prefixed(
        &self,
        name: &str,
        config: &Mapping,
        global: &Mapping,
        errors: &mut Vec<String>,
    ) {
        errors.extend(
            self.validate_stack_with_global(config, global)
                .into_iter()
                .map(|error| format!("{name}: {error}")),
        );
    }

    /// Recognized sections must be mappings.
    fn validate_sections(config: &Mapping, errors: &mut Vec<String>) {
        for section in SECTIONS {
            match config.get(*section) {
                None | Some(Value::Null | Value::Mapping(_)) => {}
                Some(_) => errors.push(format!("{section} section must be a mapping")),
            }
        }
    }

    /// Validates `type`, `environment` and `enabled`.
    fn validate_identity(config: &Mapping, errors: &mut Vec<String>) {
        match config.get("type") {
            None => errors.push(String::from("Stack type is required")),
            Some(value) if !is_one_of(value, &StackType::NAMES) => {
                errors.push(format!("Invalid stack type: {}", display_value(value)));
            }
            Some(_) => {}
        }

        match config.get("environment") {
            None => errors.push(String::from("Environment is required")),
            Some(value) if !is_one_of(value, &Environment::NAMES) => {
                errors.push(format!("Invalid environment: {}", display_value(value)));
            }
            Some(_) => {}
        }

        match config.get("enabled") {
            None | Some(Value::Bool(_)) => {}
            Some(value) => errors.push(format!(
                "Stack enabled flag must be a boolean, got: {}",
                display_value(value)
            )),
        }
    }

    /// GCP deployments need a project and region.
    fn validate_gcp(config: &Mapping, errors: &mut Vec<String>) {
        if !is_gcp(config) {
            return;
        }

        let gcp = section(config, "gcp");
        if gcp.is_none_or(|gcp| is_blank(gcp.get("project_id"))) {
            errors.push(String::from("GCP project_id is required for GCP deployments"));
        }
        if gcp.is_none_or(|gcp| is_blank(gcp.get("region"))) {
            errors.push(String::from("GCP region is required for GCP deployments"));
        }
    }

    /// Validates replicas and resource limits.
    fn validate_superset(config: &Mapping, errors: &mut Vec<String>) {
        let Some(superset) = section(config, "superset") else {
            return;
        };

        if let Some(replicas) = superset.get("replicas") {
            if !replicas.as_u64().is_some_and(|n| n >= 1) {
                errors.push(String::from("Superset replicas must be a positive integer"));
            }
        }

        for key in ["resources", "autoscaling"] {
            match superset.get(key) {
                None | Some(Value::Null | Value::Mapping(_)) => {}
                Some(_) => errors.push(format!("Superset {key} must be a mapping")),
            }
        }

        let Some(resources) = superset.get("resources").and_then(Value::as_mapping) else {
            return;
        };

        if let Some(cpu) = resources.get("cpu") {
            if !parses_as_float(cpu) {
                errors.push(format!("Invalid CPU value: {}", display_value(cpu)));
            }
        }

        if let Some(memory) = resources.get("memory") {
            let valid = memory
                .as_str()
                .is_some_and(|m| m.ends_with("Mi") || m.ends_with("Gi"));
            if !valid {
                errors.push(format!("Invalid memory format: {}", display_value(memory)));
            }
        }
    }

    /// Validates the database backend and its environment constraint.
    fn validate_database(config: &Mapping, errors: &mut Vec<String>) {
        let Some(database) = section(config, "database") else {
            return;
        };

        let db_type = database.get("type");
        if !db_type.is_some_and(|t| is_one_of(t, &DatabaseType::NAMES)) {
            errors.push(format!("Invalid database type: {}", display_opt(db_type)));
        }

        if db_type.and_then(Value::as_str) == Some("cloud-sql") && !is_gcp(config) {
            errors.push(String::from("Cloud SQL can only be used in GCP environment"));
        }
    }

    /// Validates the cache backend.
    fn validate_cache(config: &Mapping, errors: &mut Vec<String>) {
        let Some(cache) = section(config, "cache") else {
            return;
        };

        let cache_type = cache.get("type");
        if !cache_type.is_some_and(|t| is_one_of(t, &CacheType::NAMES)) {
            errors.push(format!("Invalid cache type: {}", display_opt(cache_type)));
        }
    }
}

/// Returns a non-empty section mapping; empty sections count as absent.
fn section<'a>(config: &'a Mapping, key: &str) -> Option<&'a Mapping> {
    config
        .get(key)
        .and_then(Value::as_mapping)
        .filter(|section| !section.is_empty())
}

fn is_gcp(config: &Mapping) -> bool {
    config.get("environment").and_then(Value::as_str) == Some("gcp")
}

fn is_one_of(value: &Value, names: &[&str]) -> bool {
    value.as_str().is_some_and(|s| names.contains(&s))
}

/// Missing, null and empty-string values are blank.
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn parses_as_float(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

/// Renders a YAML value for an error message.
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::from("null"),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().replace('\n', " "))
            .unwrap_or_else(|_| String::from("<unprintable>")),
    }
}

fn display_opt(value: Option<&Value>) -> String {
    value.map_or_else(|| String::from("<missing>"), display_value)
}
