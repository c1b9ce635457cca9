//! Shared state of a stack strategy.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use serde_yaml::Mapping;

use crate::config::StackConfig;
use crate::error::{ConfigError, DeployError, ProvisionError, Result};
use crate::provision::{CollaboratorKind, CollaboratorRequest, IdentityContext, Outputs};

/// Value of the `managed-by` and `project` labels.
pub const MANAGED_BY: &str = "superset-deploy";

/// Everything a strategy needs to deploy one stack.
#[derive(Debug, Clone)]
pub struct StackContext {
    /// Stack name.
    pub name: String,
    /// Typed stack configuration.
    pub config: StackConfig,
    /// Global settings shared by every stack.
    pub global: Mapping,
}

impl StackContext {
    /// Creates a new stack context.
    #[must_use]
    pub fn new(name: impl Into<String>, config: StackConfig, global: Mapping) -> Self {
        Self {
            name: name.into(),
            config,
            global,
        }
    }

    /// Returns `<stack>-<suffix>`.
    #[must_use]
    pub fn resource_name(&self, suffix: &str) -> String {
        format!("{}-{suffix}", self.name)
    }

    /// Labels applied to every resource of this stack.
    #[must_use]
    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (String::from("environment"), self.name.clone()),
            (String::from("managed-by"), String::from(MANAGED_BY)),
            (String::from("project"), String::from(MANAGED_BY)),
            (
                String::from("stack-type"),
                self.config.stack_type.to_string(),
            ),
        ])
    }

    /// Returns the GCP identity of the stack.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] if `gcp.project_id` is not set.
    pub fn identity(&self) -> Result<IdentityContext> {
        let project_id = self
            .config
            .project_id()
            .ok_or_else(|| ConfigError::MissingField {
                stack: self.name.clone(),
                stack_type: self.config.stack_type.to_string(),
                field: String::from("gcp.project_id"),
            })?;

        Ok(IdentityContext {
            project_id: project_id.to_string(),
            region: self.config.region().to_string(),
            zone: self.config.zone(),
        })
    }

    /// Starts a labelled request for a resource named `<stack>-<suffix>`.
    #[must_use]
    pub fn request(&self, kind: CollaboratorKind, suffix: &str) -> CollaboratorRequest {
        CollaboratorRequest::new(kind, self.resource_name(suffix)).with_labels(self.labels())
    }
}

/// Converts a config section into the JSON handed to a collaborator.
pub(crate) fn to_json<T: Serialize>(section: &T) -> Result<Value> {
    serde_json::to_value(section)
        .map_err(|e| DeployError::internal(format!("Failed to encode collaborator config: {e}")))
}

/// Reads a required list output of a collaborator.
pub(crate) fn require_list(
    outputs: &Outputs,
    kind: CollaboratorKind,
    key: &str,
) -> Result<Vec<Value>> {
    outputs
        .get(key)
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| ProvisionError::missing_output(kind.as_str(), key).into())
}

/// Inserts a key into an object value; other values are left untouched.
pub(crate) fn with_field(mut value: Value, key: &str, field: impl Into<Value>) -> Value {
    if let Value::Object(map) = &mut value {
        map.insert(key.to_string(), field.into());
    }
    value
}


#[cfg(test)]
mod tests {
    use super::fixtures::context;
    use super::*;

    #[test]
    fn test_labels_and_names() {
        let ctx = context("staging", "type: standard\nenvironment: gcp");
        let labels = ctx.labels();

        assert_eq!(ctx.resource_name("db"), "staging-db");
        assert_eq!(labels["environment"], "staging");
        assert_eq!(labels["managed-by"], MANAGED_BY);
        assert_eq!(labels["stack-type"], "standard");
    }

    #[test]
    fn test_identity_requires_project() {
        let ctx = context("staging", "type: standard\nenvironment: gcp");
        let err = ctx.identity().expect_err("no project id");
        assert_eq!(
            err.to_string(),
            "Configuration error: gcp.project_id is required for standard stack 'staging'"
        );

        let ctx = context(
            "staging",
            "type: standard\nenvironment: gcp\ngcp: {project_id: acme}",
        );
        let identity = ctx.identity().expect("project set");
        assert_eq!(identity.region, "us-central1");
        assert_eq!(identity.zone, "us-central1-a");
    }

    #[test]
    fn test_with_field() {
        let value = with_field(serde_json::json!({"a": 1}), "b", 2);
        assert_eq!(value, serde_json::json!({"a": 1, "b": 2}));
    }
}
