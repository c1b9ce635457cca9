//! Stack dispatcher.
//!
//! Looks up a resolved stack, validates it, and hands it to the strategy its
//! `type` selects. A stack that fails validation or is disabled never reaches
//! a collaborator.

use serde::Serialize;
use serde_yaml::Value;
use tracing::{info, warn};

use crate::config::{ConfigHasher, StackConfig, StackType, StackValidator, SystemConfig, is_enabled};
use crate::error::{ConfigError, Result};
use crate::provision::{Outputs, Provisioner};
use crate::stacks::{Stack, StackContext};

/// Result of a successful deployment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployReport {
    /// Stack name.
    pub stack: String,
    /// Strategy that ran.
    pub stack_type: StackType,
    /// Fingerprint of the resolved stack configuration.
    pub fingerprint: String,
    /// Every output exported by the strategy.
    pub outputs: Outputs,
}

/// Outcome of dispatching one stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeployOutcome {
    /// The stack is disabled; nothing ran.
    Disabled {
        /// Stack name.
        stack: String,
    },
    /// The stack was deployed.
    Deployed(DeployReport),
}

/// Routes stacks to their strategies.
#[derive(Debug)]
pub struct Dispatcher<'a, P: ?Sized> {
    config: &'a SystemConfig,
    provisioner: &'a P,
    validator: StackValidator,
    hasher: ConfigHasher,
}

impl<'a, P> Dispatcher<'a, P>
where
    P: Provisioner + ?Sized,
{
    /// Creates a dispatcher over a resolved configuration.
    #[must_use]
    pub const fn new(config: &'a SystemConfig, provisioner: &'a P) -> Self {
        Self {
            config,
            provisioner,
            validator: StackValidator::new(),
            hasher: ConfigHasher::new(),
        }
    }

    /// Maps a deployment name onto a configured stack.
    ///
    /// An exact match wins. Otherwise a qualified name such as
    /// `superset-dev` resolves to the segment after its last `-`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StackNotFound`] if neither form matches.
    pub fn resolve_stack_name(&self, name: &str) -> Result<String> {
        if self.config.stacks.contains_key(name) {
            return Ok(name.to_string());
        }

        match name.rsplit_once('-') {
            Some((_, short)) if self.config.stacks.contains_key(short) => Ok(short.to_string()),
            _ => Err(ConfigError::StackNotFound {
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// Validates and deploys one stack.
    ///
    /// # Errors
    ///
    /// Returns an error if the stack is unknown, fails validation, has an
    /// unusable type or field, or a collaborator fails.
    pub async fn dispatch(&self, name: &str) -> Result<DeployOutcome> {
        let name = self.resolve_stack_name(name)?;
        let Some(stack) = self.config.stack(&name) else {
            return Err(ConfigError::StackNotFound { name }.into());
        };

        let errors = self
            .validator
            .validate_stack_with_global(stack, &self.config.global);
        if !errors.is_empty() {
            return Err(ConfigError::ValidationFailed {
                stack: name,
                errors,
            }
            .into());
        }

        if !is_enabled(stack) {
            warn!("Stack {name} is disabled, skipping deployment");
            return Ok(DeployOutcome::Disabled { stack: name });
        }

        let raw_type = stack.get("type").and_then(Value::as_str).unwrap_or_default();
        let stack_type: StackType = raw_type.parse()?;
        let stack_config = StackConfig::from_resolved(stack, &self.config.global)?;
        let fingerprint = self.hasher.hash_stack(stack);

        info!(
            "Deploying {stack_type} stack {name} ({})",
            self.hasher.short_hash(&fingerprint)
        );
        let ctx = StackContext::new(name.clone(), stack_config, self.config.global.clone());
        let outputs = Stack::new(stack_type, ctx).deploy(self.provisioner).await?;

        Ok(DeployOutcome::Deployed(DeployReport {
            stack: name,
            stack_type,
            fingerprint,
            outputs,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;
    use crate::error::{DeployError, ProvisionError};
    use crate::provision::{CollaboratorKind, DryRunProvisioner, MockProvisioner};

    const SYSTEM: &str = r"
stacks:
  dev:
    type: minimal
    environment: local
  off:
    type: minimal
    environment: local
    enabled: false
  broken:
    type: standard
    environment: local
    database:
      type: cloud-sql
  staging:
    type: standard
    environment: gcp
    gcp:
      project_id: acme
      region: us-central1
    database:
      type: cloud-sql
  bare:
    type: minimal
    environment: local
    database: {}
    cache: {}
    superset:
      version: 3.1
  misshapen:
    type: minimal
    environment: local
    superset:
      port: eighty
";

    fn system() -> SystemConfig {
        ConfigLoader::new()
            .parse_yaml(SYSTEM, None)
            .expect("system parses")
    }

    fn untouched() -> MockProvisioner {
        let mut provisioner = MockProvisioner::new();
        provisioner.expect_provision().never();
        provisioner
    }

    #[tokio::test]
    async fn test_minimal_dispatch() {
        let config = system();
        let provisioner = untouched();

        let outcome = Dispatcher::new(&config, &provisioner)
            .dispatch("dev")
            .await
            .expect("dispatch succeeds");

        match outcome {
            DeployOutcome::Deployed(report) => {
                assert_eq!(report.stack_type, StackType::Minimal);
                assert_eq!(report.fingerprint.len(), 64);
                assert_eq!(report.outputs["environment"], serde_json::json!("local"));
            }
            DeployOutcome::Disabled { .. } => panic!("dev is enabled"),
        }
    }

    #[tokio::test]
    async fn test_disabled_stack_is_skipped() {
        let config = system();
        let provisioner = untouched();

        let outcome = Dispatcher::new(&config, &provisioner)
            .dispatch("off")
            .await
            .expect("dispatch succeeds");
        assert_eq!(
            outcome,
            DeployOutcome::Disabled {
                stack: String::from("off")
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_stack_never_provisions() {
        let config = system();
        let provisioner = untouched();

        let err = Dispatcher::new(&config, &provisioner)
            .dispatch("broken")
            .await
            .expect_err("validation fails");
        assert_eq!(
            err.validation_errors(),
            Some(&[String::from("Cloud SQL can only be used in GCP environment")][..])
        );
    }

    #[tokio::test]
    async fn test_empty_sections_and_numeric_version_dispatch() {
        let config = system();
        let provisioner = untouched();

        let outcome = Dispatcher::new(&config, &provisioner)
            .dispatch("bare")
            .await
            .expect("a stack that validates also deploys");
        let DeployOutcome::Deployed(report) = outcome else {
            panic!("bare is enabled");
        };
        assert_eq!(report.outputs["superset_version"], serde_json::json!("3.1"));
    }

    #[tokio::test]
    async fn test_shape_errors_stop_at_validation() {
        let config = system();
        let provisioner = untouched();

        let err = Dispatcher::new(&config, &provisioner)
            .dispatch("misshapen")
            .await
            .expect_err("validation fails");
        let errors = err.validation_errors().expect("validation error");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid stack configuration:"));
    }

    #[tokio::test]
    async fn test_unknown_stack() {
        let config = system();
        let provisioner = untouched();

        let err = Dispatcher::new(&config, &provisioner)
            .dispatch("qa")
            .await
            .expect_err("unknown stack");
        assert!(matches!(
            err,
            DeployError::Config(ConfigError::StackNotFound { ref name }) if name == "qa"
        ));
    }

    #[test]
    fn test_resolve_qualified_names() {
        let config = system();
        let provisioner = DryRunProvisioner::new();
        let dispatcher = Dispatcher::new(&config, &provisioner);

        assert_eq!(dispatcher.resolve_stack_name("staging").ok().as_deref(), Some("staging"));
        assert_eq!(dispatcher.resolve_stack_name("superset-dev").ok().as_deref(), Some("dev"));
        assert!(dispatcher.resolve_stack_name("superset-qa").is_err());
    }

    #[tokio::test]
    async fn test_standard_dispatch_runs_collaborators() {
        let config = system();
        let provisioner = DryRunProvisioner::new();

        let outcome = Dispatcher::new(&config, &provisioner)
            .dispatch("superset-staging")
            .await
            .expect("dispatch succeeds");
        let DeployOutcome::Deployed(report) = outcome else {
            panic!("staging is enabled");
        };

        assert_eq!(report.stack, "staging");
        assert_eq!(report.outputs["project_id"], serde_json::json!("acme"));
        assert_eq!(provisioner.invocations().await.len(), 3);
    }

    #[tokio::test]
    async fn test_collaborator_error_propagates() {
        let config = system();
        let mut provisioner = MockProvisioner::new();
        provisioner
            .expect_provision()
            .withf(|request| request.kind == CollaboratorKind::Security)
            .times(1)
            .returning(|_| {
                Ok(Outputs::from([(
                    String::from("secret_key"),
                    serde_json::json!("generated"),
                )]))
            });
        provisioner
            .expect_provision()
            .withf(|request| request.kind == CollaboratorKind::Database)
            .times(1)
            .returning(|request| {
                Err(ProvisionError::failed("database", &request.name, "instance limit").into())
            });

        let err = Dispatcher::new(&config, &provisioner)
            .dispatch("staging")
            .await
            .expect_err("collaborator fails");
        assert_eq!(
            err.to_string(),
            "Provisioning error: database 'staging-db' failed: instance limit"
        );
    }
}
