//! Provisioning collaborator seam.
//!
//! Stack strategies never touch a cloud API directly. They describe each
//! resource as a [`CollaboratorRequest`] and hand it to a [`Provisioner`],
//! which returns the resource's outputs (connection strings, URLs, names).

mod dry_run;

pub use dry_run::DryRunProvisioner;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ProvisionError, Result};

/// Flat output map exported by collaborators and stacks.
pub type Outputs = BTreeMap<String, Value>;

/// Kind of external resource a collaborator provisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollaboratorKind {
    /// VPC network and subnet.
    Network,
    /// Secrets, SSL certificates and OAuth wiring.
    Security,
    /// Managed database instance.
    Database,
    /// Managed cache instance.
    Cache,
    /// Kubernetes cluster.
    Cluster,
    /// Autoscaled node pool.
    NodePool,
    /// Superset application runtime.
    Runtime,
    /// Cloudflare tunnel.
    Tunnel,
    /// Prometheus, Grafana and Alertmanager.
    Monitoring,
    /// Object storage bucket for backups.
    BackupBucket,
}

impl CollaboratorKind {
    /// Returns the kebab-case name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Security => "security",
            Self::Database => "database",
            Self::Cache => "cache",
            Self::Cluster => "cluster",
            Self::NodePool => "node-pool",
            Self::Runtime => "runtime",
            Self::Tunnel => "tunnel",
            Self::Monitoring => "monitoring",
            Self::BackupBucket => "backup-bucket",
        }
    }
}

impl fmt::Display for CollaboratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloud identity a collaborator operates under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityContext {
    /// GCP project ID.
    pub project_id: String,
    /// GCP region.
    pub region: String,
    /// GCP zone.
    pub zone: String,
}

/// A single provisioning request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollaboratorRequest {
    /// What to provision.
    pub kind: CollaboratorKind,
    /// Resource name, `<stack>-<suffix>`.
    pub name: String,
    /// Section configuration handed to the collaborator.
    pub config: Value,
    /// Cloud identity, absent for local resources.
    pub identity: Option<IdentityContext>,
    /// Labels applied to the resource.
    pub labels: BTreeMap<String, String>,
    /// Outputs of earlier collaborators this one depends on.
    pub inputs: Outputs,
}

impl CollaboratorRequest {
    /// Creates a request with empty configuration.
    #[must_use]
    pub fn new(kind: CollaboratorKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            config: Value::Object(serde_json::Map::new()),
            identity: None,
            labels: BTreeMap::new(),
            inputs: Outputs::new(),
        }
    }

    /// Sets the collaborator configuration.
    #[must_use]
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Sets the cloud identity.
    #[must_use]
    pub fn with_identity(mut self, identity: IdentityContext) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Sets the resource labels.
    #[must_use]
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }

    /// Adds a dependency input.
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }

    /// Returns a string config field, if present.
    #[must_use]
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    /// Returns a string input, if present.
    #[must_use]
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).and_then(Value::as_str)
    }
}

/// External provisioning collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Provisions one resource and returns its outputs.
    async fn provision(&self, request: &CollaboratorRequest) -> Result<Outputs>;
}

/// Reads a required string output of a collaborator.
///
/// # Errors
///
/// Returns [`ProvisionError::MissingOutput`] if the key is absent or not a
/// string.
pub fn require_output(outputs: &Outputs, kind: CollaboratorKind, key: &str) -> Result<String> {
    outputs
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProvisionError::missing_output(kind.as_str(), key).into())
}
