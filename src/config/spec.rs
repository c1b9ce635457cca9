//! Configuration specification types for the deployment system.
//!
//! This module defines the typed records a resolved stack maps onto, plus the
//! root [`SystemConfig`] produced by the loader. Stacks are kept in their
//! resolved YAML form until they pass validation; only then are they turned
//! into a [`StackConfig`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, Result};

/// Top-level stack sections; each must be a mapping when present.
pub(crate) const SECTIONS: &[&str] = &[
    "gcp",
    "database",
    "cache",
    "superset",
    "security",
    "cloudflare",
    "monitoring",
    "backup",
];

/// The root configuration: global settings and resolved stacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemConfig {
    /// Free-form settings shared by every stack.
    pub global: Mapping,
    /// Resolved stack configurations keyed by stack name.
    pub stacks: BTreeMap<String, Mapping>,
}

/// Deployment strategy selected by a stack's `type`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StackType {
    /// Local development: static configuration only.
    Minimal,
    /// Cloud Run based deployment on GCP.
    Standard,
    /// GKE based, highly available deployment on GCP.
    Production,
}

/// Target environment of a stack.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local Docker environment.
    Local,
    /// Google Cloud Platform.
    Gcp,
}

/// Metadata database backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseType {
    /// Embedded SQLite file.
    Sqlite,
    /// Self-managed PostgreSQL.
    Postgresql,
    /// Cloud SQL for PostgreSQL (GCP only).
    CloudSql,
}

/// Results cache backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CacheType {
    /// No cache.
    None,
    /// Redis (Memorystore on GCP).
    Redis,
    /// Memcached.
    Memcached,
}

/// A typed, validated stack descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StackConfig {
    /// Deployment strategy.
    #[serde(rename = "type")]
    pub stack_type: StackType,
    /// Target environment.
    pub environment: Environment,
    /// Whether the stack should be deployed.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// GCP project placement.
    #[serde(default)]
    pub gcp: Option<GcpConfig>,
    /// Metadata database.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Results cache.
    #[serde(default)]
    pub cache: Option<CacheConfig>,
    /// Superset runtime settings (already merged with `global.superset`).
    #[serde(default)]
    pub superset: SupersetConfig,
    /// Secrets, TLS and VPC settings.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Cloudflare tunnel ingress.
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
    /// Prometheus / Grafana monitoring.
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    /// Backup bucket retention.
    #[serde(default)]
    pub backup: BackupConfig,
    /// Unrecognized top-level keys, kept for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// GCP project placement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GcpConfig {
    /// Project identifier.
    #[serde(default, deserialize_with = "string_or_number")]
    pub project_id: Option<String>,
    /// Region (defaults to `us-central1`).
    #[serde(default, deserialize_with = "string_or_number")]
    pub region: Option<String>,
    /// Zone (defaults to `<region>-a`).
    #[serde(default, deserialize_with = "string_or_number")]
    pub zone: Option<String>,
}

/// Metadata database settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database backend.
    #[serde(rename = "type")]
    pub db_type: DatabaseType,
    /// Instance tier.
    #[serde(default = "default_db_tier")]
    pub tier: String,
    /// Initial disk size in GB.
    #[serde(default = "default_disk_size")]
    pub disk_size: u32,
    /// Disk type.
    #[serde(default = "default_disk_type")]
    pub disk_type: String,
    /// Regional availability with point-in-time recovery.
    #[serde(default)]
    pub high_availability: bool,
    /// Automated backup settings.
    #[serde(default)]
    pub backup: DatabaseBackupConfig,
}

/// Automated database backup settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseBackupConfig {
    /// Whether automated backups run.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Daily start time (`HH:MM`).
    #[serde(default = "default_backup_time")]
    pub time: String,
    /// Backup location (defaults to the stack region).
    #[serde(default)]
    pub location: Option<String>,
}

/// Results cache settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Cache backend.
    #[serde(rename = "type")]
    pub cache_type: CacheType,
    /// Service tier (`basic` or `standard`).
    #[serde(default = "default_cache_tier")]
    pub tier: String,
    /// Memory size in GB.
    #[serde(default = "default_cache_memory")]
    pub memory_size_gb: u32,
    /// Replicated, highly available instance.
    #[serde(default)]
    pub high_availability: bool,
}

/// Superset runtime settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupersetConfig {
    /// Superset image version; `3.1` written as a number is read as `"3.1"`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub version: Option<String>,
    /// Local HTTP port.
    #[serde(default)]
    pub port: Option<u16>,
    /// Fixed replica count.
    #[serde(default)]
    pub replicas: Option<u64>,
    /// Container resources.
    #[serde(default)]
    pub resources: ResourcesConfig,
    /// Autoscaling bounds.
    #[serde(default)]
    pub autoscaling: AutoscalingConfig,
}

/// Container resource limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourcesConfig {
    /// CPU limit; numbers and numeric strings are both accepted.
    #[serde(default, deserialize_with = "string_or_number")]
    pub cpu: Option<String>,
    /// Memory limit with `Mi`/`Gi` suffix.
    #[serde(default)]
    pub memory: Option<String>,
}

/// Autoscaling bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutoscalingConfig {
    /// Minimum replicas.
    #[serde(default)]
    pub min_replicas: Option<u32>,
    /// Maximum replicas.
    #[serde(default)]
    pub max_replicas: Option<u32>,
}

/// Security settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SecurityConfig {
    /// Dedicated VPC network.
    #[serde(default)]
    pub vpc: Toggle,
    /// Managed TLS certificates.
    #[serde(default)]
    pub ssl: SslConfig,
    /// OAuth login providers.
    #[serde(default)]
    pub oauth: OAuthConfig,
}

/// A section that is only switched on or off.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Toggle {
    /// Whether the feature is enabled.
    #[serde(default)]
    pub enabled: bool,
}

/// TLS certificate settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SslConfig {
    /// Whether TLS certificates are provisioned.
    #[serde(default)]
    pub enabled: bool,
    /// Use provider-managed certificates.
    #[serde(default = "default_true")]
    pub managed: bool,
    /// Certificate domains.
    #[serde(default)]
    pub domains: Vec<String>,
}

/// OAuth provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthConfig {
    /// Whether OAuth login is configured.
    #[serde(default)]
    pub enabled: bool,
    /// Provider names (`google`, `github`).
    #[serde(default)]
    pub providers: Vec<String>,
}

/// Cloudflare tunnel settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudflareConfig {
    /// Whether the tunnel is deployed.
    #[serde(default)]
    pub enabled: bool,
    /// Tunnel name.
    #[serde(default)]
    pub tunnel_name: Option<String>,
    /// Tunnel identifier.
    #[serde(default, deserialize_with = "string_or_number")]
    pub tunnel_id: Option<String>,
    /// Cloudflare account identifier.
    #[serde(default, deserialize_with = "string_or_number")]
    pub account_id: Option<String>,
    /// Tunnel credentials secret.
    #[serde(default)]
    pub tunnel_secret: Option<String>,
    /// Public hostname routed to Superset.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Public hostname routed to Grafana.
    #[serde(default)]
    pub monitoring_hostname: Option<String>,
    /// Public hostname routed to Prometheus.
    #[serde(default)]
    pub metrics_hostname: Option<String>,
    /// Where the connector runs (`cloudrun` or `gke`).
    #[serde(default = "default_connector")]
    pub deployment_type: String,
    /// Access policies to configure.
    #[serde(default)]
    pub access_policies: Vec<AccessPolicy>,
}

/// A Cloudflare Access policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Policy name.
    pub name: String,
}

/// Monitoring settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitoringConfig {
    /// Whether monitoring is deployed.
    #[serde(default)]
    pub enabled: bool,
    /// Alert routing.
    #[serde(default)]
    pub alerting: AlertingConfig,
}

/// Alert routing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertingConfig {
    /// Whether alerting is configured.
    #[serde(default)]
    pub enabled: bool,
    /// Notification channels.
    #[serde(default)]
    pub channels: Vec<AlertChannel>,
}

/// An alert notification channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlertChannel {
    /// Channel type (`email`, `slack`).
    #[serde(rename = "type")]
    pub channel_type: String,
}

/// Backup bucket settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupConfig {
    /// Whether a backup bucket is provisioned.
    #[serde(default)]
    pub enabled: bool,
    /// Days before backups are deleted.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

// Default value functions

const fn default_true() -> bool {
    true
}

const fn default_disk_size() -> u32 {
    10
}

const fn default_cache_memory() -> u32 {
    1
}

const fn default_retention_days() -> u32 {
    30
}

fn default_db_tier() -> String {
    String::from("db-f1-micro")
}

fn default_disk_type() -> String {
    String::from("pd-standard")
}

fn default_backup_time() -> String {
    String::from("02:00")
}

fn default_cache_tier() -> String {
    String::from("basic")
}

fn default_connector() -> String {
    String::from("cloudrun")
}

/// Default GCP region.
pub const DEFAULT_REGION: &str = "us-central1";

/// Default Superset version.
pub const DEFAULT_SUPERSET_VERSION: &str = "3.0.0";

/// Default Superset HTTP port.
pub const DEFAULT_SUPERSET_PORT: u16 = 8088;

impl Default for DatabaseBackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time: default_backup_time(),
            location: None,
        }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            managed: true,
            domains: Vec::new(),
        }
    }
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tunnel_name: None,
            tunnel_id: None,
            account_id: None,
            tunnel_secret: None,
            hostname: None,
            monitoring_hostname: None,
            metrics_hostname: None,
            deployment_type: default_connector(),
            access_policies: Vec::new(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            retention_days: default_retention_days(),
        }
    }
}

/// Accepts `cpu: 1`, `cpu: 0.5` and `cpu: "2"` alike; identifiers and
/// versions that YAML reads as numbers go through here too.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a number or string, got {other:?}"
        ))),
    }
}

// Name tables shared with the validator

impl StackType {
    /// All accepted `type` values.
    pub const NAMES: [&'static str; 3] = ["minimal", "standard", "production"];

    /// Returns the configuration name of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
            Self::Production => "production",
        }
    }
}

impl FromStr for StackType {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(Self::Minimal),
            "standard" => Ok(Self::Standard),
            "production" => Ok(Self::Production),
            other => Err(ConfigError::UnknownStackType {
                stack_type: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for StackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Environment {
    /// All accepted `environment` values.
    pub const NAMES: [&'static str; 2] = ["local", "gcp"];
}

impl DatabaseType {
    /// All accepted `database.type` values.
    pub const NAMES: [&'static str; 3] = ["sqlite", "postgresql", "cloud-sql"];
}

impl CacheType {
    /// All accepted `cache.type` values.
    pub const NAMES: [&'static str; 3] = ["none", "redis", "memcached"];
}

impl SystemConfig {
    /// Returns a resolved stack by name.
    #[must_use]
    pub fn stack(&self, name: &str) -> Option<&Mapping> {
        self.stacks.get(name)
    }

    /// Returns the stack names in order.
    #[must_use]
    pub fn stack_names(&self) -> Vec<&str> {
        self.stacks.keys().map(String::as_str).collect()
    }

    /// Returns the names of stacks whose `enabled` flag is not `false`.
    #[must_use]
    pub fn enabled_stacks(&self) -> Vec<&str> {
        self.stacks
            .iter()
            .filter(|(_, stack)| is_enabled(stack))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Reads the `enabled` flag of a resolved stack; anything but `false` counts
/// as enabled.
#[must_use]
pub fn is_enabled(stack: &Mapping) -> bool {
    !matches!(stack.get("enabled"), Some(Value::Bool(false)))
}

impl StackConfig {
    /// Builds the typed record of a resolved stack.
    ///
    /// The stack's `superset` section is layered over `global.superset`
    /// key by key before conversion. Null and empty sections count as absent.
    ///
    /// # Errors
    ///
    /// Returns a parse error if a recognized field has the wrong shape.
    pub fn from_resolved(stack: &Mapping, global: &Mapping) -> Result<Self> {
        Self::convert(stack, global)
            .map_err(|e| ConfigError::parse(format!("Invalid stack configuration: {e}"), None).into())
    }

    /// Runs the typed conversion, keeping the raw deserialization error.
    pub(crate) fn convert(
        stack: &Mapping,
        global: &Mapping,
    ) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_value(Value::Mapping(effective_stack(stack, global)))
    }

    /// Returns the GCP project id, if configured and non-empty.
    #[must_use]
    pub fn project_id(&self) -> Option<&str> {
        self.gcp
            .as_ref()
            .and_then(|gcp| gcp.project_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Returns the GCP region, falling back to [`DEFAULT_REGION`].
    #[must_use]
    pub fn region(&self) -> &str {
        self.gcp
            .as_ref()
            .and_then(|gcp| gcp.region.as_deref())
            .filter(|region| !region.is_empty())
            .unwrap_or(DEFAULT_REGION)
    }

    /// Returns the GCP zone, falling back to the first zone of the region.
    #[must_use]
    pub fn zone(&self) -> String {
        self.gcp
            .as_ref()
            .and_then(|gcp| gcp.zone.clone())
            .unwrap_or_else(|| format!("{}-a", self.region()))
    }

    /// Returns the cache backend, treating a missing section as no cache.
    #[must_use]
    pub fn cache_type(&self) -> CacheType {
        self.cache.as_ref().map_or(CacheType::None, |cache| cache.cache_type)
    }
}

/// The stack mapping the typed record is read from.
fn effective_stack(stack: &Mapping, global: &Mapping) -> Mapping {
    let mut effective = stack.clone();

    if let Some(Value::Mapping(global_superset)) = global.get("superset") {
        let mut superset = global_superset.clone();
        if let Some(Value::Mapping(own)) = stack.get("superset") {
            for (key, value) in own {
                superset.insert(key.clone(), value.clone());
            }
        }
        effective.insert(Value::from("superset"), Value::Mapping(superset));
    }

    for section in SECTIONS {
        let absent = match effective.get_mut(*section) {
            Some(Value::Null) => true,
            Some(Value::Mapping(map)) => {
                strip_nulls(map);
                map.is_empty()
            }
            _ => false,
        };
        if absent {
            effective.shift_remove(*section);
        }
    }

    effective
}

/// Drops null entries at any depth so they fall back to their defaults.
fn strip_nulls(map: &mut Mapping) {
    map.retain(|_, value| !value.is_null());
    for (_, value) in map.iter_mut() {
        if let Value::Mapping(inner) = value {
            strip_nulls(inner);
        }
    }
}

impl DatabaseConfig {
    /// Database settings with every field at its default.
    #[must_use]
    pub fn new(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            tier: default_db_tier(),
            disk_size: default_disk_size(),
            disk_type: default_disk_type(),
            high_availability: false,
            backup: DatabaseBackupConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Cache settings with every field at its default.
    #[must_use]
    pub fn new(cache_type: CacheType) -> Self {
        Self {
            cache_type,
            tier: default_cache_tier(),
            memory_size_gb: default_cache_memory(),
            high_availability: false,
        }
    }
}

impl SupersetConfig {
    /// Superset version, defaulting to [`DEFAULT_SUPERSET_VERSION`].
    #[must_use]
    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_SUPERSET_VERSION)
    }

    /// Local HTTP port, defaulting to [`DEFAULT_SUPERSET_PORT`].
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SUPERSET_PORT)
    }

    /// CPU limit, defaulting to one core.
    #[must_use]
    pub fn cpu(&self) -> &str {
        self.resources.cpu.as_deref().unwrap_or("1")
    }

    /// Memory limit, defaulting to `2Gi`.
    #[must_use]
    pub fn memory(&self) -> &str {
        self.resources.memory.as_deref().unwrap_or("2Gi")
    }

    /// Container image reference.
    #[must_use]
    pub fn image(&self) -> String {
        format!("apache/superset:{}", self.version())
    }
}
