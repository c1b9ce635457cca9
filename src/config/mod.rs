//! Configuration module for the Superset deployment system.
//!
//! This module handles all configuration-related functionality:
//! - Loading `system.yaml` and resolving stack inheritance
//! - Deep merging of configuration trees
//! - Validation of stack definitions
//! - Typed stack records and application settings
//! - Computing configuration fingerprints

mod hash;
mod inheritance;
mod loader;
mod merge;
mod settings;
mod spec;
mod validator;

pub use hash::ConfigHasher;
pub use inheritance::{EXTENDS_KEY, resolve_stacks};
pub use loader::{ConfigLoader, DEFAULT_CONFIG_FILES, find_config_file};
pub use merge::{merge, merge_values};
pub use settings::{AppSettings, OPTIONS as SETTING_OPTIONS, RedisEndpoint, SettingOption};
pub use spec::{
    AccessPolicy, AlertChannel, AlertingConfig, AutoscalingConfig, BackupConfig, CacheConfig,
    CacheType, CloudflareConfig, DEFAULT_REGION, DEFAULT_SUPERSET_PORT, DEFAULT_SUPERSET_VERSION,
    DatabaseBackupConfig, DatabaseConfig, DatabaseType, Environment, GcpConfig, MonitoringConfig,
    OAuthConfig, ResourcesConfig, SecurityConfig, SslConfig, StackConfig, StackType,
    SupersetConfig, SystemConfig, Toggle, is_enabled,
};
pub use validator::StackValidator;
