//! Error types for the Superset deployment system.
//!
//! This module provides the error hierarchy for every stage of a deployment
//! run: loading and resolving configuration, validation, dispatch, and the
//! external provisioning collaborators.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Superset deployment system.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors raised by provisioning collaborators.
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be read or parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// A stack extends a parent that does not exist.
    #[error("Parent stack '{parent}' not found for '{stack}'")]
    ParentNotFound {
        /// Stack declaring the `extends` reference.
        stack: String,
        /// The missing parent name.
        parent: String,
    },

    /// Stack inheritance forms a cycle.
    #[error("Circular stack inheritance detected: {cycle}")]
    CircularInheritance {
        /// The stacks forming the cycle, joined with arrows.
        cycle: String,
    },

    /// One or more validation rules failed for a stack.
    #[error("Configuration validation failed for stack '{stack}': {}", .errors.join("; "))]
    ValidationFailed {
        /// Stack that failed validation.
        stack: String,
        /// Every rule violation found.
        errors: Vec<String>,
    },

    /// The requested stack is not defined.
    #[error("Stack '{name}' not found in system configuration")]
    StackNotFound {
        /// The requested stack name.
        name: String,
    },

    /// The stack type has no matching strategy.
    #[error("Unknown stack type: {stack_type}")]
    UnknownStackType {
        /// The unrecognized type value.
        stack_type: String,
    },

    /// A field required by the selected strategy is missing.
    #[error("{field} is required for {stack_type} stack '{stack}'")]
    MissingField {
        /// Stack being deployed.
        stack: String,
        /// Type of the stack.
        stack_type: String,
        /// Dotted path of the missing field.
        field: String,
    },

    /// An application setting has an unusable value.
    #[error("Invalid setting {name}: {message}")]
    InvalidSetting {
        /// Name of the setting (environment variable).
        name: String,
        /// Why the value was rejected.
        message: String,
    },
}

/// Errors reported by external provisioning collaborators.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The collaborator failed to provision its resource.
    #[error("{collaborator} '{name}' failed: {message}")]
    Failed {
        /// Collaborator kind.
        collaborator: String,
        /// Resource name passed to the collaborator.
        name: String,
        /// Failure description.
        message: String,
    },

    /// The collaborator did not return an output the stack depends on.
    #[error("{collaborator} did not return required output '{key}'")]
    MissingOutput {
        /// Collaborator kind.
        collaborator: String,
        /// The missing output key.
        key: String,
    },
}

/// Result type alias for deployment operations.
pub type Result<T> = std::result::Result<T, DeployError>;

impl DeployError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the aggregated validation errors, if this is a validation failure.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&[String]> {
        match self {
            Self::Config(ConfigError::ValidationFailed { errors, .. }) => Some(errors.as_slice()),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a parse error with an optional location.
    #[must_use]
    pub fn parse(message: impl Into<String>, location: Option<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            location,
        }
    }

    /// Creates an invalid-setting error.
    #[must_use]
    pub fn invalid_setting(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSetting {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl ProvisionError {
    /// Creates a collaborator failure.
    #[must_use]
    pub fn failed(
        collaborator: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Failed {
            collaborator: collaborator.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a missing-output error.
    #[must_use]
    pub fn missing_output(collaborator: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingOutput {
            collaborator: collaborator.into(),
            key: key.into(),
        }
    }
}
