// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Superset Deploy
//!
//! Stack configuration resolution and deployment dispatch for Apache Superset.
//!
//! ## Overview
//!
//! A single `system.yaml` describes every deployment tier of a Superset
//! installation as a named stack. This crate:
//!
//! - Loads the document and resolves `extends` inheritance between stacks
//! - Validates each resolved stack against deployment rules
//! - Dispatches a stack to the strategy its `type` selects
//! - Drives external provisioning collaborators in a fixed order
//!
//! ## Architecture
//!
//! 1. **Loader**: reads `global` and `stacks`, deep-merging children over parents
//! 2. **Validator**: collects every rule violation of a stack
//! 3. **Dispatcher**: skips disabled stacks and selects the strategy
//! 4. **Strategies**: `minimal`, `standard` and `production` compose collaborators
//!
//! ## Modules
//!
//! - [`config`]: Loading, merging, inheritance, validation and settings
//! - [`dispatcher`]: Stack lookup, validation gate and strategy selection
//! - [`stacks`]: The three deployment strategies
//! - [`provision`]: Collaborator seam and the dry-run provisioner
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! global:
//!   superset:
//!     version: "3.0.0"
//!
//! stacks:
//!   dev:
//!     type: minimal
//!     environment: local
//!   staging:
//!     type: standard
//!     environment: gcp
//!     gcp:
//!       project_id: my-project
//!       region: us-central1
//!   prod:
//!     extends: staging
//!     type: production
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod provision;
pub mod stacks;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigLoader, StackConfig, StackValidator, SystemConfig};
pub use dispatcher::{DeployOutcome, DeployReport, Dispatcher};
pub use error::{DeployError, Result};
pub use provision::{CollaboratorKind, CollaboratorRequest, DryRunProvisioner, Outputs, Provisioner};
pub use stacks::{Stack, StackContext};
