//! Stack strategies.
//!
//! A stack's `type` selects one of a closed set of strategies. Each strategy
//! composes provisioning collaborators into one deployment and exports a flat
//! output map.

mod context;
mod minimal;
mod production;
mod standard;

pub use context::{MANAGED_BY, StackContext};
pub use minimal::MinimalStack;
pub use production::ProductionStack;
pub use standard::StandardStack;

use crate::config::StackType;
use crate::error::Result;
use crate::provision::{Outputs, Provisioner};

/// A deployable stack, one variant per [`StackType`].
#[derive(Debug, Clone)]
pub enum Stack {
    /// Local development.
    Minimal(MinimalStack),
    /// Cloud Run on GCP.
    Standard(StandardStack),
    /// GKE on GCP.
    Production(ProductionStack),
}

impl Stack {
    /// Builds the strategy for `stack_type`.
    #[must_use]
    pub fn new(stack_type: StackType, ctx: StackContext) -> Self {
        match stack_type {
            StackType::Minimal => Self::Minimal(MinimalStack::new(ctx)),
            StackType::Standard => Self::Standard(StandardStack::new(ctx)),
            StackType::Production => Self::Production(ProductionStack::new(ctx)),
        }
    }

    /// Returns the strategy's type.
    #[must_use]
    pub const fn stack_type(&self) -> StackType {
        match self {
            Self::Minimal(_) => StackType::Minimal,
            Self::Standard(_) => StackType::Standard,
            Self::Production(_) => StackType::Production,
        }
    }

    /// Deploys the stack and returns its outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is missing or a collaborator
    /// fails.
    pub async fn deploy<P>(&self, provisioner: &P) -> Result<Outputs>
    where
        P: Provisioner + ?Sized,
    {
        match self {
            Self::Minimal(stack) => Ok(stack.deploy()),
            Self::Standard(stack) => stack.deploy(provisioner).await,
            Self::Production(stack) => stack.deploy(provisioner).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::DryRunProvisioner;
    use crate::stacks::context::fixtures::context;

    #[tokio::test]
    async fn test_minimal_never_provisions() {
        let stack = Stack::new(
            StackType::Minimal,
            context("dev", "type: minimal\nenvironment: local"),
        );
        let provisioner = DryRunProvisioner::new();

        let outputs = stack.deploy(&provisioner).await.expect("minimal deploy");
        assert_eq!(stack.stack_type(), StackType::Minimal);
        assert!(outputs.contains_key("superset_url"));
        assert!(provisioner.invocations().await.is_empty());
    }

    #[test]
    fn test_type_selects_variant() {
        for stack_type in [StackType::Minimal, StackType::Standard, StackType::Production] {
            let stack = Stack::new(
                stack_type,
                context("x", &format!("type: {stack_type}\nenvironment: gcp")),
            );
            assert_eq!(stack.stack_type(), stack_type);
        }
    }
}
