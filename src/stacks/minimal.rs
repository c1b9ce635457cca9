//! Minimal stack: local Docker development.
//!
//! Nothing is provisioned. The stack only exports the settings the local
//! compose environment runs with.

use serde_json::json;
use tracing::info;

use crate::provision::Outputs;

use super::context::StackContext;

/// Local development stack backed by SQLite.
#[derive(Debug, Clone)]
pub struct MinimalStack {
    ctx: StackContext,
}

impl MinimalStack {
    /// Creates the strategy.
    #[must_use]
    pub const fn new(ctx: StackContext) -> Self {
        Self { ctx }
    }

    /// Exports the local settings.
    #[must_use]
    pub fn deploy(&self) -> Outputs {
        info!("Deploying minimal stack: {}", self.ctx.name);

        let superset = &self.ctx.config.superset;
        let port = superset.port();
        let url = format!("http://localhost:{port}");
        let instructions = format!(
            "To start the local development environment:\n\
             1. Run: make dev\n\
             2. Access Superset at: {url}\n\
             3. Default credentials: admin/admin\n\
             4. To stop: make dev-down"
        );

        Outputs::from([
            (String::from("environment"), json!("local")),
            (String::from("superset_url"), json!(url)),
            (String::from("superset_version"), json!(superset.version())),
            (String::from("database_type"), json!("sqlite")),
            (String::from("cache_type"), json!("none")),
            (String::from("instructions"), json!(instructions)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::context::fixtures::context;

    #[test]
    fn test_default_outputs() {
        let outputs = MinimalStack::new(context("dev", "type: minimal\nenvironment: local"))
            .deploy();

        assert_eq!(outputs["environment"], json!("local"));
        assert_eq!(outputs["superset_url"], json!("http://localhost:8088"));
        assert_eq!(outputs["superset_version"], json!("3.0.0"));
        assert_eq!(outputs["database_type"], json!("sqlite"));
        assert_eq!(outputs["cache_type"], json!("none"));
    }

    #[test]
    fn test_custom_port_in_url_and_instructions() {
        let outputs = MinimalStack::new(context(
            "dev",
            "type: minimal\nenvironment: local\nsuperset: {port: 9000, version: 4.0.1}",
        ))
        .deploy();

        assert_eq!(outputs["superset_url"], json!("http://localhost:9000"));
        assert_eq!(outputs["superset_version"], json!("4.0.1"));
        assert!(
            outputs["instructions"]
                .as_str()
                .is_some_and(|text| text.contains("http://localhost:9000"))
        );
    }
}
