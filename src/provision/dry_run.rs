//! Dry-run provisioner.
//!
//! Records every request in invocation order and answers with deterministic
//! outputs of the same shape a real collaborator returns. Used by `plan` and
//! by strategy tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

use super::{CollaboratorKind, CollaboratorRequest, Outputs, Provisioner};

/// Provisioner that synthesizes outputs instead of creating resources.
#[derive(Debug, Default)]
pub struct DryRunProvisioner {
    invocations: Mutex<Vec<CollaboratorRequest>>,
}

impl DryRunProvisioner {
    /// Creates an empty dry-run provisioner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded requests.
    pub async fn invocations(&self) -> Vec<CollaboratorRequest> {
        self.invocations.lock().await.clone()
    }

    /// Consumes the provisioner and returns the recorded requests.
    #[must_use]
    pub fn into_invocations(self) -> Vec<CollaboratorRequest> {
        self.invocations.into_inner()
    }
}

#[async_trait]
impl Provisioner for DryRunProvisioner {
    async fn provision(&self, request: &CollaboratorRequest) -> Result<Outputs> {
        debug!("Dry-run {} '{}'", request.kind, request.name);
        self.invocations.lock().await.push(request.clone());
        Ok(synthesize(request))
    }
}

fn synthesize(request: &CollaboratorRequest) -> Outputs {
    let name = request.name.as_str();
    let (project, region) = request.identity.as_ref().map_or(("local", "local"), |id| {
        (id.project_id.as_str(), id.region.as_str())
    });

    let pairs: Vec<(&str, Value)> = match request.kind {
        CollaboratorKind::Network => vec![
            ("network_name", json!(name)),
            (
                "subnet_name",
                json!(request
                    .config_str("subnet_name")
                    .map_or_else(|| format!("{name}-subnet"), str::to_string)),
            ),
        ],
        CollaboratorKind::Security => security_outputs(request),
        CollaboratorKind::Database => {
            let connection_name = format!("{project}:{region}:{name}");
            vec![
                ("instance_name", json!(name)),
                ("connection_name", json!(connection_name)),
                ("database_name", json!("superset")),
                ("username", json!("superset")),
                (
                    "connection_string",
                    json!(format!("postgresql://superset@/superset?host=/cloudsql/{connection_name}")),
                ),
            ]
        }
        CollaboratorKind::Cache => vec![
            ("instance_name", json!(name)),
            ("host", json!(format!("{name}.redis.internal"))),
            ("port", json!(6379)),
            ("url", json!(format!("redis://{name}.redis.internal:6379/0"))),
        ],
        CollaboratorKind::Cluster => vec![
            ("cluster_name", json!(name)),
            ("endpoint", json!(format!("https://{name}.{region}.gke.internal"))),
        ],
        CollaboratorKind::NodePool => vec![("node_pool_name", json!(name))],
        CollaboratorKind::Runtime => runtime_outputs(request, region),
        CollaboratorKind::Tunnel => tunnel_outputs(request),
        CollaboratorKind::Monitoring => vec![
            ("prometheus_url", json!(format!("https://prometheus-{name}.example.com"))),
            ("grafana_url", json!(format!("https://grafana-{name}.example.com"))),
            ("alertmanager_url", json!(format!("https://alertmanager-{name}.example.com"))),
        ],
        CollaboratorKind::BackupBucket => {
            let bucket = request
                .config_str("bucket_name")
                .map_or_else(|| format!("{project}-{name}"), str::to_string);
            vec![
                ("url", json!(format!("gs://{bucket}"))),
                ("bucket_name", json!(bucket)),
            ]
        }
    };

    let mut outputs: Outputs = pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();
    if request.kind == CollaboratorKind::Security {
        oauth_outputs(request, &mut outputs);
    }
    outputs
}

fn security_outputs(request: &CollaboratorRequest) -> Vec<(&'static str, Value)> {
    let name = request.name.as_str();
    let mut pairs = vec![("secret_key", json!(format!("secret://{name}-superset-key")))];

    let ssl_enabled = request
        .config
        .pointer("/ssl/enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if ssl_enabled {
        pairs.push(("ssl_certificate_name", json!(format!("{name}-ssl-cert"))));
    }
    pairs
}

fn runtime_outputs(request: &CollaboratorRequest, region: &str) -> Vec<(&'static str, Value)> {
    let name = request.name.as_str();
    match request.config_str("platform") {
        Some("gke") => vec![
            ("service_name", json!(name)),
            ("namespace", json!("superset")),
            ("url", json!(format!("https://superset-{name}.example.com"))),
        ],
        _ => vec![
            ("service_name", json!(name)),
            ("url", json!(format!("https://{name}-{region}.run.app"))),
        ],
    }
}

fn tunnel_outputs(request: &CollaboratorRequest) -> Vec<(&'static str, Value)> {
    let name = request.name.as_str();
    let tunnel_name = request
        .config_str("tunnel_name")
        .map_or_else(|| format!("{name}-tunnel"), str::to_string);

    let mut hostnames = vec![
        request
            .config_str("hostname")
            .map_or_else(|| format!("{name}.example.com"), str::to_string),
    ];
    if let Some(Value::Array(routes)) = request.config.get("additional_routes") {
        hostnames.extend(
            routes
                .iter()
                .filter_map(|route| route.get("hostname").and_then(Value::as_str))
                .map(str::to_string),
        );
    }

    vec![
        ("tunnel_id", json!(format!("dry-run-{tunnel_name}"))),
        ("tunnel_name", json!(tunnel_name)),
        ("hostnames", json!(hostnames)),
    ]
}

/// Adds one `oauth_<provider>_configured` flag per provider.
fn oauth_outputs(request: &CollaboratorRequest, outputs: &mut Outputs) {
    let enabled = request
        .config
        .pointer("/oauth/enabled")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !enabled {
        return;
    }
    if let Some(Value::Array(providers)) = request.config.pointer("/oauth/providers") {
        for provider in providers.iter().filter_map(Value::as_str) {
            outputs.insert(format!("oauth_{provider}_configured"), json!(true));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::IdentityContext;

    fn identity() -> IdentityContext {
        IdentityContext {
            project_id: String::from("acme"),
            region: String::from("us-central1"),
            zone: String::from("us-central1-a"),
        }
    }

    #[tokio::test]
    async fn test_records_in_order() {
        let provisioner = DryRunProvisioner::new();
        for kind in [CollaboratorKind::Database, CollaboratorKind::Cache] {
            provisioner
                .provision(&CollaboratorRequest::new(kind, "dev-x"))
                .await
                .expect("dry run never fails");
        }

        let kinds: Vec<_> = provisioner
            .invocations()
            .await
            .into_iter()
            .map(|request| request.kind)
            .collect();
        assert_eq!(kinds, vec![CollaboratorKind::Database, CollaboratorKind::Cache]);
        assert_eq!(provisioner.into_invocations().len(), 2);
    }

    #[tokio::test]
    async fn test_database_outputs() {
        let provisioner = DryRunProvisioner::new();
        let request =
            CollaboratorRequest::new(CollaboratorKind::Database, "dev-db").with_identity(identity());
        let outputs = provisioner.provision(&request).await.expect("dry run");

        assert_eq!(outputs["connection_name"], json!("acme:us-central1:dev-db"));
        assert!(
            outputs["connection_string"]
                .as_str()
                .is_some_and(|s| s.starts_with("postgresql://"))
        );
    }

    #[tokio::test]
    async fn test_tunnel_hostnames_include_routes() {
        let request = CollaboratorRequest::new(CollaboratorKind::Tunnel, "dev-cloudflare")
            .with_config(json!({
                "hostname": "bi.acme.io",
                "additional_routes": [{"hostname": "monitoring-dev.example.com"}]
            }));
        let outputs = DryRunProvisioner::new()
            .provision(&request)
            .await
            .expect("dry run");

        assert_eq!(outputs["tunnel_name"], json!("dev-cloudflare-tunnel"));
        assert_eq!(
            outputs["hostnames"],
            json!(["bi.acme.io", "monitoring-dev.example.com"])
        );
    }

    #[tokio::test]
    async fn test_security_flags() {
        let request = CollaboratorRequest::new(CollaboratorKind::Security, "prod-security")
            .with_config(json!({
                "ssl": {"enabled": true},
                "oauth": {"enabled": true, "providers": ["google"]}
            }));
        let outputs = DryRunProvisioner::new()
            .provision(&request)
            .await
            .expect("dry run");

        assert!(outputs.contains_key("secret_key"));
        assert_eq!(outputs["ssl_certificate_name"], json!("prod-security-ssl-cert"));
        assert_eq!(outputs["oauth_google_configured"], json!(true));
    }
}
