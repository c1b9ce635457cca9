//! Standard stack: Superset on Cloud Run with managed PostgreSQL and Redis.

use serde_json::{Value, json};
use tracing::info;

use crate::config::CacheType;
use crate::error::Result;
use crate::provision::{CollaboratorKind, Outputs, Provisioner, require_output};

use super::context::{StackContext, require_list, to_json, with_field};

/// Subnet range used when the stack gets its own VPC.
pub const SUBNET_CIDR: &str = "10.0.0.0/24";

/// Default Cloud Run max instances.
pub const DEFAULT_MAX_INSTANCES: u32 = 100;

/// Staging/development stack on GCP.
#[derive(Debug, Clone)]
pub struct StandardStack {
    ctx: StackContext,
}

impl StandardStack {
    /// Creates the strategy.
    #[must_use]
    pub const fn new(ctx: StackContext) -> Self {
        Self { ctx }
    }

    /// Provisions the stack through `provisioner`.
    ///
    /// # Errors
    ///
    /// Returns an error if `gcp.project_id` is missing or a collaborator
    /// fails or omits a required output.
    pub async fn deploy<P>(&self, provisioner: &P) -> Result<Outputs>
    where
        P: Provisioner + ?Sized,
    {
        let ctx = &self.ctx;
        let config = &ctx.config;
        info!("Deploying standard stack: {}", ctx.name);

        let identity = ctx.identity()?;

        let network = if config.security.vpc.enabled {
            let request = ctx
                .request(CollaboratorKind::Network, "network")
                .with_identity(identity.clone())
                .with_config(json!({
                    "auto_create_subnetworks": false,
                    "subnet_name": ctx.resource_name("subnet"),
                    "ip_cidr_range": SUBNET_CIDR,
                }));
            let outputs = provisioner.provision(&request).await?;
            Some((
                require_output(&outputs, CollaboratorKind::Network, "network_name")?,
                require_output(&outputs, CollaboratorKind::Network, "subnet_name")?,
            ))
        } else {
            None
        };
        let network_name = network.as_ref().map(|(network, _)| network.clone());
        let subnet_name = network.map(|(_, subnet)| subnet);

        let request = ctx
            .request(CollaboratorKind::Security, "security")
            .with_identity(identity.clone())
            .with_config(to_json(&config.security)?);
        let security = provisioner.provision(&request).await?;
        let secret_key = require_output(&security, CollaboratorKind::Security, "secret_key")?;

        let database_config = match &config.database {
            Some(database) => to_json(database)?,
            None => json!({}),
        };
        let request = ctx
            .request(CollaboratorKind::Database, "db")
            .with_identity(identity.clone())
            .with_config(database_config)
            .with_input("network", network_name.clone());
        let database = provisioner.provision(&request).await?;
        let database_url =
            require_output(&database, CollaboratorKind::Database, "connection_string")?;
        let database_instance =
            require_output(&database, CollaboratorKind::Database, "instance_name")?;
        let database_connection =
            require_output(&database, CollaboratorKind::Database, "connection_name")?;

        let (cache_url, cache_instance) = match (&config.cache, config.cache_type()) {
            (Some(cache), CacheType::Redis) => {
                let request = ctx
                    .request(CollaboratorKind::Cache, "redis")
                    .with_identity(identity.clone())
                    .with_config(to_json(cache)?)
                    .with_input("network", network_name.clone());
                let outputs = provisioner.provision(&request).await?;
                (
                    Some(require_output(&outputs, CollaboratorKind::Cache, "url")?),
                    Some(require_output(&outputs, CollaboratorKind::Cache, "instance_name")?),
                )
            }
            _ => (None, None),
        };

        let superset = &config.superset;
        let min_instances = if ctx.name.ends_with("-dev") { 0 } else { 1 };
        let max_instances = superset
            .autoscaling
            .max_replicas
            .unwrap_or(DEFAULT_MAX_INSTANCES);
        let runtime_config = json!({
            "platform": "cloud-run",
            "image": superset.image(),
            "cpu": superset.cpu(),
            "memory": superset.memory(),
            "min_instances": min_instances,
            "max_instances": max_instances,
        });
        let request = ctx
            .request(CollaboratorKind::Runtime, "superset")
            .with_identity(identity.clone())
            .with_config(runtime_config)
            .with_input("database_url", database_url)
            .with_input("redis_url", cache_url)
            .with_input("secret_key", secret_key)
            .with_input("network", network_name)
            .with_input("subnet", subnet_name);
        let runtime = provisioner.provision(&request).await?;
        let superset_url = require_output(&runtime, CollaboratorKind::Runtime, "url")?;
        let service_name = require_output(&runtime, CollaboratorKind::Runtime, "service_name")?;

        let (tunnel_name, hostnames) = if config.cloudflare.enabled {
            let routes = self.monitoring_routes();
            let tunnel_config = with_field(to_json(&config.cloudflare)?, "additional_routes", routes);
            let request = ctx
                .request(CollaboratorKind::Tunnel, "cloudflare")
                .with_identity(identity.clone())
                .with_config(tunnel_config)
                .with_input("target_service", superset_url.clone());
            let outputs = provisioner.provision(&request).await?;
            (
                Some(require_output(&outputs, CollaboratorKind::Tunnel, "tunnel_name")?),
                require_list(&outputs, CollaboratorKind::Tunnel, "hostnames")?,
            )
        } else {
            (None, Vec::new())
        };

        let access_url = if config.cloudflare.enabled {
            hostnames.first().cloned().unwrap_or(Value::Null)
        } else {
            json!(superset_url)
        };
        let instructions = format!(
            "Standard stack deployed successfully!\n\
             Superset URL: {superset_url}\n\
             To view logs: gcloud run services logs read {service_name} --project={}",
            identity.project_id
        );

        Ok(Outputs::from([
            (String::from("environment"), json!("gcp")),
            (String::from("project_id"), json!(identity.project_id)),
            (String::from("region"), json!(identity.region)),
            (String::from("superset_url"), json!(superset_url)),
            (String::from("superset_service"), json!(service_name)),
            (String::from("database_instance"), json!(database_instance)),
            (String::from("database_connection_name"), json!(database_connection)),
            (String::from("cache_instance"), json!(cache_instance)),
            (String::from("cloudflare_tunnel"), json!(tunnel_name)),
            (String::from("cloudflare_hostnames"), Value::Array(hostnames)),
            (String::from("access_url"), access_url),
            (String::from("instructions"), json!(instructions)),
        ]))
    }

    /// Extra tunnel routes exposing Grafana and Prometheus.
    fn monitoring_routes(&self) -> Value {
        if !self.ctx.config.monitoring.enabled {
            return json!([]);
        }

        let name = &self.ctx.name;
        let cloudflare = &self.ctx.config.cloudflare;
        let monitoring = cloudflare
            .monitoring_hostname
            .clone()
            .unwrap_or_else(|| format!("monitoring-{name}.example.com"));
        let metrics = cloudflare
            .metrics_hostname
            .clone()
            .unwrap_or_else(|| format!("metrics-{name}.example.com"));

        json!([
            {"hostname": monitoring, "service": "http://grafana:3000"},
            {"hostname": metrics, "service": "http://prometheus:9090"},
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::{DryRunProvisioner, MockProvisioner};
    use crate::stacks::context::fixtures::context;

    const BASE: &str = "type: standard\nenvironment: gcp\ngcp: {project_id: acme, region: europe-west1}\n";

    async fn run(name: &str, extra: &str) -> (Outputs, Vec<CollaboratorKind>) {
        let stack = StandardStack::new(context(name, &format!("{BASE}{extra}")));
        let provisioner = DryRunProvisioner::new();
        let outputs = stack.deploy(&provisioner).await.expect("standard deploy");
        let kinds = provisioner
            .into_invocations()
            .into_iter()
            .map(|request| request.kind)
            .collect();
        (outputs, kinds)
    }

    #[tokio::test]
    async fn test_default_order_without_optional_collaborators() {
        let (outputs, kinds) = run("staging", "database: {type: cloud-sql}").await;

        assert_eq!(
            kinds,
            vec![
                CollaboratorKind::Security,
                CollaboratorKind::Database,
                CollaboratorKind::Runtime,
            ]
        );
        assert_eq!(outputs["environment"], json!("gcp"));
        assert_eq!(outputs["region"], json!("europe-west1"));
        assert_eq!(outputs["cache_instance"], Value::Null);
        assert_eq!(outputs["cloudflare_tunnel"], Value::Null);
        assert_eq!(outputs["access_url"], outputs["superset_url"]);
    }

    #[tokio::test]
    async fn test_full_order() {
        let (outputs, kinds) = run(
            "staging",
            "cache: {type: redis}\nsecurity: {vpc: {enabled: true}}\n\
             cloudflare: {enabled: true, hostname: bi.acme.io}\nmonitoring: {enabled: true}",
        )
        .await;

        assert_eq!(
            kinds,
            vec![
                CollaboratorKind::Network,
                CollaboratorKind::Security,
                CollaboratorKind::Database,
                CollaboratorKind::Cache,
                CollaboratorKind::Runtime,
                CollaboratorKind::Tunnel,
            ]
        );
        assert_eq!(outputs["access_url"], json!("bi.acme.io"));
        assert_eq!(
            outputs["cloudflare_hostnames"],
            json!([
                "bi.acme.io",
                "monitoring-staging.example.com",
                "metrics-staging.example.com"
            ])
        );
    }

    #[tokio::test]
    async fn test_runtime_receives_upstream_outputs() {
        let stack = StandardStack::new(context(
            "superset-dev",
            &format!("{BASE}cache: {{type: redis}}\nsuperset: {{autoscaling: {{max_replicas: 4}}}}"),
        ));
        let provisioner = DryRunProvisioner::new();
        stack.deploy(&provisioner).await.expect("standard deploy");

        let invocations = provisioner.into_invocations();
        let runtime = invocations
            .iter()
            .find(|request| request.kind == CollaboratorKind::Runtime)
            .expect("runtime invoked");

        assert_eq!(runtime.name, "superset-dev-superset");
        assert!(runtime.input_str("database_url").is_some());
        assert!(runtime.input_str("redis_url").is_some_and(|url| url.starts_with("redis://")));
        assert!(runtime.input_str("secret_key").is_some());
        assert_eq!(runtime.config["min_instances"], json!(0));
        assert_eq!(runtime.config["max_instances"], json!(4));
        assert_eq!(runtime.labels["stack-type"], "standard");
    }

    #[tokio::test]
    async fn test_memcached_skips_cache_collaborator() {
        let (_, kinds) = run("staging", "cache: {type: memcached}").await;
        assert!(!kinds.contains(&CollaboratorKind::Cache));
    }

    #[tokio::test]
    async fn test_missing_project_fails_before_provisioning() {
        let stack = StandardStack::new(context("staging", "type: standard\nenvironment: gcp"));
        let mut provisioner = MockProvisioner::new();
        provisioner.expect_provision().never();

        assert!(stack.deploy(&provisioner).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_output_is_reported() {
        let stack = StandardStack::new(context("staging", BASE));
        let mut provisioner = MockProvisioner::new();
        provisioner
            .expect_provision()
            .times(1)
            .returning(|_| Ok(Outputs::new()));

        let err = stack.deploy(&provisioner).await.expect_err("empty outputs");
        assert!(err.to_string().contains("secret_key"));
    }
}
