//! Production stack: Superset on a private GKE cluster.
//!
//! Database and cache always run highly available. Monitoring, backups and
//! the Cloudflare tunnel are opt-in.

use serde_json::{Value, json};
use tracing::info;

use crate::config::{CacheConfig, CacheType, DatabaseConfig, DatabaseType};
use crate::error::Result;
use crate::provision::{CollaboratorKind, Outputs, Provisioner, require_output};

use super::context::{StackContext, to_json, with_field};

/// Primary subnet range.
pub const SUBNET_CIDR: &str = "10.0.0.0/20";

/// Secondary range for pods.
pub const PODS_CIDR: &str = "10.1.0.0/16";

/// Secondary range for services.
pub const SERVICES_CIDR: &str = "10.2.0.0/20";

/// Control plane range of the private cluster.
pub const MASTER_CIDR: &str = "172.16.0.0/28";

/// Machine type of the autoscaled node pool.
pub const NODE_MACHINE_TYPE: &str = "n2-standard-4";

/// Storage class of the backup bucket.
pub const BACKUP_STORAGE_CLASS: &str = "NEARLINE";

/// High-availability production stack on GCP.
#[derive(Debug, Clone)]
pub struct ProductionStack {
    ctx: StackContext,
}

impl ProductionStack {
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
    #[allow(clippy::too_many_lines)]
    pub async fn deploy<P>(&self, provisioner: &P) -> Result<Outputs>
    where
        P: Provisioner + ?Sized,
    {
        let ctx = &self.ctx;
        let config = &ctx.config;
        info!("Deploying production stack: {}", ctx.name);

        let identity = ctx.identity()?;
        let project_id = identity.project_id.clone();
        let region = identity.region.clone();

        // Network
        let request = ctx
            .request(CollaboratorKind::Network, "network")
            .with_identity(identity.clone())
            .with_config(json!({
                "auto_create_subnetworks": false,
                "subnet_name": ctx.resource_name("subnet"),
                "ip_cidr_range": SUBNET_CIDR,
                "secondary_ip_ranges": [
                    {"range_name": "pods", "ip_cidr_range": PODS_CIDR},
                    {"range_name": "services", "ip_cidr_range": SERVICES_CIDR},
                ],
            }));
        let network = provisioner.provision(&request).await?;
        let network_name = require_output(&network, CollaboratorKind::Network, "network_name")?;
        let subnet_name = require_output(&network, CollaboratorKind::Network, "subnet_name")?;

        // Security
        let request = ctx
            .request(CollaboratorKind::Security, "security")
            .with_identity(identity.clone())
            .with_config(to_json(&config.security)?);
        let security = provisioner.provision(&request).await?;
        let secret_key = require_output(&security, CollaboratorKind::Security, "secret_key")?;

        // Database, HA forced
        let mut database_config = config
            .database
            .clone()
            .unwrap_or_else(|| DatabaseConfig::new(DatabaseType::CloudSql));
        database_config.high_availability = true;
        let request = ctx
            .request(CollaboratorKind::Database, "db")
            .with_identity(identity.clone())
            .with_config(to_json(&database_config)?)
            .with_input("network", network_name.clone());
        let database = provisioner.provision(&request).await?;
        let database_url =
            require_output(&database, CollaboratorKind::Database, "connection_string")?;
        let database_instance =
            require_output(&database, CollaboratorKind::Database, "instance_name")?;
        let database_connection =
            require_output(&database, CollaboratorKind::Database, "connection_name")?;

        // Cache, HA forced
        let mut cache_config = config
            .cache
            .clone()
            .unwrap_or_else(|| CacheConfig::new(CacheType::Redis));
        cache_config.high_availability = true;
        let request = ctx
            .request(CollaboratorKind::Cache, "redis")
            .with_identity(identity.clone())
            .with_config(to_json(&cache_config)?)
            .with_input("network", network_name.clone());
        let cache = provisioner.provision(&request).await?;
        let cache_url = require_output(&cache, CollaboratorKind::Cache, "url")?;
        let cache_instance = require_output(&cache, CollaboratorKind::Cache, "instance_name")?;

        // Cluster
        let request = ctx
            .request(CollaboratorKind::Cluster, "gke")
            .with_identity(identity.clone())
            .with_config(json!({
                "location": region,
                "initial_node_count": 1,
                "remove_default_node_pool": true,
                "cluster_secondary_range_name": "pods",
                "services_secondary_range_name": "services",
                "enable_private_nodes": true,
                "enable_private_endpoint": false,
                "master_ipv4_cidr_block": MASTER_CIDR,
                "issue_client_certificate": false,
                "workload_pool": format!("{project_id}.svc.id.goog"),
            }))
            .with_input("network", network_name)
            .with_input("subnet", subnet_name);
        let cluster = provisioner.provision(&request).await?;
        let cluster_name = require_output(&cluster, CollaboratorKind::Cluster, "cluster_name")?;
        let cluster_endpoint = require_output(&cluster, CollaboratorKind::Cluster, "endpoint")?;

        // Node pool
        let request = ctx
            .request(CollaboratorKind::NodePool, "node-pool")
            .with_identity(identity.clone())
            .with_config(json!({
                "location": region,
                "machine_type": NODE_MACHINE_TYPE,
                "initial_node_count": 3,
                "min_node_count": 2,
                "max_node_count": 10,
                "disk_size_gb": 100,
                "disk_type": "pd-ssd",
                "preemptible": false,
                "auto_repair": true,
                "auto_upgrade": true,
            }))
            .with_input("cluster_name", cluster_name.clone());
        provisioner.provision(&request).await?;

        // Runtime
        let superset = &config.superset;
        let runtime_config = with_field(to_json(superset)?, "platform", "gke");
        let runtime_config = with_field(runtime_config, "image", superset.image());
        let request = ctx
            .request(CollaboratorKind::Runtime, "superset")
            .with_identity(identity.clone())
            .with_config(runtime_config)
            .with_input("cluster_name", cluster_name.clone())
            .with_input("database_url", database_url)
            .with_input("redis_url", cache_url)
            .with_input("secret_key", secret_key);
        let runtime = provisioner.provision(&request).await?;
        let superset_url = require_output(&runtime, CollaboratorKind::Runtime, "url")?;

        // Tunnel
        let tunnel_name = if config.cloudflare.enabled {
            let request = ctx
                .request(CollaboratorKind::Tunnel, "cloudflare")
                .with_identity(identity.clone())
                .with_config(to_json(&config.cloudflare)?)
                .with_input("target_service", superset_url.clone());
            let outputs = provisioner.provision(&request).await?;
            Some(require_output(&outputs, CollaboratorKind::Tunnel, "tunnel_name")?)
        } else {
            None
        };

        // Monitoring
        let grafana_url = if config.monitoring.enabled {
            let request = ctx
                .request(CollaboratorKind::Monitoring, "monitoring")
                .with_identity(identity.clone())
                .with_config(to_json(&config.monitoring)?)
                .with_input("cluster_name", cluster_name.clone());
            let outputs = provisioner.provision(&request).await?;
            Some(require_output(&outputs, CollaboratorKind::Monitoring, "grafana_url")?)
        } else {
            None
        };

        // Backups
        let backup_url = if config.backup.enabled {
            let request = ctx
                .request(CollaboratorKind::BackupBucket, "backup-bucket")
                .with_identity(identity.clone())
                .with_config(json!({
                    "bucket_name": format!("{project_id}-{}-backups", ctx.name),
                    "location": region,
                    "storage_class": BACKUP_STORAGE_CLASS,
                    "delete_after_days": config.backup.retention_days,
                }));
            let outputs = provisioner.provision(&request).await?;
            Some(require_output(&outputs, CollaboratorKind::BackupBucket, "url")?)
        } else {
            None
        };

        let instructions = format!(
            "Production stack deployed successfully!\n\
             Superset URL: {superset_url}\n\
             Grafana URL: {}\n\
             To connect to cluster: gcloud container clusters get-credentials {cluster_name} \
             --region={region} --project={project_id}",
            grafana_url.as_deref().unwrap_or("Not enabled"),
        );

        Ok(Outputs::from([
            (String::from("environment"), json!("gcp-production")),
            (String::from("project_id"), json!(project_id)),
            (String::from("region"), json!(region)),
            (String::from("cluster_name"), json!(cluster_name)),
            (String::from("cluster_endpoint"), json!(cluster_endpoint)),
            (String::from("superset_url"), json!(superset_url)),
            (String::from("database_instance"), json!(database_instance)),
            (String::from("database_connection_name"), json!(database_connection)),
            (String::from("cache_instance"), json!(cache_instance)),
            (String::from("monitoring_url"), json!(grafana_url)),
            (String::from("backup_bucket"), json!(backup_url)),
            (String::from("cloudflare_tunnel"), Value::from(tunnel_name)),
            (String::from("instructions"), json!(instructions)),
        ]))
    }
}
