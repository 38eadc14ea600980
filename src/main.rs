//! Kubernetes Distribution Metadata Operator
//!
//! Seeds the cluster from the vendor default catalog, then re-applies the
//! catalog file on a fixed interval.
//!
//! ## Usage
//!
//! ```bash
//! # Apply a catalog every five minutes (requires kubeconfig)
//! kdm-operator --catalog /var/lib/kdm/data.json --rancher-version v2.5.1
//!
//! # Log what would be written without touching the cluster
//! RUST_LOG=debug kdm-operator --catalog data.json --dry-run
//! ```

use clap::Parser;
use kdm_operator::leader_election::{self, LeaderElector};
use kdm_operator::{
    KubeMetadataStore, KubeSettingsSink, LoggingSettingsSink, MemoryStore, MetadataCatalog,
    MetadataStore, ReconciliationDriver, SettingsSink,
};
use kube::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Kubernetes Distribution Metadata Operator
#[derive(Parser, Debug)]
#[command(name = "kdm-operator")]
#[command(version, about = "Applies Kubernetes distribution metadata to the management plane")]
struct Args {
    /// Catalog snapshot to apply on every refresh
    #[arg(long, env = "KDM_CATALOG")]
    catalog: PathBuf,

    /// Vendor default catalog (defaults to the catalog snapshot)
    #[arg(long, env = "KDM_DEFAULT_CATALOG")]
    default_catalog: Option<PathBuf>,

    /// Running management-plane version
    #[arg(long, env = "RANCHER_VERSION", default_value = "dev")]
    rancher_version: String,

    /// Namespace for the metadata objects
    #[arg(long, default_value = kdm_operator::crd::GLOBAL_NAMESPACE)]
    namespace: String,

    /// Seconds between catalog refreshes
    #[arg(long, default_value = "300")]
    refresh_interval_secs: u64,

    /// Use an in-memory store and log settings instead of writing them
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Enable leader election for HA deployments
    #[arg(long, default_value = "false")]
    leader_election: bool,

    /// Namespace for the leader election Lease (auto-detected if empty)
    #[arg(long, default_value = "")]
    leader_election_namespace: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args = Args::parse();

    info!("Starting Kubernetes distribution metadata operator");
    info!("Catalog: {}", args.catalog.display());
    info!("Namespace: {}", args.namespace);
    info!("Dry run: {}", args.dry_run);

    let vendor_path = args.default_catalog.as_ref().unwrap_or(&args.catalog);
    let vendor = MetadataCatalog::load(vendor_path)?;

    let (store, settings, elector): (Arc<dyn MetadataStore>, Arc<dyn SettingsSink>, _) =
        if args.dry_run {
            (Arc::new(MemoryStore::new()), Arc::new(LoggingSettingsSink), None)
        } else {
            let client = Client::try_default().await?;
            info!("Connected to Kubernetes API server");

            // acquire the lease before the first pass
            let elector = if args.leader_election {
                let ns = leader_election::detect_namespace(&args.leader_election_namespace);
                info!("Leader election namespace: {}", ns);
                let elector = LeaderElector::new(client.clone(), &ns);
                elector.acquire().await;
                Some(Arc::new(elector))
            } else {
                None
            };
            (
                Arc::new(KubeMetadataStore::new(client.clone())),
                Arc::new(KubeSettingsSink::new(client)),
                elector,
            )
        };

    let driver = ReconciliationDriver::new(store, settings, vendor, &args.rancher_version)
        .with_namespace(args.namespace.clone());
    let catalog_path = args.catalog.clone();
    let interval = Duration::from_secs(args.refresh_interval_secs.max(1));
    let refresh_handle = tokio::spawn(async move { driver.run(&catalog_path, interval).await });

    // pending forever when leader election is disabled
    let elector_for_renew = elector.clone();
    let renew_handle = tokio::spawn(async move {
        match elector_for_renew {
            Some(e) => loop {
                tokio::time::sleep(e.renew_interval()).await;
                match e.renew().await {
                    Ok(true) => {}
                    Ok(false) => {
                        error!("Lost leader lease");
                        break;
                    }
                    Err(err) => {
                        error!("Failed to renew leader lease: {}", err);
                        break;
                    }
                }
            },
            None => std::future::pending::<()>().await,
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = refresh_handle => {
            if let Err(e) = result {
                error!("Refresh task failed: {}", e);
            }
        }
        _ = renew_handle => {
            error!("Leader lease lost, initiating shutdown");
        }
    }

    if let Some(e) = &elector {
        e.release().await;
    }

    info!("Kubernetes distribution metadata operator shutting down");
    Ok(())
}
