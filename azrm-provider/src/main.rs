//! azrm: run single lifecycle operations against Azure resources.
//!
//! Meant for scripting and debugging the resource bindings by hand: every
//! subcommand runs one reconciler entry point and prints the result as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use azrm_provider::{
    Provider, ProviderArgs, Reconciler, Resource, ResourceData, load_resource_data,
};

/// Azure resource reconciler
#[derive(Parser, Debug)]
#[command(name = "azrm", version, about)]
struct Args {
    #[command(flatten)]
    provider: ProviderArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ResourceKind {
    StreamAnalyticsJob,
    ServiceFabricManagedCluster,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the attribute schema of a resource type
    Schema {
        #[arg(long)]
        resource: ResourceKind,
    },
    /// Create a resource, or update it when --id is given
    Apply {
        #[arg(long)]
        resource: ResourceKind,
        /// JSON file with the desired configuration
        #[arg(long)]
        config: PathBuf,
        /// Identifier of the existing resource
        #[arg(long)]
        id: Option<String>,
    },
    /// Read the current state of a resource
    Read {
        #[arg(long)]
        resource: ResourceKind,
        #[arg(long)]
        id: String,
        /// JSON file with previously known state
        #[arg(long)]
        prior: Option<PathBuf>,
    },
    /// Check whether a resource exists
    Exists {
        #[arg(long)]
        resource: ResourceKind,
        #[arg(long)]
        id: String,
    },
    /// Delete a resource
    Delete {
        #[arg(long)]
        resource: ResourceKind,
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "azrm=info,azrm_provider=info,azrm_arm=info,reqwest=warn,hyper=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    // Schema needs no credentials
    if let Command::Schema { resource } = &args.command {
        let schema = match resource {
            ResourceKind::StreamAnalyticsJob => azrm_provider::resources::stream_analytics_job::schema(),
            ResourceKind::ServiceFabricManagedCluster => {
                azrm_provider::resources::service_fabric_managed_cluster::schema()
            }
        };
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let config = args.provider.into_config().context("invalid provider configuration")?;
    let provider = Provider::new(config)?;

    match args.command {
        Command::Schema { .. } => Ok(()),
        Command::Apply { resource, config, id } => {
            let desired = load_resource_data(&config)?;
            match resource {
                ResourceKind::StreamAnalyticsJob => {
                    apply(&provider.stream_analytics_job(), &desired, id.as_deref()).await
                }
                ResourceKind::ServiceFabricManagedCluster => {
                    apply(&provider.service_fabric_managed_cluster(), &desired, id.as_deref())
                        .await
                }
            }
        }
        Command::Read { resource, id, prior } => {
            let prior = prior.as_deref().map(load_resource_data).transpose()?;
            match resource {
                ResourceKind::StreamAnalyticsJob => {
                    read(&provider.stream_analytics_job(), &id, prior.as_ref()).await
                }
                ResourceKind::ServiceFabricManagedCluster => {
                    read(&provider.service_fabric_managed_cluster(), &id, prior.as_ref()).await
                }
            }
        }
        Command::Exists { resource, id } => {
            let exists = match resource {
                ResourceKind::StreamAnalyticsJob => provider.stream_analytics_job().exists(&id).await?,
                ResourceKind::ServiceFabricManagedCluster => {
                    provider.service_fabric_managed_cluster().exists(&id).await?
                }
            };
            println!("{}", serde_json::json!({ "id": id, "exists": exists }));
            Ok(())
        }
        Command::Delete { resource, id } => {
            match resource {
                ResourceKind::StreamAnalyticsJob => provider.stream_analytics_job().delete(&id).await?,
                ResourceKind::ServiceFabricManagedCluster => {
                    provider.service_fabric_managed_cluster().delete(&id).await?
                }
            }
            info!("Deleted {}", id);
            Ok(())
        }
    }
}

async fn apply<R: Resource>(
    reconciler: &Reconciler<R>,
    desired: &ResourceData,
    existing: Option<&str>,
) -> Result<()> {
    let id = reconciler.create_or_update(desired, existing).await?;
    let state = reconciler
        .read(&id, Some(desired))
        .await?
        .with_context(|| format!("{id} disappeared right after apply"))?;
    let state = redact(reconciler, state);
    println!("{}", serde_json::json!({ "id": id, "state": state }));
    Ok(())
}

/// Mask sensitive attributes before printing.
fn redact<R: Resource>(reconciler: &Reconciler<R>, mut state: ResourceData) -> ResourceData {
    for (name, attribute) in reconciler.schema().iter() {
        if attribute.sensitive && state.contains(name) {
            state.set(name, "(sensitive)");
        }
    }
    state
}

async fn read<R: Resource>(
    reconciler: &Reconciler<R>,
    id: &str,
    prior: Option<&ResourceData>,
) -> Result<()> {
    match reconciler.read(id, prior).await? {
        Some(state) => {
            let state = redact(reconciler, state);
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        None => bail!("{} not found", id),
    }
}
