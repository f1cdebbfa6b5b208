//! vpcshare CLI - Command line interface for VPC file-share volumes.
//!
//! This tool loads a provider configuration, opens a session against the
//! selected provider and runs one volume operation. Results are printed as
//! JSON on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vpcshare_provider::{
    init_providers, open_provider_session_with_cancel, FileConfig, ListQuery, ProviderRegistry,
    Session, VolumeSpec,
};

#[derive(Parser)]
#[command(name = "vpcshare")]
#[command(about = "vpcshare - VPC file-share volume management")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: <config dir>/vpcshare/config.json).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Provider identity to open a session against.
    /// Defaults to the only registered provider.
    #[arg(short, long)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new volume and wait until it is usable.
    Create {
        /// Volume name.
        #[arg(short, long)]
        name: String,

        /// Capacity in GiB.
        #[arg(short = 's', long)]
        capacity: String,

        /// Provisioned IOPS.
        #[arg(long)]
        iops: Option<String>,

        /// Share profile (default: dp2).
        #[arg(long)]
        profile: Option<String>,

        /// Zone name.
        #[arg(short, long)]
        zone: Option<String>,

        /// Resource group id.
        #[arg(short, long)]
        resource_group: Option<String>,

        /// Customer-managed encryption key CRN.
        #[arg(long)]
        encryption_key: Option<String>,

        /// User tag; may be repeated.
        #[arg(short, long)]
        tag: Vec<String>,
    },

    /// Show one volume.
    Get {
        /// Volume id.
        #[arg(required_unless_present = "name")]
        id: Option<String>,

        /// Look the volume up by name instead of id.
        #[arg(short, long, conflicts_with = "id")]
        name: Option<String>,
    },

    /// Delete a volume.
    Delete {
        /// Volume id.
        id: String,
    },

    /// List volumes.
    List {
        /// Page size (non-numeric means upstream default).
        #[arg(short, long)]
        limit: Option<String>,

        /// Continuation cursor from a previous page.
        #[arg(long)]
        start: Option<String>,

        /// Resource group id.
        #[arg(short, long)]
        resource_group: Option<String>,

        /// User tag.
        #[arg(short, long)]
        tag: Option<String>,

        /// Zone name.
        #[arg(short, long)]
        zone: Option<String>,

        /// Volume name.
        #[arg(short, long)]
        name: Option<String>,

        /// Follow continuation cursors and print every volume.
        #[arg(short, long)]
        all: bool,
    },

    /// Grow a volume.
    Expand {
        /// Volume id.
        id: String,

        /// New capacity in GiB.
        #[arg(short = 's', long)]
        capacity: i64,
    },

    /// Show registered providers.
    Providers,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    info!("Loading configuration from {}", config_path.display());
    let conf = FileConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load configuration {}", config_path.display()))?;

    let registry = init_providers(&conf).context("Failed to initialize providers")?;

    if let Commands::Providers = cli.command {
        let mut providers = registry.providers();
        providers.sort();
        return print_json(&providers);
    }

    let provider_id = select_provider(&registry, cli.provider)?;
    let session = open_session(&conf, &registry, &provider_id).await?;

    match cli.command {
        Commands::Create {
            name,
            capacity,
            iops,
            profile,
            zone,
            resource_group,
            encryption_key,
            tag,
        } => {
            let mut parameters = HashMap::new();
            parameters.insert("capacity".to_string(), capacity);
            let optional = [
                ("iops", iops),
                ("profile", profile),
                ("zone", zone),
                ("resource_group", resource_group),
                ("encryption_key", encryption_key),
            ];
            for (key, value) in optional {
                if let Some(value) = value {
                    parameters.insert(key.to_string(), value);
                }
            }
            if !tag.is_empty() {
                parameters.insert("tags".to_string(), tag.join(","));
            }

            let spec = VolumeSpec::from_parameters(name, &parameters)
                .context("Invalid volume parameters")?;
            cmd_create(session.as_ref(), &spec).await
        }

        Commands::Get { id, name } => cmd_get(session.as_ref(), id, name).await,

        Commands::Delete { id } => {
            let outcome = session
                .delete_volume(&id)
                .await
                .with_context(|| format!("Failed to delete volume {}", id))?;
            print_json(&serde_json::json!({ "id": id, "outcome": outcome }))
        }

        Commands::List {
            limit,
            start,
            resource_group,
            tag,
            zone,
            name,
            all,
        } => {
            let parameters: HashMap<String, String> = [
                ("limit", limit),
                ("start", start),
                ("resource_group", resource_group),
                ("tag", tag),
                ("zone", zone),
                ("name", name),
            ]
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect();

            cmd_list(session.as_ref(), ListQuery::from_parameters(&parameters), all).await
        }

        Commands::Expand { id, capacity } => {
            let volume = session
                .expand_volume(&id, capacity)
                .await
                .with_context(|| format!("Failed to expand volume {}", id))?;
            print_json(&volume)
        }

        Commands::Providers => Ok(()),
    }
}

fn default_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Cannot determine configuration directory")?;
    Ok(dir.join("vpcshare").join("config.json"))
}

/// Use the requested provider, or the only registered one.
fn select_provider(registry: &ProviderRegistry, requested: Option<String>) -> Result<String> {
    if let Some(provider) = requested {
        return Ok(provider);
    }

    let providers = registry.providers();
    match providers.as_slice() {
        [only] => Ok(only.clone()),
        _ => anyhow::bail!(
            "Several providers are registered ({}); choose one with --provider",
            providers.join(", ")
        ),
    }
}

/// Open a session; Ctrl-C aborts the open.
async fn open_session(
    conf: &FileConfig,
    registry: &ProviderRegistry,
    provider_id: &str,
) -> Result<Box<dyn Session>> {
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            guard.cancel();
        }
    });

    open_provider_session_with_cancel(cancel, conf, registry, provider_id)
        .await
        .map_err(|e| {
            let fatal = e.fatal;
            anyhow::Error::new(e).context(format!(
                "Failed to open session for provider '{}' (fatal: {})",
                provider_id, fatal
            ))
        })
}

async fn cmd_create(session: &dyn Session, spec: &VolumeSpec) -> Result<()> {
    info!("Creating volume: {}", spec.name.as_deref().unwrap_or_default());

    let volume = session
        .create_volume(spec)
        .await
        .context("Failed to create volume")?;
    print_json(&volume)
}

async fn cmd_get(session: &dyn Session, id: Option<String>, name: Option<String>) -> Result<()> {
    let volume = match (id, name) {
        (Some(id), _) => session
            .get_volume(&id)
            .await
            .with_context(|| format!("Failed to get volume {}", id))?,
        (None, Some(name)) => session
            .get_volume_by_name(&name)
            .await
            .with_context(|| format!("Failed to get volume named {}", name))?,
        (None, None) => anyhow::bail!("Either a volume id or --name is required"),
    };
    print_json(&volume)
}

async fn cmd_list(session: &dyn Session, query: ListQuery, all: bool) -> Result<()> {
    if all {
        let volumes = session
            .list_all_volumes(&query.filters)
            .await
            .context("Failed to list volumes")?;
        return print_json(&volumes);
    }

    let page = session
        .list_volumes(query.limit, query.start.as_deref(), &query.filters)
        .await
        .context("Failed to list volumes")?;
    print_json(&page)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", json);
    Ok(())
}
