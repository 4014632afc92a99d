//! blockgridd: the BlockGrid daemon.
//!
//! Assembles the capability store, liveness directory, and scheduler,
//! and makes placement decisions from JSON inputs. Transport for
//! capability reports and requests is left to the embedding service.
//!
//! # Usage
//!
//! ```text
//! blockgridd schedule --config blockgrid.toml \
//!     --services services.json --reports reports.json --request request.json
//! blockgridd check-config --config blockgrid.toml
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use blockgrid_core::{CapabilityReport, FilterProperties, SchedulerConfig, ServiceRecord};
use blockgrid_placement::{builtin_filters, builtin_weighers};
use blockgrid_scheduler::{Scheduler, StaticServiceDirectory};
use blockgrid_state::CapabilityStore;

#[derive(Parser)]
#[command(name = "blockgridd", about = "BlockGrid volume placement daemon")]
struct Cli {
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank backends for one volume-creation request.
    Schedule {
        /// Scheduler configuration (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON array of service records from the liveness directory.
        #[arg(long)]
        services: PathBuf,

        /// JSON array of capability reports.
        #[arg(long)]
        reports: PathBuf,

        /// JSON scheduling request.
        #[arg(long)]
        request: PathBuf,

        /// Print only the selected host instead of the full ranking.
        #[arg(long)]
        select: bool,
    },
    /// Validate a configuration file and its strategy names.
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Schedule {
            config,
            services,
            reports,
            request,
            select,
        } => {
            let config = load_config(config.as_deref())?;
            run_schedule(config, &services, &reports, &request, select).await
        }
        Command::CheckConfig { config } => {
            let config = load_config(config.as_deref())?;
            check_config(&config)
        }
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,blockgrid=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SchedulerConfig> {
    match path {
        Some(path) => {
            let config = SchedulerConfig::from_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => {
            debug!("no config file given, using defaults");
            Ok(SchedulerConfig::default())
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

async fn run_schedule(
    config: SchedulerConfig,
    services_path: &Path,
    reports_path: &Path,
    request_path: &Path,
    select: bool,
) -> anyhow::Result<()> {
    let services: Vec<ServiceRecord> = read_json(services_path)?;
    let reports: Vec<CapabilityReport> = read_json(reports_path)?;
    let props: FilterProperties = read_json(request_path)?;

    let store = CapabilityStore::new(config.volume_topic.clone(), config.service_down_time());
    let mut ingested = 0;
    for report in reports {
        if store.ingest(report).await? {
            ingested += 1;
        }
    }
    info!(services = services.len(), reports = ingested, "inputs loaded");

    let directory = StaticServiceDirectory::new(services);
    let scheduler = Scheduler::new(config, store, Arc::new(directory))?;

    let output = if select {
        let host = scheduler.select_host(&props).await?;
        serde_json::json!({ "host": host.host })
    } else {
        serde_json::to_value(scheduler.schedule(&props).await?)?
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn check_config(config: &SchedulerConfig) -> anyhow::Result<()> {
    let filters = builtin_filters();
    let weighers = builtin_weighers(config);
    filters.resolve(&config.default_filters.to_vec())?;
    weighers.resolve(&config.default_weighers.to_vec())?;

    println!("filters available: {}", filters.names().join(", "));
    println!("weighers available: {}", weighers.names().join(", "));
    println!("default filters: {}", config.default_filters.to_vec().join(", "));
    println!("default weighers: {}", config.default_weighers.to_vec().join(", "));
    println!("configuration OK");
    Ok(())
}
