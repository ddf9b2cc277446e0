//! Host CLI for the fabric core.
//!
//! Exit codes: 0 success, 1 validation/topology error, 2 I/O error,
//! 3 cancellation.

use clap::{Args, Parser, Subcommand};
use dnaas_fabric::domain::Endpoint;
use dnaas_fabric::{CoreError, FabricConfig, FabricService, ServiceRequest};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dnaas-fabric", about = "Bridge-domain automation for spine-leaf fabrics")]
struct Cli {
    /// Directory with per-device parsed artifacts
    #[arg(long, default_value = "parsed_data")]
    data_dir: PathBuf,

    /// Working directory for persisted state and outputs
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a discovery pass and write the topology snapshot
    Discover {
        /// Also print the topology as a tier-ordered tree
        #[arg(long)]
        tree: bool,
    },
    /// Run discovery and print the consolidated bridge-domain report
    Consolidate,
    /// Build a point-to-point service configuration
    BuildP2p(BuildArgs),
    /// Build a point-to-multipoint service configuration
    BuildP2mp(BuildArgs),
    /// Exercise path computation and synthesis across leaf pairs
    Audit {
        /// Cap the number of leaf pairs probed
        #[arg(long)]
        pair_limit: Option<usize>,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Service name (also the bridge-domain instance name)
    #[arg(long)]
    service_name: String,

    /// VLAN ID to assign along the path
    #[arg(long)]
    vlan_id: i32,

    /// Source endpoint as device:interface
    #[arg(long)]
    source: String,

    /// Destination endpoint(s) as device:interface (repeatable)
    #[arg(long = "dest", required = true)]
    destinations: Vec<String>,

    /// Write the artifact JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn parse_endpoint(raw: &str) -> Result<Endpoint, CoreError> {
    let (device, interface) = raw.split_once(':').ok_or_else(|| {
        CoreError::Validation(format!("endpoint '{raw}' must be device:interface"))
    })?;
    Ok(Endpoint::new(device, interface))
}

async fn run(cli: Cli) -> Result<(), CoreError> {
    let config = FabricConfig::new(&cli.data_dir, &cli.work_dir);
    let service = FabricService::new(config).await?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; cancelling");
            ctrl_c_token.cancel();
        }
    });

    match cli.command {
        Command::Discover { tree } => {
            let report = service.discover(&cancel).await?;
            if report.cancelled {
                return Err(CoreError::Cancelled);
            }
            println!(
                "discovered {} devices, {} bridge domains, {} consolidated services",
                report.summary.device_count,
                report.summary.bridge_domain_count,
                report.summary.consolidated_count
            );
            if tree {
                let source =
                    dnaas_fabric::persistence::FsArtifactSource::new(&cli.data_dir);
                let graph = service.build_graph(&source, &cancel).await?;
                print!("{}", dnaas_fabric::visualization::render_topology_tree(&graph));
            }
            for issue in &report.issues {
                eprintln!("warning [{}]: {}", issue.kind, issue.detail);
            }
        }
        Command::Audit { pair_limit } => {
            let source = dnaas_fabric::persistence::FsArtifactSource::new(&cli.data_dir);
            let graph = service.build_graph(&source, &cancel).await?;
            let mut auditor = dnaas_fabric::FabricAuditor::new(&graph, service.normalizer());
            if let Some(limit) = pair_limit {
                auditor = auditor.with_pair_limit(limit);
            }
            let report = auditor.audit(&cancel)?;
            println!(
                "audited {} leaf pairs: {} passed, {} failed ({:.1}% pass rate)",
                report.pairs_tested,
                report.passed,
                report.failed,
                report.pass_rate * 100.0
            );
            for failure in &report.failures {
                eprintln!(
                    "  {} -> {}: {}",
                    failure.source,
                    failure.destination,
                    failure.error.as_deref().unwrap_or("unknown")
                );
            }
        }
        Command::Consolidate => {
            let report = service.discover(&cancel).await?;
            if report.cancelled {
                return Err(CoreError::Cancelled);
            }
            println!("{}", serde_json::to_string_pretty(&report.consolidated)
                .map_err(CoreError::from)?);
        }
        Command::BuildP2p(args) | Command::BuildP2mp(args) => {
            let request = ServiceRequest {
                service_name: args.service_name,
                vlan_id: args.vlan_id,
                source: parse_endpoint(&args.source)?,
                destinations: args
                    .destinations
                    .iter()
                    .map(|d| parse_endpoint(d))
                    .collect::<Result<_, _>>()?,
            };
            let artifact = service.build_service(&request, &cancel).await?;
            eprint!("{}", artifact.summary());
            let rendered = serde_json::to_string_pretty(&artifact).map_err(CoreError::from)?;
            match args.output {
                Some(path) => {
                    dnaas_fabric::persistence::write_atomic(&path, rendered.as_bytes()).await?;
                    println!("configuration written to {}", path.display());
                }
                None => println!("{rendered}"),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code() as u8)
        }
    }
}
