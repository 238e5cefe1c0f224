mod client;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing::level_filters::LevelFilter;
use dm_integration_lib::topology::{FileTopology, TopologySource};
use dm_integration_schemas::cli_models::{Opts, SubCommand, ValidateTopologyCmd};
use dm_integration_schemas::topology_yaml::TopologyDocument;
use reqwest::Client;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    std::process::exit(match run_app().await {
        Ok(_) => 0,
        Err(err) => {
            tracing::error!("{:#}", err);
            1
        }
    });
}

fn log_level(s: &str) -> anyhow::Result<LevelFilter> {
    match s.to_lowercase().as_str() {
        "error" => Ok(LevelFilter::ERROR),
        "warn" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        _ => Err(anyhow!("Unknown Log LevelFilter {}", s)),
    }
}

/// Parse the CLI arguments, set up logging and run the command. Command failures are logged
/// with their causes and turned into a non zero exit code.
pub async fn run_app() -> Result<(), anyhow::Error> {
    let opts: Opts = Opts::parse();
    let mut e = None;
    let level = match &opts.verbosity {
        None => LevelFilter::INFO,
        Some(x) => match log_level(x) {
            Ok(l) => l,
            Err(err) => {
                e = Some(err);
                LevelFilter::INFO
            }
        },
    };

    let stdout_log = tracing_subscriber::fmt::layer();
    tracing_subscriber::registry()
        .with(stdout_log.with_filter(level))
        .init();
    if let Some(e) = e {
        tracing::warn!("{}", e);
    }

    if let Err(err) = parse_command(&opts).await {
        tracing::error!("ERROR: {}", err);
        err.chain().skip(1).for_each(|cause| tracing::error!("because: {}", cause));
        bail!("{} failed", opts.sub_command.name());
    }
    Ok(())
}

/// This is the entrypoint for all commands
pub async fn parse_command(opts: &Opts) -> anyhow::Result<()> {
    // validation is offline, everything else goes through the service
    if let SubCommand::ValidateTopology(cmd) = &opts.sub_command {
        return validate_topology(cmd);
    }

    tracing::trace!("server connection = {:?}", opts.server_connection);
    let client = Client::new();
    let conn_test = client.get(client::api_url(&opts.server_connection, "status"))
        .send()
        .await
        .context("Connecting to dm integration service");
    if conn_test.is_err() {
        bail!("could not connect to dm integration service at {}, is it running?", opts.server_connection);
    }

    match &opts.sub_command {
        SubCommand::Status => client::status(&client, opts).await,
        SubCommand::Resolve(cmd) => client::resolve(&client, opts, cmd).await,
        SubCommand::Bindings(cmd) => client::bindings(&client, opts, cmd).await,
        _ => bail!("command not matched, please raise an issue"),
    }
}

/// Load the topology file the way the service does and report each node's links
fn validate_topology(cmd: &ValidateTopologyCmd) -> anyhow::Result<()> {
    let document = TopologyDocument::load_from_file(&cmd.path)
        .with_context(|| format!("validating {}", cmd.path.display()))?;
    let names: Vec<String> = document.nodes.iter().map(|node| node.name.clone()).collect();
    let topology = FileTopology::from_document(document);
    for name in &names {
        let node = topology.resolve(name)?;
        tracing::info!("{}: {} port(s)", node.name, node.ports.len());
        for port in &node.ports {
            tracing::debug!("  {} {}", port.switch_name, port.port_name);
        }
    }
    tracing::info!("{} is valid, {} node(s)", cmd.path.display(), names.len());
    Ok(())
}
