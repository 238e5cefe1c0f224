use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version = "1.0", about = "Device Manager VLAN binding integration")]
pub struct Opts {
    #[arg(short, long)]
    pub verbosity: Option<String>,
    #[command(subcommand)]
    pub sub_command: SubCommand,
    #[arg(
    long,
    default_value = "http://localhost:3366/",
    help = "Specify the URL to the dm integration service"
    )]
    pub server_connection: String,
}

#[derive(Subcommand, Debug, Deserialize, Serialize)]
pub enum SubCommand {
    #[command(about = "Validate a static topology file without contacting the service")]
    ValidateTopology(ValidateTopologyCmd),
    #[command(about = "Show the state of the dm integration service")]
    Status,
    #[command(about = "Show the physical links of a compute host")]
    Resolve(HostCmd),
    #[command(about = "Show the bindings a VMI would get on a compute host")]
    Bindings(HostCmd),
}

impl SubCommand {
    pub fn name(&self) -> String {
        match &self {
            SubCommand::ValidateTopology(_) => "validate topology".into(),
            SubCommand::Status => "status".into(),
            SubCommand::Resolve(_) => "resolve".into(),
            SubCommand::Bindings(_) => "bindings".into(),
        }
    }
}

#[derive(Args, Debug, Deserialize, Serialize)]
pub struct ValidateTopologyCmd {
    #[arg(help = "Path to the topology YAML")]
    pub path: PathBuf,
}

#[derive(Args, Debug, Deserialize, Serialize)]
pub struct HostCmd {
    #[arg(help = "Compute host name, as in binding:host_id")]
    pub host: String,
    #[arg(long, help = "Pretty print the JSON response")]
    pub pretty: bool,
}
