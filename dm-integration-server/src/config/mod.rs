use std::path::PathBuf;
use anyhow::Context;
use clap::Parser;
use dm_integration_schemas::settings::DmIntegrationConfig;

pub mod handlers;

#[derive(Parser, Debug)]
#[command(version, about = "Device Manager integration hook service")]
pub struct ServerArgs {
    #[arg(long, help = "Path to the config JSON, defaults to /etc/dm-integration/config.json")]
    pub config: Option<PathBuf>,
}

/// Read the config from the path given on the command line or from the default location
pub async fn load_config(args: &ServerArgs) -> anyhow::Result<DmIntegrationConfig> {
    let path = args.config.clone()
        .unwrap_or_else(DmIntegrationConfig::default_path);
    DmIntegrationConfig::read(&path).await
        .with_context(|| format!("loading config from {}", path.display()))
}
