use anyhow::{bail, Context};
use reqwest::Client;
use dm_integration_schemas::cli_models::{HostCmd, Opts};
use dm_integration_schemas::handlers::ServiceStatus;

/// Build an API url from the server connection, which may or may not end with a slash
pub fn api_url(server_connection: &str, path: &str) -> String {
    format!("{}/api/{}", server_connection.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub async fn status(client: &Client, opts: &Opts) -> anyhow::Result<()> {
    let server_api = api_url(&opts.server_connection, "status");
    tracing::trace!("api url used = {:?}", &server_api);
    let resp = client.get(&server_api).send().await?;
    if !resp.status().is_success() {
        bail!("could not get status from server: {}", resp.text().await?);
    }
    let status: ServiceStatus = serde_json::from_str(&resp.text().await?)
        .context("reading service status")?;

    tracing::info!("version: {}", status.version);
    if status.enabled {
        tracing::info!("integration enabled, topology mode: {}", status.topology_mode);
    } else {
        tracing::info!("integration disabled");
    }
    tracing::info!("running since: {}", status.started_at);
    Ok(())
}

pub async fn resolve(client: &Client, opts: &Opts, cmd: &HostCmd) -> anyhow::Result<()> {
    let server_api = api_url(&opts.server_connection, &format!("topology/{}", cmd.host));
    print_host_response(client, &server_api, cmd).await
        .with_context(|| format!("resolving host '{}'", cmd.host))
}

pub async fn bindings(client: &Client, opts: &Opts, cmd: &HostCmd) -> anyhow::Result<()> {
    let server_api = api_url(&opts.server_connection, &format!("bindings/{}", cmd.host));
    print_host_response(client, &server_api, cmd).await
        .with_context(|| format!("getting bindings for host '{}'", cmd.host))
}

async fn print_host_response(client: &Client, server_api: &str, cmd: &HostCmd) -> anyhow::Result<()> {
    tracing::trace!("api url used = {:?}", server_api);
    let resp = client.get(server_api)
        .query(&[("pretty", cmd.pretty)])
        .send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        bail!("server responded with {}: {}", status, text);
    }
    println!("{text}");
    Ok(())
}
