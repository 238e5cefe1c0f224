use std::process::exit;
use std::sync::Arc;
use axum::extract::Request;
use axum::ServiceExt;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::normalize_path::NormalizePathLayer;
use tower_layer::Layer;
use dm_integration_lib::core_plugin::NeutronCorePlugin;
use dm_integration_lib::fabric::VncFabricClient;
use dm_integration_lib::hooks::PortEventHandler;
use dm_integration_lib::integrator::DeviceManagerIntegrator;
use dm_integration_schemas::settings::DmIntegrationConfig;
use service_clients::keystone::KeystoneAuth;
use dm_integration_server_lib::{dm_app, logging, AppState};
use dm_integration_server_lib::config::{load_config, ServerArgs};

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    let args = ServerArgs::parse();

    // logging is not set up yet, the config decides where the log file goes
    let config = match load_config(&args).await {
        Ok(ok) => ok,
        Err(err) => {
            eprintln!("could not start server, error: {err:#}");
            exit(1);
        }
    };

    let _logging_guard = match logging::configure_logging(&config.log_folder).await {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("could not set up logging, error: {err:#}");
            exit(1);
        }
    };

    // loading the topology and talking to the controller is blocking
    let setup_config = config.clone();
    let handler = match tokio::task::spawn_blocking(move || build_handler(&setup_config)).await {
        Ok(Ok(handler)) => handler,
        Ok(Err(err)) => {
            tracing::error!("could not start server due to integration configuration, error: {err:#}");
            exit(1);
        }
        Err(err) => {
            tracing::error!("could not start server, error: {err:#}");
            exit(1);
        }
    };

    let addr = match config.server.socket_addr() {
        Ok(addr) => addr,
        Err(err) => {
            tracing::error!("could not start server, error: {err:#}");
            exit(1);
        }
    };

    let app_state = Arc::new(AppState::new(handler));
    let app = NormalizePathLayer::trim_trailing_slash().layer(dm_app(app_state));

    tracing::info!("listening on {}", addr);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("could not bind {addr}, error: {err:#}");
            exit(1);
        }
    };
    if let Err(err) = axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await {
        tracing::error!("server stopped with error: {err:#}");
        exit(1);
    }
}

fn build_handler(config: &DmIntegrationConfig) -> anyhow::Result<PortEventHandler> {
    // one keystone session shared by both clients
    let keystone = config.keystone.as_ref().map(|keystone| Arc::new(KeystoneAuth::new(keystone)));
    let fabric = Arc::new(VncFabricClient::new(&config.api_server, keystone.clone()));
    let core_plugin = Arc::new(NeutronCorePlugin::new(&config.neutron, keystone)?);
    let integrator = DeviceManagerIntegrator::new(config, fabric, core_plugin)?;
    Ok(PortEventHandler::new(integrator))
}
