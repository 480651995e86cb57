//! Dummy microservice.
//!
//! Serves the dummy command set under `/dummy`, the REST routes under
//! `rest.base_route`, plus heartbeat, status and about, all on one endpoint.
//!
//! Run:
//!   cargo run -p commandable-example-dummy -- --config demos/dummy/config.toml
//!
//! Then:
//!   curl -X POST localhost:8080/dummy/get_dummies -d '{}'
//!   curl localhost:8080/api/v1/dummies
//!   curl localhost:8080/heartbeat

use clap::Parser;
use commandable_core::ConfigParams;
use commandable_example_dummy::{
    DummyCommandableHttpService, DummyCommands, DummyController, DummyRestService,
};
use commandable_server::{
    AboutRestService, HeartbeatRestService, HttpEndpoint, RestService, StatusRestService,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dummy-server")]
#[command(about = "Dummy CRUD microservice over HTTP", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "DUMMY_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configuration
    #[arg(short, long, env = "DUMMY_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("commandable_example_dummy=info".parse()?)
                .add_directive("commandable_server=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ConfigParams::from_toml_file(path)?,
        None => ConfigParams::new(),
    };
    if let Some(port) = cli.port {
        config.set("connection.port", port);
    }

    let endpoint = Arc::new(HttpEndpoint::from_config(&config));
    let controller = Arc::new(DummyController::new());
    let commands = DummyCommands::new(controller.clone())?;

    let _commandable = DummyCommandableHttpService::with_endpoint(
        endpoint.clone(),
        &config.section("commandable"),
        &commands,
    );
    let _rest =
        DummyRestService::with_endpoint(endpoint.clone(), &config.section("rest"), controller);
    let _heartbeat = RestService::with_endpoint(
        endpoint.clone(),
        &ConfigParams::new(),
        Arc::new(HeartbeatRestService::from_config(&config.section("heartbeat"))),
    );
    let status = StatusRestService::from_config(&config);
    tracing::info!("Starting '{}' ({})", status.info().name, status.info().context_id);
    let _status =
        RestService::with_endpoint(endpoint.clone(), &ConfigParams::new(), Arc::new(status));
    let about = Arc::new(AboutRestService::from_config(&config));
    let _about = RestService::with_endpoint(endpoint.clone(), &ConfigParams::new(), about);

    endpoint.open(None).await?;
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    endpoint.close(None).await;
    Ok(())
}
