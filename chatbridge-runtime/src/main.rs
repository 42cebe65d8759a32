//! `chatbridge` binary: load config, open the store, start the bridge, wait for Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use chatbridge_core::config::BridgeConfig;
use chatbridge_core::persistence::SqliteAccountStore;
use chatbridge_net::GroupClient;
use chatbridge_runtime::tcp::{TcpGameConnector, bind_group_relay, serve_group_relay};
use chatbridge_runtime::{BridgeContext, ReconnectSupervisor, periodic};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &BridgeConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},chatbridge=debug", config.general.log_level)));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if config.general.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = BridgeConfig::load_layered(config_path.as_deref()).context("loading configuration")?;
    init_tracing(&config);

    let store = Arc::new(SqliteAccountStore::open(&config.persistence).context("opening account store")?);
    let group = GroupClient::from_config(&config.group);
    if !group.is_available() {
        warn!("No group bot token configured; group publishing is disabled");
    }

    let game_addr = format!("{}:{}", config.game.host, config.game.port);
    let connector = Arc::new(TcpGameConnector::new(game_addr, config.game.username.clone()));
    let relay = bind_group_relay(&config.group.relay_bind)
        .await
        .context("binding group relay")?;

    let ctx = BridgeContext::new(config, store, Arc::new(group)).context("building bridge")?;
    ReconnectSupervisor::new(Arc::clone(&ctx), connector).spawn();
    periodic::spawn_all(&ctx);
    ctx.scheduler
        .spawn_service("group-relay", serve_group_relay(Arc::clone(&ctx), relay));
    info!("Bridge running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    ctx.shutdown().await;
    Ok(())
}
