//! ELGAS2 gateway server

use anyhow::Context;
use clap::Parser;
use elgas_gateway::{
    CallHandler, ElgasSessionFactory, GatewayConfig, GatewayListener, HttpSettingsProvider,
};
use std::sync::Arc;

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::parse();
    init_logging(config.debug);

    let address = config.listen_address().context("invalid listen address")?;
    let settings =
        HttpSettingsProvider::new(&config.base_url, &config.api_key, config.http_timeout())
            .context("failed to set up backend client")?;
    let handler = CallHandler::new(Arc::new(settings), Arc::new(ElgasSessionFactory));
    let listener =
        GatewayListener::new(handler, address).with_socket_timeout(Some(config.socket_timeout()));

    log::info!("Starting ELGAS gateway, settings from {}", config.base_url);
    listener.start().await.context("gateway stopped")?;
    Ok(())
}
