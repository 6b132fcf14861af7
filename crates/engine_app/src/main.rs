//! # engine_app
//!
//! The authoritative game server. It owns the only copy of the world and
//! advances it at a fixed rate; clients talk to it over NATS.
//!
//! ## Startup sequence
//!
//! 1. Parse and validate configuration (flags with environment fallbacks).
//! 2. Connect to NATS (default `nats://localhost:4222`).
//! 3. Populate the arena and register the gameplay systems.
//! 4. Start the gateway task that bridges client subjects to the tick loop.
//! 5. Enter the fixed-rate tick loop until interrupted.

mod config;
mod gateway;
mod registry;
mod session;
mod sim;
mod spawn;
mod systems;
mod tick;

use anyhow::Result;
use clap::Parser;
use engine_net::{NatsConnection, WireFormat};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use gateway::Gateway;
use tick::TickLoop;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("engine_app=info".parse()?))
        .init();

    let args = AppConfig::parse();
    let (tick_config, sim_config) = args.validate()?;
    let format = WireFormat::from(args.wire_format);

    info!(nats_url = %args.nats_url, "engine_app starting");

    let conn = NatsConnection::connect_to(&args.nats_url, format).await?;
    info!("connected to NATS");

    let mut tick_loop = TickLoop::new(tick_config, sim_config, format);
    tick_loop.sim_mut().populate();
    systems::register_default_systems(tick_loop.registry_mut());

    let gateway = Gateway::new(conn, tick_loop.event_sender(), args.outbound_buffer);
    let gateway_task = tokio::spawn(async move {
        if let Err(e) = gateway.run().await {
            error!(%e, "gateway stopped");
        }
    });

    tick_loop
        .run_async(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(%e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;

    gateway_task.abort();
    info!(ticks = tick_loop.tick_id(), "engine_app shut down");
    Ok(())
}
