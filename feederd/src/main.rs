//! # Feeder Daemon
//!
//! Wires the whole bridge together: the in-process variable store, the
//! polling monitor (which owns the sweep task lifecycle), the PWM
//! actuator driver, and the REST gateway.
//!
//! Data flow: REST clients write desired values into the store → the
//! monitor polls the store and reconciles it into the shared control
//! state → the sweep task reads the control state and drives the
//! actuator. Shutdown is ordered: cancel the sweep, join it, then
//! de-energize the output.

mod config;

use clap::Parser;
use config::FeederConfig;
use feeder_common::config::ConfigLoader;
use feeder_core::actuator::{self, PwmActuator};
use feeder_core::monitor::{Monitor, MonitorConfig};
use feeder_core::state::ControlState;
use feeder_core::store::{MemStore, VariableStore};
use feeder_gateway::{create_router, GatewayState};
use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Servo feeder bridge daemon")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[cfg(feature = "hardware")]
fn build_driver(config: &FeederConfig) -> Result<Box<dyn PwmActuator>, feeder_core::error::ActuatorError> {
    use feeder_core::actuator::HardwarePwm;
    Ok(Box::new(HardwarePwm::new(config.pwm.channel)?))
}

#[cfg(not(feature = "hardware"))]
fn build_driver(_config: &FeederConfig) -> Result<Box<dyn PwmActuator>, feeder_core::error::ActuatorError> {
    use feeder_core::actuator::SimPwm;
    Ok(Box::new(SimPwm::new()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FeederConfig::load(path)?,
        None => FeederConfig::default(),
    };
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.shared.log_level.as_filter_str())),
        )
        .init();

    info!(service = %config.shared.service_name, "feederd starting");

    // Actuator init failure is fatal — no degraded mode.
    let driver = build_driver(&config)?;
    info!(driver = driver.name(), "actuator driver ready");
    let actuator = actuator::shared(driver);

    let store: Arc<dyn VariableStore> = Arc::new(MemStore::new());
    let control = Arc::new(ControlState::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let monitor = Monitor::new(
        Arc::clone(&store),
        Arc::clone(&control),
        Arc::clone(&actuator),
        MonitorConfig {
            poll_period: Duration::from_millis(config.control.poll_period_ms),
            debounce: Duration::from_millis(config.control.debounce_ms),
            duty_step_tenths: config.control.duty_step_tenths,
        },
    );
    let monitor_task = tokio::spawn(monitor.run(shutdown_rx.clone()));

    let router = create_router(GatewayState {
        store: Arc::clone(&store),
    })
    .layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    )
    .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "gateway listening");

    let mut server_shutdown = shutdown_rx.clone();
    let server_task = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.changed().await;
            })
            .into_future(),
    );

    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!(error = %e, "unable to listen for shutdown signal"),
    }

    // Ordered teardown: the monitor cancels and joins the sweep task, then
    // de-energizes the actuator; the server drains in parallel.
    let _ = shutdown_tx.send(true);
    if let Err(e) = monitor_task.await {
        error!(error = %e, "monitor task panicked");
    }
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "server exited with error"),
        Err(e) => error!(error = %e, "server task panicked"),
    }

    info!("feederd shutdown complete");
    Ok(())
}
