use anyhow::{Context, Result};
use ember::api::{create_router, ApiState};
use ember::bus::{EventPublisher, NatsClient, ToolServer};
use ember::commands::ToolDispatcher;
use ember::config::EmberConfig;
use ember::engine::WorldEngine;
use ember::routing::RouteService;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ember=info".into()),
        )
        .init();

    info!("Ember starting...");

    let config = Arc::new(EmberConfig::load().context("Failed to load configuration")?);
    info!(
        tick_hz = config.simulation.tick_hz,
        batch_hz = config.simulation.batch_hz,
        stationary_hz = config.simulation.stationary_hz,
        routing_enabled = config.routing.enabled,
        osrm_url = %config.routing.osrm_url,
        locations = config.locations.len(),
        "Configuration loaded"
    );

    let routes = Arc::new(
        RouteService::from_config(&config.routing).context("Failed to initialize routing")?,
    );

    let (engine, handle) = WorldEngine::new(Arc::clone(&config), routes);
    let engine_task = tokio::spawn(engine.run());

    // Message bus is optional; the world keeps running without it
    let mut bus_tasks = Vec::new();
    if config.nats.enabled {
        match NatsClient::connect(config.nats.clone()).await {
            Ok(nats) => {
                let publisher =
                    EventPublisher::new(nats.client().clone(), config.nats.event_prefix.clone());
                bus_tasks.push(tokio::spawn(publisher.run(handle.subscribe())));

                let server = ToolServer::new(
                    nats.client().clone(),
                    config.nats.tools_subject.clone(),
                    ToolDispatcher::new(handle.clone()),
                );
                bus_tasks.push(tokio::spawn(async move {
                    if let Err(e) = server.run().await {
                        error!(error = %format!("{:#}", e), "Tool server error");
                    }
                }));
                info!(tools_subject = %config.nats.tools_subject, "NATS adapter started");
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "NATS unavailable, running without message bus");
            }
        }
    }

    let server_handle = if config.api.enabled {
        let router = create_router(Arc::new(ApiState::new(handle.clone())));
        let listener = tokio::net::TcpListener::bind(&config.api.bind)
            .await
            .with_context(|| format!("Failed to bind API address '{}'", config.api.bind))?;
        info!(bind = %config.api.bind, "HTTP API listening");

        Some(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "HTTP API server error");
            }
        }))
    } else {
        None
    };

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    if let Some(server) = server_handle {
        server.abort();
    }
    for task in bus_tasks {
        task.abort();
    }
    engine_task.abort();
    info!("Ember stopped");

    Ok(())
}
