//! Ouroboros learning service binary
//!
//! Runs the background apply and meta-evaluation loops until ctrl-c.

use std::sync::Arc;

use anyhow::Result;
use prometheus::Registry;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ouroboros_learning::{
    LearningRuntime, LearningServiceConfig, LearningTelemetry, LEARNING_VERSION,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Ouroboros learning service v{}", LEARNING_VERSION);

    // Load configuration
    let config = LearningServiceConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    // Register telemetry
    let registry = Registry::new();
    let telemetry = Arc::new(LearningTelemetry::new()?);
    telemetry.register(&registry)?;

    let runtime = Arc::new(LearningRuntime::from_config(&config, Some(telemetry))?);
    info!(
        agent_id = %runtime.agent().id(),
        strategy = %runtime.agent().current_strategy(),
        "Learning components initialized"
    );

    let handle = Arc::clone(&runtime).spawn();

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    handle.shutdown().await;

    let performance = runtime.agent().performance();
    info!(
        interactions = performance.total_interactions,
        quality = performance.average_response_quality,
        adaptations = runtime.agent().adaptation_history().len(),
        metric_families = registry.gather().len(),
        "Shutting down Ouroboros learning service"
    );
    Ok(())
}
