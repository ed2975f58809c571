//! # thermotwind — thermostat twin daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialize logging and the metrics recorder
//! - Initialize the `SQLite` connection pool and run migrations
//! - Connect to the MQTT broker
//! - Construct application services, injecting adapters via port traits
//! - Start one ingestion task per inbound topic
//! - Bind to a TCP port and serve the HTTP API
//! - Handle graceful shutdown (SIGTERM/SIGINT) within a bounded grace period
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use thermotwin_adapter_http_axum::state::AppState;
use thermotwin_adapter_metrics_prometheus::PrometheusTelemetry;
use thermotwin_adapter_mqtt::MqttChannel;
use thermotwin_adapter_storage_sqlite_sqlx::{
    Config as DatabaseConfig, SqliteCurrentStateRepository, SqliteTargetStateRepository,
};
use thermotwin_app::ingest::{Processor, handler, middleware};
use thermotwin_app::ports::{NoopTelemetry, TwinTelemetry};
use thermotwin_app::reconciler::Reconciler;
use thermotwin_app::services::state_store::StateStore;
use thermotwin_app::services::twin_service::TwinService;

use crate::config::{Config, LogFormat, LoggingConfig};

/// Shutdown finished but some step failed along the way.
#[derive(Debug, thiserror::Error)]
#[error("shutdown completed with {0} error(s)")]
struct ShutdownError(usize);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging);

    // Metrics
    let metrics = if config.metrics.enabled {
        Some(thermotwin_adapter_metrics_prometheus::install()?)
    } else {
        None
    };
    let telemetry: Arc<dyn TwinTelemetry> = if metrics.is_some() {
        Arc::new(PrometheusTelemetry)
    } else {
        Arc::new(NoopTelemetry)
    };

    // Database
    let db = DatabaseConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .inspect_err(|err| tracing::error!(error = ?err, "unable to open the database"))?;
    let pool = db.pool().clone();

    // Device channel
    let channel = MqttChannel::connect(&config.mqtt)
        .await
        .inspect_err(|err| tracing::error!(error = %err, "unable to connect to the MQTT broker"))?;

    // Services
    let store = Arc::new(StateStore::new(
        SqliteTargetStateRepository::new(pool.clone()),
        SqliteCurrentStateRepository::new(pool),
        config.defaults,
        Arc::clone(&telemetry),
    ));
    let twin_service = Arc::new(TwinService::new(
        Arc::clone(&store),
        channel.clone(),
        config.mqtt.outbound_topic.clone(),
    ));

    // Ingestion
    let reconciler = Reconciler::new(config.fetch_failure_policy());
    let mut processor = Processor::new(channel.clone())
        .with_middleware(middleware::observe(Arc::clone(&telemetry)))
        .with_middleware(middleware::trace());
    for topic in &config.mqtt.inbound_topics {
        processor = processor.route(
            topic.clone(),
            handler::current_state(Arc::clone(&store), reconciler),
        );
    }
    processor.start().await?;

    // HTTP
    let mut state = AppState::new(twin_service, telemetry);
    if let Some(handle) = metrics {
        state = state.with_metrics(Arc::new(move || handle.render()));
    }
    let app = thermotwin_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "thermotwind listening");

    let grace = config.grace_period();
    let mut failures = serve(listener, app, grace).await;

    // Teardown, in reverse order of startup
    if let Err(err) = processor.stop(grace).await {
        tracing::error!(error = %err, "ingestion did not stop cleanly");
        failures += 1;
    }
    if let Err(err) = channel.disconnect().await {
        tracing::error!(error = %err, "unable to disconnect from the MQTT broker");
        failures += 1;
    }
    db.close().await;

    if failures > 0 {
        return Err(ShutdownError(failures).into());
    }
    tracing::info!("thermotwind stopped");
    Ok(())
}

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {:?}: {err}, falling back to info", config.filter);
        EnvFilter::new("info")
    });
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

/// Serve until a shutdown signal arrives or the server fails, then give
/// in-flight requests `grace` to finish. Returns the number of failures.
async fn serve(listener: tokio::net::TcpListener, app: axum::Router, grace: Duration) -> usize {
    let (signalled_tx, mut signalled_rx) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = signalled_tx.send(true);
    });
    let mut server = tokio::spawn(server.into_future());

    let finished = tokio::select! {
        biased;
        finished = &mut server => Some(finished),
        _ = signalled_rx.changed() => None,
    };
    let finished = match finished {
        Some(finished) => {
            tracing::error!("HTTP server stopped unexpectedly");
            finished
        }
        None => match tokio::time::timeout(grace, &mut server).await {
            Ok(finished) => finished,
            Err(_) => {
                tracing::warn!(grace_secs = grace.as_secs(), "abandoning in-flight HTTP requests");
                return 1;
            }
        },
    };

    match finished {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            tracing::error!(error = %err, "HTTP server failed");
            1
        }
        Err(err) => {
            tracing::error!(error = %err, "HTTP server task failed");
            1
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
