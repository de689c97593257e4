use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use revive_api::{app, worker, AppState, AuthConfig, Repositories};
use revive_store::{BroadcastPublisher, Config, DbClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "revive_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Revive API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let events = Arc::new(BroadcastPublisher::new(256));
    let rules = &config.business_rules;
    let app_state = AppState::new(
        Repositories::postgres(&db),
        events.clone(),
        rules,
        AuthConfig { secret: config.auth.jwt_secret.clone() },
    );

    tokio::spawn(worker::start_event_logger(events.subscribe()));
    tokio::spawn(worker::start_trust_outbox_worker(
        app_state.outbox_relay.clone(),
        Duration::from_secs(rules.trust_outbox_poll_seconds),
    ));
    tokio::spawn(worker::start_warehouse_reconciler(
        app_state.warehouse.clone(),
        Duration::from_secs(rules.reconcile_interval_seconds),
    ));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
