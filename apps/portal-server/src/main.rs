//! # News Portal Server
//!
//! Serves the JSON API, consumes queued notification jobs and runs the
//! weekly digest.

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_actix_web::TracingLogger;

mod alert;
mod background;
mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use alert::{AdminMailer, AlertReceiver};
use config::{AppConfig, NotificationMode, QueueBackend};
use state::AppState;
use telemetry::TelemetryConfig;

#[derive(Parser)]
#[command(name = "portal-server")]
#[command(author, version, about = "News portal API server and background worker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve {
        /// Do not consume queued jobs in this process
        #[arg(long, env = "NO_WORKER")]
        no_worker: bool,
    },
    /// Consume queued notification jobs without serving HTTP
    Worker,
    /// Send the weekly digest once and exit
    SendDigest,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let telemetry = TelemetryConfig::from_env();
    let alerts = telemetry::init_telemetry(&telemetry);

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    let state = AppState::new(&config).await;

    if let Some(alerts) = alerts {
        start_admin_mail(&state, &config, &telemetry, alerts);
    }

    match cli.command.unwrap_or(Command::Serve { no_worker: false }) {
        Command::Serve { no_worker } => serve(config, state, !no_worker).await,
        Command::Worker => worker(config, state).await,
        Command::SendDigest => send_digest(state).await,
    }
}

fn start_admin_mail(
    state: &AppState,
    config: &AppConfig,
    telemetry: &TelemetryConfig,
    alerts: AlertReceiver,
) {
    AdminMailer::new(
        state.mail.clone(),
        config.mail.from.clone(),
        config.mail.admins.clone(),
        telemetry.service_name.clone(),
    )
    .spawn(alerts);
}

async fn serve(config: AppConfig, state: AppState, run_worker: bool) -> anyhow::Result<()> {
    tracing::info!(host = %config.host, port = config.port, "Starting news portal server");

    if run_worker {
        start_worker(&state).await?;
    } else if config.notification_mode == NotificationMode::Queued
        && config.jobs.backend == QueueBackend::Memory
    {
        tracing::warn!("In-memory job queue without a worker: notifications will not be sent");
    }

    #[cfg(feature = "scheduler")]
    let mut scheduler =
        background::scheduler::start_digest_scheduler(&config.digest, state.digest.clone())
            .await
            .context("failed to start the digest scheduler")?;

    #[cfg(feature = "rate-limit")]
    let limiter = {
        let limiter = std::sync::Arc::new(
            portal_infra::KeyedRateLimiter::new(config.rate_limit.clone())
                .context("invalid rate limit settings")?,
        );
        spawn_limiter_pruning(limiter.clone(), config.rate_limit.window);
        limiter
    };

    let server_state = state.clone();
    let result = HttpServer::new(move || {
        let app = App::new();
        #[cfg(feature = "rate-limit")]
        let app = app.wrap(middleware::rate_limit::RateLimitMiddleware::new(
            limiter.clone(),
        ));
        app.wrap(TracingLogger::default())
            .app_data(web::Data::new(server_state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await;

    #[cfg(feature = "scheduler")]
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler did not stop cleanly");
    }

    result.context("HTTP server failed")
}

async fn worker(config: AppConfig, state: AppState) -> anyhow::Result<()> {
    if config.jobs.backend == QueueBackend::Memory {
        anyhow::bail!("the worker command needs a shared queue; set JOB_QUEUE_BACKEND=redis");
    }

    start_worker(&state).await?;

    #[cfg(feature = "scheduler")]
    let mut scheduler =
        background::scheduler::start_digest_scheduler(&config.digest, state.digest.clone())
            .await
            .context("failed to start the digest scheduler")?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    #[cfg(feature = "scheduler")]
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler did not stop cleanly");
    }
    Ok(())
}

async fn send_digest(state: AppState) -> anyhow::Result<()> {
    let report = state.digest.run().await;

    println!(
        "Digest sent: {} categories, {} messages, {} failures",
        report.categories, report.sent, report.failed
    );
    Ok(())
}

async fn start_worker(state: &AppState) -> anyhow::Result<()> {
    state
        .queue
        .start_worker(background::worker::job_router(state.dispatcher.clone()))
        .await
        .context("failed to start job workers")
}

#[cfg(feature = "rate-limit")]
fn spawn_limiter_pruning(
    limiter: std::sync::Arc<portal_infra::KeyedRateLimiter>,
    every: std::time::Duration,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(std::time::Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            limiter.prune();
        }
    });
}
