// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use clap::Parser;
use kube::Client;
use reverse_proxy_operator::{
    config::{LogFormat, OperatorConfig},
    constants::{TOKIO_THREAD_NAME, TOKIO_WORKER_THREADS},
    context::Context,
    controller::run_reverseproxyentry_controller,
    http_server::{self, HealthState},
    reconcilers::{retry::RetryTracker, KubePlatform},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    let config = OperatorConfig::parse();
    config.validate()?;

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name(TOKIO_THREAD_NAME)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

fn init_logging(format: LogFormat) {
    // Respects RUST_LOG if set, otherwise defaults to INFO level
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(config: OperatorConfig) -> Result<()> {
    init_logging(config.log_format);

    info!("Starting ReverseProxyEntry operator");
    debug!(?config, "Operator configuration loaded");

    let client = Client::try_default()
        .await
        .context("failed to initialize Kubernetes client")?;
    debug!("Kubernetes client initialized successfully");

    let shutdown = CancellationToken::new();
    let ctx = Arc::new(Context::new(
        Arc::new(KubePlatform::new(client.clone())),
        config.engine_settings(),
        RetryTracker::new(config.requeue_backoff()),
        shutdown.clone(),
        config.reconcile_timeout(),
    ));

    let health = Arc::new(HealthState::new());
    let mut server = tokio::spawn(http_server::serve(
        config.http_bind_address,
        health.clone(),
        shutdown.clone(),
    ));

    // Neither the controller nor the HTTP server should exit on their own
    let mut server_stopped = false;
    let result = tokio::select! {
        () = run_reverseproxyentry_controller(client, ctx, config.watch_namespace.clone(), health.clone()) => {
            error!("CRITICAL: ReverseProxyEntry controller exited unexpectedly");
            Err(anyhow::anyhow!("ReverseProxyEntry controller exited unexpectedly"))
        }
        joined = &mut server => {
            server_stopped = true;
            error!("CRITICAL: HTTP server exited unexpectedly: {:?}", joined);
            joined??;
            Err(anyhow::anyhow!("HTTP server exited unexpectedly without error"))
        }
        signal = shutdown_signal() => {
            signal?;
            info!("Shutdown signal received, stopping controller");
            Ok(())
        }
    };

    health.set_controller_running(false);
    shutdown.cancel();

    if !server_stopped {
        match server.await {
            Ok(Ok(())) => debug!("HTTP server stopped"),
            Ok(Err(e)) => error!(error = %e, "HTTP server failed"),
            Err(e) => error!(error = %e, "HTTP server task panicked"),
        }
    }

    result
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for SIGINT")?,
        _ = sigterm.recv() => {}
    }
    Ok(())
}
