// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP endpoints for Prometheus scraping and Kubernetes probes.
//!
//! - `/metrics` renders [`crate::metrics::gather_metrics`] in text format
//! - `/healthz` answers 200 while the process is alive
//! - `/readyz` answers 200 once the server is bound and the controller is running

use crate::constants::{HEALTHZ_PATH, METRICS_SERVER_PATH, READYZ_PATH};
use crate::metrics;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Readiness flags shared between `main` and the probe handlers.
#[derive(Debug, Default)]
pub struct HealthState {
    started: AtomicBool,
    controller_running: AtomicBool,
}

impl HealthState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_started(&self) {
        self.started.store(true, Ordering::SeqCst);
        info!("HTTP server marked as started");
    }

    pub fn set_controller_running(&self, running: bool) {
        self.controller_running.store(running, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.started.load(Ordering::SeqCst) && self.controller_running.load(Ordering::SeqCst)
    }
}

/// Routes served by the operator.
pub fn router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTHZ_PATH, get(healthz))
        .route(READYZ_PATH, get(readyz))
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` is cancelled.
///
/// The state is marked as started only after the listener is bound.
///
/// # Errors
///
/// Returns the bind or accept error.
pub async fn serve(
    addr: SocketAddr,
    state: Arc<HealthState>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening");

    state.mark_started();

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(body) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        debug!("Readiness probe: NOT READY");
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
#[path = "http_server_tests.rs"]
mod http_server_tests;
