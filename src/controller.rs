// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Control loop driver for `ReverseProxyEntry` resources.
//!
//! Registers the convergence engine with [`kube::runtime::Controller`],
//! watching entries and the three child kinds they own. The runtime
//! serializes invocations per entry, coalesces bursts of events and
//! re-delivers on requeue; this module only maps engine results onto
//! controller actions, metrics and logs.

use crate::constants::CONTROLLER_NAME;
use crate::context::Context;
use crate::crd::{EntryKey, ReverseProxyEntry};
use crate::errors::ReconcileError;
use crate::http_server::HealthState;
use crate::labels::CHILD_LABEL_SELECTOR;
use crate::metrics;
use crate::reconcilers::reconcile_reverseproxyentry;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::discovery::v1::EndpointSlice;
use k8s_openapi::api::networking::v1::Ingress;
use kube::core::NamespaceResourceScope;
use kube::runtime::{controller::Action, watcher::Config, Controller};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + Debug + DeserializeOwned,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the `ReverseProxyEntry` controller until its watch streams end.
///
/// With `watch_namespace` set, entries and children are only watched in that
/// namespace; otherwise cluster-wide. `health` reports the controller as
/// running from the moment its watch streams are set up until they end.
pub async fn run_reverseproxyentry_controller(
    client: Client,
    ctx: Arc<Context>,
    watch_namespace: Option<String>,
    health: Arc<HealthState>,
) {
    info!(
        controller = CONTROLLER_NAME,
        namespace = watch_namespace.as_deref().unwrap_or("<all>"),
        "Starting ReverseProxyEntry controller"
    );

    let ns = watch_namespace.as_deref();
    let entries = scoped_api::<ReverseProxyEntry>(&client, ns);
    let services = scoped_api::<Service>(&client, ns);
    let endpoint_slices = scoped_api::<EndpointSlice>(&client, ns);
    let ingresses = scoped_api::<Ingress>(&client, ns);

    let child_watch = Config::default().labels(CHILD_LABEL_SELECTOR);

    let events = Controller::new(entries, Config::default())
        .owns(services, child_watch.clone())
        .owns(endpoint_slices, child_watch.clone())
        .owns(ingresses, child_watch)
        .run(reconcile_reverseproxyentry_wrapper, error_policy, ctx);

    health.set_controller_running(true);

    events
        .for_each(|result| {
            match result {
                Ok((obj, _action)) => debug!("Reconciled ReverseProxyEntry {}", obj),
                Err(e) => warn!("ReverseProxyEntry controller event failed: {}", e),
            }
            futures::future::ready(())
        })
        .await;

    health.set_controller_running(false);
}

/// Reconcile wrapper for `ReverseProxyEntry`
///
/// Builds the invocation guard, runs the engine and records metrics. Every
/// success waits for the next change: the finalizer patch and child creations
/// produce their own watch events.
///
/// # Errors
///
/// Returns the engine's [`ReconcileError`], or [`ReconcileError::MissingNamespace`]
/// if the delivered object has no namespace.
pub async fn reconcile_reverseproxyentry_wrapper(
    entry: Arc<ReverseProxyEntry>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();

    let Some(key) = EntryKey::from_entry(&entry) else {
        let err = ReconcileError::MissingNamespace {
            name: entry.name_any(),
        };
        metrics::record_reconciliation("error", start.elapsed());
        metrics::record_error(err.error_type());
        return Err(err);
    };

    debug!(entry = %key, "Reconcile wrapper called for ReverseProxyEntry");

    let inv = ctx.invocation();
    match reconcile_reverseproxyentry(&ctx, &key, &inv).await {
        Ok(outcome) => {
            ctx.retry.reset(&key.to_string());
            metrics::record_reconciliation(outcome.as_str(), start.elapsed());
            info!(
                entry = %key,
                outcome = outcome.as_str(),
                "Successfully reconciled ReverseProxyEntry"
            );
            Ok(Action::await_change())
        }
        Err(e) => {
            metrics::record_reconciliation("error", start.elapsed());
            metrics::record_error(e.error_type());
            Err(e)
        }
    }
}

/// Error policy for the `ReverseProxyEntry` controller
///
/// Retryable failures are requeued with per-entry exponential backoff.
/// Terminal failures are logged and wait for the entry to change.
pub fn error_policy(entry: Arc<ReverseProxyEntry>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    let key = format!(
        "{}/{}",
        entry.namespace().unwrap_or_default(),
        entry.name_any()
    );

    if err.is_retryable() {
        let delay = ctx.retry.record_failure(&key);
        let reason = requeue_reason(err);
        metrics::record_requeue(reason);
        warn!(
            entry = %key,
            error = %err,
            reason,
            attempt = ctx.retry.failures(&key),
            retry_in = ?delay,
            "Failed to reconcile ReverseProxyEntry, requeueing"
        );
        Action::requeue(delay)
    } else {
        error!(
            entry = %key,
            error = %err,
            error_type = err.error_type(),
            "Failed to reconcile ReverseProxyEntry; not retrying until the entry changes"
        );
        Action::await_change()
    }
}

/// Label for `requeues_total`: interrupted invocations first, then failures
/// expected to clear up on their own, then everything else.
fn requeue_reason(err: &ReconcileError) -> &'static str {
    if err.is_interrupted() {
        "cancelled"
    } else if err.is_transient() {
        "transient"
    } else {
        "error"
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
