// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `ReverseProxyEntry` reconciliation logic.
//!
//! Each invocation re-reads the entry and walks one of two paths:
//!
//! - **Active** (no deletion timestamp): make sure the finalizer is present,
//!   then create every missing child resource. Existing children are left
//!   untouched.
//! - **Terminating**: delete the Service and the Ingress, then release the
//!   finalizer. The `EndpointSlice` goes away through owner garbage collection
//!   once the entry is removed.
//!
//! Every child is handled independently: one failing child never prevents the
//! others from being checked, and all failures are reported together.

use crate::child_resources::{child_name, validate_entry, ChildKind, ChildObject};
use crate::context::{Context, Invocation};
use crate::crd::{EntryKey, ReverseProxyEntry};
use crate::errors::{PlatformError, ReconcileError};
use crate::metrics;
use crate::reconcilers::finalizers::{finalizers_with, finalizers_without};
use kube::ResourceExt;
use tracing::{debug, error, info, warn};

/// What a successful invocation did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The entry no longer exists; nothing to do
    EntryNotFound,
    /// The finalizer was added; children are handled on the next invocation
    FinalizerAdded,
    /// All children exist; `created` lists the kinds created by this invocation
    Converged { created: Vec<ChildKind> },
    /// The entry is terminating and the finalizer is already gone
    AlreadyFinalized,
    /// Cleanup finished and the finalizer was removed
    Finalized { deleted: Vec<ChildKind> },
}

impl ReconcileOutcome {
    /// Label value used for the reconciliation metrics.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntryNotFound => "entry_not_found",
            Self::FinalizerAdded => "finalizer_added",
            Self::Converged { .. } => "converged",
            Self::AlreadyFinalized => "already_finalized",
            Self::Finalized { .. } => "finalized",
        }
    }
}

/// Reconciles one `ReverseProxyEntry` identified by `key`.
///
/// # Errors
///
/// Returns a retryable [`ReconcileError`] for platform failures (the
/// finalizer is never released while cleanup is incomplete), and a terminal
/// [`ReconcileError::InvalidEntry`] when the entry cannot produce valid
/// children.
pub async fn reconcile_reverseproxyentry(
    ctx: &Context,
    key: &EntryKey,
    inv: &Invocation,
) -> Result<ReconcileOutcome, ReconcileError> {
    let fetched = inv
        .run(|| ctx.platform.get_entry(key))
        .await
        .map_err(|source| ReconcileError::Entry {
            action: "get",
            key: key.to_string(),
            source,
        })?;

    let Some(entry) = fetched else {
        debug!(entry = %key, "ReverseProxyEntry not found, nothing to reconcile");
        return Ok(ReconcileOutcome::EntryNotFound);
    };

    if entry.is_terminating() {
        finalize_entry(ctx, key, &entry, inv).await
    } else {
        converge_entry(ctx, key, &entry, inv).await
    }
}

async fn converge_entry(
    ctx: &Context,
    key: &EntryKey,
    entry: &ReverseProxyEntry,
    inv: &Invocation,
) -> Result<ReconcileOutcome, ReconcileError> {
    let finalizer = ctx.settings.finalizer.as_str();

    if !entry.has_finalizer(finalizer) {
        let desired = finalizers_with(entry.finalizers(), finalizer);
        return match inv
            .run(|| ctx.platform.patch_entry_finalizers(entry, desired))
            .await
        {
            Ok(()) => {
                info!(entry = %key, finalizer, "Added finalizer to ReverseProxyEntry");
                metrics::record_finalizer_operation("add");
                Ok(ReconcileOutcome::FinalizerAdded)
            }
            Err(e) if e.is_not_found() => Ok(ReconcileOutcome::EntryNotFound),
            Err(source) => Err(ReconcileError::Entry {
                action: "add finalizer to",
                key: key.to_string(),
                source,
            }),
        };
    }

    if let Err(source) = validate_entry(entry) {
        error!(
            entry = %key,
            error = %source,
            "ReverseProxyEntry cannot produce child resources; waiting for the entry to change"
        );
        return Err(ReconcileError::InvalidEntry {
            key: key.to_string(),
            source,
        });
    }

    let mut created = Vec::new();
    let mut failures = Vec::new();
    for kind in ChildKind::ALL {
        match ensure_child(ctx, key, entry, kind, inv).await {
            Ok(true) => created.push(kind),
            Ok(false) => {}
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                warn!(entry = %key, kind = %kind, error = %e, "Child resource not converged");
                failures.push(e);
            }
        }
    }

    if !failures.is_empty() {
        return Err(ReconcileError::Convergence {
            key: key.to_string(),
            failures,
        });
    }

    if created.is_empty() {
        debug!(entry = %key, "All child resources already exist");
    }
    Ok(ReconcileOutcome::Converged { created })
}

/// Creates the child of `kind` if it is absent. Returns `true` if this call created it.
async fn ensure_child(
    ctx: &Context,
    key: &EntryKey,
    entry: &ReverseProxyEntry,
    kind: ChildKind,
    inv: &Invocation,
) -> Result<bool, ReconcileError> {
    let name = child_name(&ctx.settings.child_prefix, &key.name);
    let child_err =
        |action: &'static str, source: PlatformError| child_error(kind, key, &name, action, source);

    let existing = inv
        .run(|| ctx.platform.get_child(kind, &key.namespace, &name))
        .await
        .map_err(|source| child_err("get", source))?;

    if existing.is_some() {
        debug!(entry = %key, kind = %kind, name = %name, "Child resource exists");
        return Ok(false);
    }

    let child = ChildObject::build(kind, entry, &ctx.settings.child_prefix).map_err(|source| {
        ReconcileError::InvalidEntry {
            key: key.to_string(),
            source,
        }
    })?;

    match inv.run(|| ctx.platform.create_child(&child)).await {
        Ok(()) => {
            info!(entry = %key, kind = %kind, name = %name, "Created child resource");
            metrics::record_child_created(kind.as_str());
            Ok(true)
        }
        Err(e) if e.is_already_exists() => {
            debug!(entry = %key, kind = %kind, name = %name, "Child resource created concurrently");
            Ok(false)
        }
        Err(source) => Err(child_err("create", source)),
    }
}

async fn finalize_entry(
    ctx: &Context,
    key: &EntryKey,
    entry: &ReverseProxyEntry,
    inv: &Invocation,
) -> Result<ReconcileOutcome, ReconcileError> {
    let finalizer = ctx.settings.finalizer.as_str();

    if !entry.has_finalizer(finalizer) {
        debug!(entry = %key, "ReverseProxyEntry terminating without our finalizer");
        return Ok(ReconcileOutcome::AlreadyFinalized);
    }

    info!(entry = %key, "Cleaning up child resources of deleted ReverseProxyEntry");

    let mut deleted = Vec::new();
    let mut failures = Vec::new();
    for kind in ChildKind::CLEANUP {
        match remove_child(ctx, key, kind, inv).await {
            Ok(true) => deleted.push(kind),
            Ok(false) => {}
            Err(e) => {
                warn!(entry = %key, kind = %kind, error = %e, "Child resource cleanup failed");
                failures.push(e);
            }
        }
    }

    if !failures.is_empty() {
        return Err(ReconcileError::Cleanup {
            key: key.to_string(),
            failures,
        });
    }

    let remaining = finalizers_without(entry.finalizers(), finalizer);
    match inv
        .run(|| ctx.platform.patch_entry_finalizers(entry, remaining))
        .await
    {
        Ok(()) => {
            info!(entry = %key, finalizer, "Removed finalizer from ReverseProxyEntry");
            metrics::record_finalizer_operation("remove");
            Ok(ReconcileOutcome::Finalized { deleted })
        }
        Err(e) if e.is_not_found() => Ok(ReconcileOutcome::Finalized { deleted }),
        Err(source) => Err(ReconcileError::Entry {
            action: "remove finalizer from",
            key: key.to_string(),
            source,
        }),
    }
}

/// Deletes the child of `kind` if present. Returns `true` if this call deleted it.
async fn remove_child(
    ctx: &Context,
    key: &EntryKey,
    kind: ChildKind,
    inv: &Invocation,
) -> Result<bool, ReconcileError> {
    let name = child_name(&ctx.settings.child_prefix, &key.name);
    let child_err =
        |action: &'static str, source: PlatformError| child_error(kind, key, &name, action, source);

    let existing = inv
        .run(|| ctx.platform.get_child(kind, &key.namespace, &name))
        .await
        .map_err(|source| child_err("get", source))?;

    let Some(meta) = existing else {
        debug!(entry = %key, kind = %kind, name = %name, "Child resource already absent");
        return Ok(false);
    };

    match inv.run(|| ctx.platform.delete_child(kind, &meta)).await {
        Ok(()) => {
            info!(entry = %key, kind = %kind, name = %name, "Deleted child resource");
            metrics::record_child_deleted(kind.as_str());
            Ok(true)
        }
        Err(e) if e.is_not_found() => Ok(false),
        Err(source) => Err(child_err("delete", source)),
    }
}

fn child_error(
    kind: ChildKind,
    key: &EntryKey,
    name: &str,
    action: &'static str,
    source: PlatformError,
) -> ReconcileError {
    ReconcileError::Child {
        kind,
        namespace: key.namespace.clone(),
        name: name.to_string(),
        action,
        source,
    }
}

#[cfg(test)]
#[path = "reverseproxyentry_tests.rs"]
mod reverseproxyentry_tests;
