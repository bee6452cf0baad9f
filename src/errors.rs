// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the reverse proxy operator.
//!
//! This module provides three layers of errors:
//! - [`PlatformError`]: a single Kubernetes API call failed
//! - [`InvalidEntry`]: a `ReverseProxyEntry` cannot be turned into child resources
//! - [`ReconcileError`]: what a reconcile invocation reports back to the controller
//!
//! Only [`ReconcileError::InvalidEntry`] and [`ReconcileError::MissingNamespace`]
//! are terminal. Everything else is retried with backoff.

use crate::child_resources::ChildKind;
use crate::reconcilers::retry::is_transient_status;
use thiserror::Error;

/// Failure of a single call against the Kubernetes API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// Object does not exist (HTTP 404)
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Object with the same name already exists (HTTP 409, reason `AlreadyExists`)
    #[error("already exists: {message}")]
    AlreadyExists { message: String },

    /// Stale `resourceVersion` or failed precondition (HTTP 409)
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Any other rejection by the API server
    #[error("API error {code} ({reason}): {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Kubernetes status reason
        reason: String,
        /// Message returned by the API server
        message: String,
    },

    /// The request never produced an API response
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The invocation was cancelled before the call completed
    #[error("operation cancelled")]
    Cancelled,

    /// The invocation deadline passed before the call completed
    #[error("reconcile deadline exceeded")]
    DeadlineExceeded,
}

impl PlatformError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns true if the failure is expected to clear up on its own
    /// (rate limiting, server errors, network trouble, lost races).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api { code, .. } => is_transient_status(*code),
            Self::Conflict { .. }
            | Self::Transport { .. }
            | Self::Cancelled
            | Self::DeadlineExceeded => true,
            Self::NotFound { .. } | Self::AlreadyExists { .. } => false,
        }
    }

    /// Label value used for the `error_type` metric.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::Conflict { .. } => "conflict",
            Self::Api { code, .. } if is_transient_status(*code) => "transient",
            Self::Api { .. } => "api_rejected",
            Self::Transport { .. } => "transport",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl From<kube::Error> for PlatformError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 404 => Self::NotFound {
                message: ae.message,
            },
            kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
                Self::AlreadyExists {
                    message: ae.message,
                }
            }
            kube::Error::Api(ae) if ae.code == 409 => Self::Conflict {
                message: ae.message,
            },
            kube::Error::Api(ae) => Self::Api {
                code: ae.code,
                reason: ae.reason,
                message: ae.message,
            },
            other => Self::Transport {
                message: other.to_string(),
            },
        }
    }
}

/// A `ReverseProxyEntry` that cannot produce well-formed child resources.
///
/// The schema layer normally rejects these before they reach the operator.
/// Seeing one means the CRD schema and the operator disagree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidEntry {
    #[error("spec.target.endpoints must contain at least one address")]
    MissingEndpoints,

    #[error("spec.target.endpoints[0] '{address}' is not an IPv4 address")]
    InvalidEndpoint { address: String },

    #[error("spec.target.port {port} is outside 1-65535")]
    InvalidPort { port: i32 },

    #[error("spec.ingress.host must not be empty")]
    EmptyHost,

    #[error("entry has no {field}, cannot build an owner reference")]
    MissingIdentity { field: &'static str },
}

/// Error returned by a reconcile invocation.
#[derive(Error, Debug, Clone)]
pub enum ReconcileError {
    /// Reading or patching the entry itself failed
    #[error("failed to {action} entry {key}: {source}")]
    Entry {
        action: &'static str,
        key: String,
        #[source]
        source: PlatformError,
    },

    /// A single child resource operation failed
    #[error("failed to {action} {kind} {namespace}/{name}: {source}")]
    Child {
        kind: ChildKind,
        namespace: String,
        name: String,
        action: &'static str,
        #[source]
        source: PlatformError,
    },

    /// One or more child resources could not be brought into existence
    #[error("entry {key} did not converge: {}", join_failures(.failures))]
    Convergence {
        key: String,
        failures: Vec<ReconcileError>,
    },

    /// One or more child resources could not be removed; the finalizer is kept
    #[error("cleanup of entry {key} incomplete, finalizer kept: {}", join_failures(.failures))]
    Cleanup {
        key: String,
        failures: Vec<ReconcileError>,
    },

    /// The entry content cannot produce child resources
    #[error("entry {key} is invalid: {source}")]
    InvalidEntry {
        key: String,
        #[source]
        source: InvalidEntry,
    },

    /// The controller handed over an entry without a namespace
    #[error("entry {name} has no namespace")]
    MissingNamespace { name: String },
}

fn join_failures(failures: &[ReconcileError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ReconcileError {
    /// Returns true if the controller should requeue the entry with backoff.
    ///
    /// Configuration defects are terminal: retrying them cannot succeed until
    /// the entry changes, and a change triggers a fresh reconcile anyway.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidEntry { .. } | Self::MissingNamespace { .. }
        )
    }

    /// Label value used for the `errors_total` metric.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Entry { source, .. } | Self::Child { source, .. } => source.error_type(),
            Self::Convergence { .. } => "convergence",
            Self::Cleanup { .. } => "cleanup",
            Self::InvalidEntry { .. } => "invalid_entry",
            Self::MissingNamespace { .. } => "missing_namespace",
        }
    }

    /// Returns true if every underlying platform failure is expected to clear up
    /// on its own. Aggregates are transient only if all their parts are.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Entry { source, .. } | Self::Child { source, .. } => source.is_transient(),
            Self::Convergence { failures, .. } | Self::Cleanup { failures, .. } => {
                !failures.is_empty() && failures.iter().all(Self::is_transient)
            }
            Self::InvalidEntry { .. } | Self::MissingNamespace { .. } => false,
        }
    }

    /// Returns true if the invocation stopped because it was cancelled or ran out of time.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Entry { source, .. } | Self::Child { source, .. } => matches!(
                source,
                PlatformError::Cancelled | PlatformError::DeadlineExceeded
            ),
            Self::Convergence { failures, .. } | Self::Cleanup { failures, .. } => {
                failures.iter().any(Self::is_interrupted)
            }
            Self::InvalidEntry { .. } | Self::MissingNamespace { .. } => false,
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
