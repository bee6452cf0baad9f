// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line and environment configuration for the operator binary.
//!
//! Every flag has an environment variable fallback so the operator can be
//! configured from a Deployment manifest without changing its arguments.

use crate::constants::{
    DEFAULT_CHILD_PREFIX, DEFAULT_ERROR_REQUEUE_INITIAL_MILLIS, DEFAULT_ERROR_REQUEUE_MAX_SECS,
    DEFAULT_HTTP_BIND_ADDRESS, DEFAULT_RECONCILE_TIMEOUT_SECS, MAX_CHILD_PREFIX_LEN,
};
use crate::context::EngineSettings;
use crate::labels::FINALIZER_REVERSE_PROXY_ENTRY;
use crate::reconcilers::retry::RequeueBackoff;
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines with ANSI colours
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Reverse proxy entry operator
#[derive(Parser, Debug, Clone)]
#[command(name = "rpe-operator", version, about)]
pub struct OperatorConfig {
    /// Prefix prepended to the entry name for derived Service, EndpointSlice and Ingress names
    #[arg(long, env = "RPE_CHILD_PREFIX", default_value = DEFAULT_CHILD_PREFIX)]
    pub child_prefix: String,

    /// Only watch this namespace (default: all namespaces)
    #[arg(long, env = "RPE_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Bind address of the metrics and health HTTP server
    #[arg(long, env = "RPE_HTTP_BIND_ADDRESS", default_value = DEFAULT_HTTP_BIND_ADDRESS)]
    pub http_bind_address: SocketAddr,

    /// Deadline for a single reconcile invocation, in seconds
    #[arg(long, env = "RPE_RECONCILE_TIMEOUT_SECS", default_value_t = DEFAULT_RECONCILE_TIMEOUT_SECS)]
    pub reconcile_timeout_secs: u64,

    /// Requeue delay after the first failed reconcile, in milliseconds
    #[arg(long, env = "RPE_ERROR_REQUEUE_INITIAL_MS", default_value_t = DEFAULT_ERROR_REQUEUE_INITIAL_MILLIS)]
    pub error_requeue_initial_ms: u64,

    /// Upper bound for the requeue delay, in seconds
    #[arg(long, env = "RPE_ERROR_REQUEUE_MAX_SECS", default_value_t = DEFAULT_ERROR_REQUEUE_MAX_SECS)]
    pub error_requeue_max_secs: u64,

    /// Log output format
    #[arg(long, env = "RUST_LOG_FORMAT", value_enum, ignore_case = true, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Invalid operator configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("child prefix must not be empty")]
    EmptyChildPrefix,

    #[error("child prefix '{prefix}' is longer than {max} characters")]
    ChildPrefixTooLong { prefix: String, max: usize },

    #[error("child prefix '{prefix}' must contain only lowercase letters, digits and '-', and start with a letter or digit")]
    InvalidChildPrefix { prefix: String },

    #[error("watch namespace must not be empty")]
    EmptyWatchNamespace,

    #[error("reconcile timeout must be at least one second")]
    ZeroReconcileTimeout,

    #[error("initial requeue delay must be greater than zero")]
    ZeroRequeueDelay,

    #[error("initial requeue delay {initial:?} exceeds the maximum {max:?}")]
    RequeueBoundsInverted { initial: Duration, max: Duration },
}

impl OperatorConfig {
    /// Checks values clap cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_child_prefix(&self.child_prefix)?;

        if self.watch_namespace.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::EmptyWatchNamespace);
        }
        if self.reconcile_timeout_secs == 0 {
            return Err(ConfigError::ZeroReconcileTimeout);
        }
        if self.error_requeue_initial_ms == 0 {
            return Err(ConfigError::ZeroRequeueDelay);
        }

        let backoff = self.requeue_backoff();
        if backoff.initial > backoff.max {
            return Err(ConfigError::RequeueBoundsInverted {
                initial: backoff.initial,
                max: backoff.max,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            child_prefix: self.child_prefix.clone(),
            finalizer: FINALIZER_REVERSE_PROXY_ENTRY.to_string(),
        }
    }

    #[must_use]
    pub fn requeue_backoff(&self) -> RequeueBackoff {
        RequeueBackoff::new(
            Duration::from_millis(self.error_requeue_initial_ms),
            Duration::from_secs(self.error_requeue_max_secs),
        )
    }

    #[must_use]
    pub fn reconcile_timeout(&self) -> Duration {
        Duration::from_secs(self.reconcile_timeout_secs)
    }
}

/// A prefix must keep derived names valid DNS-1123 labels.
fn validate_child_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.is_empty() {
        return Err(ConfigError::EmptyChildPrefix);
    }
    if prefix.len() > MAX_CHILD_PREFIX_LEN {
        return Err(ConfigError::ChildPrefixTooLong {
            prefix: prefix.to_string(),
            max: MAX_CHILD_PREFIX_LEN,
        });
    }

    let valid_chars = prefix
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_start = prefix
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !valid_chars || !valid_start {
        return Err(ConfigError::InvalidChildPrefix {
            prefix: prefix.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
