// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the `ReverseProxyEntry` controller.
//!
//! Every reconcile invocation receives an `Arc<Context>` holding:
//! - the [`EntryPlatform`] used for all cluster access
//! - engine settings (child prefix, finalizer name)
//! - the per-entry retry tracker
//! - the process shutdown token
//!
//! It also defines [`Invocation`], the cancellation and deadline guard that
//! wraps every platform call of a single reconcile.

use crate::constants::{DEFAULT_CHILD_PREFIX, DEFAULT_RECONCILE_TIMEOUT_SECS};
use crate::errors::PlatformError;
use crate::labels::FINALIZER_REVERSE_PROXY_ENTRY;
use crate::reconcilers::platform::EntryPlatform;
use crate::reconcilers::retry::RetryTracker;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Values the convergence engine reads but never changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    /// Prefix prepended to the entry name to derive child names
    pub child_prefix: String,
    /// Finalizer guarding entry deletion
    pub finalizer: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            child_prefix: DEFAULT_CHILD_PREFIX.to_string(),
            finalizer: FINALIZER_REVERSE_PROXY_ENTRY.to_string(),
        }
    }
}

/// Shared context passed to every reconcile invocation.
#[derive(Clone)]
pub struct Context {
    /// Cluster access
    pub platform: Arc<dyn EntryPlatform>,

    /// Engine configuration
    pub settings: EngineSettings,

    /// Consecutive failure counts per entry, drives requeue backoff
    pub retry: Arc<RetryTracker>,

    /// Cancelled on process shutdown; each invocation derives a child token
    pub shutdown: CancellationToken,

    /// Deadline applied to each invocation
    pub reconcile_timeout: Duration,
}

impl Context {
    #[must_use]
    pub fn new(
        platform: Arc<dyn EntryPlatform>,
        settings: EngineSettings,
        retry: RetryTracker,
        shutdown: CancellationToken,
        reconcile_timeout: Duration,
    ) -> Self {
        Self {
            platform,
            settings,
            retry: Arc::new(retry),
            shutdown,
            reconcile_timeout,
        }
    }

    /// Context with default settings around the given platform.
    #[cfg(test)]
    pub fn for_testing(platform: Arc<dyn EntryPlatform>) -> Self {
        Self::new(
            platform,
            EngineSettings::default(),
            RetryTracker::default(),
            CancellationToken::new(),
            Duration::from_secs(DEFAULT_RECONCILE_TIMEOUT_SECS),
        )
    }

    /// Starts the guard for one reconcile invocation.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation::new(self.shutdown.child_token(), self.reconcile_timeout)
    }
}

/// Cancellation and deadline scope of a single reconcile invocation.
///
/// All platform calls go through [`Invocation::run`]. Once the token is
/// cancelled or the deadline passes, in-flight calls are abandoned and no
/// new call is started.
#[derive(Clone, Debug)]
pub struct Invocation {
    cancel: CancellationToken,
    deadline: Instant,
}

impl Invocation {
    #[must_use]
    pub fn new(cancel: CancellationToken, timeout: Duration) -> Self {
        Self {
            cancel,
            deadline: Instant::now() + timeout,
        }
    }

    /// Fails if the invocation must not issue further calls.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Cancelled`] or [`PlatformError::DeadlineExceeded`].
    pub fn ensure_active(&self) -> Result<(), PlatformError> {
        if self.cancel.is_cancelled() {
            return Err(PlatformError::Cancelled);
        }
        if Instant::now() >= self.deadline {
            return Err(PlatformError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Starts one platform call under this invocation's cancellation and deadline.
    ///
    /// `call` is not invoked at all once the invocation is no longer active.
    ///
    /// # Errors
    ///
    /// Returns the call's own error, or [`PlatformError::Cancelled`] /
    /// [`PlatformError::DeadlineExceeded`] if the invocation ended first.
    pub async fn run<T, F, Fut>(&self, call: F) -> Result<T, PlatformError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, PlatformError>>,
    {
        self.ensure_active()?;
        let call = call();
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(PlatformError::Cancelled),
            () = tokio::time::sleep_until(self.deadline) => Err(PlatformError::DeadlineExceeded),
            result = call => result,
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
