// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation logic for `ReverseProxyEntry` resources.
//!
//! # Reconciliation Architecture
//!
//! Each invocation reads the latest entry and takes one of two paths:
//!
//! 1. **Active** - ensure the finalizer is present, then create each missing
//!    child (Service, `EndpointSlice`, Ingress). Existing children are left as they are.
//! 2. **Terminating** - delete the Service and the Ingress, then remove the
//!    finalizer. The `EndpointSlice` is left to owner-reference garbage collection.
//!
//! All cluster access goes through the [`EntryPlatform`] trait so the engine
//! can be exercised without an API server.
//!
//! # Example: Running one reconcile
//!
//! ```rust,no_run
//! use reverse_proxy_operator::context::Context;
//! use reverse_proxy_operator::crd::EntryKey;
//! use reverse_proxy_operator::reconcilers::reconcile_reverseproxyentry;
//!
//! async fn reconcile_once(ctx: &Context) {
//!     let key = EntryKey::new("monitoring", "grafana");
//!     let inv = ctx.invocation();
//!     match reconcile_reverseproxyentry(ctx, &key, &inv).await {
//!         Ok(outcome) => println!("{key}: {}", outcome.as_str()),
//!         Err(e) => eprintln!("{key}: {e}"),
//!     }
//! }
//! ```

pub mod finalizers;
pub mod platform;
pub mod retry;
pub mod reverseproxyentry;

pub use platform::{EntryPlatform, KubePlatform};
pub use reverseproxyentry::{reconcile_reverseproxyentry, ReconcileOutcome};
