// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Reverse Proxy Operator for Kubernetes
//!
//! Exposes backends that live outside the cluster through the cluster's
//! ingress controller. Each `ReverseProxyEntry` names an external address,
//! a port and a hostname; the operator derives three child objects from it:
//!
//! - a selector-less `Service` named `rpe-<entry>`
//! - an `EndpointSlice` pointing that Service at the external address
//! - an `Ingress` routing the hostname to the Service
//!
//! Children carry an owner reference to their entry. A finalizer keeps the
//! entry around until the Service and Ingress have been deleted.
//!
//! ## Modules
//!
//! - [`crd`] - the `ReverseProxyEntry` custom resource
//! - [`child_resources`] - builders for the derived Service, `EndpointSlice` and Ingress
//! - [`reconcilers`] - the convergence engine and its cluster access seam
//! - [`controller`] - wiring of the engine into `kube::runtime::Controller`
//! - [`context`] - shared context and the per-invocation cancellation guard
//! - [`config`] - command-line and environment configuration
//! - [`http_server`] - metrics and probe endpoints
//!
//! ## Example
//!
//! ```rust,no_run
//! use reverse_proxy_operator::child_resources::build_service;
//! use reverse_proxy_operator::crd::{IngressSettings, ReverseProxyEntry, ReverseProxyEntrySpec, Target};
//!
//! let mut entry = ReverseProxyEntry::new(
//!     "grafana",
//!     ReverseProxyEntrySpec {
//!         target: Target {
//!             endpoints: vec!["192.168.10.20".to_string()],
//!             port: 3000,
//!         },
//!         ingress: IngressSettings {
//!             class_name: "nginx".to_string(),
//!             target_protocol: "http".to_string(),
//!             host: "grafana.example.com".to_string(),
//!             tls: false,
//!             secret_name: None,
//!             annotations: None,
//!         },
//!     },
//! );
//! entry.metadata.namespace = Some("monitoring".to_string());
//! entry.metadata.uid = Some("0c1e5d6a".to_string());
//!
//! let service = build_service(&entry, "rpe-").unwrap();
//! assert_eq!(service.metadata.name.as_deref(), Some("rpe-grafana"));
//! ```

pub mod child_resources;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod errors;
pub mod http_server;
pub mod labels;
pub mod metrics;
pub mod reconcilers;

#[cfg(test)]
mod testing;
