// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the reverse proxy operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group for the `ReverseProxyEntry` CRD
pub const API_GROUP: &str = "reverse-proxy.app-scape.de";

/// API version for the `ReverseProxyEntry` CRD
pub const API_VERSION: &str = "v1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "reverse-proxy.app-scape.de/v1";

/// Kind name for `ReverseProxyEntry` resource
pub const KIND_REVERSE_PROXY_ENTRY: &str = "ReverseProxyEntry";

// ============================================================================
// Child Resource Constants
// ============================================================================

/// Default prefix prepended to the entry name to derive child resource names
pub const DEFAULT_CHILD_PREFIX: &str = "rpe-";

/// Longest prefix accepted by the configuration layer.
///
/// Child names must stay valid DNS-1123 labels (63 chars) for typical entry names.
pub const MAX_CHILD_PREFIX_LEN: usize = 20;

/// Default ingress class when the entry does not specify one
pub const DEFAULT_INGRESS_CLASS: &str = "nginx";

/// Default advisory backend protocol
pub const DEFAULT_TARGET_PROTOCOL: &str = "http";

/// Protocol used for the Service port and the `EndpointSlice` port
pub const PROTOCOL_TCP: &str = "TCP";

/// Service type for the derived Service (cluster-internal routing)
pub const SERVICE_TYPE_CLUSTER_IP: &str = "ClusterIP";

/// Address type of the derived `EndpointSlice`
pub const ADDRESS_TYPE_IPV4: &str = "IPv4";

/// Path routed by the derived Ingress rule
pub const INGRESS_ROOT_PATH: &str = "/";

/// Path match type of the derived Ingress rule
pub const INGRESS_PATH_TYPE_PREFIX: &str = "Prefix";

/// Lowest valid backend port
pub const MIN_TARGET_PORT: i32 = 1;

/// Highest valid backend port
pub const MAX_TARGET_PORT: i32 = 65_535;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Deadline for a single reconcile invocation (30 seconds)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 30;

/// First requeue delay after a retryable reconcile failure (500ms)
pub const DEFAULT_ERROR_REQUEUE_INITIAL_MILLIS: u64 = 500;

/// Upper bound for the requeue delay after repeated failures (5 minutes)
pub const DEFAULT_ERROR_REQUEUE_MAX_SECS: u64 = 300;

/// Backoff multiplier (exponential growth factor)
pub const ERROR_REQUEUE_MULTIPLIER: u32 = 2;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Thread name for Tokio worker threads
pub const TOKIO_THREAD_NAME: &str = "rpe-controller";

/// Name used for the controller in logs
pub const CONTROLLER_NAME: &str = "reverseproxyentry";

// ============================================================================
// HTTP Server Constants
// ============================================================================

/// Bind address for the metrics and health HTTP server
pub const DEFAULT_HTTP_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness probe
pub const HEALTHZ_PATH: &str = "/healthz";

/// Path for the readiness probe
pub const READYZ_PATH: &str = "/readyz";
