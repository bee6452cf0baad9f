// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label, annotation and finalizer constants.
//!
//! Keeps the keys stamped on child resources in one place so the builders,
//! the controller watch filters and the tests agree on them.

use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Label the EndpointSlice controller convention uses to bind a slice to its Service
pub const K8S_SERVICE_NAME: &str = "kubernetes.io/service-name";

// ============================================================================
// Label Values
// ============================================================================

/// Key of the application label carried by every child resource
pub const APP_LABEL: &str = "app";

/// Value of the application label carried by every child resource
pub const APP_REVERSE_PROXY: &str = "reverse-proxy";

/// Value for `app.kubernetes.io/managed-by` on child resources
pub const MANAGED_BY_REVERSE_PROXY_ENTRY: &str = "ReverseProxyEntry";

/// Label selector used to narrow the owned-resource watches
pub const CHILD_LABEL_SELECTOR: &str = "app=reverse-proxy";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `ReverseProxyEntry` resources
pub const FINALIZER_REVERSE_PROXY_ENTRY: &str = "app-scape.de/finalizer";

/// Labels shared by all three child resources.
#[must_use]
pub fn build_child_labels() -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(APP_LABEL.into(), APP_REVERSE_PROXY.into());
    labels.insert(K8S_MANAGED_BY.into(), MANAGED_BY_REVERSE_PROXY_ENTRY.into());
    labels
}
