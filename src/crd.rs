// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for reverse proxy entries.
//!
//! A [`ReverseProxyEntry`] declares an external backend (IPv4 endpoints and a
//! port) and how it should be exposed through the cluster ingress. The
//! operator derives a `Service`, an `EndpointSlice` and an `Ingress` from it.
//!
//! # Example
//!
//! ```rust,no_run
//! use reverse_proxy_operator::crd::{IngressSettings, ReverseProxyEntrySpec, Target};
//!
//! let spec = ReverseProxyEntrySpec {
//!     target: Target {
//!         endpoints: vec!["10.0.0.5".to_string()],
//!         port: 8443,
//!     },
//!     ingress: IngressSettings {
//!         class_name: "nginx".to_string(),
//!         target_protocol: "https".to_string(),
//!         host: "checkout.example.com".to_string(),
//!         tls: true,
//!         secret_name: None,
//!         annotations: None,
//!     },
//! };
//! ```

use crate::constants::{DEFAULT_INGRESS_CLASS, DEFAULT_TARGET_PROTOCOL};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Backend the entry points at.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// IPv4 addresses of the backend.
    ///
    /// Only the first address is used for the derived `EndpointSlice`.
    #[schemars(length(min = 1))]
    pub endpoints: Vec<String>,

    /// Backend port. Used for the Service port, its target port and the
    /// `EndpointSlice` port.
    #[schemars(range(min = 1, max = 65_535))]
    pub port: i32,
}

/// Public exposure of the backend.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngressSettings {
    /// Ingress class for the derived Ingress.
    #[serde(default = "default_class_name")]
    pub class_name: String,

    /// Protocol spoken by the backend. Advisory; the derived resources do not use it.
    #[serde(default = "default_target_protocol")]
    pub target_protocol: String,

    /// Externally routable hostname.
    pub host: String,

    /// Whether TLS is requested.
    ///
    /// The derived Ingress always carries a TLS block regardless of this flag.
    #[serde(default)]
    pub tls: bool,

    /// Name of a TLS secret. Not used by the derived Ingress, which always
    /// references a secret named after the child resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,

    /// Annotations copied verbatim onto the derived Ingress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, String>>,
}

fn default_class_name() -> String {
    DEFAULT_INGRESS_CLASS.to_string()
}

fn default_target_protocol() -> String {
    DEFAULT_TARGET_PROTOCOL.to_string()
}

/// `ReverseProxyEntry` spec.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[kube(
    group = "reverse-proxy.app-scape.de",
    version = "v1",
    kind = "ReverseProxyEntry",
    plural = "reverseproxyentries",
    shortname = "rpe",
    namespaced,
    doc = "ReverseProxyEntry exposes an external backend through a cluster Service, EndpointSlice and Ingress."
)]
#[kube(status = "ReverseProxyEntryStatus")]
#[kube(printcolumn = r#"{"name":"Host","type":"string","jsonPath":".spec.ingress.host"}"#)]
#[kube(printcolumn = r#"{"name":"Port","type":"integer","jsonPath":".spec.target.port"}"#)]
#[kube(printcolumn = r#"{"name":"Class","type":"string","jsonPath":".spec.ingress.className"}"#)]
#[serde(rename_all = "camelCase")]
pub struct ReverseProxyEntrySpec {
    /// Backend target.
    pub target: Target,

    /// Ingress exposure settings.
    pub ingress: IngressSettings,
}

/// Observed state of a `ReverseProxyEntry`.
///
/// Reserved; the operator does not report status yet.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct ReverseProxyEntryStatus {}

/// Namespace and name of a `ReverseProxyEntry`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryKey {
    pub namespace: String,
    pub name: String,
}

impl EntryKey {
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of an entry, or `None` when the object carries no namespace.
    #[must_use]
    pub fn from_entry(entry: &ReverseProxyEntry) -> Option<Self> {
        let namespace = entry.namespace()?;
        Some(Self::new(namespace, entry.name_any()))
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl ReverseProxyEntry {
    /// `true` once the API server has set a deletion timestamp.
    #[must_use]
    pub fn is_terminating(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// `true` if `finalizer` is present on the entry.
    #[must_use]
    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers().iter().any(|f| f == finalizer)
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
