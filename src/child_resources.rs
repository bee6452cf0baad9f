// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Builders for the Kubernetes resources derived from a `ReverseProxyEntry`.
//!
//! Every entry owns exactly three children, all named `<prefix><entry name>`
//! in the entry's namespace:
//!
//! - a selector-less `ClusterIP` Service
//! - an `EndpointSlice` that feeds that Service with the backend address
//! - an `Ingress` routing the entry host to the Service
//!
//! The builders are pure. The same entry always produces the same objects,
//! which keeps create-if-absent reconciliation idempotent.

use crate::constants::{
    ADDRESS_TYPE_IPV4, API_GROUP_VERSION, INGRESS_PATH_TYPE_PREFIX, INGRESS_ROOT_PATH,
    KIND_REVERSE_PROXY_ENTRY, MAX_TARGET_PORT, MIN_TARGET_PORT, PROTOCOL_TCP,
    SERVICE_TYPE_CLUSTER_IP,
};
use crate::crd::ReverseProxyEntry;
use crate::errors::InvalidEntry;
use crate::labels::{build_child_labels, K8S_SERVICE_NAME};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::discovery::v1::{Endpoint, EndpointConditions, EndpointPort, EndpointSlice};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use std::fmt;
use std::net::Ipv4Addr;

/// The kinds of resources derived from an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildKind {
    Service,
    EndpointSlice,
    Ingress,
}

impl ChildKind {
    /// Every child kind, in creation order.
    pub const ALL: [ChildKind; 3] = [
        ChildKind::Service,
        ChildKind::EndpointSlice,
        ChildKind::Ingress,
    ];

    /// Kinds deleted explicitly before the finalizer is released.
    ///
    /// The `EndpointSlice` is left to owner-reference garbage collection.
    pub const CLEANUP: [ChildKind; 2] = [ChildKind::Service, ChildKind::Ingress];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "Service",
            Self::EndpointSlice => "EndpointSlice",
            Self::Ingress => "Ingress",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built child resource, ready to be created.
#[derive(Clone, Debug, PartialEq)]
pub enum ChildObject {
    Service(Service),
    EndpointSlice(EndpointSlice),
    Ingress(Ingress),
}

impl ChildObject {
    /// Builds the child of the given kind for `entry`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidEntry`] if the entry cannot produce a well-formed object.
    pub fn build(
        kind: ChildKind,
        entry: &ReverseProxyEntry,
        prefix: &str,
    ) -> Result<Self, InvalidEntry> {
        Ok(match kind {
            ChildKind::Service => Self::Service(build_service(entry, prefix)?),
            ChildKind::EndpointSlice => Self::EndpointSlice(build_endpoint_slice(entry, prefix)?),
            ChildKind::Ingress => Self::Ingress(build_ingress(entry, prefix)?),
        })
    }

    #[must_use]
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::Service(_) => ChildKind::Service,
            Self::EndpointSlice(_) => ChildKind::EndpointSlice,
            Self::Ingress(_) => ChildKind::Ingress,
        }
    }

    #[must_use]
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Self::Service(svc) => &svc.metadata,
            Self::EndpointSlice(slice) => &slice.metadata,
            Self::Ingress(ing) => &ing.metadata,
        }
    }

    /// Name of the object, empty if unset.
    #[must_use]
    pub fn name(&self) -> &str {
        self.meta().name.as_deref().unwrap_or_default()
    }

    /// Namespace of the object, empty if unset.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.meta().namespace.as_deref().unwrap_or_default()
    }
}

/// Derived child name: plain concatenation of prefix and entry name.
#[must_use]
pub fn child_name(prefix: &str, entry_name: &str) -> String {
    format!("{prefix}{entry_name}")
}

/// Builds the controller owner reference pointing back at the entry.
///
/// # Errors
///
/// Returns [`InvalidEntry::MissingIdentity`] if the entry has no UID, which
/// happens only for objects that were never persisted.
pub fn build_owner_reference(entry: &ReverseProxyEntry) -> Result<OwnerReference, InvalidEntry> {
    let uid = entry
        .metadata
        .uid
        .clone()
        .ok_or(InvalidEntry::MissingIdentity { field: "uid" })?;

    Ok(OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_REVERSE_PROXY_ENTRY.to_string(),
        name: entry.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Backend values shared by the three builders, checked once.
struct Backend<'a> {
    address: &'a str,
    port: i32,
}

fn validated_backend(entry: &ReverseProxyEntry) -> Result<Backend<'_>, InvalidEntry> {
    let address = entry
        .spec
        .target
        .endpoints
        .first()
        .ok_or(InvalidEntry::MissingEndpoints)?;

    if address.parse::<Ipv4Addr>().is_err() {
        return Err(InvalidEntry::InvalidEndpoint {
            address: address.clone(),
        });
    }

    let port = entry.spec.target.port;
    if !(MIN_TARGET_PORT..=MAX_TARGET_PORT).contains(&port) {
        return Err(InvalidEntry::InvalidPort { port });
    }

    Ok(Backend { address, port })
}

fn validated_host(entry: &ReverseProxyEntry) -> Result<&str, InvalidEntry> {
    let host = entry.spec.ingress.host.as_str();
    if host.trim().is_empty() {
        return Err(InvalidEntry::EmptyHost);
    }
    Ok(host)
}

/// Checks everything the builders rely on without building anything.
///
/// # Errors
///
/// Returns the first [`InvalidEntry`] defect found.
pub fn validate_entry(entry: &ReverseProxyEntry) -> Result<(), InvalidEntry> {
    validated_backend(entry)?;
    validated_host(entry)?;
    child_metadata(entry, "")?;
    Ok(())
}

/// Metadata common to all children: name, namespace, labels, owner reference.
fn child_metadata(entry: &ReverseProxyEntry, prefix: &str) -> Result<ObjectMeta, InvalidEntry> {
    let namespace = entry
        .namespace()
        .ok_or(InvalidEntry::MissingIdentity { field: "namespace" })?;

    Ok(ObjectMeta {
        name: Some(child_name(prefix, &entry.name_any())),
        namespace: Some(namespace),
        labels: Some(build_child_labels()),
        owner_references: Some(vec![build_owner_reference(entry)?]),
        ..Default::default()
    })
}

/// Builds the selector-less `ClusterIP` Service for an entry.
///
/// The Service has no selector; its endpoints come from the `EndpointSlice`
/// built by [`build_endpoint_slice`].
///
/// # Errors
///
/// Returns [`InvalidEntry`] if the target or identity of the entry is malformed.
pub fn build_service(entry: &ReverseProxyEntry, prefix: &str) -> Result<Service, InvalidEntry> {
    let backend = validated_backend(entry)?;

    Ok(Service {
        metadata: child_metadata(entry, prefix)?,
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                name: Some(entry.name_any()),
                port: backend.port,
                target_port: Some(IntOrString::Int(backend.port)),
                protocol: Some(PROTOCOL_TCP.into()),
                ..Default::default()
            }]),
            type_: Some(SERVICE_TYPE_CLUSTER_IP.into()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Builds the `EndpointSlice` pointing the Service at the first backend address.
///
/// Readiness is asserted rather than observed: the backend is outside the
/// cluster and is not health-checked.
///
/// # Errors
///
/// Returns [`InvalidEntry`] if the target or identity of the entry is malformed.
pub fn build_endpoint_slice(
    entry: &ReverseProxyEntry,
    prefix: &str,
) -> Result<EndpointSlice, InvalidEntry> {
    let backend = validated_backend(entry)?;
    let mut metadata = child_metadata(entry, prefix)?;

    let service_name = child_name(prefix, &entry.name_any());
    metadata
        .labels
        .get_or_insert_with(Default::default)
        .insert(K8S_SERVICE_NAME.into(), service_name);

    Ok(EndpointSlice {
        metadata,
        address_type: ADDRESS_TYPE_IPV4.into(),
        endpoints: vec![Endpoint {
            addresses: vec![backend.address.to_string()],
            conditions: Some(EndpointConditions {
                ready: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }],
        ports: Some(vec![EndpointPort {
            name: Some(entry.name_any()),
            port: Some(backend.port),
            protocol: Some(PROTOCOL_TCP.into()),
            ..Default::default()
        }]),
    })
}

/// Builds the `Ingress` routing the entry host to the derived Service.
///
/// A TLS block is always emitted, whatever `spec.ingress.tls` says, and it
/// references a secret named like the children.
///
/// # Errors
///
/// Returns [`InvalidEntry`] if the host, target or identity of the entry is malformed.
pub fn build_ingress(entry: &ReverseProxyEntry, prefix: &str) -> Result<Ingress, InvalidEntry> {
    let backend = validated_backend(entry)?;
    let host = validated_host(entry)?;
    let mut metadata = child_metadata(entry, prefix)?;
    metadata.annotations.clone_from(&entry.spec.ingress.annotations);

    let name = child_name(prefix, &entry.name_any());

    Ok(Ingress {
        metadata,
        spec: Some(IngressSpec {
            ingress_class_name: Some(entry.spec.ingress.class_name.clone()),
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some(INGRESS_ROOT_PATH.into()),
                        path_type: INGRESS_PATH_TYPE_PREFIX.into(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: name.clone(),
                                port: Some(ServiceBackendPort {
                                    number: Some(backend.port),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            tls: Some(vec![IngressTLS {
                hosts: Some(vec![host.to_string()]),
                secret_name: Some(name),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    })
}

#[cfg(test)]
#[path = "child_resources_tests.rs"]
mod child_resources_tests;
