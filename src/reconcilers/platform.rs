// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes API seam for the `ReverseProxyEntry` reconciler.
//!
//! The reconciler only talks to the cluster through [`EntryPlatform`], which
//! lets the convergence logic be exercised against mocks and in-memory fakes.
//! [`KubePlatform`] is the production implementation on top of [`kube::Api`].

use crate::child_resources::{ChildKind, ChildObject};
use crate::crd::{EntryKey, ReverseProxyEntry};
use crate::errors::PlatformError;
use crate::reconcilers::finalizers::patch_finalizers;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::discovery::v1::EndpointSlice;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, PostParams, Preconditions};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Operations the reconciler needs from the cluster.
///
/// Lookups return `Ok(None)` for absent objects; every other failure is a
/// [`PlatformError`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EntryPlatform: Send + Sync {
    /// Fetch an entry by namespace and name.
    async fn get_entry(&self, key: &EntryKey) -> Result<Option<ReverseProxyEntry>, PlatformError>;

    /// Replace the finalizer list of `entry`, guarded by its `resourceVersion`.
    async fn patch_entry_finalizers(
        &self,
        entry: &ReverseProxyEntry,
        finalizers: Vec<String>,
    ) -> Result<(), PlatformError>;

    /// Fetch the metadata of a child resource.
    async fn get_child(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectMeta>, PlatformError>;

    /// Create a child resource.
    async fn create_child(&self, child: &ChildObject) -> Result<(), PlatformError>;

    /// Delete a child resource, preconditioned on the observed `resourceVersion` and UID.
    async fn delete_child(&self, kind: ChildKind, existing: &ObjectMeta)
        -> Result<(), PlatformError>;
}

/// [`EntryPlatform`] backed by a live Kubernetes client.
#[derive(Clone)]
pub struct KubePlatform {
    client: Client,
}

impl KubePlatform {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_meta<K>(&self, namespace: &str, name: &str) -> Result<Option<ObjectMeta>, PlatformError>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let found = api.get_opt(name).await?;
        Ok(found.map(|obj| obj.meta().clone()))
    }

    async fn create<K>(&self, obj: &K) -> Result<(), PlatformError>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned,
    {
        let namespace = obj.meta().namespace.as_deref().unwrap_or_default();
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), obj).await?;
        Ok(())
    }

    async fn delete<K>(&self, existing: &ObjectMeta) -> Result<(), PlatformError>
    where
        K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        let namespace = existing.namespace.as_deref().unwrap_or_default();
        let name = existing.name.as_deref().unwrap_or_default();
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);

        let params = DeleteParams {
            preconditions: Some(Preconditions {
                resource_version: existing.resource_version.clone(),
                uid: existing.uid.clone(),
            }),
            ..DeleteParams::default()
        };

        api.delete(name, &params).await?;
        debug!(
            "Delete of {} {}/{} accepted",
            K::kind(&()),
            namespace,
            name
        );
        Ok(())
    }
}

#[async_trait]
impl EntryPlatform for KubePlatform {
    async fn get_entry(&self, key: &EntryKey) -> Result<Option<ReverseProxyEntry>, PlatformError> {
        let api: Api<ReverseProxyEntry> = Api::namespaced(self.client.clone(), &key.namespace);
        Ok(api.get_opt(&key.name).await?)
    }

    async fn patch_entry_finalizers(
        &self,
        entry: &ReverseProxyEntry,
        finalizers: Vec<String>,
    ) -> Result<(), PlatformError> {
        let namespace = entry.metadata.namespace.as_deref().unwrap_or_default();
        let api: Api<ReverseProxyEntry> = Api::namespaced(self.client.clone(), namespace);
        patch_finalizers(&api, entry, finalizers).await?;
        Ok(())
    }

    async fn get_child(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectMeta>, PlatformError> {
        match kind {
            ChildKind::Service => self.get_meta::<Service>(namespace, name).await,
            ChildKind::EndpointSlice => self.get_meta::<EndpointSlice>(namespace, name).await,
            ChildKind::Ingress => self.get_meta::<Ingress>(namespace, name).await,
        }
    }

    async fn create_child(&self, child: &ChildObject) -> Result<(), PlatformError> {
        match child {
            ChildObject::Service(svc) => self.create(svc).await,
            ChildObject::EndpointSlice(slice) => self.create(slice).await,
            ChildObject::Ingress(ing) => self.create(ing).await,
        }
    }

    async fn delete_child(
        &self,
        kind: ChildKind,
        existing: &ObjectMeta,
    ) -> Result<(), PlatformError> {
        match kind {
            ChildKind::Service => self.delete::<Service>(existing).await,
            ChildKind::EndpointSlice => self.delete::<EndpointSlice>(existing).await,
            ChildKind::Ingress => self.delete::<Ingress>(existing).await,
        }
    }
}
