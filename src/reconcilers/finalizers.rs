// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for namespaced Kubernetes resources.
//!
//! Finalizer edits are read-modify-write merge patches that carry the
//! `resourceVersion` the caller observed. The API server rejects the patch
//! with HTTP 409 if the object changed in between, so a concurrent writer
//! never loses its own finalizer edits.
//!
//! # Example
//!
//! ```rust,ignore
//! use reverse_proxy_operator::reconcilers::finalizers::{finalizers_with, patch_finalizers};
//!
//! let desired = finalizers_with(entry.finalizers(), FINALIZER_REVERSE_PROXY_ENTRY);
//! patch_finalizers(&api, &entry, desired).await?;
//! ```

use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Resource, ResourceExt};
use serde_json::{json, Value};
use tracing::debug;

/// Returns `current` with `finalizer` appended if it is not already present.
#[must_use]
pub fn finalizers_with(current: &[String], finalizer: &str) -> Vec<String> {
    let mut finalizers = current.to_vec();
    if !finalizers.iter().any(|f| f == finalizer) {
        finalizers.push(finalizer.to_string());
    }
    finalizers
}

/// Returns `current` without any occurrence of `finalizer`, preserving the order of the rest.
#[must_use]
pub fn finalizers_without(current: &[String], finalizer: &str) -> Vec<String> {
    current
        .iter()
        .filter(|f| f.as_str() != finalizer)
        .cloned()
        .collect()
}

/// Builds the merge patch body replacing the finalizer list.
///
/// When `resource_version` is set the patch only applies to that exact
/// version of the object.
#[must_use]
pub fn finalizer_patch(resource_version: Option<&str>, finalizers: &[String]) -> Value {
    match resource_version {
        Some(rv) => json!({
            "metadata": {
                "resourceVersion": rv,
                "finalizers": finalizers,
            }
        }),
        None => json!({ "metadata": { "finalizers": finalizers } }),
    }
}

/// Replaces the finalizer list of `resource`, guarded by its observed `resourceVersion`.
///
/// # Errors
///
/// Returns the underlying [`kube::Error`]; a 409 means the object changed
/// since it was read.
pub async fn patch_finalizers<T>(
    api: &Api<T>,
    resource: &T,
    finalizers: Vec<String>,
) -> Result<(), kube::Error>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
{
    let name = resource.name_any();
    let patch = finalizer_patch(resource.resource_version().as_deref(), &finalizers);

    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    debug!(
        kind = %T::kind(&()),
        namespace = %resource.namespace().unwrap_or_default(),
        name = %name,
        ?finalizers,
        "Patched finalizers"
    );

    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
