// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Test fixtures shared by unit tests.
//!
//! [`FakePlatform`] is an in-memory [`EntryPlatform`] that mimics the API
//! server behaviour the reconciler depends on: `resourceVersion` checks on
//! patches, delete preconditions, `AlreadyExists` on create and owner
//! garbage collection once a terminating entry loses its last finalizer.

use crate::child_resources::{ChildKind, ChildObject};
use crate::crd::{EntryKey, IngressSettings, ReverseProxyEntry, ReverseProxyEntrySpec, Target};
use crate::errors::PlatformError;
use crate::reconcilers::platform::EntryPlatform;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// A persisted-looking entry: namespace, name, uid and resourceVersion set.
pub fn create_test_entry(namespace: &str, name: &str) -> ReverseProxyEntry {
    let mut entry = ReverseProxyEntry::new(
        name,
        ReverseProxyEntrySpec {
            target: Target {
                endpoints: vec!["10.0.0.5".to_string()],
                port: 8080,
            },
            ingress: IngressSettings {
                class_name: "nginx".to_string(),
                target_protocol: "http".to_string(),
                host: format!("{name}.example.com"),
                tls: false,
                secret_name: None,
                annotations: None,
            },
        },
    );
    entry.metadata.namespace = Some(namespace.to_string());
    entry.metadata.uid = Some(format!("uid-{namespace}-{name}"));
    entry.metadata.resource_version = Some("1".to_string());
    entry
}

/// Marks the entry as terminating without constructing a timestamp type directly.
pub fn mark_terminating(entry: &mut ReverseProxyEntry) {
    let meta: ObjectMeta = serde_json::from_value(serde_json::json!({
        "deletionTimestamp": "2025-01-01T00:00:00Z"
    }))
    .expect("valid deletion timestamp");
    entry.metadata.deletion_timestamp = meta.deletion_timestamp;
}

type ChildId = (ChildKind, String, String);

#[derive(Default)]
struct FakeState {
    entries: BTreeMap<EntryKey, ReverseProxyEntry>,
    children: BTreeMap<ChildId, ObjectMeta>,
    next_version: u64,
    fail_get: HashSet<ChildKind>,
    fail_create: HashSet<ChildKind>,
    fail_delete: HashSet<ChildKind>,
    created: Vec<(ChildKind, String)>,
    deleted: Vec<(ChildKind, String)>,
    finalizer_patches: usize,
    calls: usize,
}

impl FakeState {
    fn bump_version(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }

    /// Removes a terminating entry and its owned children once nothing holds it.
    fn collect_garbage(&mut self, key: &EntryKey) {
        let Some(entry) = self.entries.get(key) else {
            return;
        };
        if !entry.is_terminating() || !entry.metadata.finalizers.clone().unwrap_or_default().is_empty()
        {
            return;
        }
        let uid = entry.metadata.uid.clone();
        self.entries.remove(key);
        self.children.retain(|_, meta| {
            !meta
                .owner_references
                .iter()
                .flatten()
                .any(|owner| Some(&owner.uid) == uid.as_ref())
        });
    }
}

fn injected(kind: ChildKind, action: &str) -> PlatformError {
    PlatformError::Api {
        code: 503,
        reason: "ServiceUnavailable".to_string(),
        message: format!("injected {action} failure for {kind}"),
    }
}

/// In-memory stand-in for the Kubernetes API.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake platform state poisoned")
    }

    /// Stores `entry`, assigning it a fresh resourceVersion. Returns the stored copy.
    pub fn insert_entry(&self, mut entry: ReverseProxyEntry) -> ReverseProxyEntry {
        let mut state = self.state();
        entry.metadata.resource_version = Some(state.bump_version());
        let key = EntryKey::from_entry(&entry).expect("test entry has a namespace");
        state.entries.insert(key, entry.clone());
        entry
    }

    /// Stores a child built for `entry` as if it had been created earlier.
    pub fn insert_child(&self, child: &ChildObject) {
        let mut state = self.state();
        let mut meta = child.meta().clone();
        meta.resource_version = Some(state.bump_version());
        meta.uid = Some(format!("uid-{}-{}", child.kind(), child.name()));
        state.children.insert(
            (child.kind(), child.namespace().to_string(), child.name().to_string()),
            meta,
        );
    }

    pub fn entry(&self, key: &EntryKey) -> Option<ReverseProxyEntry> {
        self.state().entries.get(key).cloned()
    }

    pub fn has_child(&self, kind: ChildKind, namespace: &str, name: &str) -> bool {
        self.state()
            .children
            .contains_key(&(kind, namespace.to_string(), name.to_string()))
    }

    pub fn child_count(&self, kind: ChildKind) -> usize {
        self.state().children.keys().filter(|(k, _, _)| *k == kind).count()
    }

    pub fn created(&self) -> Vec<(ChildKind, String)> {
        self.state().created.clone()
    }

    pub fn deleted(&self) -> Vec<(ChildKind, String)> {
        self.state().deleted.clone()
    }

    pub fn finalizer_patches(&self) -> usize {
        self.state().finalizer_patches
    }

    pub fn calls(&self) -> usize {
        self.state().calls
    }

    pub fn fail_get(&self, kind: ChildKind) {
        self.state().fail_get.insert(kind);
    }

    pub fn fail_create(&self, kind: ChildKind) {
        self.state().fail_create.insert(kind);
    }

    pub fn fail_delete(&self, kind: ChildKind) {
        self.state().fail_delete.insert(kind);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.fail_get.clear();
        state.fail_create.clear();
        state.fail_delete.clear();
    }

    /// Bumps the stored entry's resourceVersion, as a concurrent writer would.
    pub fn touch_entry(&self, key: &EntryKey) {
        let mut state = self.state();
        let version = state.bump_version();
        if let Some(entry) = state.entries.get_mut(key) {
            entry.metadata.resource_version = Some(version);
        }
    }
}

#[async_trait]
impl EntryPlatform for FakePlatform {
    async fn get_entry(&self, key: &EntryKey) -> Result<Option<ReverseProxyEntry>, PlatformError> {
        let mut state = self.state();
        state.calls += 1;
        Ok(state.entries.get(key).cloned())
    }

    async fn patch_entry_finalizers(
        &self,
        entry: &ReverseProxyEntry,
        finalizers: Vec<String>,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.calls += 1;
        let key = EntryKey::from_entry(entry).ok_or(PlatformError::Api {
            code: 400,
            reason: "BadRequest".to_string(),
            message: "namespace required".to_string(),
        })?;

        let version = state.bump_version();
        let stored = state
            .entries
            .get_mut(&key)
            .ok_or_else(|| PlatformError::NotFound {
                message: format!("reverseproxyentries \"{}\" not found", key.name),
            })?;

        if stored.metadata.resource_version != entry.metadata.resource_version {
            return Err(PlatformError::Conflict {
                message: "the object has been modified".to_string(),
            });
        }

        stored.metadata.finalizers = Some(finalizers);
        stored.metadata.resource_version = Some(version);
        state.finalizer_patches += 1;
        state.collect_garbage(&key);
        Ok(())
    }

    async fn get_child(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectMeta>, PlatformError> {
        let mut state = self.state();
        state.calls += 1;
        if state.fail_get.contains(&kind) {
            return Err(injected(kind, "get"));
        }
        Ok(state
            .children
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_child(&self, child: &ChildObject) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.calls += 1;
        let kind = child.kind();
        if state.fail_create.contains(&kind) {
            return Err(injected(kind, "create"));
        }

        let id = (kind, child.namespace().to_string(), child.name().to_string());
        if state.children.contains_key(&id) {
            return Err(PlatformError::AlreadyExists {
                message: format!("{kind} \"{}\" already exists", child.name()),
            });
        }

        let mut meta = child.meta().clone();
        meta.resource_version = Some(state.bump_version());
        meta.uid = Some(format!("uid-{kind}-{}", child.name()));
        state.children.insert(id, meta);
        state.created.push((kind, child.name().to_string()));
        Ok(())
    }

    async fn delete_child(
        &self,
        kind: ChildKind,
        existing: &ObjectMeta,
    ) -> Result<(), PlatformError> {
        let mut state = self.state();
        state.calls += 1;
        if state.fail_delete.contains(&kind) {
            return Err(injected(kind, "delete"));
        }

        let name = existing.name.clone().unwrap_or_default();
        let id = (kind, existing.namespace.clone().unwrap_or_default(), name.clone());
        let stored = state.children.get(&id).ok_or_else(|| PlatformError::NotFound {
            message: format!("{kind} \"{name}\" not found"),
        })?;

        if stored.resource_version != existing.resource_version || stored.uid != existing.uid {
            return Err(PlatformError::Conflict {
                message: "precondition failed".to_string(),
            });
        }

        state.children.remove(&id);
        state.deleted.push((kind, name));
        Ok(())
    }
}
