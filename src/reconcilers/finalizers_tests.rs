// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `finalizers.rs`

#[cfg(test)]
mod tests {
    use crate::reconcilers::finalizers::{finalizer_patch, finalizers_with, finalizers_without};
    use serde_json::json;

    const TEST_FINALIZER: &str = "app-scape.de/finalizer";

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_finalizers_with_appends_once() {
        let current = strings(&["other.io/keep"]);

        let added = finalizers_with(&current, TEST_FINALIZER);
        assert_eq!(added, strings(&["other.io/keep", TEST_FINALIZER]));

        let again = finalizers_with(&added, TEST_FINALIZER);
        assert_eq!(again, added, "adding twice must be a no-op");
    }

    #[test]
    fn test_finalizers_with_on_empty_list() {
        assert_eq!(finalizers_with(&[], TEST_FINALIZER), strings(&[TEST_FINALIZER]));
    }

    #[test]
    fn test_finalizers_without_keeps_foreign_finalizers() {
        let current = strings(&["a.io/first", TEST_FINALIZER, "b.io/last"]);

        assert_eq!(
            finalizers_without(&current, TEST_FINALIZER),
            strings(&["a.io/first", "b.io/last"])
        );
    }

    #[test]
    fn test_finalizers_without_absent_is_noop() {
        let current = strings(&["a.io/first"]);
        assert_eq!(finalizers_without(&current, TEST_FINALIZER), current);
    }

    #[test]
    fn test_patch_carries_resource_version() {
        let patch = finalizer_patch(Some("42"), &strings(&[TEST_FINALIZER]));

        assert_eq!(
            patch,
            json!({
                "metadata": {
                    "resourceVersion": "42",
                    "finalizers": [TEST_FINALIZER]
                }
            })
        );
    }

    #[test]
    fn test_patch_with_empty_list_clears_finalizers() {
        let patch = finalizer_patch(Some("7"), &[]);
        assert_eq!(patch["metadata"]["finalizers"], json!([]));
    }

    #[test]
    fn test_patch_without_resource_version() {
        let patch = finalizer_patch(None, &strings(&[TEST_FINALIZER]));
        assert!(patch["metadata"].get("resourceVersion").is_none());
    }
}
