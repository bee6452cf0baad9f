// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for operator error types.

#[cfg(test)]
mod tests {
    use crate::child_resources::ChildKind;
    use crate::errors::*;

    fn child_error(source: PlatformError) -> ReconcileError {
        ReconcileError::Child {
            kind: ChildKind::Service,
            namespace: "shop".to_string(),
            name: "rpe-checkout".to_string(),
            action: "create",
            source,
        }
    }

    #[test]
    fn test_platform_error_display() {
        let error = PlatformError::Api {
            code: 403,
            reason: "Forbidden".to_string(),
            message: "services is forbidden".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "API error 403 (Forbidden): services is forbidden"
        );
        assert_eq!(PlatformError::Cancelled.to_string(), "operation cancelled");
    }

    #[test]
    fn test_platform_error_transience() {
        let throttled = PlatformError::Api {
            code: 429,
            reason: "TooManyRequests".to_string(),
            message: String::new(),
        };
        let unavailable = PlatformError::Api {
            code: 503,
            reason: "ServiceUnavailable".to_string(),
            message: String::new(),
        };
        let forbidden = PlatformError::Api {
            code: 403,
            reason: "Forbidden".to_string(),
            message: String::new(),
        };

        assert!(throttled.is_transient());
        assert!(unavailable.is_transient());
        assert!(!forbidden.is_transient());
        assert!(PlatformError::Conflict {
            message: String::new()
        }
        .is_transient());
        assert!(PlatformError::DeadlineExceeded.is_transient());
        assert!(!PlatformError::NotFound {
            message: String::new()
        }
        .is_transient());
    }

    #[test]
    fn test_platform_error_type_labels() {
        assert_eq!(
            PlatformError::Api {
                code: 500,
                reason: "InternalError".to_string(),
                message: String::new(),
            }
            .error_type(),
            "transient"
        );
        assert_eq!(
            PlatformError::Api {
                code: 422,
                reason: "Invalid".to_string(),
                message: String::new(),
            }
            .error_type(),
            "api_rejected"
        );
        assert_eq!(
            PlatformError::Conflict {
                message: String::new()
            }
            .error_type(),
            "conflict"
        );
    }

    #[test]
    fn test_invalid_entry_display() {
        assert_eq!(
            InvalidEntry::InvalidEndpoint {
                address: "not-an-ip".to_string()
            }
            .to_string(),
            "spec.target.endpoints[0] 'not-an-ip' is not an IPv4 address"
        );
        assert_eq!(
            InvalidEntry::InvalidPort { port: 0 }.to_string(),
            "spec.target.port 0 is outside 1-65535"
        );
    }

    #[test]
    fn test_child_error_display() {
        let error = child_error(PlatformError::Transport {
            message: "connection reset".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "failed to create Service shop/rpe-checkout: transport error: connection reset"
        );
        assert_eq!(error.error_type(), "transport");
    }

    #[test]
    fn test_aggregated_errors_join_failures() {
        let error = ReconcileError::Cleanup {
            key: "shop/checkout".to_string(),
            failures: vec![
                child_error(PlatformError::Conflict {
                    message: "stale".to_string(),
                }),
                child_error(PlatformError::Cancelled),
            ],
        };

        let rendered = error.to_string();
        assert!(rendered.starts_with("cleanup of entry shop/checkout incomplete"));
        assert!(rendered.contains("conflict: stale; "));
        assert!(rendered.ends_with("operation cancelled"));
        assert_eq!(error.error_type(), "cleanup");
        assert!(error.is_interrupted());
    }

    #[test]
    fn test_only_configuration_defects_are_terminal() {
        let invalid = ReconcileError::InvalidEntry {
            key: "shop/checkout".to_string(),
            source: InvalidEntry::EmptyHost,
        };
        let missing_ns = ReconcileError::MissingNamespace {
            name: "checkout".to_string(),
        };
        let convergence = ReconcileError::Convergence {
            key: "shop/checkout".to_string(),
            failures: vec![child_error(PlatformError::Api {
                code: 403,
                reason: "Forbidden".to_string(),
                message: String::new(),
            })],
        };

        assert!(!invalid.is_retryable());
        assert!(!missing_ns.is_retryable());
        assert!(convergence.is_retryable());
        assert!(!convergence.is_interrupted());
        assert_eq!(invalid.error_type(), "invalid_entry");
    }

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(
            kube::error::ErrorResponse::failure(&format!("{reason} from the API server"), reason)
                .with_code(code)
                .boxed(),
        )
    }

    #[test]
    fn test_kube_error_mapping() {
        assert!(PlatformError::from(api_error(404, "NotFound")).is_not_found());
        assert!(PlatformError::from(api_error(409, "AlreadyExists")).is_already_exists());
        assert!(matches!(
            PlatformError::from(api_error(409, "Conflict")),
            PlatformError::Conflict { .. }
        ));
        assert!(matches!(
            PlatformError::from(api_error(422, "Invalid")),
            PlatformError::Api { code: 422, .. }
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(PlatformError::from(api_error(429, "TooManyRequests")).is_transient());
        assert!(PlatformError::from(api_error(503, "ServiceUnavailable")).is_transient());
        assert!(!PlatformError::from(api_error(403, "Forbidden")).is_transient());
        assert!(!PlatformError::from(api_error(404, "NotFound")).is_transient());
    }
}
