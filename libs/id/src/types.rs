//! Typed name definitions for all spotgrid resources.
//!
//! Each name type carries a resource-type tag used when rendering fully
//! qualified references. Names are caller-assigned; the platform never
//! invents identity from object-tree position.

use crate::define_name;

// =============================================================================
// Job Model
// =============================================================================

define_name!(TemplateName, "job-template");
define_name!(QueueName, "dispatch-queue");

// =============================================================================
// Capacity
// =============================================================================

define_name!(TierName, "capacity-tier");
define_name!(PerimeterName, "network-perimeter");

// =============================================================================
// Identity and Secrets
// =============================================================================

define_name!(IdentityName, "execution-identity");
define_name!(SecretName, "secret");

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NameError;

    #[test]
    fn test_tier_name_roundtrip() {
        let name = TierName::new("high-capacity").unwrap();
        let parsed: TierName = name.as_str().parse().unwrap();
        assert_eq!(name, parsed);
    }

    #[test]
    fn test_name_rejects_empty() {
        let result = TemplateName::new("");
        assert!(matches!(result, Err(NameError::Empty)));
    }

    #[test]
    fn test_name_rejects_uppercase() {
        let result = TemplateName::new("MyTask");
        assert!(matches!(result, Err(NameError::InvalidStart { .. })));

        let result = TemplateName::new("my-Task");
        assert!(matches!(result, Err(NameError::InvalidChar { actual: 'T' })));
    }

    #[test]
    fn test_name_rejects_leading_digit() {
        let result = QueueName::new("9lives");
        assert!(matches!(result, Err(NameError::InvalidStart { .. })));
    }

    #[test]
    fn test_name_rejects_trailing_hyphen() {
        let result = SecretName::new("api-key-");
        assert!(matches!(result, Err(NameError::TrailingHyphen)));
    }

    #[test]
    fn test_name_rejects_too_long() {
        let long = "a".repeat(64);
        let result = IdentityName::new(long);
        assert!(matches!(result, Err(NameError::TooLong { .. })));

        let ok = "a".repeat(63);
        assert!(IdentityName::new(ok).is_ok());
    }

    #[test]
    fn test_name_srn() {
        let name = TemplateName::new("starter-task").unwrap();
        let srn = name.srn("884515231596", "eu-central-1");
        assert_eq!(
            srn.to_string(),
            "srn:884515231596:eu-central-1:job-template/starter-task"
        );
    }

    #[test]
    fn test_name_json_roundtrip() {
        let name = PerimeterName::new("batch-perimeter").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        let parsed: PerimeterName = serde_json::from_str(&json).unwrap();
        assert_eq!(name, parsed);
    }

    #[test]
    fn test_json_rejects_invalid() {
        let result: Result<TierName, _> = serde_json::from_str("\"Bad Name\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_all_resource_types_unique() {
        let tags = vec![
            TemplateName::RESOURCE_TYPE,
            QueueName::RESOURCE_TYPE,
            TierName::RESOURCE_TYPE,
            PerimeterName::RESOURCE_TYPE,
            IdentityName::RESOURCE_TYPE,
            SecretName::RESOURCE_TYPE,
        ];

        let unique: std::collections::HashSet<_> = tags.iter().collect();
        assert_eq!(tags.len(), unique.len(), "Duplicate resource-type tags!");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn valid_names_roundtrip(s in "[a-z][a-z0-9-]{0,61}[a-z0-9]") {
                let name = TierName::new(s.clone()).unwrap();
                let parsed: TierName = name.as_str().parse().unwrap();
                prop_assert_eq!(name, parsed);
            }

            #[test]
            fn parse_never_panics(s in "\\PC*") {
                let _ = TierName::new(s);
            }
        }
    }
}
