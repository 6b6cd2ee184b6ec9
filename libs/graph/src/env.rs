//! Explicit environment targets.

use spotgrid_id::Srn;

use crate::error::GraphError;

/// The account/region target a graph is compiled for.
///
/// Always an explicit value threaded through graph construction and the
/// provisioner call; the platform never reads an ambient default.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EnvironmentContext {
    account: String,
    region: String,
}

impl EnvironmentContext {
    /// Create an environment target.
    pub fn new(
        account: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, GraphError> {
        let account = account.into();
        let region = region.into();

        validate_part("account", &account)?;
        validate_part("region", &region)?;

        Ok(Self { account, region })
    }

    /// The target account.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// The target region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Build the fully qualified reference for a resource in this
    /// environment.
    #[must_use]
    pub fn srn(&self, resource_type: &str, name: &str) -> Srn {
        Srn::new(&self.account, &self.region, resource_type, name)
    }
}

impl std::fmt::Display for EnvironmentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.account, self.region)
    }
}

fn validate_part(field: &'static str, value: &str) -> Result<(), GraphError> {
    if value.is_empty() {
        return Err(GraphError::InvalidEnvironment {
            message: format!("{field} cannot be empty"),
        });
    }
    if value.contains(':') || value.contains('/') {
        return Err(GraphError::InvalidEnvironment {
            message: format!("{field} must not contain ':' or '/'"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_srn() {
        let env = EnvironmentContext::new("884515231596", "eu-central-1").unwrap();
        let srn = env.srn("job-template", "starter-task");
        assert_eq!(
            srn.to_string(),
            "srn:884515231596:eu-central-1:job-template/starter-task"
        );
    }

    #[test]
    fn test_rejects_empty_parts() {
        assert!(EnvironmentContext::new("", "eu-central-1").is_err());
        assert!(EnvironmentContext::new("884515231596", "").is_err());
    }

    #[test]
    fn test_rejects_reserved_characters() {
        assert!(EnvironmentContext::new("acct:1", "region").is_err());
        assert!(EnvironmentContext::new("acct", "region/a").is_err());
    }
}
