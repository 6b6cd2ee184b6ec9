//! Execution identities.
//!
//! An execution identity is the principal a job instance runs as. It
//! carries exactly the permissions a running job needs: emitting logs,
//! pulling its image, and reading the secrets bound to it. Nothing
//! beyond that set is ever granted implicitly.

use std::collections::BTreeSet;

use spotgrid_id::{IdentityName, Srn};

use crate::vault::{CredentialVault, SecretRef, VaultError};

/// The caller class allowed to assume an execution identity.
///
/// Fixed to the job-execution substrate; no other caller may assume
/// these identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Principal {
    JobExecutionSubstrate,
}

impl Principal {
    /// Stable identifier used in rendered resources.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Principal::JobExecutionSubstrate => "job-execution-substrate",
        }
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single permission in an identity's minimal set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    /// Emit logs from the running container.
    EmitLogs,

    /// Pull the job's container image.
    PullImage,

    /// Read one specific vault secret.
    ReadSecret(Srn),
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Permission::EmitLogs => write!(f, "logs:emit"),
            Permission::PullImage => write!(f, "image:pull"),
            Permission::ReadSecret(srn) => write!(f, "secret:read:{}", srn),
        }
    }
}

/// A minimal-permission principal used to run jobs.
///
/// Identities may be shared by multiple job templates; templates only
/// reference them and can never widen a shared identity's permission
/// set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionIdentity {
    name: IdentityName,
    principal: Principal,
    permissions: BTreeSet<Permission>,
}

impl ExecutionIdentity {
    /// Create an identity for the job-execution substrate.
    ///
    /// Grants exactly `{EmitLogs, PullImage}`; secret reads are added
    /// one at a time through [`bind_secret_read`](Self::bind_secret_read).
    #[must_use]
    pub fn for_job_execution(name: IdentityName) -> Self {
        let mut permissions = BTreeSet::new();
        permissions.insert(Permission::EmitLogs);
        permissions.insert(Permission::PullImage);
        Self {
            name,
            principal: Principal::JobExecutionSubstrate,
            permissions,
        }
    }

    /// Grant this identity read access to one secret.
    ///
    /// Registers the grant with the vault and composes the matching
    /// `ReadSecret` permission. Happens only during identity
    /// construction; built identities referenced by templates are
    /// read-only.
    pub fn bind_secret_read(
        &mut self,
        vault: &mut dyn CredentialVault,
        secret: &SecretRef,
    ) -> Result<(), VaultError> {
        vault.grant_read(&self.name, secret)?;
        self.permissions
            .insert(Permission::ReadSecret(secret.srn().clone()));
        Ok(())
    }

    /// The identity's stable name.
    #[must_use]
    pub fn name(&self) -> &IdentityName {
        &self.name
    }

    /// The caller class allowed to assume this identity.
    #[must_use]
    pub fn principal(&self) -> Principal {
        self.principal
    }

    /// The full permission set, sorted.
    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<Permission> {
        &self.permissions
    }

    /// Check whether this identity may read a secret.
    #[must_use]
    pub fn can_read(&self, secret: &SecretRef) -> bool {
        self.permissions
            .contains(&Permission::ReadSecret(secret.srn().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{MemoryVault, SecretValue};
    use spotgrid_id::SecretName;

    #[test]
    fn test_baseline_permissions() {
        let name = IdentityName::new("batch-runner").unwrap();
        let identity = ExecutionIdentity::for_job_execution(name);

        assert_eq!(identity.principal(), Principal::JobExecutionSubstrate);
        assert_eq!(identity.permissions().len(), 2);
        assert!(identity.permissions().contains(&Permission::EmitLogs));
        assert!(identity.permissions().contains(&Permission::PullImage));
    }

    #[test]
    fn test_bind_secret_read_composes_grant_and_permission() {
        let mut vault = MemoryVault::new("acct", "region");
        let secret_name = SecretName::new("api-key").unwrap();
        let secret = vault
            .create_secret(&secret_name, SecretValue::empty())
            .unwrap();

        let name = IdentityName::new("batch-runner").unwrap();
        let mut identity = ExecutionIdentity::for_job_execution(name);

        assert!(!identity.can_read(&secret));
        identity.bind_secret_read(&mut vault, &secret).unwrap();

        assert!(identity.can_read(&secret));
        assert!(vault.has_grant(identity.name(), &secret));
        assert_eq!(identity.permissions().len(), 3);
    }

    #[test]
    fn test_bind_secret_read_is_idempotent() {
        let mut vault = MemoryVault::new("acct", "region");
        let secret_name = SecretName::new("api-key").unwrap();
        let secret = vault
            .create_secret(&secret_name, SecretValue::empty())
            .unwrap();

        let name = IdentityName::new("batch-runner").unwrap();
        let mut identity = ExecutionIdentity::for_job_execution(name);

        identity.bind_secret_read(&mut vault, &secret).unwrap();
        identity.bind_secret_read(&mut vault, &secret).unwrap();
        assert_eq!(identity.permissions().len(), 3);
    }

    #[test]
    fn test_failed_grant_adds_no_permission() {
        let mut vault = MemoryVault::new("acct", "region");
        let foreign = SecretRef::new(spotgrid_id::Srn::new("other", "region", "secret", "ghost"));

        let name = IdentityName::new("batch-runner").unwrap();
        let mut identity = ExecutionIdentity::for_job_execution(name);

        assert!(identity.bind_secret_read(&mut vault, &foreign).is_err());
        assert_eq!(identity.permissions().len(), 2);
    }
}
