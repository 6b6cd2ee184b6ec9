//! Credential vault interface.
//!
//! The vault is a managed secret store operated outside this control
//! plane. The core only ever creates secrets and grants scoped read
//! access to execution identities; it never reads secret values back.

use std::collections::{BTreeMap, BTreeSet};

use spotgrid_id::{IdentityName, SecretName, Srn};
use thiserror::Error;

/// Vault errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// A secret with this name already exists.
    #[error("secret '{name}' already exists")]
    DuplicateSecret { name: SecretName },

    /// A grant was requested for a secret this vault does not hold.
    #[error("unknown secret: {reference}")]
    UnknownSecret { reference: String },
}

/// An opaque secret payload.
///
/// The value is write-only from the control plane's perspective: it can
/// be handed to a vault but never read back, and it never appears in
/// `Debug` output or rendered resources.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretValue(String);

impl SecretValue {
    /// Wrap an initial secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// An empty placeholder, for secrets whose value is set out of band.
    #[must_use]
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Consume the wrapper, yielding the payload for vault storage.
    ///
    /// Only vault implementations should call this.
    #[must_use]
    pub fn into_payload(self) -> String {
        self.0
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretValue([REDACTED])")
    }
}

/// A full reference to a vault secret, including the specific key within
/// the secret when one is selected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct SecretRef {
    srn: Srn,
    key: Option<String>,
}

impl SecretRef {
    /// Build a reference from a secret SRN.
    #[must_use]
    pub fn new(srn: Srn) -> Self {
        Self { srn, key: None }
    }

    /// Select a specific key within the secret.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// The secret's fully qualified reference.
    #[must_use]
    pub fn srn(&self) -> &Srn {
        &self.srn
    }

    /// The selected key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Rendered reference string, key included when selected.
    #[must_use]
    pub fn value_from(&self) -> String {
        match &self.key {
            Some(key) => format!("{}#{}", self.srn, key),
            None => self.srn.to_string(),
        }
    }
}

impl std::fmt::Display for SecretRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value_from())
    }
}

/// A managed secret store with scoped read grants.
pub trait CredentialVault {
    /// Store a new secret and return its reference.
    fn create_secret(
        &mut self,
        name: &SecretName,
        initial_value: SecretValue,
    ) -> Result<SecretRef, VaultError>;

    /// Grant a principal read access to a secret.
    fn grant_read(
        &mut self,
        principal: &IdentityName,
        secret: &SecretRef,
    ) -> Result<(), VaultError>;
}

/// In-memory vault for tests and dry-run deployments.
///
/// Mints SRN-backed references and records grants; payloads are
/// discarded immediately because nothing in this process may read them.
#[derive(Debug, Clone)]
pub struct MemoryVault {
    account: String,
    region: String,
    secrets: BTreeMap<SecretName, SecretRef>,
    grants: BTreeSet<(IdentityName, Srn)>,
}

impl MemoryVault {
    /// Create a vault minting references for an environment target.
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            secrets: BTreeMap::new(),
            grants: BTreeSet::new(),
        }
    }

    /// Look up the reference for a secret created in this vault.
    #[must_use]
    pub fn secret_ref(&self, name: &SecretName) -> Option<&SecretRef> {
        self.secrets.get(name)
    }

    /// Check whether a read grant exists.
    #[must_use]
    pub fn has_grant(&self, principal: &IdentityName, secret: &SecretRef) -> bool {
        self.grants
            .contains(&(principal.clone(), secret.srn().clone()))
    }
}

impl CredentialVault for MemoryVault {
    fn create_secret(
        &mut self,
        name: &SecretName,
        initial_value: SecretValue,
    ) -> Result<SecretRef, VaultError> {
        if self.secrets.contains_key(name) {
            return Err(VaultError::DuplicateSecret { name: name.clone() });
        }

        // Drop the payload: the control plane never holds secret material.
        drop(initial_value);

        let secret_ref = SecretRef::new(name.srn(&self.account, &self.region));
        self.secrets.insert(name.clone(), secret_ref.clone());
        Ok(secret_ref)
    }

    fn grant_read(
        &mut self,
        principal: &IdentityName,
        secret: &SecretRef,
    ) -> Result<(), VaultError> {
        let known = self
            .secrets
            .values()
            .any(|r| r.srn() == secret.srn());
        if !known {
            return Err(VaultError::UnknownSecret {
                reference: secret.value_from(),
            });
        }

        self.grants
            .insert((principal.clone(), secret.srn().clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> MemoryVault {
        MemoryVault::new("884515231596", "eu-central-1")
    }

    #[test]
    fn test_create_secret_mints_srn() {
        let mut vault = vault();
        let name = SecretName::new("api-key").unwrap();
        let secret = vault.create_secret(&name, SecretValue::empty()).unwrap();
        assert_eq!(
            secret.value_from(),
            "srn:884515231596:eu-central-1:secret/api-key"
        );
    }

    #[test]
    fn test_duplicate_secret_rejected() {
        let mut vault = vault();
        let name = SecretName::new("api-key").unwrap();
        vault.create_secret(&name, SecretValue::empty()).unwrap();
        let result = vault.create_secret(&name, SecretValue::empty());
        assert!(matches!(result, Err(VaultError::DuplicateSecret { .. })));
    }

    #[test]
    fn test_grant_read() {
        let mut vault = vault();
        let name = SecretName::new("api-key").unwrap();
        let identity = IdentityName::new("batch-runner").unwrap();
        let secret = vault.create_secret(&name, SecretValue::empty()).unwrap();

        assert!(!vault.has_grant(&identity, &secret));
        vault.grant_read(&identity, &secret).unwrap();
        assert!(vault.has_grant(&identity, &secret));
    }

    #[test]
    fn test_grant_unknown_secret_rejected() {
        let mut vault = vault();
        let identity = IdentityName::new("batch-runner").unwrap();
        let foreign = SecretRef::new(Srn::new("other", "region", "secret", "ghost"));
        let result = vault.grant_read(&identity, &foreign);
        assert!(matches!(result, Err(VaultError::UnknownSecret { .. })));
    }

    #[test]
    fn test_secret_ref_with_key() {
        let secret =
            SecretRef::new(Srn::new("acct", "region", "secret", "api-key")).with_key("token");
        assert_eq!(secret.value_from(), "srn:acct:region:secret/api-key#token");
    }

    #[test]
    fn test_secret_value_debug_redacted() {
        let value = SecretValue::new("hunter2");
        assert_eq!(format!("{:?}", value), "SecretValue([REDACTED])");
    }
}
