//! Fully qualified resource references.

use crate::NameError;

/// A fully qualified, environment-pinned resource reference.
///
/// Canonical form: `srn:{account}:{region}:{resource_type}/{name}`.
///
/// The account and region come from an explicit environment target; they
/// are never read from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Srn {
    account: String,
    region: String,
    resource_type: String,
    name: String,
}

impl Srn {
    /// Builds a reference from its parts.
    ///
    /// Parts are taken as-is; typed names validate their own charset
    /// before reaching this point.
    #[must_use]
    pub fn new(
        account: impl Into<String>,
        region: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Parses a reference from its canonical string form.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        let rest = s
            .strip_prefix("srn:")
            .ok_or_else(|| NameError::InvalidReference {
                message: format!("missing 'srn:' prefix in '{s}'"),
            })?;

        let mut parts = rest.splitn(3, ':');
        let account = parts.next().unwrap_or_default();
        let region = parts.next().unwrap_or_default();
        let qualified = parts.next().unwrap_or_default();

        if account.is_empty() || region.is_empty() || qualified.is_empty() {
            return Err(NameError::InvalidReference {
                message: format!("expected srn:account:region:type/name, got '{s}'"),
            });
        }

        let Some((resource_type, name)) = qualified.split_once('/') else {
            return Err(NameError::InvalidReference {
                message: format!("missing '/' between type and name in '{s}'"),
            });
        };

        if resource_type.is_empty() || name.is_empty() {
            return Err(NameError::InvalidReference {
                message: format!("empty type or name in '{s}'"),
            });
        }

        Ok(Self::new(account, region, resource_type, name))
    }

    /// The account the resource lives in.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// The region the resource lives in.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The resource-type tag.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// The caller-assigned name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks that the reference carries the expected resource type.
    pub fn expect_type(&self, expected: &'static str) -> Result<&Self, NameError> {
        if self.resource_type == expected {
            Ok(self)
        } else {
            Err(NameError::TypeMismatch {
                expected,
                actual: self.resource_type.clone(),
            })
        }
    }
}

impl std::fmt::Display for Srn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "srn:{}:{}:{}/{}",
            self.account, self.region, self.resource_type, self.name
        )
    }
}

impl std::str::FromStr for Srn {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for Srn {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Srn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srn_roundtrip() {
        let srn = Srn::new("884515231596", "eu-central-1", "job-template", "starter");
        let s = srn.to_string();
        assert_eq!(s, "srn:884515231596:eu-central-1:job-template/starter");

        let parsed = Srn::parse(&s).unwrap();
        assert_eq!(parsed, srn);
    }

    #[test]
    fn test_srn_missing_prefix() {
        let result = Srn::parse("884515231596:eu-central-1:job-template/starter");
        assert!(matches!(result, Err(NameError::InvalidReference { .. })));
    }

    #[test]
    fn test_srn_missing_slash() {
        let result = Srn::parse("srn:acct:region:job-template");
        assert!(matches!(result, Err(NameError::InvalidReference { .. })));
    }

    #[test]
    fn test_srn_empty_parts() {
        assert!(Srn::parse("srn:::job-template/starter").is_err());
        assert!(Srn::parse("srn:acct:region:/starter").is_err());
        assert!(Srn::parse("srn:acct:region:job-template/").is_err());
    }

    #[test]
    fn test_expect_type() {
        let srn = Srn::new("acct", "region", "secret", "api-key");
        assert!(srn.expect_type("secret").is_ok());
        assert!(matches!(
            srn.expect_type("job-template"),
            Err(NameError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_srn_json_roundtrip() {
        let srn = Srn::new("acct", "region", "capacity-tier", "high-capacity");
        let json = serde_json::to_string(&srn).unwrap();
        let parsed: Srn = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, srn);
    }
}
