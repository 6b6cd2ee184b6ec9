//! Container image references.

use crate::ValidationError;

/// Reference to an immutable container image: registry path plus a tag or
/// digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageSource {
    repository: String,
    reference: ImageReference,
}

/// Tag or digest portion of an image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageReference {
    /// A mutable tag (e.g., `latest`).
    Tag(String),

    /// A content digest (`sha256:` + 64 hex characters).
    Digest(String),
}

impl ImageSource {
    /// Create a tagged image reference.
    pub fn new(
        repository: impl Into<String>,
        tag: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let repository = repository.into();
        let tag = tag.into();
        validate_repository(&repository)?;
        validate_tag(&tag)?;
        Ok(Self {
            repository,
            reference: ImageReference::Tag(tag),
        })
    }

    /// Create a digest-pinned image reference.
    pub fn with_digest(
        repository: impl Into<String>,
        digest: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let repository = repository.into();
        let digest = digest.into();
        validate_repository(&repository)?;
        validate_digest(&digest)?;
        Ok(Self {
            repository,
            reference: ImageReference::Digest(digest),
        })
    }

    /// The registry path (e.g., `robofarm/batch-starter`).
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// The tag or digest.
    #[must_use]
    pub fn reference(&self) -> &ImageReference {
        &self.reference
    }

    /// Full pullable image URI.
    #[must_use]
    pub fn uri(&self) -> String {
        match &self.reference {
            ImageReference::Tag(tag) => format!("{}:{}", self.repository, tag),
            ImageReference::Digest(digest) => format!("{}@{}", self.repository, digest),
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri())
    }
}

fn validate_repository(repository: &str) -> Result<(), ValidationError> {
    if repository.is_empty() {
        return Err(ValidationError::InvalidImage {
            reason: "repository cannot be empty".to_string(),
        });
    }

    for (index, segment) in repository.split('/').enumerate() {
        if segment.is_empty() {
            return Err(ValidationError::InvalidImage {
                reason: format!("empty path segment in '{repository}'"),
            });
        }

        // The leading segment may be a registry host with a port.
        let segment = match (index, segment.split_once(':')) {
            (0, Some((host, port))) => {
                if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
                    return Err(ValidationError::InvalidImage {
                        reason: format!("invalid registry port in '{segment}'"),
                    });
                }
                host
            }
            (_, Some(_)) => {
                return Err(ValidationError::InvalidImage {
                    reason: format!("invalid characters in path segment '{segment}'"),
                });
            }
            (_, None) => segment,
        };

        let ok = segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'));
        if !ok {
            return Err(ValidationError::InvalidImage {
                reason: format!("invalid characters in path segment '{segment}'"),
            });
        }
    }

    Ok(())
}

fn validate_tag(tag: &str) -> Result<(), ValidationError> {
    if tag.is_empty() || tag.len() > 128 {
        return Err(ValidationError::InvalidImage {
            reason: "tag must be 1-128 characters".to_string(),
        });
    }
    let ok = tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if !ok {
        return Err(ValidationError::InvalidImage {
            reason: format!("invalid characters in tag '{tag}'"),
        });
    }
    Ok(())
}

fn validate_digest(digest: &str) -> Result<(), ValidationError> {
    let Some(hex) = digest.strip_prefix("sha256:") else {
        return Err(ValidationError::InvalidImage {
            reason: "digest must start with 'sha256:'".to_string(),
        });
    };
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidImage {
            reason: "digest must be 64 hex characters".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_image_uri() {
        let image = ImageSource::new("robofarm/batch-starter", "latest").unwrap();
        assert_eq!(image.uri(), "robofarm/batch-starter:latest");
    }

    #[test]
    fn test_digest_image_uri() {
        let digest = format!("sha256:{}", "ab".repeat(32));
        let image = ImageSource::with_digest("robofarm/batch-starter", &digest).unwrap();
        assert_eq!(image.uri(), format!("robofarm/batch-starter@{digest}"));
    }

    #[test]
    fn test_rejects_bad_repository() {
        assert!(ImageSource::new("", "latest").is_err());
        assert!(ImageSource::new("Robofarm/starter", "latest").is_err());
        assert!(ImageSource::new("robofarm//starter", "latest").is_err());
    }

    #[test]
    fn test_registry_host_with_port() {
        let image = ImageSource::new("registry.example:5000/acme/worker", "v2").unwrap();
        assert_eq!(image.uri(), "registry.example:5000/acme/worker:v2");

        // Ports are digits only and only valid in the leading segment.
        assert!(ImageSource::new("registry.example:latest/worker", "v2").is_err());
        assert!(ImageSource::new("acme/worker:5000/app", "v2").is_err());
    }

    #[test]
    fn test_rejects_bad_tag() {
        assert!(ImageSource::new("robofarm/starter", "").is_err());
        assert!(ImageSource::new("robofarm/starter", "la test").is_err());
    }

    #[test]
    fn test_rejects_bad_digest() {
        assert!(ImageSource::with_digest("robofarm/starter", "deadbeef").is_err());
        assert!(ImageSource::with_digest("robofarm/starter", "sha256:dead").is_err());
    }
}
