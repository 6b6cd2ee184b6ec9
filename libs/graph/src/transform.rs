//! Post-render transforms.
//!
//! The declarative template model does not expose secret injection or
//! execution-identity binding directly; this module patches the
//! *rendered* container properties after graph construction. It is the
//! single place the system reaches below its declarative abstraction,
//! and therefore the highest-risk point for breakage when the rendered
//! model changes shape. The shape is checked on every application and
//! any mismatch fails loudly.

use serde_json::{json, Value};
use spotgrid_id::Srn;
use spotgrid_model::SecretBinding;

use crate::error::OverrideError;
use crate::render::RenderedResource;

/// Injects secret bindings and the execution-identity reference into a
/// rendered job template.
///
/// Applying the same transform twice yields byte-identical properties.
#[derive(Debug, Clone)]
pub struct SecretInjection {
    secrets: Vec<(String, String)>,
    identity: Srn,
}

impl SecretInjection {
    /// Build a transform from a template's bindings and identity.
    #[must_use]
    pub fn new(bindings: &[SecretBinding], identity: Srn) -> Self {
        let secrets = bindings
            .iter()
            .map(|b| (b.env_var.clone(), b.secret.value_from()))
            .collect();
        Self { secrets, identity }
    }

    /// Patch the rendered resource's container properties.
    ///
    /// Fails with [`OverrideError::UnsupportedShape`] when the rendered
    /// structure does not look like a job template, and with
    /// [`OverrideError::ConflictingBinding`] when an existing entry
    /// targets the same environment variable with a different source.
    pub fn apply(&self, resource: &mut RenderedResource) -> Result<(), OverrideError> {
        let resource_id = resource.srn.to_string();

        let container = resource
            .properties
            .get_mut("containerProperties")
            .ok_or_else(|| OverrideError::UnsupportedShape {
                resource: resource_id.clone(),
                detail: "missing 'containerProperties'".to_string(),
            })?;

        let container = container
            .as_object_mut()
            .ok_or_else(|| OverrideError::UnsupportedShape {
                resource: resource_id.clone(),
                detail: "'containerProperties' is not an object".to_string(),
            })?;

        // Existing entries must have the shape we would have written.
        let mut entries: Vec<(String, String)> = match container.get("secrets") {
            None => Vec::new(),
            Some(Value::Array(existing)) => {
                let mut entries = Vec::with_capacity(existing.len());
                for entry in existing {
                    let (Some(name), Some(value_from)) = (
                        entry.get("name").and_then(Value::as_str),
                        entry.get("valueFrom").and_then(Value::as_str),
                    ) else {
                        return Err(OverrideError::UnsupportedShape {
                            resource: resource_id.clone(),
                            detail: "'secrets' entry is not {name, valueFrom}".to_string(),
                        });
                    };
                    entries.push((name.to_string(), value_from.to_string()));
                }
                entries
            }
            Some(_) => {
                return Err(OverrideError::UnsupportedShape {
                    resource: resource_id.clone(),
                    detail: "'secrets' is not a list".to_string(),
                });
            }
        };

        for (env_var, value_from) in &self.secrets {
            match entries.iter().find(|(name, _)| name == env_var) {
                // Already present with the same source: idempotent no-op.
                Some((_, existing)) if existing == value_from => {}
                Some(_) => {
                    return Err(OverrideError::ConflictingBinding {
                        resource: resource_id.clone(),
                        env_var: env_var.clone(),
                    });
                }
                None => entries.push((env_var.clone(), value_from.clone())),
            }
        }

        entries.sort();
        container.insert(
            "secrets".to_string(),
            Value::Array(
                entries
                    .iter()
                    .map(|(name, value_from)| json!({ "name": name, "valueFrom": value_from }))
                    .collect(),
            ),
        );

        container.insert(
            "executionRoleRef".to_string(),
            Value::String(self.identity.to_string()),
        );

        Ok(())
    }
}
