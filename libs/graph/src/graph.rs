//! Resource graph assembly and compilation.

use std::collections::BTreeMap;

use spotgrid_id::{IdentityName, PerimeterName, QueueName, SecretName, TemplateName, TierName};
use spotgrid_model::{
    CapacityTier, DispatchQueue, ExecutionIdentity, JobTemplate, Permission, SecretRef,
};
use spotgrid_networking::NetworkPerimeter;
use tracing::{debug, info, instrument};

use crate::env::EnvironmentContext;
use crate::error::GraphError;
use crate::render::{self, RenderedGraph, RenderedResource};
use crate::transform::SecretInjection;

/// A declared resource graph for one environment target.
///
/// Collects components under caller-assigned names; duplicates are
/// rejected at insertion, dangling references at [`compile`](Self::compile).
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    environment: EnvironmentContext,
    perimeters: BTreeMap<PerimeterName, NetworkPerimeter>,
    tiers: BTreeMap<TierName, CapacityTier>,
    queues: BTreeMap<QueueName, DispatchQueue>,
    identities: BTreeMap<IdentityName, ExecutionIdentity>,
    templates: BTreeMap<TemplateName, JobTemplate>,
    secrets: BTreeMap<SecretName, SecretRef>,
}

impl ResourceGraph {
    /// Start an empty graph for an environment target.
    #[must_use]
    pub fn new(environment: EnvironmentContext) -> Self {
        Self {
            environment,
            perimeters: BTreeMap::new(),
            tiers: BTreeMap::new(),
            queues: BTreeMap::new(),
            identities: BTreeMap::new(),
            templates: BTreeMap::new(),
            secrets: BTreeMap::new(),
        }
    }

    /// The environment this graph targets.
    #[must_use]
    pub fn environment(&self) -> &EnvironmentContext {
        &self.environment
    }

    /// Add a network perimeter.
    pub fn add_perimeter(&mut self, perimeter: NetworkPerimeter) -> Result<(), GraphError> {
        let name = perimeter.name().clone();
        if self.perimeters.contains_key(&name) {
            return Err(GraphError::DuplicateName {
                kind: "network-perimeter",
                name: name.to_string(),
            });
        }
        self.perimeters.insert(name, perimeter);
        Ok(())
    }

    /// Add a capacity tier.
    pub fn add_tier(&mut self, tier: CapacityTier) -> Result<(), GraphError> {
        let name = tier.name().clone();
        if self.tiers.contains_key(&name) {
            return Err(GraphError::DuplicateName {
                kind: "capacity-tier",
                name: name.to_string(),
            });
        }
        self.tiers.insert(name, tier);
        Ok(())
    }

    /// Add a dispatch queue.
    pub fn add_queue(&mut self, queue: DispatchQueue) -> Result<(), GraphError> {
        let name = queue.name().clone();
        if self.queues.contains_key(&name) {
            return Err(GraphError::DuplicateName {
                kind: "dispatch-queue",
                name: name.to_string(),
            });
        }
        self.queues.insert(name, queue);
        Ok(())
    }

    /// Add an execution identity.
    pub fn add_identity(&mut self, identity: ExecutionIdentity) -> Result<(), GraphError> {
        let name = identity.name().clone();
        if self.identities.contains_key(&name) {
            return Err(GraphError::DuplicateName {
                kind: "execution-identity",
                name: name.to_string(),
            });
        }
        self.identities.insert(name, identity);
        Ok(())
    }

    /// Add a job template.
    pub fn add_template(&mut self, template: JobTemplate) -> Result<(), GraphError> {
        let name = template.name().clone();
        if self.templates.contains_key(&name) {
            return Err(GraphError::DuplicateName {
                kind: "job-template",
                name: name.to_string(),
            });
        }
        self.templates.insert(name, template);
        Ok(())
    }

    /// Register a vault secret so templates and identities may
    /// reference it.
    pub fn register_secret(
        &mut self,
        name: SecretName,
        secret: SecretRef,
    ) -> Result<(), GraphError> {
        if self.secrets.contains_key(&name) {
            return Err(GraphError::DuplicateName {
                kind: "secret",
                name: name.to_string(),
            });
        }
        self.secrets.insert(name, secret);
        Ok(())
    }

    /// Compile the declared graph into its rendered form.
    ///
    /// Checks referential integrity, renders every resource, and
    /// applies the post-render secret-injection transform. Compiling
    /// the same graph twice yields identical output.
    #[instrument(skip(self), fields(environment = %self.environment))]
    pub fn compile(&self) -> Result<RenderedGraph, GraphError> {
        self.check_integrity()?;

        let env = &self.environment;
        let mut resources: BTreeMap<String, RenderedResource> = BTreeMap::new();

        for perimeter in self.perimeters.values() {
            insert(&mut resources, render::render_perimeter(env, perimeter));
        }
        for tier in self.tiers.values() {
            insert(&mut resources, render::render_tier(env, tier));
        }
        for queue in self.queues.values() {
            insert(&mut resources, render::render_queue(env, queue));
        }
        for identity in self.identities.values() {
            insert(&mut resources, render::render_identity(env, identity));
        }
        for secret in self.secrets.values() {
            insert(&mut resources, render::render_secret(secret));
        }

        for template in self.templates.values() {
            let mut rendered = render::render_template(env, template);

            if let Some(identity) = template.execution_identity() {
                let identity_srn = env.srn("execution-identity", identity.as_str());
                let transform = SecretInjection::new(template.secret_bindings(), identity_srn);
                transform.apply(&mut rendered)?;
            }

            insert(&mut resources, rendered);
        }

        debug!(resource_count = resources.len(), "Rendered resource graph");
        let graph = RenderedGraph::new(self.environment.clone(), resources);
        info!(hash = %graph.hash(), "Graph compiled");

        Ok(graph)
    }

    /// Verify that nothing references a resource absent from the graph.
    fn check_integrity(&self) -> Result<(), GraphError> {
        for tier in self.tiers.values() {
            if !self.perimeters.contains_key(tier.network()) {
                return Err(GraphError::MissingReference {
                    resource: format!("capacity-tier '{}'", tier.name()),
                    missing: format!("network-perimeter '{}'", tier.network()),
                });
            }
        }

        for queue in self.queues.values() {
            let mut expected_perimeter: Option<&PerimeterName> = None;
            for entry in queue.tiers() {
                let Some(tier) = self.tiers.get(&entry.tier) else {
                    return Err(GraphError::MissingReference {
                        resource: format!("dispatch-queue '{}'", queue.name()),
                        missing: format!("capacity-tier '{}'", entry.tier),
                    });
                };

                match expected_perimeter {
                    None => expected_perimeter = Some(tier.network()),
                    Some(expected) if expected != tier.network() => {
                        return Err(GraphError::QueuePerimeterMismatch {
                            queue: queue.name().to_string(),
                            tier: tier.name().to_string(),
                            expected: expected.to_string(),
                            actual: tier.network().to_string(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        for identity in self.identities.values() {
            for permission in identity.permissions() {
                if let Permission::ReadSecret(srn) = permission {
                    let known = self.secrets.values().any(|s| s.srn() == srn);
                    if !known {
                        return Err(GraphError::MissingReference {
                            resource: format!("execution-identity '{}'", identity.name()),
                            missing: format!("secret '{}'", srn),
                        });
                    }
                }
            }
        }

        for template in self.templates.values() {
            let identity = match template.execution_identity() {
                Some(name) => match self.identities.get(name) {
                    Some(identity) => Some(identity),
                    None => {
                        return Err(GraphError::MissingReference {
                            resource: format!("job-template '{}'", template.name()),
                            missing: format!("execution-identity '{}'", name),
                        });
                    }
                },
                None => None,
            };

            if !template.secret_bindings().is_empty() && identity.is_none() {
                return Err(GraphError::NoIdentityForSecrets {
                    template: template.name().to_string(),
                });
            }

            for binding in template.secret_bindings() {
                let known = self
                    .secrets
                    .values()
                    .any(|s| s.srn() == binding.secret.srn());
                if !known {
                    return Err(GraphError::MissingReference {
                        resource: format!("job-template '{}'", template.name()),
                        missing: format!("secret '{}'", binding.secret.srn()),
                    });
                }

                if let Some(identity) = identity {
                    if !identity.can_read(&binding.secret) {
                        return Err(GraphError::MissingGrant {
                            template: template.name().to_string(),
                            identity: identity.name().to_string(),
                            secret: binding.secret.srn().to_string(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

fn insert(resources: &mut BTreeMap<String, RenderedResource>, resource: RenderedResource) {
    resources.insert(resource.srn.to_string(), resource);
}
