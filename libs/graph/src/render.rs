//! Deterministic rendering of declared components to resource
//! properties.
//!
//! Rendering is pure: the same component in the same environment always
//! produces the same JSON. Property objects are key-sorted, so the
//! serialized form is canonical and the graph hash is stable.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use spotgrid_id::Srn;
use spotgrid_model::{
    CapacityTier, DispatchQueue, ExecutionIdentity, InstanceFamilies, JobTemplate, PriceStrategy,
    SecretRef,
};
use spotgrid_networking::NetworkPerimeter;

use crate::env::EnvironmentContext;

/// The kind of a rendered resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    JobTemplate,
    CapacityTier,
    DispatchQueue,
    NetworkPerimeter,
    ExecutionIdentity,
    Secret,
}

impl ResourceKind {
    /// The resource-type tag used in references.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::JobTemplate => "job-template",
            ResourceKind::CapacityTier => "capacity-tier",
            ResourceKind::DispatchQueue => "dispatch-queue",
            ResourceKind::NetworkPerimeter => "network-perimeter",
            ResourceKind::ExecutionIdentity => "execution-identity",
            ResourceKind::Secret => "secret",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One rendered resource: a reference plus its low-level properties.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RenderedResource {
    pub srn: Srn,
    pub kind: ResourceKind,
    pub properties: Value,
}

/// Deterministic content hash of a rendered graph.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct GraphHash(String);

impl GraphHash {
    /// Hash a JSON value's canonical serialization.
    ///
    /// `serde_json` objects are key-sorted, so serialization is already
    /// canonical for values built from sorted maps. Serializing a
    /// `Value` is infallible (object keys are always strings), so this
    /// goes through `to_string` rather than a fallible byte path.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let canonical = value.to_string();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        Self(format!("sha256:{}", hex::encode(hasher.finalize())))
    }

    /// The hash string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GraphHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully rendered, content-hashed resource graph ready for a
/// provisioner.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RenderedGraph {
    environment: EnvironmentContext,
    resources: BTreeMap<String, RenderedResource>,
    hash: GraphHash,
}

impl RenderedGraph {
    /// Assemble a graph from rendered resources and compute its hash.
    #[must_use]
    pub fn new(
        environment: EnvironmentContext,
        resources: BTreeMap<String, RenderedResource>,
    ) -> Self {
        let body = json!({
            "environment": {
                "account": environment.account(),
                "region": environment.region(),
            },
            "resources": resources
                .iter()
                .map(|(srn, r)| (srn.clone(), r.properties.clone()))
                .collect::<BTreeMap<String, Value>>(),
        });
        let hash = GraphHash::from_value(&body);

        Self {
            environment,
            resources,
            hash,
        }
    }

    /// The environment this graph targets.
    #[must_use]
    pub fn environment(&self) -> &EnvironmentContext {
        &self.environment
    }

    /// All rendered resources, keyed by reference and sorted.
    #[must_use]
    pub fn resources(&self) -> &BTreeMap<String, RenderedResource> {
        &self.resources
    }

    /// Look up a rendered resource by reference.
    #[must_use]
    pub fn get(&self, srn: &Srn) -> Option<&RenderedResource> {
        self.resources.get(&srn.to_string())
    }

    /// The graph's content hash.
    #[must_use]
    pub fn hash(&self) -> &GraphHash {
        &self.hash
    }
}

fn secret_entry(secret: &SecretRef) -> Value {
    json!({ "reference": secret.value_from() })
}

pub(crate) fn render_perimeter(
    env: &EnvironmentContext,
    perimeter: &NetworkPerimeter,
) -> RenderedResource {
    let rules: Vec<Value> = perimeter
        .allowed_inbound()
        .iter()
        .map(|rule| {
            json!({
                "source": rule.source().to_string(),
                "protocol": rule.protocol().as_str(),
                "ports": rule.ports().map(|p| p.to_string()),
                "description": rule.description(),
            })
        })
        .collect();

    RenderedResource {
        srn: env.srn("network-perimeter", perimeter.name().as_str()),
        kind: ResourceKind::NetworkPerimeter,
        properties: json!({
            "addressBlock": perimeter.address_block().to_string(),
            "allowedInbound": rules,
        }),
    }
}

pub(crate) fn render_tier(env: &EnvironmentContext, tier: &CapacityTier) -> RenderedResource {
    let price_strategy = match tier.price_strategy() {
        PriceStrategy::Spot { bid_percentage } => json!({
            "type": "spot",
            "bidPercentage": bid_percentage,
        }),
        PriceStrategy::OnDemand => json!({ "type": "on-demand" }),
    };

    let instance_families = match tier.instance_families() {
        InstanceFamilies::ProviderOptimal => json!("provider-optimal"),
        InstanceFamilies::Explicit(families) => json!(families
            .iter()
            .map(|f| json!({
                "name": f.name,
                "vcpus": f.vcpus,
                "memoryMib": f.memory_mib,
            }))
            .collect::<Vec<Value>>()),
    };

    RenderedResource {
        srn: env.srn("capacity-tier", tier.name().as_str()),
        kind: ResourceKind::CapacityTier,
        properties: json!({
            "priceStrategy": price_strategy,
            "minVcpus": tier.min_vcpus(),
            "maxVcpus": tier.max_vcpus(),
            "network": env.srn("network-perimeter", tier.network().as_str()).to_string(),
            "instanceFamilies": instance_families,
        }),
    }
}

pub(crate) fn render_queue(env: &EnvironmentContext, queue: &DispatchQueue) -> RenderedResource {
    let tiers: Vec<Value> = queue
        .tiers()
        .iter()
        .map(|entry| {
            json!({
                "tier": env.srn("capacity-tier", entry.tier.as_str()).to_string(),
                "order": entry.order,
            })
        })
        .collect();

    RenderedResource {
        srn: env.srn("dispatch-queue", queue.name().as_str()),
        kind: ResourceKind::DispatchQueue,
        properties: json!({ "tiers": tiers }),
    }
}

pub(crate) fn render_identity(
    env: &EnvironmentContext,
    identity: &ExecutionIdentity,
) -> RenderedResource {
    let permissions: Vec<String> = identity
        .permissions()
        .iter()
        .map(|p| p.to_string())
        .collect();

    RenderedResource {
        srn: env.srn("execution-identity", identity.name().as_str()),
        kind: ResourceKind::ExecutionIdentity,
        properties: json!({
            "principal": identity.principal().as_str(),
            "permissions": permissions,
        }),
    }
}

pub(crate) fn render_secret(secret: &SecretRef) -> RenderedResource {
    RenderedResource {
        srn: secret.srn().clone(),
        kind: ResourceKind::Secret,
        properties: secret_entry(secret),
    }
}

/// Render a job template.
///
/// Secret bindings and the execution-identity reference are *not*
/// rendered here; the post-render transform injects them, matching the
/// one place the system reaches below its declarative model.
pub(crate) fn render_template(
    env: &EnvironmentContext,
    template: &JobTemplate,
) -> RenderedResource {
    let command: Vec<String> = template.command().iter().map(|a| a.to_string()).collect();

    RenderedResource {
        srn: env.srn("job-template", template.name().as_str()),
        kind: ResourceKind::JobTemplate,
        properties: json!({
            "image": template.image().uri(),
            "parameters": template.parameters(),
            // Propagated unmodified; the substrate enforces it.
            "timeoutSeconds": template.timeout().as_secs(),
            "containerProperties": {
                "command": command,
                "vcpus": template.vcpus(),
                "memoryReservationMib": template.memory_mib(),
                "readOnlyRootFilesystem": template.read_only_root(),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotgrid_id::{PerimeterName, TemplateName, TierName};
    use spotgrid_model::ImageSource;
    use std::time::Duration;

    fn env() -> EnvironmentContext {
        EnvironmentContext::new("884515231596", "eu-central-1").unwrap()
    }

    #[test]
    fn test_render_template_excludes_secrets() {
        let template = JobTemplate::builder(
            TemplateName::new("starter-task").unwrap(),
            ImageSource::new("robofarm/batch-starter", "latest").unwrap(),
        )
        .command(["run.sh"])
        .timeout(Duration::from_secs(600))
        .build()
        .unwrap();

        let rendered = render_template(&env(), &template);
        assert_eq!(rendered.kind, ResourceKind::JobTemplate);
        assert_eq!(rendered.properties["timeoutSeconds"], 600);
        assert_eq!(
            rendered.properties["containerProperties"]["readOnlyRootFilesystem"],
            true
        );
        // Injected by the post-render transform, never by rendering.
        assert!(rendered.properties["containerProperties"]
            .get("secrets")
            .is_none());
    }

    #[test]
    fn test_render_tier_min_is_zero() {
        let tier = CapacityTier::builder(
            TierName::new("high-capacity").unwrap(),
            PriceStrategy::Spot { bid_percentage: 75 },
            PerimeterName::new("batch-perimeter").unwrap(),
        )
        .min_vcpus(4)
        .max_vcpus(8)
        .build()
        .unwrap();

        let rendered = render_tier(&env(), &tier);
        assert_eq!(rendered.properties["minVcpus"], 0);
        assert_eq!(rendered.properties["maxVcpus"], 8);
        assert_eq!(rendered.properties["priceStrategy"]["bidPercentage"], 75);
        assert_eq!(rendered.properties["instanceFamilies"], "provider-optimal");
    }

    #[test]
    fn test_graph_hash_is_deterministic() {
        let a = json!({"b": 2, "a": 1});
        let b = json!({"a": 1, "b": 2});
        assert_eq!(GraphHash::from_value(&a), GraphHash::from_value(&b));
        assert!(GraphHash::from_value(&a).as_str().starts_with("sha256:"));
    }

    #[test]
    fn test_graph_hash_distinguishes_values() {
        let a = GraphHash::from_value(&json!({"a": 1}));
        let b = GraphHash::from_value(&json!({"a": 2}));
        assert_ne!(a, b);

        let empty = GraphHash::from_value(&json!({}));
        assert_ne!(a, empty);
    }
}
