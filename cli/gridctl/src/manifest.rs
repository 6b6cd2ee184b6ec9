//! Stack manifest parsing.
//!
//! v1 contract: one TOML file declares the full stack for one
//! environment target. The manifest hash is computed from a
//! canonicalized representation of the TOML, so formatting and key
//! order never change it.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::CliError;

use spotgrid_graph::{EnvironmentContext, ResourceGraph};
use spotgrid_id::{IdentityName, PerimeterName, QueueName, SecretName, TemplateName, TierName};
use spotgrid_model::{
    CapacityTier, CredentialVault, DispatchQueue, ExecutionIdentity, ImageSource, InstanceFamily,
    JobTemplate, MemoryVault, PriceStrategy, SecretRef, SecretValue, TierEntry,
};
use spotgrid_networking::{
    IngressRule, IngressSource, Ipv4Cidr, NetworkPerimeter, PortRange, Protocol,
};

const SCHEMA_VERSION: &str = "v1";

/// A full stack declaration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub schema_version: String,
    pub environment: EnvironmentDecl,

    #[serde(default, rename = "perimeter")]
    pub perimeters: Vec<PerimeterDecl>,

    #[serde(default, rename = "tier")]
    pub tiers: Vec<TierDecl>,

    #[serde(default, rename = "queue")]
    pub queues: Vec<QueueDecl>,

    #[serde(default, rename = "secret")]
    pub secrets: Vec<SecretDecl>,

    #[serde(default, rename = "identity")]
    pub identities: Vec<IdentityDecl>,

    #[serde(default, rename = "template")]
    pub templates: Vec<TemplateDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentDecl {
    pub account: String,
    pub region: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PerimeterDecl {
    pub name: String,
    pub address_block: String,

    #[serde(default, rename = "inbound")]
    pub inbound: Vec<InboundDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InboundDecl {
    pub source: String,
    pub protocol: String,

    #[serde(default)]
    pub ports: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierDecl {
    pub name: String,
    pub network: String,
    pub price: PriceDecl,

    #[serde(default)]
    pub max_vcpus: Option<u32>,

    #[serde(default, rename = "instance_family")]
    pub instance_families: Vec<InstanceFamilyDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum PriceDecl {
    Spot { bid_percentage: u8 },
    OnDemand,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstanceFamilyDecl {
    pub name: String,
    pub vcpus: u32,
    pub memory_mib: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueDecl {
    pub name: String,

    #[serde(rename = "tier")]
    pub tiers: Vec<QueueTierDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueueTierDecl {
    pub name: String,
    pub order: u32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretDecl {
    pub name: String,

    /// Optional key within the secret.
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityDecl {
    pub name: String,

    /// Names of declared secrets this identity may read.
    #[serde(default)]
    pub secrets: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateDecl {
    pub name: String,
    pub image: String,
    pub timeout_seconds: u64,
    pub command: Vec<String>,

    #[serde(default)]
    pub vcpus: Option<u32>,

    #[serde(default)]
    pub memory_mib: Option<u32>,

    #[serde(default)]
    pub read_only_root: Option<bool>,

    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    #[serde(default)]
    pub identity: Option<String>,

    #[serde(default, rename = "secret")]
    pub secrets: Vec<TemplateSecretDecl>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSecretDecl {
    pub env_var: String,
    pub secret: String,
}

/// Parse a manifest from TOML text.
pub fn parse(contents: &str) -> Result<Manifest> {
    let manifest: Manifest = toml::from_str(contents).context("invalid manifest TOML")?;
    if manifest.schema_version != SCHEMA_VERSION {
        bail!(
            "unsupported schema_version '{}' (expected '{}')",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

/// Read and parse a manifest file.
pub fn load(path: &Path) -> Result<Manifest> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest: {}", path.display()))?;
    parse(&contents).map_err(|e| {
        CliError::Manifest {
            path: path.display().to_string(),
            message: format!("{e:#}"),
        }
        .into()
    })
}

/// Compute the canonical content hash of a manifest.
pub fn manifest_hash(contents: &str) -> Result<String> {
    let value: toml::Value = toml::from_str(contents).context("invalid manifest TOML")?;
    if !value.is_table() {
        bail!("manifest must be a TOML table (key/value pairs at top-level)");
    }

    let json_value = serde_json::to_value(&value).context("failed to canonicalize manifest")?;
    let canonical_json =
        serde_json::to_vec(&json_value).context("failed to serialize manifest for hashing")?;

    let mut hasher = Sha256::new();
    hasher.update(&canonical_json);
    Ok(format!("sha256:{:x}", hasher.finalize()))
}

/// Build a declared resource graph from a parsed manifest.
///
/// Secrets are minted in an in-memory vault scoped to the manifest's
/// environment; identity grants are registered as part of identity
/// construction.
pub fn build_graph(manifest: &Manifest) -> Result<ResourceGraph> {
    let env = EnvironmentContext::new(
        &manifest.environment.account,
        &manifest.environment.region,
    )?;
    let mut graph = ResourceGraph::new(env);
    let mut vault = MemoryVault::new(
        &manifest.environment.account,
        &manifest.environment.region,
    );

    let mut secret_refs: BTreeMap<&str, SecretRef> = BTreeMap::new();
    for decl in &manifest.secrets {
        let name = SecretName::new(&decl.name)
            .with_context(|| format!("invalid secret name '{}'", decl.name))?;
        let mut secret = vault.create_secret(&name, SecretValue::empty())?;
        if let Some(key) = &decl.key {
            secret = secret.with_key(key);
        }
        secret_refs.insert(decl.name.as_str(), secret.clone());
        graph.register_secret(name, secret)?;
    }

    for decl in &manifest.identities {
        let name = IdentityName::new(&decl.name)
            .with_context(|| format!("invalid identity name '{}'", decl.name))?;
        let mut identity = ExecutionIdentity::for_job_execution(name);
        for secret_name in &decl.secrets {
            let secret = secret_refs.get(secret_name.as_str()).with_context(|| {
                format!(
                    "identity '{}' references undeclared secret '{}'",
                    decl.name, secret_name
                )
            })?;
            identity.bind_secret_read(&mut vault, secret)?;
        }
        graph.add_identity(identity)?;
    }

    for decl in &manifest.perimeters {
        graph.add_perimeter(build_perimeter(decl)?)?;
    }

    for decl in &manifest.tiers {
        graph.add_tier(build_tier(decl)?)?;
    }

    for decl in &manifest.queues {
        let name = QueueName::new(&decl.name)
            .with_context(|| format!("invalid queue name '{}'", decl.name))?;
        let mut entries = Vec::with_capacity(decl.tiers.len());
        for entry in &decl.tiers {
            entries.push(TierEntry {
                tier: TierName::new(&entry.name)
                    .with_context(|| format!("invalid tier name '{}'", entry.name))?,
                order: entry.order,
            });
        }
        graph.add_queue(DispatchQueue::new(name, entries)?)?;
    }

    for decl in &manifest.templates {
        graph.add_template(build_template(decl, &secret_refs)?)?;
    }

    Ok(graph)
}

fn build_perimeter(decl: &PerimeterDecl) -> Result<NetworkPerimeter> {
    let name = PerimeterName::new(&decl.name)
        .with_context(|| format!("invalid perimeter name '{}'", decl.name))?;
    let address_block = Ipv4Cidr::from_cidr(&decl.address_block)
        .with_context(|| format!("invalid address block '{}'", decl.address_block))?;

    let mut perimeter = NetworkPerimeter::new(name, address_block);
    for inbound in &decl.inbound {
        let source = IngressSource::parse(&inbound.source)
            .with_context(|| format!("invalid inbound source '{}'", inbound.source))?;
        let protocol: Protocol = inbound
            .protocol
            .parse()
            .with_context(|| format!("invalid protocol '{}'", inbound.protocol))?;

        let mut rule = match (protocol, &inbound.ports) {
            (Protocol::Icmp, None) => IngressRule::icmp(source),
            (Protocol::Icmp, Some(_)) => {
                bail!("inbound rule for perimeter '{}': icmp takes no ports", decl.name)
            }
            (protocol, Some(ports)) => {
                let ports = PortRange::parse(ports)
                    .with_context(|| format!("invalid port range '{}'", ports))?;
                IngressRule::new(source, protocol, ports)?
            }
            (_, None) => bail!(
                "inbound rule for perimeter '{}': {} requires ports",
                decl.name,
                protocol
            ),
        };
        if let Some(description) = &inbound.description {
            rule = rule.with_description(description);
        }
        perimeter = perimeter.allow_inbound(rule);
    }

    Ok(perimeter)
}

fn build_tier(decl: &TierDecl) -> Result<CapacityTier> {
    let name = TierName::new(&decl.name)
        .with_context(|| format!("invalid tier name '{}'", decl.name))?;
    let network = PerimeterName::new(&decl.network)
        .with_context(|| format!("invalid perimeter name '{}'", decl.network))?;

    let price = match decl.price {
        PriceDecl::Spot { bid_percentage } => PriceStrategy::Spot { bid_percentage },
        PriceDecl::OnDemand => PriceStrategy::OnDemand,
    };

    let mut builder = CapacityTier::builder(name, price, network);
    if let Some(max_vcpus) = decl.max_vcpus {
        builder = builder.max_vcpus(max_vcpus);
    }
    for family in &decl.instance_families {
        builder = builder.instance_family(InstanceFamily::new(
            &family.name,
            family.vcpus,
            family.memory_mib,
        ));
    }

    Ok(builder.build()?)
}

fn build_template(
    decl: &TemplateDecl,
    secret_refs: &BTreeMap<&str, SecretRef>,
) -> Result<JobTemplate> {
    let name = TemplateName::new(&decl.name)
        .with_context(|| format!("invalid template name '{}'", decl.name))?;
    let image = parse_image(&decl.image)
        .with_context(|| format!("invalid image '{}'", decl.image))?;

    let mut builder = JobTemplate::builder(name, image)
        .command(decl.command.iter().cloned())
        .timeout(Duration::from_secs(decl.timeout_seconds));

    if let Some(vcpus) = decl.vcpus {
        builder = builder.vcpus(vcpus);
    }
    if let Some(memory_mib) = decl.memory_mib {
        builder = builder.memory_mib(memory_mib);
    }
    if let Some(read_only) = decl.read_only_root {
        builder = builder.read_only_root(read_only);
    }
    for (param, default) in &decl.parameters {
        builder = builder.parameter(param, default);
    }
    if let Some(identity) = &decl.identity {
        builder = builder.execution_identity(
            IdentityName::new(identity)
                .with_context(|| format!("invalid identity name '{}'", identity))?,
        );
    }
    for binding in &decl.secrets {
        let secret = secret_refs.get(binding.secret.as_str()).with_context(|| {
            format!(
                "template '{}' references undeclared secret '{}'",
                decl.name, binding.secret
            )
        })?;
        builder = builder.secret(&binding.env_var, secret.clone());
    }

    Ok(builder.build()?)
}

/// Parse an image reference in `repo:tag` or `repo@sha256:<hex>` form.
fn parse_image(image: &str) -> Result<ImageSource> {
    if let Some((repository, digest)) = image.split_once('@') {
        return Ok(ImageSource::with_digest(repository, digest)?);
    }

    // The tag is everything after the last colon, unless that segment
    // contains a slash (then the colon belongs to a registry port).
    match image.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => Ok(ImageSource::new(repository, tag)?),
        _ => Ok(ImageSource::new(image, "latest")?),
    }
}
