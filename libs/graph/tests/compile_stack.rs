//! End-to-end compilation of a complete two-tier batch stack.

use std::time::Duration;

use spotgrid_graph::{
    DryRunProvisioner, EnvironmentContext, Provisioner, ResourceGraph, ResourceKind,
};
use spotgrid_id::{IdentityName, PerimeterName, QueueName, SecretName, TemplateName, TierName};
use spotgrid_model::{
    CapacityTier, CredentialVault, DispatchQueue, ExecutionIdentity, ImageSource, JobTemplate,
    MemoryVault, PriceStrategy, SecretValue, TierEntry,
};
use spotgrid_networking::{IngressRule, IngressSource, Ipv4Cidr, NetworkPerimeter, PortRange, Protocol};

const ACCOUNT: &str = "884515231596";
const REGION: &str = "eu-central-1";

/// Builds the reference deployment: one perimeter, two spot tiers, a
/// queue preferring the larger tier, and a secret-consuming template.
fn build_stack() -> ResourceGraph {
    let env = EnvironmentContext::new(ACCOUNT, REGION).unwrap();
    let mut graph = ResourceGraph::new(env);

    let perimeter = NetworkPerimeter::new(
        PerimeterName::new("batch-perimeter").unwrap(),
        Ipv4Cidr::from_cidr("10.0.0.0/16").unwrap(),
    )
    .allow_inbound(
        IngressRule::new(
            IngressSource::AnyIpv4,
            Protocol::Tcp,
            PortRange::single(22).unwrap(),
        )
        .unwrap()
        .with_description("operator ssh"),
    );
    graph.add_perimeter(perimeter).unwrap();

    let high_capacity = CapacityTier::builder(
        TierName::new("high-capacity").unwrap(),
        PriceStrategy::Spot { bid_percentage: 75 },
        PerimeterName::new("batch-perimeter").unwrap(),
    )
    .max_vcpus(8)
    .build()
    .unwrap();
    graph.add_tier(high_capacity).unwrap();

    let default_capacity = CapacityTier::builder(
        TierName::new("default-capacity").unwrap(),
        PriceStrategy::Spot {
            bid_percentage: 100,
        },
        PerimeterName::new("batch-perimeter").unwrap(),
    )
    .max_vcpus(1)
    .build()
    .unwrap();
    graph.add_tier(default_capacity).unwrap();

    let queue = DispatchQueue::new(
        QueueName::new("batch-queue").unwrap(),
        vec![
            TierEntry {
                tier: TierName::new("high-capacity").unwrap(),
                order: 1,
            },
            TierEntry {
                tier: TierName::new("default-capacity").unwrap(),
                order: 2,
            },
        ],
    )
    .unwrap();
    graph.add_queue(queue).unwrap();

    let mut vault = MemoryVault::new(ACCOUNT, REGION);
    let api_key_name = SecretName::new("api-key").unwrap();
    let api_key = vault
        .create_secret(&api_key_name, SecretValue::empty())
        .unwrap();

    let mut identity = ExecutionIdentity::for_job_execution(IdentityName::new("batch-runner").unwrap());
    identity.bind_secret_read(&mut vault, &api_key).unwrap();
    graph.add_identity(identity).unwrap();
    graph.register_secret(api_key_name, api_key.clone()).unwrap();

    let template = JobTemplate::builder(
        TemplateName::new("starter-task").unwrap(),
        ImageSource::new("robofarm/batch-starter", "latest").unwrap(),
    )
    .parameter("MyParam", "")
    .command(["run.sh", "Ref::MyParam"])
    .timeout(Duration::from_secs(600))
    .secret("API_KEY", api_key)
    .execution_identity(IdentityName::new("batch-runner").unwrap())
    .build()
    .unwrap();
    graph.add_template(template).unwrap();

    graph
}

#[test]
fn test_stack_compiles_with_all_resources() {
    let rendered = build_stack().compile().unwrap();

    // 1 perimeter + 2 tiers + 1 queue + 1 identity + 1 secret + 1 template.
    assert_eq!(rendered.resources().len(), 7);

    let kinds: Vec<ResourceKind> = rendered.resources().values().map(|r| r.kind).collect();
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == ResourceKind::CapacityTier)
            .count(),
        2
    );
    assert!(kinds.contains(&ResourceKind::NetworkPerimeter));
    assert!(kinds.contains(&ResourceKind::DispatchQueue));
    assert!(kinds.contains(&ResourceKind::ExecutionIdentity));
    assert!(kinds.contains(&ResourceKind::Secret));
    assert!(kinds.contains(&ResourceKind::JobTemplate));
}

#[test]
fn test_tiers_render_with_zero_floor_and_bids() {
    let rendered = build_stack().compile().unwrap();
    let env = rendered.environment().clone();

    let high = rendered
        .get(&env.srn("capacity-tier", "high-capacity"))
        .unwrap();
    assert_eq!(high.properties["minVcpus"], 0);
    assert_eq!(high.properties["maxVcpus"], 8);
    assert_eq!(high.properties["priceStrategy"]["type"], "spot");
    assert_eq!(high.properties["priceStrategy"]["bidPercentage"], 75);

    let default = rendered
        .get(&env.srn("capacity-tier", "default-capacity"))
        .unwrap();
    assert_eq!(default.properties["minVcpus"], 0);
    assert_eq!(default.properties["maxVcpus"], 1);
    assert_eq!(default.properties["priceStrategy"]["bidPercentage"], 100);
}

#[test]
fn test_queue_orders_tiers_by_preference() {
    let rendered = build_stack().compile().unwrap();
    let env = rendered.environment().clone();

    let queue = rendered
        .get(&env.srn("dispatch-queue", "batch-queue"))
        .unwrap();
    let tiers = queue.properties["tiers"].as_array().unwrap();
    assert_eq!(tiers.len(), 2);
    assert_eq!(tiers[0]["order"], 1);
    assert_eq!(
        tiers[0]["tier"],
        format!("srn:{}:{}:capacity-tier/high-capacity", ACCOUNT, REGION)
    );
    assert_eq!(tiers[1]["order"], 2);
}

#[test]
fn test_template_carries_exactly_its_bound_secrets() {
    let rendered = build_stack().compile().unwrap();
    let env = rendered.environment().clone();

    let template = rendered
        .get(&env.srn("job-template", "starter-task"))
        .unwrap();
    let container = &template.properties["containerProperties"];

    let secrets = container["secrets"].as_array().unwrap();
    assert_eq!(secrets.len(), 1);
    assert_eq!(secrets[0]["name"], "API_KEY");
    assert_eq!(
        secrets[0]["valueFrom"],
        format!("srn:{}:{}:secret/api-key", ACCOUNT, REGION)
    );

    assert_eq!(
        container["executionRoleRef"],
        format!(
            "srn:{}:{}:execution-identity/batch-runner",
            ACCOUNT, REGION
        )
    );

    assert_eq!(container["vcpus"], 1);
    assert_eq!(container["memoryReservationMib"], 512);
    assert_eq!(container["readOnlyRootFilesystem"], true);
    assert_eq!(template.properties["timeoutSeconds"], 600);
}

#[test]
fn test_identity_permissions_cover_logs_image_and_secret() {
    let rendered = build_stack().compile().unwrap();
    let env = rendered.environment().clone();

    let identity = rendered
        .get(&env.srn("execution-identity", "batch-runner"))
        .unwrap();
    assert_eq!(identity.properties["principal"], "job-execution-substrate");

    let permissions = identity.properties["permissions"].as_array().unwrap();
    assert_eq!(permissions.len(), 3);
    assert!(permissions.contains(&serde_json::json!("logs:emit")));
    assert!(permissions.contains(&serde_json::json!("image:pull")));
    assert!(permissions.contains(&serde_json::json!(format!(
        "secret:read:srn:{}:{}:secret/api-key",
        ACCOUNT, REGION
    ))));
}

#[test]
fn test_recompilation_is_idempotent() {
    let graph = build_stack();
    let first = graph.compile().unwrap();
    let second = graph.compile().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.hash(), second.hash());

    // Two independently built stacks converge on the same hash.
    let rebuilt = build_stack().compile().unwrap();
    assert_eq!(first.hash(), rebuilt.hash());
}

#[test]
fn test_dry_run_apply_reports_every_resource() {
    let rendered = build_stack().compile().unwrap();
    let mut provisioner = DryRunProvisioner;

    let report = provisioner.apply(&rendered).unwrap();
    assert_eq!(report.applied, 7);
    assert_eq!(report.graph_hash, rendered.hash().to_string());
}
