//! Capacity tiers.
//!
//! A capacity tier is a named pool of compute capacity with a price
//! strategy, a size ceiling, and a network placement. Multiple tiers
//! with different cost/capacity tradeoffs feed one dispatch queue: a
//! narrow high-bid tier for guaranteed burst plus a wide low-bid tier
//! for cheap scale-out.
//!
//! # Invariants
//!
//! - `min_vcpus` is always 0: an idle tier costs nothing. The builder
//!   accepts a caller-supplied minimum and unconditionally forces it
//!   to zero; this is policy, not a default.
//! - Spot bid ceilings are a percentage of the on-demand price in
//!   (0, 100].

use spotgrid_id::{PerimeterName, TierName};

use crate::error::ValidationError;

/// A job's resource ask, checked against tier capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub vcpus: u32,
    pub memory_mib: u32,
}

/// Pricing policy for a tier's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceStrategy {
    /// Spot-priced capacity with a bid ceiling as a percentage of the
    /// on-demand price.
    Spot { bid_percentage: u8 },

    /// On-demand capacity at list price.
    OnDemand,
}

impl std::fmt::Display for PriceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceStrategy::Spot { bid_percentage } => write!(f, "spot({}%)", bid_percentage),
            PriceStrategy::OnDemand => write!(f, "on-demand"),
        }
    }
}

/// One machine shape a tier may launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceFamily {
    /// Provider family name (e.g., `c5`).
    pub name: String,

    /// vCPUs per instance of this family.
    pub vcpus: u32,

    /// Memory per instance in MiB.
    pub memory_mib: u32,
}

impl InstanceFamily {
    /// Describe a machine shape.
    #[must_use]
    pub fn new(name: impl Into<String>, vcpus: u32, memory_mib: u32) -> Self {
        Self {
            name: name.into(),
            vcpus,
            memory_mib,
        }
    }

    /// Whether one instance of this family covers a reservation.
    #[must_use]
    pub fn satisfies(&self, reservation: Reservation) -> bool {
        self.vcpus >= reservation.vcpus && self.memory_mib >= reservation.memory_mib
    }
}

/// Instance family selection for a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceFamilies {
    /// Defer family selection to the substrate's default algorithm.
    ///
    /// Treated as able to cover any reservation that fits under the
    /// tier's capacity ceiling; the actual selection is external
    /// behavior.
    ProviderOptimal,

    /// An explicit list of machine shapes.
    Explicit(Vec<InstanceFamily>),
}

/// A priced, bounded pool of compute capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityTier {
    name: TierName,
    price_strategy: PriceStrategy,
    min_vcpus: u32,
    max_vcpus: u32,
    network: PerimeterName,
    instance_families: InstanceFamilies,
}

impl CapacityTier {
    /// Start building a tier.
    #[must_use]
    pub fn builder(
        name: TierName,
        price_strategy: PriceStrategy,
        network: PerimeterName,
    ) -> CapacityTierBuilder {
        CapacityTierBuilder::new(name, price_strategy, network)
    }

    /// The tier's stable name.
    #[must_use]
    pub fn name(&self) -> &TierName {
        &self.name
    }

    /// The tier's pricing policy.
    #[must_use]
    pub fn price_strategy(&self) -> PriceStrategy {
        self.price_strategy
    }

    /// Minimum pool size in vCPUs. Always 0.
    #[must_use]
    pub fn min_vcpus(&self) -> u32 {
        self.min_vcpus
    }

    /// Maximum pool size in vCPUs.
    #[must_use]
    pub fn max_vcpus(&self) -> u32 {
        self.max_vcpus
    }

    /// The network perimeter this tier's instances are placed in.
    #[must_use]
    pub fn network(&self) -> &PerimeterName {
        &self.network
    }

    /// The tier's instance family selection.
    #[must_use]
    pub fn instance_families(&self) -> &InstanceFamilies {
        &self.instance_families
    }

    /// Whether this tier could ever admit a job with this reservation,
    /// given unlimited time and an empty pool.
    #[must_use]
    pub fn can_ever_satisfy(&self, reservation: Reservation) -> bool {
        if reservation.vcpus > self.max_vcpus {
            return false;
        }
        match &self.instance_families {
            InstanceFamilies::ProviderOptimal => true,
            InstanceFamilies::Explicit(families) => {
                families.iter().any(|f| f.satisfies(reservation))
            }
        }
    }
}

/// Builder for [`CapacityTier`].
#[derive(Debug)]
pub struct CapacityTierBuilder {
    name: TierName,
    price_strategy: PriceStrategy,
    network: PerimeterName,
    requested_min_vcpus: u32,
    max_vcpus: u32,
    instance_families: Option<Vec<InstanceFamily>>,
}

impl CapacityTierBuilder {
    /// Start a builder. Defaults: max 1 vCPU, provider-optimal families.
    #[must_use]
    pub fn new(name: TierName, price_strategy: PriceStrategy, network: PerimeterName) -> Self {
        Self {
            name,
            price_strategy,
            network,
            requested_min_vcpus: 0,
            max_vcpus: 1,
            instance_families: None,
        }
    }

    /// Request a minimum pool size.
    ///
    /// Accepted for interface symmetry and unconditionally forced to 0
    /// in the built tier: idle tiers must scale to zero cost.
    #[must_use]
    pub fn min_vcpus(mut self, min_vcpus: u32) -> Self {
        self.requested_min_vcpus = min_vcpus;
        self
    }

    /// Set the capacity ceiling in vCPUs.
    #[must_use]
    pub fn max_vcpus(mut self, max_vcpus: u32) -> Self {
        self.max_vcpus = max_vcpus;
        self
    }

    /// Add an explicit instance family.
    ///
    /// When no family is added the tier stays provider-optimal.
    #[must_use]
    pub fn instance_family(mut self, family: InstanceFamily) -> Self {
        self.instance_families
            .get_or_insert_with(Vec::new)
            .push(family);
        self
    }

    /// Validate and build the tier.
    pub fn build(self) -> Result<CapacityTier, ValidationError> {
        if let PriceStrategy::Spot { bid_percentage } = self.price_strategy {
            if bid_percentage == 0 || bid_percentage > 100 {
                return Err(ValidationError::BidOutOfRange {
                    value: bid_percentage as u32,
                });
            }
        }

        if self.max_vcpus == 0 {
            return Err(ValidationError::ZeroMaxVcpus);
        }

        let instance_families = match self.instance_families {
            None => InstanceFamilies::ProviderOptimal,
            Some(families) => {
                for family in &families {
                    if family.vcpus == 0 || family.memory_mib == 0 {
                        return Err(ValidationError::EmptyInstanceFamily {
                            name: family.name.clone(),
                        });
                    }
                }
                InstanceFamilies::Explicit(families)
            }
        };

        Ok(CapacityTier {
            name: self.name,
            price_strategy: self.price_strategy,
            // Forced regardless of the requested minimum.
            min_vcpus: 0,
            max_vcpus: self.max_vcpus,
            network: self.network,
            instance_families,
        })
    }
}
